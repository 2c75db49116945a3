// SPDX-License-Identifier: Apache-2.0

//! Device session wrapper: owns a running frame source for its lifetime,
//! serves the latest aligned frame pair on demand, and projects captures
//! into colored point clouds.
//!
//! A session moves through `Running -> Stopped` and never back. Shutdown is
//! idempotent and also runs from `Drop`, so exclusive device access is
//! released on every exit path. Retrieval is single-caller: the session
//! advances shared source state and is not reentrant without external
//! synchronization.

use crate::{
    calib::Calibration,
    camera::{Error, FramePair, FrameSource, Resolution},
    cloud::{project_frame, PointCloud},
};
use log::debug;
use ndarray::{Array2, Array3};
use std::time::Duration;

/// Session construction parameters.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Depth stream resolution
    pub depth_resolution: Resolution,
    /// Color stream resolution
    pub color_resolution: Resolution,
    /// Stream frame rate in Hz
    pub frame_rate: u32,
    /// Device serial number; `None` selects the first attached device
    pub serial: Option<String>,
    /// Bound on each blocking frame retrieval
    pub frame_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            depth_resolution: Resolution::default(),
            color_resolution: Resolution::default(),
            frame_rate: 30,
            serial: None,
            frame_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    /// Reject configurations no device can serve.
    pub fn validate(&self) -> Result<(), Error> {
        if self.depth_resolution.pixel_count() == 0 {
            return Err(Error::Config(format!(
                "invalid depth resolution {}",
                self.depth_resolution
            )));
        }
        if self.color_resolution.pixel_count() == 0 {
            return Err(Error::Config(format!(
                "invalid color resolution {}",
                self.color_resolution
            )));
        }
        if self.frame_rate == 0 {
            return Err(Error::Config("frame rate must be non-zero".to_string()));
        }
        if self.frame_timeout.is_zero() {
            return Err(Error::Config("frame timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// One full retrieval result: the colored point cloud plus the raw grids
/// it was derived from.
///
/// This is the unified return shape for the "get all data" operation; the
/// point and color sequences inside [`Capture::cloud`] are always equal in
/// length and index-aligned.
#[derive(Clone, Debug)]
pub struct Capture {
    /// Colored point cloud derived from the frame pair
    pub cloud: PointCloud,
    /// Raw depth grid, shape `(height, width)`
    pub depth: Array2<u16>,
    /// Raw color grid, shape `(height, width, 3)`
    pub color: Array3<u8>,
    /// Timestamp in nanoseconds
    pub timestamp: u64,
    /// Frame sequence ID
    pub frame_id: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Running,
    Stopped,
}

/// An open, running connection to one depth camera.
///
/// Constructed over a started [`FrameSource`]; the session owns the source
/// exclusively and releases it on [`DeviceSession::close`] or drop.
pub struct DeviceSession {
    source: Box<dyn FrameSource>,
    config: SessionConfig,
    calibration: Option<Calibration>,
    state: State,
}

impl DeviceSession {
    /// Wrap an already-opened frame source.
    ///
    /// Fails with `Config` on invalid parameters; in that case the source
    /// is dropped and nothing remains claimed.
    pub fn with_source(
        source: Box<dyn FrameSource>,
        config: SessionConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        debug!(
            "session running on device {} at {}/{} {} fps",
            source.serial(),
            config.depth_resolution,
            config.color_resolution,
            config.frame_rate
        );
        Ok(Self {
            source,
            config,
            calibration: None,
            state: State::Running,
        })
    }

    /// Discover a RealSense device, configure depth + color streams, and
    /// start frame delivery.
    ///
    /// Fails with `DeviceNotFound` when no device (or no device with the
    /// configured serial) is attached, and `DeviceBusy` when the device is
    /// already claimed by another session. On failure no device resource
    /// remains claimed.
    #[cfg(feature = "realsense")]
    pub fn open(config: SessionConfig) -> Result<Self, Error> {
        config.validate()?;
        let source = crate::realsense::RealSenseSource::open(&config)?;
        Self::with_source(Box::new(source), config)
    }

    /// Serial number of the device this session owns.
    pub fn serial(&self) -> &str {
        self.source.serial()
    }

    /// The configuration this session was opened with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the session is still running.
    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Retrieve the latest aligned depth + color frame pair.
    ///
    /// Drains any buffered backlog first so stale frames are dropped; if
    /// nothing is pending, blocks up to the configured timeout. A
    /// `FrameTimeout` leaves the session running and the caller may retry.
    /// After [`Self::close`] this fails with `SessionClosed`.
    pub fn frame_pair(&mut self) -> Result<FramePair, Error> {
        if self.state != State::Running {
            return Err(Error::SessionClosed);
        }

        let mut latest = None;
        while let Some(pair) = self.source.try_frame()? {
            latest = Some(pair);
        }

        match latest {
            Some(pair) => Ok(pair),
            None => self.source.wait_frame(self.config.frame_timeout),
        }
    }

    /// Retrieve the latest frame pair and project it into a colored point
    /// cloud, returning the cloud together with the raw grids.
    ///
    /// Fails with the same timeout error as [`Self::frame_pair`], or with
    /// `Projection` when the device supplies no usable calibration. A
    /// projection failure leaves the session usable for raw retrievals.
    pub fn capture(&mut self) -> Result<Capture, Error> {
        let pair = self.frame_pair()?;
        let calib = self.calibration()?;
        let cloud = project_frame(&pair, &calib)?;

        Ok(Capture {
            cloud,
            depth: pair.depth,
            color: pair.color,
            timestamp: pair.timestamp,
            frame_id: pair.frame_id,
        })
    }

    /// Calibration of the running streams, fetched from the device on
    /// first use and cached for the session's lifetime.
    pub fn calibration(&mut self) -> Result<Calibration, Error> {
        if let Some(calib) = self.calibration {
            return Ok(calib);
        }
        let calib = self.source.calibration()?;
        calib.validate()?;
        self.calibration = Some(calib);
        Ok(calib)
    }

    /// Stop frame delivery and release the device.
    ///
    /// Idempotent: closing an already-stopped session is a no-op. Also
    /// invoked from `Drop`.
    pub fn close(&mut self) {
        if self.state == State::Running {
            self.source.stop();
            self.state = State::Stopped;
            debug!("session on device {} closed", self.source.serial());
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_source::SyntheticSource;

    fn running_session(frames: u32) -> DeviceSession {
        let source = SyntheticSource::procedural(Resolution::new(32, 24), frames);
        let config = SessionConfig {
            depth_resolution: Resolution::new(32, 24),
            color_resolution: Resolution::new(32, 24),
            frame_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        DeviceSession::with_source(Box::new(source), config).unwrap()
    }

    #[test]
    fn test_config_validation() {
        let config = SessionConfig {
            frame_rate: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = SessionConfig {
            depth_resolution: Resolution::new(0, 480),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let source = SyntheticSource::procedural(Resolution::new(32, 24), 1);
        let config = SessionConfig {
            frame_rate: 0,
            ..Default::default()
        };
        assert!(matches!(
            DeviceSession::with_source(Box::new(source), config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = running_session(1);
        assert!(session.is_running());
        session.close();
        assert!(!session.is_running());
        session.close();
        assert!(!session.is_running());
    }

    #[test]
    fn test_retrieval_after_close_fails() {
        let mut session = running_session(3);
        session.close();
        assert!(matches!(session.frame_pair(), Err(Error::SessionClosed)));
        assert!(matches!(session.capture(), Err(Error::SessionClosed)));
    }

    #[test]
    fn test_timeout_does_not_close_session() {
        let mut session = running_session(0);
        assert!(matches!(
            session.frame_pair(),
            Err(Error::FrameTimeout(_))
        ));
        assert!(session.is_running());
    }

    #[test]
    fn test_calibration_is_cached() {
        let mut session = running_session(1);
        let first = session.calibration().unwrap();
        let second = session.calibration().unwrap();
        assert_eq!(first, second);
    }
}
