// SPDX-License-Identifier: Apache-2.0

//! Common camera types and the frame-source trait abstraction.
//!
//! This module provides device-agnostic types for depth camera capture,
//! enabling a unified interface across SDK-backed and synthetic sources.

use crate::calib::Calibration;
use ndarray::{Array2, Array3};
use std::{fmt, time::Duration};

/// Stream resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels at this resolution.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A synchronized depth + color frame pair.
///
/// The depth grid holds raw device depth units (multiply by the
/// calibration's depth scale for meters); zero means no return at that
/// pixel. The color grid is `(height, width, 3)` RGB. Frame pairs are
/// transient: the session produces one per retrieval and retains nothing.
#[derive(Clone, Debug)]
pub struct FramePair {
    /// Timestamp in nanoseconds
    pub timestamp: u64,
    /// Frame sequence ID (wraps at u32::MAX)
    pub frame_id: u32,
    /// Depth grid, shape `(height, width)`
    pub depth: Array2<u16>,
    /// Color grid, shape `(height, width, 3)`, RGB order
    pub color: Array3<u8>,
}

impl FramePair {
    /// Resolution of the depth grid.
    pub fn depth_resolution(&self) -> Resolution {
        let (rows, cols) = self.depth.dim();
        Resolution::new(cols as u32, rows as u32)
    }

    /// Resolution of the color grid.
    pub fn color_resolution(&self) -> Resolution {
        let (rows, cols, _) = self.color.dim();
        Resolution::new(cols as u32, rows as u32)
    }
}

/// Common error type for camera operations
///
/// This enum consolidates construction, retrieval, and projection errors
/// into a single type for consistent error handling.
#[derive(Debug)]
pub enum Error {
    /// No matching device found at construction
    DeviceNotFound(String),
    /// Device already claimed by another session
    DeviceBusy(String),
    /// No frame arrived within the timeout bound (recoverable by retry)
    FrameTimeout(Duration),
    /// Missing or invalid calibration data
    Projection(String),
    /// Retrieval attempted on a closed session
    SessionClosed,
    /// Configuration error
    Config(String),
    /// I/O error
    Io(std::io::Error),
    /// Shape error from ndarray operations
    Shape(ndarray::ShapeError),
    /// System time error
    SystemTime(std::time::SystemTimeError),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DeviceNotFound(what) => write!(f, "device not found: {}", what),
            Error::DeviceBusy(what) => write!(f, "device busy: {}", what),
            Error::FrameTimeout(bound) => {
                write!(f, "no frame within {} ms", bound.as_millis())
            }
            Error::Projection(msg) => write!(f, "projection error: {}", msg),
            Error::SessionClosed => write!(f, "session is closed"),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Shape(err) => write!(f, "shape error: {}", err),
            Error::SystemTime(err) => write!(f, "system time error: {}", err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::Shape(err)
    }
}

impl From<std::time::SystemTimeError> for Error {
    fn from(err: std::time::SystemTimeError) -> Self {
        Error::SystemTime(err)
    }
}

/// Trait for synchronized depth + color frame sources.
///
/// Implementations sit between the session wrapper and the actual frame
/// producer (vendor SDK pipeline, synthetic generator). Frame delivery is
/// blocking with a bounded timeout; the session drains [`Self::try_frame`]
/// first so the caller always receives the newest available pair.
pub trait FrameSource: Send {
    /// Block until the next frame pair arrives, up to `timeout`.
    ///
    /// # Returns
    /// - `Ok(pair)` - A synchronized depth + color frame pair
    /// - `Err(Error::FrameTimeout)` - Nothing arrived within the bound
    fn wait_frame(&mut self, timeout: Duration) -> Result<FramePair, Error>;

    /// Return a frame pair if one is immediately available.
    ///
    /// Never blocks. Used to drop stale backlog ahead of a retrieval.
    fn try_frame(&mut self) -> Result<Option<FramePair>, Error>;

    /// Calibration of the configured streams.
    ///
    /// # Returns
    /// - `Err(Error::Projection)` - The device supplies no calibration
    fn calibration(&self) -> Result<Calibration, Error>;

    /// Serial number of the underlying device.
    fn serial(&self) -> &str;

    /// Release the device. Idempotent; further calls are no-ops.
    fn stop(&mut self);
}

/// Get current timestamp in nanoseconds.
///
/// On Linux, uses `CLOCK_MONOTONIC_RAW` for best accuracy.
/// On other platforms, falls back to `SystemTime`.
#[cfg(target_os = "linux")]
pub fn timestamp() -> Result<u64, Error> {
    let mut tp = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let err = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC_RAW, &mut tp) };
    if err != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    Ok(tp.tv_sec as u64 * 1_000_000_000 + tp.tv_nsec as u64)
}

#[cfg(not(target_os = "linux"))]
pub fn timestamp() -> Result<u64, Error> {
    let now = std::time::SystemTime::now();
    let duration = now.duration_since(std::time::UNIX_EPOCH)?;
    Ok(duration.as_nanos() as u64)
}
