// SPDX-License-Identifier: Apache-2.0

//! RealSense SDK frame source.
//!
//! Wraps a librealsense2 pipeline as a [`FrameSource`]: device discovery
//! by optional serial number, Z16 depth + RGB8 color stream configuration,
//! and calibration readout from the stream profiles. Requires the native
//! SDK at build time, hence the `realsense` cargo feature.

use crate::{
    calib::{Calibration, Extrinsics, Intrinsics},
    camera::{timestamp, Error, FramePair, FrameSource},
    session::SessionConfig,
};
use log::warn;
use ndarray::{Array2, Array3};
use realsense_rust::{
    config::Config,
    context::Context,
    frame::{ColorFrame, CompositeFrame, DepthFrame},
    kind::{Rs2CameraInfo, Rs2Format, Rs2Option, Rs2StreamKind},
    pipeline::{ActivePipeline, InactivePipeline},
};
use std::{
    collections::HashSet,
    ffi::CString,
    time::{Duration, Instant},
};

/// Depth scale reported by D400-series devices when the option readout
/// fails (millimeter units).
const FALLBACK_DEPTH_SCALE: f32 = 0.001;

/// A running RealSense pipeline serving synchronized depth + color frames.
pub struct RealSenseSource {
    pipeline: Option<ActivePipeline>,
    calibration: Calibration,
    serial: String,
    frame_id: u32,
}

impl RealSenseSource {
    /// Discover a device, configure the streams from `config`, and start
    /// frame delivery. Claims exclusive access to the device.
    pub fn open(config: &SessionConfig) -> Result<Self, Error> {
        let context = Context::new().map_err(|e| Error::Config(e.to_string()))?;
        let devices = context.query_devices(HashSet::new());

        let mut serial = None;
        for device in devices {
            let Some(sn) = device.info(Rs2CameraInfo::SerialNumber) else {
                continue;
            };
            let sn = sn.to_string_lossy().into_owned();
            match &config.serial {
                Some(wanted) if *wanted != sn => continue,
                _ => {
                    serial = Some(sn);
                    break;
                }
            }
        }

        let Some(serial) = serial else {
            let wanted = config.serial.as_deref().unwrap_or("any");
            return Err(Error::DeviceNotFound(format!("serial {}", wanted)));
        };

        let serial_cstr = CString::new(serial.clone())
            .map_err(|e| Error::Config(format!("invalid serial: {}", e)))?;

        let mut stream_config = Config::new();
        stream_config
            .enable_device_from_serial(&serial_cstr)
            .map_err(start_error)?
            .disable_all_streams()
            .map_err(start_error)?
            .enable_stream(
                Rs2StreamKind::Depth,
                None,
                config.depth_resolution.width as usize,
                config.depth_resolution.height as usize,
                Rs2Format::Z16,
                config.frame_rate as usize,
            )
            .map_err(start_error)?
            .enable_stream(
                Rs2StreamKind::Color,
                None,
                config.color_resolution.width as usize,
                config.color_resolution.height as usize,
                Rs2Format::Rgb8,
                config.frame_rate as usize,
            )
            .map_err(start_error)?;

        let pipeline = InactivePipeline::try_from(&context).map_err(start_error)?;
        let pipeline = pipeline.start(Some(stream_config)).map_err(start_error)?;

        let calibration = read_calibration(&pipeline)?;

        Ok(Self {
            pipeline: Some(pipeline),
            calibration,
            serial,
            frame_id: 0,
        })
    }

    /// Convert a composite frame into a frame pair, or `None` when either
    /// stream is missing from the composite.
    fn convert(&mut self, frames: &CompositeFrame) -> Result<Option<FramePair>, Error> {
        let mut depth_frames = frames.frames_of_type::<DepthFrame>();
        let mut color_frames = frames.frames_of_type::<ColorFrame>();
        let (Some(depth), Some(color)) = (depth_frames.pop(), color_frames.pop()) else {
            return Ok(None);
        };

        let depth_grid = unsafe {
            let ptr: *const _ = depth.get_data();
            let buf = std::slice::from_raw_parts(
                ptr.cast::<u16>(),
                depth.get_data_size() / std::mem::size_of::<u16>(),
            )
            .to_vec();
            Array2::from_shape_vec((depth.height(), depth.width()), buf)?
        };

        let color_grid = unsafe {
            let ptr: *const _ = color.get_data();
            let buf =
                std::slice::from_raw_parts(ptr.cast::<u8>(), color.get_data_size()).to_vec();
            Array3::from_shape_vec((color.height(), color.width(), 3), buf)?
        };

        let pair = FramePair {
            timestamp: timestamp()?,
            frame_id: self.frame_id,
            depth: depth_grid,
            color: color_grid,
        };
        self.frame_id = self.frame_id.wrapping_add(1);

        Ok(Some(pair))
    }
}

impl FrameSource for RealSenseSource {
    fn wait_frame(&mut self, timeout: Duration) -> Result<FramePair, Error> {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(pipeline) = self.pipeline.as_mut() else {
                return Err(Error::SessionClosed);
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::FrameTimeout(timeout));
            }

            let frames = match pipeline.wait(Some(remaining)) {
                Ok(frames) => frames,
                Err(e) => {
                    // Disconnection surfaces as a wait failure; either way
                    // the caller sees a bounded timeout and may retry.
                    warn!("frame wait failed: {}", e);
                    return Err(Error::FrameTimeout(timeout));
                }
            };

            // Composite without both streams: keep waiting out the bound
            if let Some(pair) = self.convert(&frames)? {
                return Ok(pair);
            }
        }
    }

    fn try_frame(&mut self) -> Result<Option<FramePair>, Error> {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(Error::SessionClosed);
        };
        match pipeline.poll() {
            Some(frames) => self.convert(&frames),
            None => Ok(None),
        }
    }

    fn calibration(&self) -> Result<Calibration, Error> {
        Ok(self.calibration)
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    fn stop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.stop();
        }
    }
}

impl Drop for RealSenseSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Map a construction-time SDK error to the session error taxonomy.
///
/// librealsense reports an already-claimed device as a busy resource; any
/// other start failure is a configuration problem.
fn start_error(err: impl std::fmt::Display) -> Error {
    let msg = err.to_string();
    if msg.to_lowercase().contains("busy") {
        Error::DeviceBusy(msg)
    } else {
        Error::Config(msg)
    }
}

/// Read intrinsics, extrinsics, and the depth scale from a started
/// pipeline's stream profiles.
fn read_calibration(pipeline: &ActivePipeline) -> Result<Calibration, Error> {
    let profile = pipeline.profile();

    let mut depth_profile = None;
    let mut color_profile = None;
    for stream in profile.streams() {
        match stream.kind() {
            Rs2StreamKind::Depth => depth_profile = Some(stream),
            Rs2StreamKind::Color => color_profile = Some(stream),
            _ => {}
        }
    }

    let (Some(depth_profile), Some(color_profile)) = (depth_profile, color_profile) else {
        return Err(Error::Projection(
            "pipeline profile is missing a configured stream".to_string(),
        ));
    };

    let depth = intrinsics_from(&depth_profile)?;
    let color = intrinsics_from(&color_profile)?;

    let extr = depth_profile
        .extrinsics(&color_profile)
        .map_err(|e| Error::Projection(format!("extrinsics unavailable: {}", e)))?;
    let depth_to_color = Extrinsics {
        rotation: extr.rotation(),
        translation: extr.translation(),
    };

    let depth_scale = profile
        .device()
        .sensors()
        .iter()
        .find_map(|sensor| sensor.get_option(Rs2Option::DepthUnits))
        .unwrap_or_else(|| {
            warn!(
                "depth units not reported, assuming {} m/unit",
                FALLBACK_DEPTH_SCALE
            );
            FALLBACK_DEPTH_SCALE
        });

    Ok(Calibration {
        depth,
        color,
        depth_to_color,
        depth_scale,
    })
}

fn intrinsics_from(stream: &realsense_rust::stream_profile::StreamProfile) -> Result<Intrinsics, Error> {
    let intr = stream
        .intrinsics()
        .map_err(|e| Error::Projection(format!("intrinsics unavailable: {}", e)))?;

    Ok(Intrinsics {
        width: intr.width() as u32,
        height: intr.height() as u32,
        fx: intr.fx(),
        fy: intr.fy(),
        cx: intr.ppx(),
        cy: intr.ppy(),
        distortion: intr.coeffs(),
    })
}
