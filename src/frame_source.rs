// SPDX-License-Identifier: Apache-2.0

//! Frame sources that need no hardware.
//!
//! This module provides [`FrameSource`] implementations for operation
//! without a physical camera, enabling:
//!
//! - **Testing**: Replaying pre-built frame pairs
//! - **Demos**: Looping procedural frames
//! - **Failure injection**: A source that never yields (timeout path)
//!
//! # Example
//!
//! ```
//! use depthpub::{
//!     camera::{FrameSource, Resolution},
//!     frame_source::SyntheticSource,
//! };
//! use std::time::Duration;
//!
//! let mut source = SyntheticSource::procedural(Resolution::new(64, 48), 2);
//! let pair = source.wait_frame(Duration::from_millis(100)).unwrap();
//! assert_eq!(pair.depth.dim(), (48, 64));
//! ```

use crate::{
    calib::Calibration,
    camera::{timestamp, Error, FramePair, FrameSource, Resolution},
};
use ndarray::{Array2, Array3};
use std::time::Duration;

/// Build one procedural frame pair: a depth gradient with an invalid
/// (zero) left column, and a color pattern encoding row/col/frame.
pub fn procedural_pair(resolution: Resolution, frame_id: u32) -> FramePair {
    let width = resolution.width as usize;
    let height = resolution.height as usize;

    let mut depth = Array2::<u16>::zeros((height, width));
    let mut color = Array3::<u8>::zeros((height, width, 3));

    for row in 0..height {
        for col in 0..width {
            // Column 0 simulates pixels with no depth return
            depth[[row, col]] = if col == 0 {
                0
            } else {
                400 + (row + col) as u16
            };
            color[[row, col, 0]] = (row % 256) as u8;
            color[[row, col, 1]] = (col % 256) as u8;
            color[[row, col, 2]] = (frame_id % 256) as u8;
        }
    }

    FramePair {
        timestamp: timestamp().unwrap_or(0),
        frame_id,
        depth,
        color,
    }
}

/// Finite frame source for unit testing.
///
/// Serves a sequence of pre-built frame pairs, then reports timeouts.
pub struct SyntheticSource {
    frames: Vec<FramePair>,
    index: usize,
    calibration: Option<Calibration>,
    serial: String,
    stopped: bool,
    paced: bool,
}

impl SyntheticSource {
    /// Create a source serving the given frames with the given calibration.
    pub fn new(frames: Vec<FramePair>, calibration: Calibration) -> Self {
        Self {
            frames,
            index: 0,
            calibration: Some(calibration),
            serial: "synthetic".to_string(),
            stopped: false,
            paced: false,
        }
    }

    /// Create a source whose device reports no calibration data.
    pub fn without_calibration(frames: Vec<FramePair>) -> Self {
        Self {
            frames,
            index: 0,
            calibration: None,
            serial: "synthetic".to_string(),
            stopped: false,
            paced: false,
        }
    }

    /// Switch to paced delivery: frames arrive one per blocking wait and
    /// never report as pending backlog, like a live camera keeping up with
    /// its consumer. The default (unpaced) mode exposes all queued frames
    /// through `try_frame`, modelling a consumer that fell behind.
    pub fn paced(mut self) -> Self {
        self.paced = true;
        self
    }

    /// Create a source with `count` procedurally generated frames and an
    /// ideal calibration at the given resolution.
    pub fn procedural(resolution: Resolution, count: u32) -> Self {
        let frames = (0..count).map(|id| procedural_pair(resolution, id)).collect();
        Self::new(frames, Calibration::ideal(resolution))
    }

    /// Reset the source to the beginning.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Get the number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether the source has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Frames not yet served.
    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.index)
    }

    fn pop(&mut self) -> Option<FramePair> {
        if self.stopped || self.index >= self.frames.len() {
            return None;
        }
        let pair = self.frames[self.index].clone();
        self.index += 1;
        Some(pair)
    }
}

impl FrameSource for SyntheticSource {
    fn wait_frame(&mut self, timeout: Duration) -> Result<FramePair, Error> {
        match self.pop() {
            Some(pair) => Ok(pair),
            None => Err(Error::FrameTimeout(timeout)),
        }
    }

    fn try_frame(&mut self) -> Result<Option<FramePair>, Error> {
        if self.paced {
            return Ok(None);
        }
        Ok(self.pop())
    }

    fn calibration(&self) -> Result<Calibration, Error> {
        self.calibration
            .ok_or_else(|| Error::Projection("device supplies no calibration".to_string()))
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Looping frame source that repeats its frames indefinitely.
///
/// Useful for demos or soak testing without hardware. Frame IDs count up
/// across loops instead of repeating.
pub struct LoopingSyntheticSource {
    frames: Vec<FramePair>,
    index: usize,
    calibration: Calibration,
    serial: String,
    stopped: bool,
}

impl LoopingSyntheticSource {
    /// Create a looping source over the given frames.
    pub fn new(frames: Vec<FramePair>, calibration: Calibration) -> Self {
        Self {
            frames,
            index: 0,
            calibration,
            serial: "synthetic-loop".to_string(),
            stopped: false,
        }
    }

    /// Looping source over `count` procedural frames.
    pub fn procedural(resolution: Resolution, count: u32) -> Self {
        let frames = (0..count).map(|id| procedural_pair(resolution, id)).collect();
        Self::new(frames, Calibration::ideal(resolution))
    }
}

impl FrameSource for LoopingSyntheticSource {
    fn wait_frame(&mut self, timeout: Duration) -> Result<FramePair, Error> {
        if self.stopped || self.frames.is_empty() {
            return Err(Error::FrameTimeout(timeout));
        }
        let mut pair = self.frames[self.index % self.frames.len()].clone();
        pair.frame_id = self.index as u32;
        pair.timestamp = timestamp().unwrap_or(pair.timestamp);
        self.index += 1;
        Ok(pair)
    }

    fn try_frame(&mut self) -> Result<Option<FramePair>, Error> {
        // A looping source always has a next frame; report nothing pending
        // so consumers block in wait_frame at their own pace.
        Ok(None)
    }

    fn calibration(&self) -> Result<Calibration, Error> {
        Ok(self.calibration)
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Source simulating a disconnected device: every wait blocks for the full
/// timeout and then fails.
pub struct DisconnectedSource {
    serial: String,
}

impl DisconnectedSource {
    pub fn new() -> Self {
        Self {
            serial: "disconnected".to_string(),
        }
    }
}

impl Default for DisconnectedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for DisconnectedSource {
    fn wait_frame(&mut self, timeout: Duration) -> Result<FramePair, Error> {
        std::thread::sleep(timeout);
        Err(Error::FrameTimeout(timeout))
    }

    fn try_frame(&mut self) -> Result<Option<FramePair>, Error> {
        Ok(None)
    }

    fn calibration(&self) -> Result<Calibration, Error> {
        Err(Error::Projection(
            "disconnected device has no calibration".to_string(),
        ))
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    fn stop(&mut self) {}
}
