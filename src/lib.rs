// SPDX-License-Identifier: Apache-2.0

//! Depth Camera Capture Library
//!
//! This library provides a session wrapper for depth cameras: synchronized
//! depth + color frame retrieval and colored point cloud projection.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐     ┌────────────────┐     ┌──────────────────┐
//! │   FrameSource     │ ──► │ DeviceSession  │ ──► │  FramePair /     │
//! │ (SDK / synthetic) │     │ (state machine)│     │  Capture         │
//! └───────────────────┘     └────────────────┘     └──────────────────┘
//!                                   │
//!                                   ▼
//!                  ┌────────────────────────────────────┐
//!                  │ cloud::project_frame               │
//!                  │ (pinhole deproject + color mapping)│
//!                  └────────────────────────────────────┘
//! ```
//!
//! The session owns its frame source for its whole lifetime: construction
//! claims the device, retrievals return the latest aligned pair (stale
//! backlog dropped), and `close`/`Drop` release the device on every exit
//! path. The point and color sequences inside a capture are always equal
//! in length and index-aligned.
//!
//! # Modules
//!
//! - [`camera`]: Common types, the `FrameSource` trait, error handling
//! - [`calib`]: Intrinsics, extrinsics, per-device calibration
//! - [`cloud`]: Point cloud container and projection
//! - [`frame_source`]: Synthetic and failure-injection sources
//! - [`session`]: The device session wrapper
//! - `realsense`: RealSense SDK source (with feature flag)
//!
//! # Example
//!
//! ```
//! use depthpub::{
//!     camera::Resolution,
//!     frame_source::SyntheticSource,
//!     session::{DeviceSession, SessionConfig},
//! };
//!
//! let resolution = Resolution::new(64, 48);
//! let source = SyntheticSource::procedural(resolution, 1);
//! let config = SessionConfig {
//!     depth_resolution: resolution,
//!     color_resolution: resolution,
//!     ..Default::default()
//! };
//!
//! let mut session = DeviceSession::with_source(Box::new(source), config).unwrap();
//! let capture = session.capture().unwrap();
//! assert_eq!(capture.cloud.positions().len(), capture.cloud.colors().len());
//! session.close();
//! ```

pub mod calib;
pub mod camera;
pub mod cloud;
pub mod frame_source;
#[cfg(feature = "realsense")]
pub mod realsense;
pub mod session;

// Re-exports for convenience
pub use calib::{Calibration, Extrinsics, Intrinsics};
pub use camera::{Error, FramePair, FrameSource, Resolution};
pub use cloud::{project_frame, PointCloud};
pub use frame_source::{DisconnectedSource, LoopingSyntheticSource, SyntheticSource};
#[cfg(feature = "realsense")]
pub use realsense::RealSenseSource;
pub use session::{Capture, DeviceSession, SessionConfig};
