// SPDX-License-Identifier: Apache-2.0

//! Depth camera viewer: captures synchronized depth + color frames and
//! logs the raw images plus the colored point cloud to a rerun viewer.

mod args;

use args::Args;
use clap::Parser;
use depthpub::{
    camera::Resolution,
    frame_source::LoopingSyntheticSource,
    session::{DeviceSession, SessionConfig},
    Error,
};
use log::{info, warn};
use rerun::{external::re_sdk_comms::DEFAULT_SERVER_PORT, RecordingStream};
use std::{net::SocketAddr, thread::sleep, time::Duration};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let rr: RecordingStream = if let Some(addr) = args.connect {
        let port = args.port.unwrap_or(DEFAULT_SERVER_PORT);
        let remote = SocketAddr::new(addr.into(), port);
        rerun::RecordingStreamBuilder::new("depthview")
            .connect_tcp_opts(remote, rerun::default_flush_timeout())?
    } else if let Some(record) = &args.record {
        rerun::RecordingStreamBuilder::new("depthview").save(record)?
    } else if args.viewer {
        rerun::RecordingStreamBuilder::new("depthview").spawn()?
    } else {
        eprintln!("one of --connect, --record, or --viewer is required");
        std::process::exit(1);
    };

    let resolution = Resolution::new(args.width, args.height);
    let config = SessionConfig {
        depth_resolution: resolution,
        color_resolution: resolution,
        frame_rate: args.fps,
        serial: args.serial.clone(),
        frame_timeout: Duration::from_millis(args.timeout_ms),
    };

    let mut session = open_session(&args, config)?;
    info!("session open on device {}", session.serial());

    let depth_units_per_meter = 1.0 / session.calibration()?.depth_scale;
    let frame_interval = Duration::from_millis(1000 / args.fps.max(1) as u64);
    let paced = args.synthetic || cfg!(not(feature = "realsense"));

    loop {
        let capture = match session.capture() {
            Ok(capture) => capture,
            Err(Error::FrameTimeout(bound)) => {
                warn!("no frame within {} ms, retrying", bound.as_millis());
                continue;
            }
            Err(e) => {
                session.close();
                return Err(e.into());
            }
        };

        rr.set_time_seconds("stable_time", capture.timestamp as f64 / 1e9);

        rr.log(
            "camera/depth",
            &rerun::DepthImage::try_from(capture.depth)?.with_meter(depth_units_per_meter),
        )?;

        rr.log(
            "camera/color",
            &rerun::Image::from_color_model_and_tensor(rerun::ColorModel::RGB, capture.color)?,
        )?;

        let points = rerun::Points3D::new(capture.cloud.positions()).with_colors(
            capture
                .cloud
                .colors()
                .into_iter()
                .map(|[r, g, b]| rerun::Color::from_rgb(r, g, b)),
        );
        rr.log("camera/points", &points)?;

        if paced {
            sleep(frame_interval);
        }
    }
}

#[cfg(feature = "realsense")]
fn open_session(args: &Args, config: SessionConfig) -> Result<DeviceSession, Error> {
    if args.synthetic {
        synthetic_session(config)
    } else {
        DeviceSession::open(config)
    }
}

#[cfg(not(feature = "realsense"))]
fn open_session(args: &Args, config: SessionConfig) -> Result<DeviceSession, Error> {
    if !args.synthetic {
        warn!("built without realsense support, using synthetic frames");
    }
    synthetic_session(config)
}

fn synthetic_session(config: SessionConfig) -> Result<DeviceSession, Error> {
    let source = LoopingSyntheticSource::procedural(config.depth_resolution, 32);
    DeviceSession::with_source(Box::new(source), config)
}
