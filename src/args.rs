// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use std::net::Ipv4Addr;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// connect to remote rerun viewer at this address
    #[arg(short, long)]
    pub connect: Option<Ipv4Addr>,

    /// record rerun data to file instead of live viewer
    #[arg(short, long)]
    pub record: Option<String>,

    /// launch local rerun viewer
    #[arg(short, long)]
    pub viewer: bool,

    /// use this port for the rerun viewer (remote or web server)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Depth and color stream width in pixels
    #[arg(long, env, default_value = "640")]
    pub width: u32,

    /// Depth and color stream height in pixels
    #[arg(long, env, default_value = "480")]
    pub height: u32,

    /// Stream frame rate in Hz
    #[arg(long, env, default_value = "30")]
    pub fps: u32,

    /// Device serial number.  Selects among multiple attached cameras;
    /// the first device is used when unset.
    #[arg(long, env)]
    pub serial: Option<String>,

    /// Frame retrieval timeout in milliseconds
    #[arg(long, env, default_value = "5000")]
    pub timeout_ms: u64,

    /// Use a looping synthetic source instead of camera hardware
    #[arg(long, env)]
    pub synthetic: bool,
}
