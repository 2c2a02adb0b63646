//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;
use ltc2mtc_common::config::LatencySetting;
use ltc2mtc_common::FrameRate;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit:  ",
    env!("GIT_HASH"),
    "\nbuilt:   ",
    env!("BUILD_TIMESTAMP"),
    "\nprofile: ",
    env!("BUILD_PROFILE"),
    "\ntarget:  ",
    env!("BUILD_TARGET"),
);

/// Command-line arguments for ltc2mtc
#[derive(Parser, Debug, Clone)]
#[command(name = "ltc2mtc")]
#[command(about = "Translate linear timecode (LTC) from an audio input into MIDI time code (MTC)")]
#[command(version, long_version = LONG_VERSION)]
pub struct Args {
    /// Expected frame rate as num[/den] (default 25/1)
    #[arg(short = 'f', long, value_name = "num[/den]", env = "LTC2MTC_FPS")]
    pub fps: Option<FrameRate>,

    /// Autodetect the frame rate from decoded LTC
    #[arg(short = 'F', long)]
    pub detect_fps: bool,

    /// Audio input device carrying LTC
    #[arg(short = 'l', long, value_name = "name", env = "LTC2MTC_LTC_PORT")]
    pub ltc_port: Option<String>,

    /// MIDI output port to connect to
    #[arg(short = 'm', long, value_name = "name", env = "LTC2MTC_MTC_PORT")]
    pub mtc_port: Option<String>,

    /// Input channel carrying LTC, counted from 0
    #[arg(short = 'c', long, value_name = "n")]
    pub channel: Option<u16>,

    /// Capture latency compensation in frames, or "auto"
    #[arg(long, value_name = "auto|n")]
    pub ltc_latency: Option<LatencySetting>,

    /// Playback latency compensation in frames
    #[arg(long, value_name = "n")]
    pub mtc_latency: Option<u32>,

    /// Emit quarter-frame messages instead of full-frame sysex
    #[arg(long)]
    pub quarter_frame: bool,

    /// Count timecode discontinuities
    #[arg(long)]
    pub detect_discontinuities: bool,

    /// Event queue capacity
    #[arg(long, value_name = "n")]
    pub queue_size: Option<usize>,

    /// TOML configuration file
    #[arg(long, value_name = "path", env = "LTC2MTC_CONFIG")]
    pub config: Option<PathBuf>,

    /// List audio input devices and MIDI output ports, then exit
    #[arg(long)]
    pub list_ports: bool,

    /// Do not lock process memory
    #[arg(long)]
    pub no_mlock: bool,
}
