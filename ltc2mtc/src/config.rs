//! Effective runtime settings
//!
//! Overlays command-line arguments (which already include their environment
//! variables) on the TOML file and fills in built-in defaults.

use ltc2mtc_common::config::{LatencySetting, TomlConfig};
use ltc2mtc_common::{FrameRate, MessageFormat};

use crate::cli::Args;
use crate::error::{Error, Result};
use crate::estimator::DEFAULT_MIN_OBSERVATIONS;
use crate::processor::ProcessorConfig;
use crate::queue::DEFAULT_QUEUE_CAPACITY;

/// Upper bound on the event queue capacity
pub const MAX_QUEUE_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub frame_rate: FrameRate,
    pub detect_fps: bool,
    pub detect_min_frames: u32,
    pub queue_capacity: usize,
    pub message_format: MessageFormat,
    pub detect_discontinuities: bool,
    pub ltc_port: Option<String>,
    pub mtc_port: Option<String>,
    pub channel: u16,
    pub ltc_latency: LatencySetting,
    pub mtc_latency: u32,
    pub lock_memory: bool,
}

impl Settings {
    /// Resolve with priority: argument/env > TOML > default.
    pub fn resolve(args: &Args, toml: &TomlConfig) -> Result<Self> {
        let frame_rate = match (args.fps, toml.translator.fps.as_deref()) {
            (Some(rate), _) => rate,
            (None, Some(text)) => text.parse::<FrameRate>()?,
            (None, None) => FrameRate::default(),
        };

        let queue_capacity = args
            .queue_size
            .or(toml.translator.queue_capacity)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);
        if queue_capacity == 0 || queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(Error::Config(format!(
                "queue capacity must be between 1 and {}, got {}",
                MAX_QUEUE_CAPACITY, queue_capacity
            )));
        }

        let message_format = if args.quarter_frame {
            MessageFormat::QuarterFrame
        } else {
            toml.translator.message_format.unwrap_or_default()
        };

        Ok(Self {
            frame_rate,
            detect_fps: args.detect_fps || toml.translator.detect_fps.unwrap_or(false),
            detect_min_frames: toml
                .translator
                .detect_min_frames
                .unwrap_or(DEFAULT_MIN_OBSERVATIONS),
            queue_capacity,
            message_format,
            detect_discontinuities: args.detect_discontinuities
                || toml.translator.detect_discontinuities.unwrap_or(false),
            ltc_port: args.ltc_port.clone().or_else(|| toml.ports.ltc.clone()),
            mtc_port: args.mtc_port.clone().or_else(|| toml.ports.mtc.clone()),
            channel: args.channel.or(toml.ports.channel).unwrap_or(0),
            ltc_latency: args.ltc_latency.or(toml.latency.ltc).unwrap_or_default(),
            mtc_latency: args.mtc_latency.or(toml.latency.mtc).unwrap_or(0),
            lock_memory: !args.no_mlock && toml.system.lock_memory.unwrap_or(true),
        })
    }

    pub fn processor_config(&self, sample_rate: u32) -> ProcessorConfig {
        ProcessorConfig {
            sample_rate,
            frame_rate: self.frame_rate,
            detect_fps: self.detect_fps,
            detect_min_frames: self.detect_min_frames,
            queue_capacity: self.queue_capacity,
            message_format: self.message_format,
            detect_discontinuities: self.detect_discontinuities,
        }
    }
}
