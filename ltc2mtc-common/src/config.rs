//! Configuration file loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in default (fallback)
//!
//! This module owns the TOML layer and the config file search. Command-line
//! and environment handling live in the binary, which overlays its
//! arguments on top of [`TomlConfig`].
//!
//! A missing config file is never fatal: the caller logs a warning and
//! continues with defaults. A file that exists but does not parse is an
//! error.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::mtc::MessageFormat;
use crate::{Error, Result};

/// Directory/file name used under the platform config directory
const CONFIG_DIR_NAME: &str = "ltc2mtc";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub translator: TranslatorConfig,
    pub ports: PortsConfig,
    pub latency: LatencyConfig,
    pub system: SystemConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Translation settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Expected frame rate as `num[/den]`
    pub fps: Option<String>,
    /// Infer the frame rate from decoded frame numbers
    pub detect_fps: Option<bool>,
    /// Minimum number of frames observed before an estimate is accepted
    pub detect_min_frames: Option<u32>,
    /// Capacity of the pending event queue
    pub queue_capacity: Option<usize>,
    /// Full-frame sysex or quarter-frame messages
    pub message_format: Option<MessageFormat>,
    /// Count timecode jumps between consecutive decoded frames
    pub detect_discontinuities: Option<bool>,
}

/// Device and port selection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// Audio input device carrying LTC
    pub ltc: Option<String>,
    /// MIDI output port receiving MTC
    pub mtc: Option<String>,
    /// Input channel index carrying LTC
    pub channel: Option<u16>,
}

/// Latency compensation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Capture-side compensation
    pub ltc: Option<LatencySetting>,
    /// Playback-side compensation in frames
    pub mtc: Option<u32>,
}

/// Process-level settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Lock process memory against paging
    pub lock_memory: Option<bool>,
}

/// Capture latency compensation: fixed or measured from the audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencySetting {
    /// Measure from stream timestamps
    Auto,
    /// Fixed number of sample frames
    Frames(u32),
}

impl Default for LatencySetting {
    fn default() -> Self {
        LatencySetting::Frames(0)
    }
}

impl FromStr for LatencySetting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(LatencySetting::Auto);
        }
        s.parse::<u32>()
            .map(LatencySetting::Frames)
            .map_err(|_| Error::InvalidInput(format!("latency must be 'auto' or frames, got '{}'", s)))
    }
}

impl<'de> Deserialize<'de> for LatencySetting {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Frames(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Frames(frames) => Ok(LatencySetting::Frames(frames)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the explicit file if given, else the first default location
    /// that exists, else built-in defaults.
    ///
    /// An explicit path that does not exist is reported and ignored.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => match default_config_path() {
                Some(path) => Self::load(&path),
                None => {
                    debug!("No config file found, using built-in defaults");
                    Ok(Self::default())
                }
            },
        }
    }
}

/// Candidate config file locations for the platform, most specific first
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    paths
}

/// First existing default config file, if any
fn default_config_path() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|p| p.exists())
}
