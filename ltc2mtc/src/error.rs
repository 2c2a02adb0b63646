//! Error types for ltc2mtc
//!
//! Setup failures (device, port, configuration) are fatal and surface
//! through [`Error`]. Per-cycle anomalies have their own small error types
//! next to the code that produces them and never reach `main`.

use thiserror::Error;

/// Main error type for the translator service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file or argument errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared library (config parsing, frame rates)
    #[error(transparent)]
    Common(#[from] ltc2mtc_common::Error),

    /// Audio input device errors
    #[error("Audio input error: {0}")]
    AudioInput(String),

    /// MIDI output port errors
    #[error("MIDI output error: {0}")]
    MidiOutput(String),
}

/// Convenience Result type using ltc2mtc Error
pub type Result<T> = std::result::Result<T, Error>;
