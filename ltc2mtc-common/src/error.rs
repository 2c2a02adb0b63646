//! Common error types for ltc2mtc

use thiserror::Error;

/// Common result type for ltc2mtc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the translator crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Frame rate argument was malformed or out of range
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(String),

    /// Timecode field outside its valid range
    #[error("Invalid timecode: {0}")]
    InvalidTimecode(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
