//! # ltc2mtc Common Library
//!
//! Shared code for the LTC to MTC translator:
//! - SMPTE timecode model and frame arithmetic
//! - MTC rate codes and message encoders
//! - TOML configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod mtc;
pub mod timecode;

pub use error::{Error, Result};
pub use mtc::{MessageFormat, MtcRate};
pub use timecode::{FrameRate, Timecode};
