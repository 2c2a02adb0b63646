//! # ltc2mtc
//!
//! Translates linear timecode (LTC) carried on an audio input into MIDI time
//! code (MTC) messages, in real time, inside the audio callback.
//!
//! **Architecture:** cpal input callback → decode bridge → LTC decoder →
//! translator → bounded event queue → per-cycle scheduler → lock-free
//! dispatch ring → midir output.
//!
//! Everything reachable from [`processor::Processor::process`] is real-time
//! safe: no locks, no allocation, no logging. Anomalies are counted in
//! [`diagnostics::Diagnostics`] and reported by a monitor task.

pub mod audio;
pub mod bridge;
pub mod cli;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod discontinuity;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod latency;
pub mod ltc;
pub mod memlock;
pub mod midi;
pub mod processor;
pub mod queue;
pub mod scheduler;
pub mod state;
pub mod translator;

pub use error::{Error, Result};
pub use processor::Processor;
pub use state::{RunState, SharedRunState};
