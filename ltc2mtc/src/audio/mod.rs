//! Audio input for the LTC signal

pub mod input;

pub use input::{hardware_latency_samples, measure_capture_latency, AudioInput};
