//! Monotonic sample clock
//!
//! Counts audio frames processed since the stream started. Every position
//! in the system (decoded frame offsets, event alignments, cycle windows)
//! is expressed on this time base.

use thiserror::Error;

/// The clock cannot advance without wrapping
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("sample clock overflow: {now} + {frames}")]
pub struct ClockError {
    pub now: i64,
    pub frames: u32,
}

/// Frames processed since start.
///
/// Signed so that latency-compensated positions before the first sample
/// are representable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SampleClock {
    frames: i64,
}

impl SampleClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the first frame of the current cycle
    pub fn now(&self) -> i64 {
        self.frames
    }

    /// Advance by exactly `frames`, returning the new position.
    ///
    /// Overflow is reported, never wrapped.
    pub fn advance(&mut self, frames: u32) -> Result<i64, ClockError> {
        self.frames = self
            .frames
            .checked_add(frames as i64)
            .ok_or(ClockError {
                now: self.frames,
                frames,
            })?;
        Ok(self.frames)
    }
}
