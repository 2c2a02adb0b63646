//! Port latency compensation values
//!
//! Written by the latency refresh path and read by the audio callback on
//! every cycle. Values are in samples.

use std::sync::atomic::{AtomicU32, Ordering};

/// Measured capture latency must move by more than this before it replaces
/// the current value
pub const CAPTURE_JITTER_TOLERANCE: u32 = 32;

#[derive(Debug, Default)]
pub struct PortLatency {
    capture: AtomicU32,
    playback: AtomicU32,
}

impl PortLatency {
    pub fn new(capture: u32, playback: u32) -> Self {
        Self {
            capture: AtomicU32::new(capture),
            playback: AtomicU32::new(playback),
        }
    }

    /// Input latency; decoded positions are shifted back by this much
    pub fn capture(&self) -> u32 {
        self.capture.load(Ordering::Relaxed)
    }

    /// Output latency; events are emitted this much early
    pub fn playback(&self) -> u32 {
        self.playback.load(Ordering::Relaxed)
    }

    /// Returns true if the value changed
    pub fn set_capture(&self, samples: u32) -> bool {
        self.capture.swap(samples, Ordering::Relaxed) != samples
    }

    /// Take a capture latency measurement.
    ///
    /// Timestamps jitter from one callback to the next; only a move beyond
    /// [`CAPTURE_JITTER_TOLERANCE`] is stored. Returns true if it was.
    pub fn update_capture(&self, measured: u32) -> bool {
        if self.capture().abs_diff(measured) <= CAPTURE_JITTER_TOLERANCE {
            return false;
        }
        self.set_capture(measured)
    }

    /// `(capture, playback)`
    pub fn snapshot(&self) -> (u32, u32) {
        (self.capture(), self.playback())
    }
}
