//! Frame-rate inference from decoded frame numbers
//!
//! LTC carries no explicit rate. Watching the frame field for a while and
//! taking the highest value seen plus one gives the displayed rate once at
//! least a full second of frames has passed.

/// Observations required before an estimate is published
pub const DEFAULT_MIN_OBSERVATIONS: u32 = 60;

/// Running-maximum frame-rate estimator.
///
/// Once an estimate is published it is frozen until [`restart`](Self::restart).
#[derive(Debug, Clone)]
pub struct FrameRateEstimator {
    max_frame: u8,
    observed: u32,
    min_observations: u32,
    estimate: Option<u32>,
}

impl FrameRateEstimator {
    pub fn new(min_observations: u32) -> Self {
        Self {
            max_frame: 0,
            observed: 0,
            min_observations,
            estimate: None,
        }
    }

    /// Record one decoded frame number and return the current estimate.
    pub fn observe(&mut self, frame: u8) -> Option<u32> {
        if self.estimate.is_some() {
            return self.estimate;
        }

        self.max_frame = self.max_frame.max(frame);
        self.observed = self.observed.saturating_add(1);

        let candidate = self.max_frame as u32 + 1;
        if self.observed > candidate && self.observed > self.min_observations {
            self.estimate = Some(candidate);
        }
        self.estimate
    }

    pub fn estimate(&self) -> Option<u32> {
        self.estimate
    }

    /// Forget everything and start estimating again
    pub fn restart(&mut self) {
        self.max_frame = 0;
        self.observed = 0;
        self.estimate = None;
    }
}

impl Default for FrameRateEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_OBSERVATIONS)
    }
}
