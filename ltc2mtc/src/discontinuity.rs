//! Timecode discontinuity detection
//!
//! Optional strategy: flags decoded frames that are not the direct
//! successor (forward) or predecessor (reverse) of the previous one. It
//! only observes; translation is never affected.

use ltc2mtc_common::Timecode;

use crate::ltc::{DecodedFrame, Direction};

#[derive(Debug, Default, Clone)]
pub struct DiscontinuityDetector {
    previous: Option<(Timecode, Direction)>,
}

impl DiscontinuityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `frame` and return whether it breaks the sequence.
    ///
    /// The first frame, and the first frame after a change of direction,
    /// start a new sequence and are never reported.
    pub fn observe(&mut self, frame: &DecodedFrame, fps: u32) -> bool {
        let current = (frame.timecode, frame.direction);
        let Some((prev, prev_direction)) = self.previous.replace(current) else {
            return false;
        };

        if prev_direction != frame.direction {
            return false;
        }

        let expected = match frame.direction {
            Direction::Forward => prev.next(fps),
            Direction::Reverse => prev.prev(fps),
        };
        !same_label(&expected, &frame.timecode)
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

fn same_label(a: &Timecode, b: &Timecode) -> bool {
    (a.hours, a.minutes, a.seconds, a.frames) == (b.hours, b.minutes, b.seconds, b.frames)
}
