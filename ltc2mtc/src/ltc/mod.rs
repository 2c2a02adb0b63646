//! Linear timecode decoding
//!
//! [`LtcDecoder`] is the boundary between the real-time core and the
//! bit-level decoder: raw unsigned 8-bit samples go in, tagged with the
//! sample-clock position of the first sample, and fully decoded frames come
//! out with their own start/end positions and playback direction.
//!
//! [`BiphaseDecoder`] is the implementation used by the service.

pub mod decoder;
pub mod frame;

use ltc2mtc_common::Timecode;

pub use decoder::BiphaseDecoder;
pub use frame::LtcFrame;

/// Direction the timecode was played in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// One LTC frame, fully received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Timecode label carried by the frame
    pub timecode: Timecode,
    /// Playback direction in which the frame was received
    pub direction: Direction,
    /// Sample-clock position of the frame's first sample
    pub off_start: i64,
    /// Sample-clock position of the frame's last sample
    pub off_end: i64,
    /// The eight user-bit nibbles, first group in the low nibble
    pub user_bits: u32,
    /// Color frame flag (bit 11)
    pub color_frame: bool,
}

impl DecodedFrame {
    pub fn is_reverse(&self) -> bool {
        self.direction == Direction::Reverse
    }
}

/// Bit-stream decoder collaborator.
///
/// State (partial frames, bit clock) persists across `write` calls.
pub trait LtcDecoder {
    /// Feed samples; `posinfo` is the clock position of `samples[0]`
    fn write(&mut self, samples: &[u8], posinfo: i64);

    /// Next completed frame, oldest first
    fn read(&mut self) -> Option<DecodedFrame>;

    /// Frames discarded because the output queue was full
    fn overflow_count(&self) -> u64 {
        0
    }
}
