//! Biphase-mark LTC decoder
//!
//! LTC is biphase-mark coded: the signal toggles at every bit-cell boundary,
//! and a `1` toggles once more in the middle of the cell. Decoding therefore
//! only needs the spacing between zero crossings:
//!
//! - one full-cell interval is a `0`
//! - two consecutive half-cell intervals are a `1`
//!
//! Decoded bits are shifted into an 80-bit window. A frame is complete when
//! the sync word sits at the newest end of the window (forward playback) or,
//! bit-reversed, at the oldest end (reverse playback). The coding is
//! symmetric in time, so reverse playback yields the same bit values in the
//! opposite order.
//!
//! Everything here is allocation-free after construction.

use std::collections::VecDeque;

use super::frame::{LtcFrame, LTC_FRAME_BITS, SYNC_WORD, SYNC_WORD_FORWARD_WINDOW};
use super::{DecodedFrame, Direction, LtcDecoder};

/// Default number of decoded frames buffered between reads
pub const DEFAULT_FRAME_QUEUE_LEN: usize = 30;

const WINDOW_MASK: u128 = (1u128 << LTC_FRAME_BITS) - 1;

/// Smallest hysteresis band around the signal midpoint, in 8-bit steps
const MIN_HYSTERESIS: i32 = 2;

/// Envelope decays one step toward the midpoint every this many samples
const ENVELOPE_DECAY_SAMPLES: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Unknown,
    Low,
    High,
}

/// Biphase-mark LTC decoder.
pub struct BiphaseDecoder {
    /// Estimated samples per bit cell
    bit_period: f64,
    /// Seed for `bit_period` after a resync
    nominal_bit_period: f64,

    level: Level,
    env_max: i32,
    env_min: i32,
    decay_counter: u32,

    /// Position of the previous zero crossing
    last_edge: Option<i64>,
    /// Position where the current bit cell started
    cell_start: i64,
    /// A half-cell interval is waiting for its partner
    half_pending: bool,

    /// Newest bit in bit 0
    window: u128,
    /// Bits decoded since the last resync
    bit_count: u64,
    /// Start position of each of the last 80 bits, indexed by bit count
    bit_starts: [i64; LTC_FRAME_BITS],

    frames: VecDeque<DecodedFrame>,
    frame_queue_len: usize,
    overflows: u64,
}

impl BiphaseDecoder {
    /// Create a decoder expecting roughly `samples_per_frame` samples per
    /// LTC frame (sample rate divided by frame rate). The estimate adapts
    /// to the actual signal.
    pub fn new(samples_per_frame: f64, frame_queue_len: usize) -> Self {
        let nominal_bit_period = (samples_per_frame / LTC_FRAME_BITS as f64).max(2.0);
        let frame_queue_len = frame_queue_len.max(1);
        Self {
            bit_period: nominal_bit_period,
            nominal_bit_period,
            level: Level::Unknown,
            env_max: 0,
            env_min: 0,
            decay_counter: 0,
            last_edge: None,
            cell_start: 0,
            half_pending: false,
            window: 0,
            bit_count: 0,
            bit_starts: [0; LTC_FRAME_BITS],
            frames: VecDeque::with_capacity(frame_queue_len),
            frame_queue_len,
            overflows: 0,
        }
    }

    /// Current bit-period estimate in samples
    pub fn bit_period(&self) -> f64 {
        self.bit_period
    }

    /// Frames decoded but not yet read
    pub fn pending(&self) -> usize {
        self.frames.len()
    }

    fn process_sample(&mut self, sample: u8, pos: i64) {
        let value = sample as i32 - 128;
        self.track_envelope(value);

        let mid = (self.env_max + self.env_min) / 2;
        let hysteresis = ((self.env_max - self.env_min) / 8).max(MIN_HYSTERESIS);

        let next = match self.level {
            Level::High if value < mid - hysteresis => Level::Low,
            Level::Low if value > mid + hysteresis => Level::High,
            Level::Unknown if value > mid + hysteresis => Level::High,
            Level::Unknown if value < mid - hysteresis => Level::Low,
            current => current,
        };

        if next != self.level {
            let was_known = self.level != Level::Unknown;
            self.level = next;
            if was_known {
                self.on_edge(pos);
            }
        }
    }

    fn track_envelope(&mut self, value: i32) {
        self.decay_counter += 1;
        if self.decay_counter >= ENVELOPE_DECAY_SAMPLES {
            self.decay_counter = 0;
            if self.env_max > 0 {
                self.env_max -= 1;
            }
            if self.env_min < 0 {
                self.env_min += 1;
            }
        }
        self.env_max = self.env_max.max(value);
        self.env_min = self.env_min.min(value);
    }

    fn on_edge(&mut self, pos: i64) {
        let Some(last) = self.last_edge.replace(pos) else {
            self.cell_start = pos;
            return;
        };

        let interval = (pos - last) as f64;
        let period = self.bit_period;

        if interval > period * 2.0 || interval < period * 0.25 {
            // Dropout or noise: nothing before this edge can be trusted
            self.resync(pos);
            return;
        }

        if interval > period * 0.75 {
            if self.half_pending {
                // Half-cell without its partner: we were aligned on the
                // middle of a cell. This edge is a real boundary.
                self.half_pending = false;
                self.bit_count = 0;
                self.cell_start = pos;
                return;
            }
            self.bit_period = (3.0 * period + interval) / 4.0;
            self.push_bit(false, pos);
        } else {
            self.bit_period = (3.0 * period + 2.0 * interval) / 4.0;
            if self.half_pending {
                self.half_pending = false;
                self.push_bit(true, pos);
            } else {
                self.half_pending = true;
            }
        }
    }

    fn resync(&mut self, pos: i64) {
        self.bit_period = self.nominal_bit_period;
        self.half_pending = false;
        self.bit_count = 0;
        self.cell_start = pos;
    }

    /// Shift in the bit whose cell ended at the edge at `end`
    fn push_bit(&mut self, bit: bool, end: i64) {
        self.bit_starts[(self.bit_count % LTC_FRAME_BITS as u64) as usize] = self.cell_start;
        self.window = ((self.window << 1) | bit as u128) & WINDOW_MASK;
        self.bit_count += 1;
        self.cell_start = end;

        if self.bit_count >= LTC_FRAME_BITS as u64 {
            self.check_sync(end);
        }
    }

    fn check_sync(&mut self, end: i64) {
        let newest = (self.window & 0xFFFF) as u16;
        let oldest = (self.window >> (LTC_FRAME_BITS - 16)) as u16;

        let (frame, direction) = if newest == SYNC_WORD_FORWARD_WINDOW {
            (self.forward_frame(), Direction::Forward)
        } else if oldest == SYNC_WORD {
            (self.reverse_frame(), Direction::Reverse)
        } else {
            return;
        };

        // Oldest of the last 80 bits is the slot about to be reused
        let off_start = self.bit_starts[(self.bit_count % LTC_FRAME_BITS as u64) as usize];

        self.enqueue(DecodedFrame {
            timecode: frame.timecode(),
            direction,
            off_start,
            off_end: end - 1,
            user_bits: frame.user_bits(),
            color_frame: frame.color_frame(),
        });
    }

    /// Forward playback: bit `n` was received `79 - n` bits ago
    fn forward_frame(&self) -> LtcFrame {
        let mut data = [0u8; 10];
        for n in 0..LTC_FRAME_BITS {
            if (self.window >> (LTC_FRAME_BITS - 1 - n)) & 1 == 1 {
                data[n / 8] |= 1 << (n % 8);
            }
        }
        LtcFrame::from_bytes(data)
    }

    /// Reverse playback: bit `n` was received `n` bits ago
    fn reverse_frame(&self) -> LtcFrame {
        let bytes = self.window.to_le_bytes();
        let mut data = [0u8; 10];
        data.copy_from_slice(&bytes[..10]);
        LtcFrame::from_bytes(data)
    }

    fn enqueue(&mut self, frame: DecodedFrame) {
        if self.frames.len() >= self.frame_queue_len {
            self.frames.pop_front();
            self.overflows += 1;
        }
        self.frames.push_back(frame);
    }
}

impl LtcDecoder for BiphaseDecoder {
    fn write(&mut self, samples: &[u8], posinfo: i64) {
        for (i, &sample) in samples.iter().enumerate() {
            self.process_sample(sample, posinfo + i as i64);
        }
    }

    fn read(&mut self) -> Option<DecodedFrame> {
        self.frames.pop_front()
    }

    fn overflow_count(&self) -> u64 {
        self.overflows
    }
}
