//! 80-bit LTC frame layout
//!
//! Bits are numbered in transmission order (0-79) and stored LSB first:
//! bit `n` lives in byte `n / 8` at position `n % 8`. BCD fields are LSB
//! first as well.
//!
//! | bits  | field                | bits  | field                |
//! |-------|----------------------|-------|----------------------|
//! | 0-3   | frame units          | 32-35 | minute units         |
//! | 8-9   | frame tens           | 40-42 | minute tens          |
//! | 10    | drop-frame flag      | 48-51 | hour units           |
//! | 11    | color-frame flag     | 56-57 | hour tens            |
//! | 16-19 | second units         | 64-79 | sync word            |
//! | 24-26 | second tens          |       |                      |
//!
//! User bit groups occupy the nibbles at 4, 12, 20, 28, 36, 44, 52 and 60.

use ltc2mtc_common::Timecode;

/// Bits per LTC frame
pub const LTC_FRAME_BITS: usize = 80;

/// Sync word (bits 64-79) read as a little-endian u16
pub const SYNC_WORD: u16 = 0xBFFC;

/// Sync word as it appears in the newest 16 bits of a forward bit window
pub const SYNC_WORD_FORWARD_WINDOW: u16 = 0x3FFD;

const USER_BIT_OFFSETS: [usize; 8] = [4, 12, 20, 28, 36, 44, 52, 60];

/// Raw frame bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LtcFrame {
    data: [u8; 10],
}

impl LtcFrame {
    pub fn from_bytes(data: [u8; 10]) -> Self {
        Self { data }
    }

    pub fn bit(&self, n: usize) -> bool {
        (self.data[n / 8] >> (n % 8)) & 1 == 1
    }

    /// `len` bits starting at `start`, LSB first
    fn field(&self, start: usize, len: usize) -> u8 {
        (0..len).fold(0u8, |acc, i| acc | ((self.bit(start + i) as u8) << i))
    }

    pub fn drop_frame(&self) -> bool {
        self.bit(10)
    }

    pub fn color_frame(&self) -> bool {
        self.bit(11)
    }

    /// Timecode label.
    ///
    /// BCD digits are taken as-is; a corrupt frame can produce values such
    /// as 15 in a units digit, which are passed through rather than rejected.
    pub fn timecode(&self) -> Timecode {
        Timecode {
            hours: self.field(48, 4) + 10 * self.field(56, 2),
            minutes: self.field(32, 4) + 10 * self.field(40, 3),
            seconds: self.field(16, 4) + 10 * self.field(24, 3),
            frames: self.field(0, 4) + 10 * self.field(8, 2),
            drop_frame: self.drop_frame(),
        }
    }

    pub fn user_bits(&self) -> u32 {
        USER_BIT_OFFSETS
            .iter()
            .enumerate()
            .fold(0u32, |acc, (group, &start)| {
                acc | ((self.field(start, 4) as u32) << (group * 4))
            })
    }
}
