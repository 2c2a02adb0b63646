//! MIDI Time Code message encoding
//!
//! Two wire formats are supported:
//!
//! - **Full frame**: a 10-byte universal real-time sysex carrying a complete
//!   timestamp: `F0 7F 7F 01 01 <rate|hour> <minute> <second> <frame> F7`
//! - **Quarter frame**: 2-byte `F1 <piece|nibble>` messages, eight of which
//!   describe one timestamp
//!
//! The rate code occupies bits 5-6 of the hour byte in both formats.

use serde::Deserialize;

use crate::timecode::Timecode;

/// Length of a full-frame message in bytes
pub const FULL_FRAME_LEN: usize = 10;

/// Length of a quarter-frame message in bytes
pub const QUARTER_FRAME_LEN: usize = 2;

/// Number of quarter-frame pieces per complete timestamp
pub const QUARTER_FRAME_PIECES: u8 = 8;

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;
const UNIVERSAL_REALTIME: u8 = 0x7F;
const ALL_CHANNELS: u8 = 0x7F;
const SUB_ID_MTC: u8 = 0x01;
const SUB_ID_FULL_FRAME: u8 = 0x01;
const QUARTER_FRAME_STATUS: u8 = 0xF1;

/// The four frame rates MTC can signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtcRate {
    /// 24 fps (film)
    Fps24,
    /// 25 fps (PAL/SECAM)
    Fps25,
    /// 29.97 fps drop-frame (NTSC color)
    Fps2997Drop,
    /// 30 fps non-drop
    Fps30,
}

impl MtcRate {
    /// Rate used when the estimate is not one MTC can express
    pub const FALLBACK: MtcRate = MtcRate::Fps25;

    /// Map an integer frame-rate estimate to an MTC rate.
    ///
    /// Returns `None` for anything other than 24, 25, 29 or 30.
    pub fn from_fps(fps: u32) -> Option<Self> {
        match fps {
            24 => Some(Self::Fps24),
            25 => Some(Self::Fps25),
            29 => Some(Self::Fps2997Drop),
            30 => Some(Self::Fps30),
            _ => None,
        }
    }

    /// Rate code already shifted into bits 5-6
    pub const fn code(&self) -> u8 {
        match self {
            Self::Fps24 => 0x00,
            Self::Fps25 => 0x20,
            Self::Fps2997Drop => 0x40,
            Self::Fps30 => 0x60,
        }
    }
}

/// Which MTC messages the translator produces for each decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageFormat {
    /// One full-frame sysex per decoded frame
    #[default]
    FullFrame,
    /// Four quarter-frame messages per decoded frame
    QuarterFrame,
}

/// Encode a full-frame message.
pub fn full_frame(tc: &Timecode, rate: MtcRate) -> [u8; FULL_FRAME_LEN] {
    [
        SYSEX_START,
        UNIVERSAL_REALTIME,
        ALL_CHANNELS,
        SUB_ID_MTC,
        SUB_ID_FULL_FRAME,
        (rate.code() & 0x60) | (tc.hours & 0x1F),
        tc.minutes & 0x7F,
        tc.seconds & 0x7F,
        tc.frames & 0x7F,
        SYSEX_END,
    ]
}

/// Encode quarter-frame piece `piece` (0-7) of `tc`.
pub fn quarter_frame(tc: &Timecode, rate: MtcRate, piece: u8) -> [u8; QUARTER_FRAME_LEN] {
    let piece = piece % QUARTER_FRAME_PIECES;
    let rate_hour = rate.code() | (tc.hours & 0x1F);
    let nibble = match piece {
        0 => tc.frames & 0x0F,
        1 => (tc.frames & 0xF0) >> 4,
        2 => tc.seconds & 0x0F,
        3 => (tc.seconds & 0xF0) >> 4,
        4 => tc.minutes & 0x0F,
        5 => (tc.minutes & 0xF0) >> 4,
        6 => rate_hour & 0x0F,
        _ => (rate_hour & 0xF0) >> 4,
    };
    [QUARTER_FRAME_STATUS, (piece << 4) | nibble]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_codes() {
        assert_eq!(MtcRate::from_fps(24).map(|r| r.code()), Some(0x00));
        assert_eq!(MtcRate::from_fps(25).map(|r| r.code()), Some(0x20));
        assert_eq!(MtcRate::from_fps(29).map(|r| r.code()), Some(0x40));
        assert_eq!(MtcRate::from_fps(30).map(|r| r.code()), Some(0x60));
    }

    #[test]
    fn test_unsupported_rates() {
        for fps in [0, 1, 23, 26, 48, 50, 60] {
            assert_eq!(MtcRate::from_fps(fps), None, "fps {}", fps);
        }
        assert_eq!(MtcRate::FALLBACK.code(), 0x20);
    }

    #[test]
    fn test_full_frame_layout() {
        let tc = Timecode::new(1, 0, 0, 11).unwrap();
        assert_eq!(
            full_frame(&tc, MtcRate::Fps25),
            [0xF0, 0x7F, 0x7F, 0x01, 0x01, 0x21, 0x00, 0x00, 0x0B, 0xF7]
        );
    }

    #[test]
    fn test_full_frame_packs_rate_and_hour() {
        let tc = Timecode::new(23, 59, 58, 29).unwrap();
        let msg = full_frame(&tc, MtcRate::Fps30);
        assert_eq!(msg[5], 0x60 | 23);
        assert_eq!(&msg[6..9], &[59, 58, 29]);
    }

    #[test]
    fn test_quarter_frame_pieces() {
        let tc = Timecode::new(1, 35, 42, 17).unwrap();
        let pieces: Vec<[u8; 2]> = (0..8).map(|p| quarter_frame(&tc, MtcRate::Fps25, p)).collect();

        assert_eq!(pieces[0], [0xF1, 0x01]); // 17 = 0x11
        assert_eq!(pieces[1], [0xF1, 0x11]);
        assert_eq!(pieces[2], [0xF1, 0x2A]); // 42 = 0x2A
        assert_eq!(pieces[3], [0xF1, 0x32]);
        assert_eq!(pieces[4], [0xF1, 0x43]); // 35 = 0x23
        assert_eq!(pieces[5], [0xF1, 0x52]);
        assert_eq!(pieces[6], [0xF1, 0x61]); // 0x21
        assert_eq!(pieces[7], [0xF1, 0x72]);
    }

    #[test]
    fn test_message_format_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: MessageFormat,
        }
        let w: Wrapper = toml::from_str("format = \"quarter-frame\"").unwrap();
        assert_eq!(w.format, MessageFormat::QuarterFrame);
        let w: Wrapper = toml::from_str("format = \"full-frame\"").unwrap();
        assert_eq!(w.format, MessageFormat::FullFrame);
    }
}
