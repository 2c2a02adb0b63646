//! SMPTE timecode model
//!
//! Hours:minutes:seconds:frames labels as carried by LTC, plus the frame
//! arithmetic needed to publish the timecode that follows a decoded frame.
//!
//! Frame rates are integers here: the displayed frame-number field wraps at
//! the nominal rate (24, 25, 30), and 29.97 fps material is expressed as a
//! drop-frame label counted at 30.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Frame rate as a rational `num/den`, e.g. `25/1` or `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub const FPS_25: FrameRate = FrameRate { num: 25, den: 1 };

    pub fn new(num: u32, den: u32) -> Result<Self> {
        if num == 0 || den == 0 {
            return Err(Error::InvalidFrameRate(format!("{}/{}", num, den)));
        }
        Ok(Self { num, den })
    }

    /// Integer frame count per second as displayed in the frame field.
    ///
    /// Rounds up, so `30000/1001` reports 30.
    pub fn nominal(&self) -> u32 {
        self.num.div_ceil(self.den)
    }

    /// Exact rate as floating point
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Duration of one frame in audio samples at `sample_rate`
    pub fn samples_per_frame(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 * self.den as f64 / self.num as f64
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_25
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for FrameRate {
    type Err = Error;

    /// Parses `num[/den]`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidFrameRate(s.to_string());
        let (num, den) = match s.trim().split_once('/') {
            Some((num, den)) => (
                num.trim().parse::<u32>().map_err(|_| invalid())?,
                den.trim().parse::<u32>().map_err(|_| invalid())?,
            ),
            None => (s.trim().parse::<u32>().map_err(|_| invalid())?, 1),
        };
        FrameRate::new(num, den)
    }
}

/// A SMPTE timecode label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timecode {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
    /// Drop-frame counting (frames 0 and 1 skipped at most minute starts)
    pub drop_frame: bool,
}

impl Timecode {
    /// Build a non-drop-frame timecode, validating field ranges.
    pub fn new(hours: u8, minutes: u8, seconds: u8, frames: u8) -> Result<Self> {
        if hours > 23 || minutes > 59 || seconds > 59 || frames > 29 {
            return Err(Error::InvalidTimecode(format!(
                "{:02}:{:02}:{:02}:{:02}",
                hours, minutes, seconds, frames
            )));
        }
        Ok(Self {
            hours,
            minutes,
            seconds,
            frames,
            drop_frame: false,
        })
    }

    pub fn with_drop_frame(mut self, drop_frame: bool) -> Self {
        self.drop_frame = drop_frame;
        self
    }

    /// Frame count at which the frame field wraps for `rate`.
    ///
    /// Drop-frame labels count to 29 even when the estimate says 29 fps.
    fn wrap(&self, rate: u32) -> u8 {
        let wrap = if self.drop_frame && rate == 29 { 30 } else { rate };
        wrap.clamp(1, u8::MAX as u32) as u8
    }

    fn skips_minute_start(&self, rate: u32) -> bool {
        self.drop_frame && (rate == 29 || rate == 30) && self.minutes % 10 != 0
    }

    /// Advance by one frame at `rate` frames per second.
    ///
    /// Hours wrap at 24. Drop-frame labels skip frames 0 and 1 at the start
    /// of every minute not divisible by ten.
    pub fn increment(&mut self, rate: u32) {
        self.frames += 1;
        if self.frames >= self.wrap(rate) {
            self.frames = 0;
            self.seconds += 1;
            if self.seconds >= 60 {
                self.seconds = 0;
                self.minutes += 1;
                if self.minutes >= 60 {
                    self.minutes = 0;
                    self.hours = (self.hours + 1) % 24;
                }
            }
        }

        if self.seconds == 0 && self.frames == 0 && self.skips_minute_start(rate) {
            self.frames = 2;
        }
    }

    /// Step back by one frame at `rate` frames per second.
    pub fn decrement(&mut self, rate: u32) {
        let first = if self.seconds == 0 && self.skips_minute_start(rate) {
            2
        } else {
            0
        };

        if self.frames > first {
            self.frames -= 1;
            return;
        }

        self.frames = self.wrap(rate) - 1;
        if self.seconds > 0 {
            self.seconds -= 1;
            return;
        }
        self.seconds = 59;
        if self.minutes > 0 {
            self.minutes -= 1;
            return;
        }
        self.minutes = 59;
        self.hours = if self.hours == 0 { 23 } else { self.hours - 1 };
    }

    /// The label one frame later
    pub fn next(mut self, rate: u32) -> Self {
        self.increment(rate);
        self
    }

    /// The label one frame earlier
    pub fn prev(mut self, rate: u32) -> Self {
        self.decrement(rate);
        self
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.drop_frame { ';' } else { ':' };
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:02}",
            self.hours, self.minutes, self.seconds, sep, self.frames
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc(h: u8, m: u8, s: u8, f: u8) -> Timecode {
        Timecode::new(h, m, s, f).unwrap()
    }

    #[test]
    fn test_frame_rate_parse_integer() {
        let rate: FrameRate = "25".parse().unwrap();
        assert_eq!(rate, FrameRate { num: 25, den: 1 });
        assert_eq!(rate.nominal(), 25);
    }

    #[test]
    fn test_frame_rate_parse_fraction() {
        let rate: FrameRate = "30000/1001".parse().unwrap();
        assert_eq!(rate.num, 30000);
        assert_eq!(rate.den, 1001);
        assert_eq!(rate.nominal(), 30);
        assert_eq!(rate.to_string(), "30000/1001");
    }

    #[test]
    fn test_frame_rate_rejects_garbage() {
        assert!("".parse::<FrameRate>().is_err());
        assert!("abc".parse::<FrameRate>().is_err());
        assert!("25/0".parse::<FrameRate>().is_err());
        assert!("0".parse::<FrameRate>().is_err());
    }

    #[test]
    fn test_samples_per_frame() {
        assert_eq!(FrameRate::FPS_25.samples_per_frame(48000), 1920.0);
        let ntsc = FrameRate::new(30000, 1001).unwrap();
        assert!((ntsc.samples_per_frame(48000) - 1601.6).abs() < 1e-9);
    }

    #[test]
    fn test_increment_simple() {
        assert_eq!(tc(1, 0, 0, 10).next(25), tc(1, 0, 0, 11));
    }

    #[test]
    fn test_increment_rollover_chain() {
        assert_eq!(tc(0, 0, 0, 24).next(25), tc(0, 0, 1, 0));
        assert_eq!(tc(0, 0, 59, 23).next(24), tc(0, 1, 0, 0));
        assert_eq!(tc(0, 59, 59, 29).next(30), tc(1, 0, 0, 0));
        assert_eq!(tc(23, 59, 59, 24).next(25), tc(0, 0, 0, 0));
    }

    #[test]
    fn test_increment_drop_frame_skips_minute_start() {
        let start = tc(0, 0, 59, 29).with_drop_frame(true);
        let next = start.next(30);
        assert_eq!((next.minutes, next.seconds, next.frames), (1, 0, 2));
        assert!(next.drop_frame);
    }

    #[test]
    fn test_increment_drop_frame_keeps_tenth_minute() {
        let start = tc(0, 9, 59, 29).with_drop_frame(true);
        let next = start.next(30);
        assert_eq!((next.minutes, next.seconds, next.frames), (10, 0, 0));
    }

    #[test]
    fn test_increment_drop_frame_at_rate_29_counts_to_29() {
        let start = tc(0, 0, 10, 28).with_drop_frame(true);
        assert_eq!(start.next(29).frames, 29);
    }

    #[test]
    fn test_decrement_mirrors_increment() {
        assert_eq!(tc(0, 0, 1, 0).prev(25), tc(0, 0, 0, 24));
        assert_eq!(tc(0, 0, 0, 0).prev(25), tc(23, 59, 59, 24));

        let df = tc(0, 1, 0, 2).with_drop_frame(true);
        let prev = df.prev(30);
        assert_eq!((prev.minutes, prev.seconds, prev.frames), (0, 59, 29));
    }

    #[test]
    fn test_display() {
        assert_eq!(tc(1, 2, 3, 4).to_string(), "01:02:03:04");
        assert_eq!(tc(1, 2, 3, 4).with_drop_frame(true).to_string(), "01:02:03;04");
    }

    #[test]
    fn test_new_validates_ranges() {
        assert!(Timecode::new(24, 0, 0, 0).is_err());
        assert!(Timecode::new(0, 60, 0, 0).is_err());
        assert!(Timecode::new(0, 0, 60, 0).is_err());
        assert!(Timecode::new(0, 0, 0, 30).is_err());
    }
}
