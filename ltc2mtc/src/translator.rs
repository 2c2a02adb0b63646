//! Decoded LTC frame → timestamped MTC events
//!
//! An LTC frame is only known once its last bit has arrived, by which time
//! the *next* frame has started. In forward play the published label is
//! therefore the decoded label plus one frame; in reverse play the frame
//! that was just read is the one about to be "entered" again, so its own
//! label is published. Either way the message targets the sample right
//! after the frame ended (`off_end + 1`).

use ltc2mtc_common::mtc::{self, MessageFormat, MtcRate, QUARTER_FRAME_PIECES};
use ltc2mtc_common::{FrameRate, Timecode};

use crate::diagnostics::Diagnostics;
use crate::discontinuity::DiscontinuityDetector;
use crate::estimator::{FrameRateEstimator, DEFAULT_MIN_OBSERVATIONS};
use crate::ltc::{DecodedFrame, Direction};
use crate::queue::PendingEvent;

/// Quarter-frame messages emitted per decoded frame
const QUARTER_FRAMES_PER_FRAME: usize = 4;

/// Silence between two frames, in frames, after which the next one starts a
/// new sequence
pub const DROPOUT_FRAMES: f64 = 25.0;

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Rate assumed until (or instead of) detection
    pub initial_rate: FrameRate,
    pub detect_fps: bool,
    pub detect_min_frames: u32,
    pub format: MessageFormat,
    pub detect_discontinuities: bool,
    /// Samples per LTC frame at the initial rate. Sizes the dropout gap and
    /// spaces quarter frames when a frame's own span is unusable.
    pub samples_per_frame: f64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            initial_rate: FrameRate::FPS_25,
            detect_fps: false,
            detect_min_frames: DEFAULT_MIN_OBSERVATIONS,
            format: MessageFormat::FullFrame,
            detect_discontinuities: false,
            samples_per_frame: FrameRate::FPS_25.samples_per_frame(48_000),
        }
    }
}

/// Events produced for one decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    /// Label the events carry
    pub timecode: Timecode,
    pub rate: MtcRate,
    events: [PendingEvent; QUARTER_FRAMES_PER_FRAME],
    len: usize,
}

impl Translation {
    fn new(timecode: Timecode, rate: MtcRate) -> Self {
        Self {
            timecode,
            rate,
            events: [PendingEvent::new(0, &[]); QUARTER_FRAMES_PER_FRAME],
            len: 0,
        }
    }

    fn push(&mut self, event: PendingEvent) {
        if self.len < self.events.len() {
            self.events[self.len] = event;
            self.len += 1;
        }
    }

    /// Events in emission order
    pub fn events(&self) -> &[PendingEvent] {
        &self.events[..self.len]
    }
}

/// Quarter-frame sequencing across decoded frames
#[derive(Debug, Clone, Copy)]
struct QuarterFrameState {
    next_piece: u8,
    direction: Direction,
    latched: Timecode,
}

impl Default for QuarterFrameState {
    fn default() -> Self {
        Self {
            next_piece: 0,
            direction: Direction::Forward,
            latched: Timecode::default(),
        }
    }
}

/// Per-frame translation state: rate estimate, warning dedupe, sequencing.
pub struct Translator {
    config: TranslatorConfig,
    estimator: Option<FrameRateEstimator>,
    discontinuity: Option<DiscontinuityDetector>,
    /// An unsupported rate has been reported and no supported one seen since
    rate_warned: bool,
    quarter: QuarterFrameState,
    /// Estimate carried over a dropout until a new one is published
    held_fps: Option<u32>,
    /// Last sample of the previous frame
    last_end: Option<i64>,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        let estimator = config
            .detect_fps
            .then(|| FrameRateEstimator::new(config.detect_min_frames));
        let discontinuity = config
            .detect_discontinuities
            .then(DiscontinuityDetector::new);
        Self {
            config,
            estimator,
            discontinuity,
            rate_warned: false,
            quarter: QuarterFrameState::default(),
            held_fps: None,
            last_end: None,
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Integer rate currently used for increments and the MTC rate code
    pub fn current_fps(&self) -> u32 {
        self.estimator
            .as_ref()
            .and_then(|e| e.estimate())
            .or(self.held_fps)
            .unwrap_or_else(|| self.config.initial_rate.nominal())
    }

    /// Forget per-sequence state when `frame` follows a dropout.
    ///
    /// The rate estimate is re-derived from the new material; until then the
    /// previous estimate stays in use.
    fn restart_after_dropout(&mut self, frame: &DecodedFrame, diagnostics: &Diagnostics) {
        let Some(last_end) = self.last_end.replace(frame.off_end) else {
            return;
        };
        let gap = (frame.off_start - last_end - 1) as f64;
        if gap <= DROPOUT_FRAMES * self.config.samples_per_frame {
            return;
        }

        if let Some(estimator) = self.estimator.as_mut() {
            if let Some(fps) = estimator.estimate() {
                self.held_fps = Some(fps);
            }
            estimator.restart();
        }
        if let Some(detector) = self.discontinuity.as_mut() {
            detector.reset();
        }
        self.quarter = QuarterFrameState::default();
        diagnostics.record_sequence_restart();
    }

    /// Translate one decoded frame.
    ///
    /// **REAL-TIME SAFE**: no allocation; anomalies go to `diagnostics`.
    pub fn translate(&mut self, frame: &DecodedFrame, diagnostics: &Diagnostics) -> Translation {
        self.restart_after_dropout(frame, diagnostics);
        if let Some(estimator) = self.estimator.as_mut() {
            estimator.observe(frame.timecode.frames);
        }
        let fps = self.current_fps();

        if let Some(detector) = self.discontinuity.as_mut() {
            if detector.observe(frame, fps) {
                diagnostics.record_discontinuity();
            }
        }

        let rate = self.resolve_rate(fps, frame.timecode.drop_frame, diagnostics);

        let timecode = match frame.direction {
            Direction::Reverse => frame.timecode,
            Direction::Forward => frame.timecode.next(fps),
        };
        let alignment = frame.off_end + 1;

        let mut translation = Translation::new(timecode, rate);
        match self.config.format {
            MessageFormat::FullFrame => {
                translation.push(PendingEvent::new(alignment, &mtc::full_frame(&timecode, rate)));
            }
            MessageFormat::QuarterFrame => {
                self.push_quarter_frames(&mut translation, alignment, frame);
            }
        }
        translation
    }

    fn resolve_rate(&mut self, fps: u32, drop_frame: bool, diagnostics: &Diagnostics) -> MtcRate {
        // 30 fps labels with the drop-frame flag are 29.97 drop-frame
        let mapped = if drop_frame && fps == 30 {
            Some(MtcRate::Fps2997Drop)
        } else {
            MtcRate::from_fps(fps)
        };

        match mapped {
            Some(rate) => {
                self.rate_warned = false;
                rate
            }
            None => {
                if !self.rate_warned {
                    diagnostics.record_unsupported_rate(fps);
                    self.rate_warned = true;
                }
                MtcRate::FALLBACK
            }
        }
    }

    /// Four pieces spread over one frame length starting at `alignment`.
    ///
    /// The length is that of the decoded frame, so the spacing follows the
    /// incoming rate. A full eight-piece sequence spans two frames and
    /// describes the label latched when its first piece went out.
    fn push_quarter_frames(&mut self, translation: &mut Translation, alignment: i64, frame: &DecodedFrame) {
        let direction = frame.direction;
        let first_piece = match direction {
            Direction::Forward => 0,
            Direction::Reverse => QUARTER_FRAME_PIECES - 1,
        };
        if self.quarter.direction != direction {
            self.quarter.direction = direction;
            self.quarter.next_piece = first_piece;
        }

        let span = frame.off_end - frame.off_start + 1;
        let frame_len = if span > 0 {
            span as f64
        } else {
            self.config.samples_per_frame
        };
        let spacing = frame_len / QUARTER_FRAMES_PER_FRAME as f64;
        for i in 0..QUARTER_FRAMES_PER_FRAME {
            let piece = self.quarter.next_piece;
            if piece == first_piece {
                self.quarter.latched = translation.timecode;
            }

            let bytes = mtc::quarter_frame(&self.quarter.latched, translation.rate, piece);
            let offset = (spacing * i as f64).round() as i64;
            translation.push(PendingEvent::new(alignment + offset, &bytes));

            self.quarter.next_piece = match direction {
                Direction::Forward => (piece + 1) % QUARTER_FRAME_PIECES,
                Direction::Reverse => (piece + QUARTER_FRAME_PIECES - 1) % QUARTER_FRAME_PIECES,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(tc: Timecode, direction: Direction, off_end: i64) -> DecodedFrame {
        DecodedFrame {
            timecode: tc,
            direction,
            off_start: off_end - 1919,
            off_end,
            user_bits: 0,
            color_frame: false,
        }
    }

    fn spanning(tc: Timecode, off_start: i64, off_end: i64) -> DecodedFrame {
        DecodedFrame {
            off_start,
            ..decoded(tc, Direction::Forward, off_end)
        }
    }

    fn tc(h: u8, m: u8, s: u8, f: u8) -> Timecode {
        Timecode::new(h, m, s, f).unwrap()
    }

    #[test]
    fn test_forward_publishes_next_frame() {
        let mut translator = Translator::new(TranslatorConfig::default());
        let diag = Diagnostics::new();

        let out = translator.translate(&decoded(tc(1, 0, 0, 10), Direction::Forward, 47_999), &diag);

        assert_eq!(out.timecode, tc(1, 0, 0, 11));
        assert_eq!(out.events().len(), 1);
        assert_eq!(out.events()[0].alignment, 48_000);
        assert_eq!(
            out.events()[0].payload(),
            &[0xF0, 0x7F, 0x7F, 0x01, 0x01, 0x21, 0x00, 0x00, 0x0B, 0xF7]
        );
    }

    #[test]
    fn test_forward_rolls_over_second() {
        let mut translator = Translator::new(TranslatorConfig::default());
        let out = translator.translate(
            &decoded(tc(0, 59, 59, 24), Direction::Forward, 100),
            &Diagnostics::new(),
        );
        assert_eq!(out.timecode, tc(1, 0, 0, 0));
    }

    #[test]
    fn test_reverse_publishes_own_label() {
        let mut translator = Translator::new(TranslatorConfig::default());
        let out = translator.translate(
            &decoded(tc(1, 0, 0, 10), Direction::Reverse, 5_000),
            &Diagnostics::new(),
        );

        assert_eq!(out.timecode, tc(1, 0, 0, 10));
        assert_eq!(out.events()[0].alignment, 5_001);
        assert_eq!(out.events()[0].payload()[8], 10);
    }

    #[test]
    fn test_rate_codes_per_fps() {
        for (num, code) in [(24, 0x00), (25, 0x20), (29, 0x40), (30, 0x60)] {
            let mut translator = Translator::new(TranslatorConfig {
                initial_rate: FrameRate::new(num, 1).unwrap(),
                ..Default::default()
            });
            let out = translator.translate(
                &decoded(tc(2, 0, 0, 0), Direction::Forward, 0),
                &Diagnostics::new(),
            );
            assert_eq!(out.events()[0].payload()[5], code | 2, "fps {}", num);
        }
    }

    #[test]
    fn test_unsupported_rate_warns_once_per_streak() {
        let mut translator = Translator::new(TranslatorConfig {
            initial_rate: FrameRate::new(48, 1).unwrap(),
            ..Default::default()
        });
        let diag = Diagnostics::new();

        for i in 0..5 {
            let out = translator.translate(&decoded(tc(0, 0, 0, i), Direction::Forward, 0), &diag);
            assert_eq!(out.rate, MtcRate::Fps25);
            assert_eq!(out.events()[0].payload()[5] & 0x60, 0x20);
        }

        let snap = diag.snapshot();
        assert_eq!(snap.unsupported_rate_warnings, 1);
        assert_eq!(snap.last_unsupported_rate, 48);
    }

    #[test]
    fn test_drop_frame_flag_upgrades_30_to_2997() {
        let mut translator = Translator::new(TranslatorConfig {
            initial_rate: FrameRate::new(30, 1).unwrap(),
            ..Default::default()
        });
        let df = tc(0, 0, 59, 29).with_drop_frame(true);

        let out = translator.translate(&decoded(df, Direction::Forward, 0), &Diagnostics::new());

        assert_eq!(out.rate, MtcRate::Fps2997Drop);
        // minute 1 skips frames 0 and 1
        assert_eq!((out.timecode.minutes, out.timecode.seconds, out.timecode.frames), (1, 0, 2));
    }

    #[test]
    fn test_detected_rate_used_after_window() {
        let mut translator = Translator::new(TranslatorConfig {
            initial_rate: FrameRate::FPS_25,
            detect_fps: true,
            detect_min_frames: 0,
            ..Default::default()
        });
        let diag = Diagnostics::new();

        // 30 fps material: frames 0..=29 then one more
        let mut last = None;
        for i in 0..31u32 {
            let frame = tc(0, 0, (i / 30) as u8, (i % 30) as u8);
            last = Some(translator.translate(&decoded(frame, Direction::Forward, 0), &diag));
        }

        assert_eq!(translator.current_fps(), 30);
        assert_eq!(last.map(|t| t.rate), Some(MtcRate::Fps30));
    }

    #[test]
    fn test_discontinuities_counted_when_enabled() {
        let mut translator = Translator::new(TranslatorConfig {
            detect_discontinuities: true,
            ..Default::default()
        });
        let diag = Diagnostics::new();

        translator.translate(&decoded(tc(0, 0, 0, 1), Direction::Forward, 0), &diag);
        translator.translate(&decoded(tc(0, 0, 0, 2), Direction::Forward, 0), &diag);
        translator.translate(&decoded(tc(0, 0, 0, 9), Direction::Forward, 0), &diag);

        assert_eq!(diag.snapshot().discontinuities, 1);
    }

    #[test]
    fn test_discontinuities_ignored_when_disabled() {
        let mut translator = Translator::new(TranslatorConfig::default());
        let diag = Diagnostics::new();

        translator.translate(&decoded(tc(0, 0, 0, 1), Direction::Forward, 0), &diag);
        translator.translate(&decoded(tc(0, 0, 0, 9), Direction::Forward, 0), &diag);

        assert_eq!(diag.snapshot().discontinuities, 0);
    }

    #[test]
    fn test_quarter_frames_forward() {
        let mut translator = Translator::new(TranslatorConfig {
            format: MessageFormat::QuarterFrame,
            samples_per_frame: 1920.0,
            ..Default::default()
        });
        let diag = Diagnostics::new();

        let first = translator.translate(&decoded(tc(1, 2, 3, 4), Direction::Forward, 999), &diag);
        let alignments: Vec<i64> = first.events().iter().map(|e| e.alignment).collect();
        assert_eq!(alignments, vec![1000, 1480, 1960, 2440]);

        let pieces: Vec<u8> = first.events().iter().map(|e| e.payload()[1] >> 4).collect();
        assert_eq!(pieces, vec![0, 1, 2, 3]);
        // 01:02:03:05 latched: frame low nibble 5, seconds low nibble 3
        assert_eq!(first.events()[0].payload(), &[0xF1, 0x05]);
        assert_eq!(first.events()[2].payload(), &[0xF1, 0x23]);

        let second = translator.translate(&decoded(tc(1, 2, 3, 5), Direction::Forward, 2919), &diag);
        let pieces: Vec<u8> = second.events().iter().map(|e| e.payload()[1] >> 4).collect();
        assert_eq!(pieces, vec![4, 5, 6, 7]);
        // rate|hour = 0x21: piece 6 low nibble 1, piece 7 high nibble 2
        assert_eq!(second.events()[2].payload(), &[0xF1, 0x61]);
        assert_eq!(second.events()[3].payload(), &[0xF1, 0x72]);
    }

    #[test]
    fn test_quarter_frames_reverse() {
        let mut translator = Translator::new(TranslatorConfig {
            format: MessageFormat::QuarterFrame,
            samples_per_frame: 1920.0,
            ..Default::default()
        });

        let out = translator.translate(
            &decoded(tc(1, 2, 3, 4), Direction::Reverse, 999),
            &Diagnostics::new(),
        );
        let pieces: Vec<u8> = out.events().iter().map(|e| e.payload()[1] >> 4).collect();
        assert_eq!(pieces, vec![7, 6, 5, 4]);
    }

    #[test]
    fn test_quarter_frame_spacing_follows_frame_length() {
        // Configured for 25 fps, fed 30 fps frames of 1600 samples
        let mut translator = Translator::new(TranslatorConfig {
            format: MessageFormat::QuarterFrame,
            ..Default::default()
        });

        let out = translator.translate(&spanning(tc(0, 0, 2, 0), 62_400, 63_999), &Diagnostics::new());

        let alignments: Vec<i64> = out.events().iter().map(|e| e.alignment).collect();
        assert_eq!(alignments, vec![64_000, 64_400, 64_800, 65_200]);
    }

    #[test]
    fn test_dropout_restarts_sequence() {
        let mut translator = Translator::new(TranslatorConfig {
            detect_fps: true,
            detect_min_frames: 0,
            detect_discontinuities: true,
            samples_per_frame: 1600.0,
            ..Default::default()
        });
        let diag = Diagnostics::new();

        let mut end = -1;
        for i in 0..31u32 {
            let frame = tc(0, 0, (i / 30) as u8, (i % 30) as u8);
            translator.translate(&spanning(frame, end + 1, end + 1600), &diag);
            end += 1600;
        }
        assert_eq!(translator.current_fps(), 30);

        // Two seconds of silence, then material from elsewhere on the tape
        let resume = end + 1 + 96_000;
        let out = translator.translate(&spanning(tc(0, 10, 0, 0), resume, resume + 1599), &diag);

        let snap = diag.snapshot();
        assert_eq!(snap.sequence_restarts, 1);
        assert_eq!(snap.discontinuities, 0);
        assert_eq!(out.rate, MtcRate::Fps30);
        assert_eq!(translator.current_fps(), 30);
    }

    #[test]
    fn test_short_gap_keeps_sequence() {
        let mut translator = Translator::new(TranslatorConfig {
            detect_discontinuities: true,
            ..Default::default()
        });
        let diag = Diagnostics::new();

        translator.translate(&spanning(tc(0, 0, 0, 1), 0, 1919), &diag);
        // One missing frame's worth of samples
        translator.translate(&spanning(tc(0, 0, 0, 9), 3840, 5759), &diag);

        let snap = diag.snapshot();
        assert_eq!(snap.sequence_restarts, 0);
        assert_eq!(snap.discontinuities, 1);
    }
}
