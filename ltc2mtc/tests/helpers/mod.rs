//! Shared fixtures for ltc2mtc integration tests
//!
//! - [`LtcSignal`]: biphase-mark LTC generator producing normalized f32 audio
//! - [`RecordingSink`]: MIDI sink remembering every scheduled message
//! - [`run_block`] / [`run_cycles`]: drive a processor the way the audio
//!   callback does

#![allow(dead_code)]

use std::sync::Arc;

use ltc2mtc::bridge::InputBuffer;
use ltc2mtc::diagnostics::Diagnostics;
use ltc2mtc::latency::PortLatency;
use ltc2mtc::ltc::LtcDecoder;
use ltc2mtc::processor::ProcessorConfig;
use ltc2mtc::scheduler::{CycleReport, MidiSink, SinkError};
use ltc2mtc::Processor;
use ltc2mtc_common::Timecode;

pub const SAMPLE_RATE: u32 = 48_000;

/// Peak level of generated LTC
pub const AMPLITUDE: f32 = 0.5;

/// Samples per LTC bit at 48 kHz and 25 fps
pub const SAMPLES_PER_BIT_25: usize = 24;

const USER_BIT_OFFSETS: [usize; 8] = [4, 12, 20, 28, 36, 44, 52, 60];

/// The 80 bits of one LTC frame in transmission order.
pub fn frame_bits(tc: &Timecode, user_bits: u32) -> [bool; 80] {
    let mut bits = [false; 80];
    let mut put = |start: usize, len: usize, value: u32| {
        for i in 0..len {
            bits[start + i] = (value >> i) & 1 == 1;
        }
    };

    put(0, 4, (tc.frames % 10) as u32);
    put(8, 2, (tc.frames / 10) as u32);
    put(10, 1, tc.drop_frame as u32);
    put(16, 4, (tc.seconds % 10) as u32);
    put(24, 3, (tc.seconds / 10) as u32);
    put(32, 4, (tc.minutes % 10) as u32);
    put(40, 3, (tc.minutes / 10) as u32);
    put(48, 4, (tc.hours % 10) as u32);
    put(56, 2, (tc.hours / 10) as u32);
    for (group, &start) in USER_BIT_OFFSETS.iter().enumerate() {
        put(start, 4, (user_bits >> (group * 4)) & 0x0F);
    }
    // Sync word, bytes FC BF
    put(64, 16, 0xBFFC);

    bits
}

/// Biphase-mark LTC generator.
///
/// Every bit starts with a level change; a one adds a second change halfway
/// through the cell. The decoder only locks on from the second edge it sees,
/// so a signal should open with a few zero bits, and close with a few more so
/// the last frame's final cell is terminated.
#[derive(Debug, Clone)]
pub struct LtcSignal {
    samples: Vec<f32>,
    samples_per_bit: usize,
    high: bool,
}

impl LtcSignal {
    pub fn new(samples_per_bit: usize) -> Self {
        Self {
            samples: Vec::new(),
            samples_per_bit,
            high: false,
        }
    }

    /// Generator for `fps` at [`SAMPLE_RATE`]
    pub fn for_fps(fps: u32) -> Self {
        Self::new((SAMPLE_RATE / (fps * 80)) as usize)
    }

    pub fn silence(mut self, samples: usize) -> Self {
        self.samples.extend(std::iter::repeat(0.0).take(samples));
        self
    }

    pub fn zeros(mut self, bits: usize) -> Self {
        for _ in 0..bits {
            self.push_bit(false);
        }
        self
    }

    pub fn frame(self, tc: Timecode) -> Self {
        self.frame_with_user_bits(tc, 0)
    }

    pub fn frame_with_user_bits(mut self, tc: Timecode, user_bits: u32) -> Self {
        for bit in frame_bits(&tc, user_bits) {
            self.push_bit(bit);
        }
        self
    }

    /// `count` consecutive frames counting up from `start`
    pub fn frames(mut self, start: Timecode, count: usize, fps: u32) -> Self {
        let mut tc = start;
        for _ in 0..count {
            self = self.frame(tc);
            tc = tc.next(fps);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// The signal played backwards
    pub fn reversed(self) -> Vec<f32> {
        let mut samples = self.samples;
        samples.reverse();
        samples
    }

    fn push_bit(&mut self, bit: bool) {
        let first = self.samples_per_bit / 2;
        let second = self.samples_per_bit - first;

        self.high = !self.high;
        self.push_level(first);
        if bit {
            self.high = !self.high;
        }
        self.push_level(second);
    }

    fn push_level(&mut self, samples: usize) {
        let level = if self.high { AMPLITUDE } else { -AMPLITUDE };
        self.samples.extend(std::iter::repeat(level).take(samples));
    }
}

/// Copy of `samples` zero-padded to `len`
pub fn pad(samples: &[f32], len: usize) -> Vec<f32> {
    let mut padded = samples.to_vec();
    padded.resize(len.max(samples.len()), 0.0);
    padded
}

/// One message written by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    /// Absolute clock position (cycle start + offset)
    pub at: i64,
    pub offset: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    cycle_start: i64,
    pub events: Vec<Emitted>,
}

impl RecordingSink {
    pub fn begin_cycle(&mut self, now: i64) {
        self.cycle_start = now;
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl MidiSink for RecordingSink {
    fn write_event(&mut self, offset: u32, bytes: &[u8]) -> Result<(), SinkError> {
        self.events.push(Emitted {
            at: self.cycle_start + offset as i64,
            offset,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

/// Processor with fixed latencies and its diagnostics
pub fn new_processor(config: &ProcessorConfig, capture: u32, playback: u32) -> (Processor, Arc<Diagnostics>) {
    shared_latency_processor(config, Arc::new(PortLatency::new(capture, playback)))
}

/// Processor reading latencies the test keeps changing
pub fn shared_latency_processor(config: &ProcessorConfig, latency: Arc<PortLatency>) -> (Processor, Arc<Diagnostics>) {
    let diagnostics = Arc::new(Diagnostics::new());
    let processor = Processor::new(config, latency, Arc::clone(&diagnostics));
    (processor, diagnostics)
}

/// Run a single cycle over `samples`
pub fn run_block<D: LtcDecoder>(processor: &mut Processor<D>, samples: &[f32], sink: &mut RecordingSink) -> CycleReport {
    sink.begin_cycle(processor.now());
    processor
        .process(&InputBuffer::mono(samples), sink)
        .expect("sample clock overflow")
}

/// Run `samples` through in cycles of `cycle` frames, zero-padding the last.
pub fn run_cycles<D: LtcDecoder>(
    processor: &mut Processor<D>,
    samples: &[f32],
    cycle: usize,
    sink: &mut RecordingSink,
) -> Vec<CycleReport> {
    samples
        .chunks(cycle)
        .map(|chunk| {
            let block = pad(chunk, cycle);
            run_block(processor, &block, sink)
        })
        .collect()
}
