//! Per-callback processing context
//!
//! Owns everything the audio callback touches: clock, decode bridge,
//! decoder, translator and event queue. Moved into the callback closure at
//! startup; shared state is limited to latency values and diagnostics.

use std::sync::Arc;

use ltc2mtc_common::{FrameRate, MessageFormat};

use crate::bridge::{DecodeBridge, InputBuffer};
use crate::clock::{ClockError, SampleClock};
use crate::diagnostics::Diagnostics;
use crate::estimator::DEFAULT_MIN_OBSERVATIONS;
use crate::latency::PortLatency;
use crate::ltc::decoder::DEFAULT_FRAME_QUEUE_LEN;
use crate::ltc::{BiphaseDecoder, LtcDecoder};
use crate::queue::{EventQueue, DEFAULT_QUEUE_CAPACITY};
use crate::scheduler::{self, CycleReport, MidiSink};
use crate::translator::{Translator, TranslatorConfig};

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub sample_rate: u32,
    pub frame_rate: FrameRate,
    pub detect_fps: bool,
    pub detect_min_frames: u32,
    pub queue_capacity: usize,
    pub message_format: MessageFormat,
    pub detect_discontinuities: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            frame_rate: FrameRate::FPS_25,
            detect_fps: false,
            detect_min_frames: DEFAULT_MIN_OBSERVATIONS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            message_format: MessageFormat::FullFrame,
            detect_discontinuities: false,
        }
    }
}

impl ProcessorConfig {
    fn translator_config(&self) -> TranslatorConfig {
        TranslatorConfig {
            initial_rate: self.frame_rate,
            detect_fps: self.detect_fps,
            detect_min_frames: self.detect_min_frames,
            format: self.message_format,
            detect_discontinuities: self.detect_discontinuities,
            samples_per_frame: self.frame_rate.samples_per_frame(self.sample_rate),
        }
    }
}

/// Decode → translate → schedule, once per audio cycle.
pub struct Processor<D: LtcDecoder = BiphaseDecoder> {
    clock: SampleClock,
    bridge: DecodeBridge,
    decoder: D,
    translator: Translator,
    queue: EventQueue,
    latency: Arc<PortLatency>,
    diagnostics: Arc<Diagnostics>,
}

impl Processor<BiphaseDecoder> {
    pub fn new(config: &ProcessorConfig, latency: Arc<PortLatency>, diagnostics: Arc<Diagnostics>) -> Self {
        let decoder = BiphaseDecoder::new(
            config.frame_rate.samples_per_frame(config.sample_rate),
            DEFAULT_FRAME_QUEUE_LEN,
        );
        Self::with_decoder(config, decoder, latency, diagnostics)
    }
}

impl<D: LtcDecoder> Processor<D> {
    pub fn with_decoder(
        config: &ProcessorConfig,
        decoder: D,
        latency: Arc<PortLatency>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            clock: SampleClock::new(),
            bridge: DecodeBridge::new(),
            decoder,
            translator: Translator::new(config.translator_config()),
            queue: EventQueue::new(config.queue_capacity),
            latency,
            diagnostics,
        }
    }

    /// Run one cycle over `input`, writing due messages to `sink`.
    ///
    /// **REAL-TIME SAFE**: no locks, no allocation, no logging. Only a clock
    /// overflow is returned as an error; every other anomaly is counted.
    pub fn process<S>(&mut self, input: &InputBuffer<'_>, sink: &mut S) -> Result<CycleReport, ClockError>
    where
        S: MidiSink + ?Sized,
    {
        let now = self.clock.now();
        let nframes = input.frames() as u32;
        let capture = self.latency.capture() as i64;

        // The decoder runs on the raw clock; capture latency only moves
        // the resulting events
        if self.bridge.feed(input, now, &mut self.decoder).is_err() {
            self.diagnostics.record_oversized_buffer();
        }

        while let Some(frame) = self.decoder.read() {
            self.diagnostics.record_frame_decoded();
            let translation = self.translator.translate(&frame, &self.diagnostics);
            for event in translation.events() {
                let mut event = *event;
                event.alignment -= capture;
                if self.queue.push(event).is_err() {
                    self.diagnostics.record_queue_overflow();
                }
            }
        }
        self.diagnostics
            .set_decoder_overflows(self.decoder.overflow_count());

        let report = scheduler::drain(&mut self.queue, now, nframes, self.latency.playback(), sink);
        self.diagnostics.record_cycle(nframes, &report);

        if let Err(e) = self.clock.advance(nframes) {
            self.diagnostics.record_clock_overflow();
            return Err(e);
        }
        Ok(report)
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }
}
