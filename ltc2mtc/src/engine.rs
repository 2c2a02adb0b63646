//! Translator engine lifecycle
//!
//! Wires the audio input, processor, dispatcher and MIDI output together.
//! [`Engine::start`] leaves the run state at `Run`; [`Engine::shutdown`]
//! tears everything down in order (stream, dispatcher, MIDI port) exactly
//! once, and is also run on drop.

use std::sync::Arc;
use std::time::Instant;

use ltc2mtc_common::config::LatencySetting;
use tracing::{debug, info, warn};

use crate::audio::{measure_capture_latency, AudioInput};
use crate::config::Settings;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::latency::PortLatency;
use crate::memlock;
use crate::midi::dispatch::DEFAULT_DISPATCH_CAPACITY;
use crate::midi::{dispatch_channel, Dispatcher, MidiOutput};
use crate::processor::Processor;
use crate::state::{RunState, SharedRunState};

pub struct Engine {
    input: AudioInput,
    dispatcher: Dispatcher,
    run_state: Arc<SharedRunState>,
    diagnostics: Arc<Diagnostics>,
    latency: Arc<PortLatency>,
    shut_down: bool,
}

impl Engine {
    /// Open devices, start the audio stream and enter `Run`.
    ///
    /// Any failure here is fatal and leaves nothing running.
    pub fn start(settings: &Settings) -> Result<Self> {
        let run_state = Arc::new(SharedRunState::new());

        if settings.lock_memory {
            match memlock::lock_all() {
                Ok(()) => debug!("Process memory locked"),
                Err(e) => warn!("Failed to lock memory: {}", e),
            }
        }

        let mut input = AudioInput::open(settings.ltc_port.as_deref())?;
        if settings.channel >= input.channels() {
            return Err(Error::Config(format!(
                "channel {} requested but '{}' has {} channel(s)",
                settings.channel,
                input.device_name(),
                input.channels()
            )));
        }
        let sample_rate = input.sample_rate();

        let midi = MidiOutput::connect(settings.mtc_port.as_deref())?;

        let capture = match settings.ltc_latency {
            LatencySetting::Auto => 0,
            LatencySetting::Frames(frames) => frames,
        };
        let latency = Arc::new(PortLatency::new(capture, settings.mtc_latency));
        let diagnostics = Arc::new(Diagnostics::new());

        let mut processor = Processor::new(
            &settings.processor_config(sample_rate),
            Arc::clone(&latency),
            Arc::clone(&diagnostics),
        );

        let (mut sink, receiver) = dispatch_channel(DEFAULT_DISPATCH_CAPACITY);
        let dispatcher = Dispatcher::spawn(receiver, Box::new(midi), sample_rate, Arc::clone(&diagnostics))?;

        let measure_latency = settings.ltc_latency == LatencySetting::Auto;
        let callback_latency = Arc::clone(&latency);
        let callback_state = Arc::clone(&run_state);

        input.start(
            settings.channel,
            move |buffer, info| {
                if callback_state.get() == RunState::Exit {
                    return;
                }
                if measure_latency {
                    if let Some(samples) = measure_capture_latency(info, buffer.frames() as u32, sample_rate) {
                        callback_latency.update_capture(samples);
                    }
                }
                sink.begin_cycle(Instant::now());
                // Clock overflow is counted in diagnostics
                let _ = processor.process(buffer, &mut sink);
            },
            Arc::clone(&run_state),
        )?;

        run_state.set_running();
        info!(
            "Translating LTC from '{}' at {} Hz, {} fps{}{}",
            input.device_name(),
            sample_rate,
            settings.frame_rate,
            if settings.detect_fps { " (autodetect)" } else { "" },
            match settings.message_format {
                ltc2mtc_common::MessageFormat::FullFrame => "",
                ltc2mtc_common::MessageFormat::QuarterFrame => ", quarter-frame",
            }
        );

        Ok(Self {
            input,
            dispatcher,
            run_state,
            diagnostics,
            latency,
            shut_down: false,
        })
    }

    pub fn run_state(&self) -> Arc<SharedRunState> {
        Arc::clone(&self.run_state)
    }

    pub fn diagnostics(&self) -> Arc<Diagnostics> {
        Arc::clone(&self.diagnostics)
    }

    pub fn latency(&self) -> Arc<PortLatency> {
        Arc::clone(&self.latency)
    }

    /// Stop the stream, the dispatcher and close the MIDI port.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.run_state.request_exit();

        info!("Shutting down");
        self.input.stop();
        if let Some(mut output) = self.dispatcher.shutdown() {
            output.close();
        }

        let (capture, playback) = self.latency.snapshot();
        debug!("Final latency compensation: capture={} playback={}", capture, playback);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
