//! Audio input using cpal
//!
//! Opens the capture device carrying LTC and runs the per-cycle callback on
//! cpal's audio thread. The stream error callback is the engine's shutdown
//! notification: a vanished device moves the run state to `Exit`.

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, InputCallbackInfo, SampleFormat, SizedSample, Stream, StreamConfig, StreamError};
use tracing::{debug, error, info, warn};

use crate::bridge::InputBuffer;
use crate::error::{Error, Result};
use crate::state::SharedRunState;

/// Audio input device and, once started, its capture stream.
pub struct AudioInput {
    device: Device,
    device_name: String,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
}

impl AudioInput {
    /// List available audio input devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .input_devices()
            .map_err(|e| Error::AudioInput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} input devices", devices.len());
        Ok(devices)
    }

    /// Open an input device.
    ///
    /// `device_name` is matched exactly first, then as a substring. A name
    /// that matches nothing falls back to the default input device with a
    /// warning.
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let requested = match device_name {
            Some(name) => {
                let devices: Vec<Device> = host
                    .input_devices()
                    .map_err(|e| Error::AudioInput(format!("Failed to enumerate devices: {}", e)))?
                    .collect();
                let exact = devices.iter().position(|d| d.name().ok().as_deref() == Some(name));
                let partial = || {
                    devices
                        .iter()
                        .position(|d| d.name().map(|n| n.contains(name)).unwrap_or(false))
                };
                match exact.or_else(partial) {
                    Some(index) => devices.into_iter().nth(index),
                    None => {
                        warn!("Requested input device '{}' not found, falling back to default device", name);
                        None
                    }
                }
            }
            None => None,
        };

        let device = match requested {
            Some(device) => device,
            None => host
                .default_input_device()
                .ok_or_else(|| Error::AudioInput("No default input device found".to_string()))?,
        };
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio input device: {}", device_name);

        let (config, sample_format) = Self::get_best_config(&device)?;
        debug!(
            "Audio input config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        Ok(Self {
            device,
            device_name,
            config,
            sample_format,
            stream: None,
        })
    }

    /// Device default config, preferring f32 samples, else i16.
    fn get_best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let default = device
            .default_input_config()
            .map_err(|e| Error::AudioInput(format!("Failed to get default config: {}", e)))?;

        if matches!(default.sample_format(), SampleFormat::F32 | SampleFormat::I16) {
            let sample_format = default.sample_format();
            return Ok((default.config(), sample_format));
        }

        let sample_rate = default.sample_rate();
        let mut supported = device
            .supported_input_configs()
            .map_err(|e| Error::AudioInput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported.find(|c| {
            c.sample_format() == SampleFormat::F32
                && c.min_sample_rate() <= sample_rate
                && c.max_sample_rate() >= sample_rate
        });

        match preferred {
            Some(c) => Ok((c.with_sample_rate(sample_rate).config(), SampleFormat::F32)),
            None => Err(Error::AudioInput(format!(
                "Unsupported sample format: {:?}",
                default.sample_format()
            ))),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Start capturing.
    ///
    /// `callback` runs on the real-time audio thread once per buffer with
    /// the selected `channel`. Stream errors that mean the device is gone
    /// request exit through `run_state`.
    pub fn start<F>(&mut self, channel: u16, callback: F, run_state: Arc<SharedRunState>) -> Result<()>
    where
        F: FnMut(&InputBuffer<'_>, &InputCallbackInfo) + Send + 'static,
    {
        info!("Starting audio input stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32, _>(
                channel,
                |data, channels, channel| InputBuffer::interleaved(data, channels, channel),
                callback,
                run_state,
            )?,
            SampleFormat::I16 => self.build_stream::<i16, _>(
                channel,
                |data, channels, channel| InputBuffer::interleaved_i16(data, channels, channel),
                callback,
                run_state,
            )?,
            sample_format => {
                return Err(Error::AudioInput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioInput(format!("Failed to start stream: {}", e)))?;
        self.stream = Some(stream);

        info!("Audio input stream started");
        Ok(())
    }

    fn build_stream<T, F>(
        &self,
        channel: u16,
        wrap: for<'a> fn(&'a [T], usize, usize) -> InputBuffer<'a>,
        mut callback: F,
        run_state: Arc<SharedRunState>,
    ) -> Result<Stream>
    where
        T: SizedSample + 'static,
        F: FnMut(&InputBuffer<'_>, &InputCallbackInfo) + Send + 'static,
    {
        let channels = self.config.channels as usize;
        let channel = channel as usize;

        self.device
            .build_input_stream(
                &self.config,
                move |data: &[T], info: &InputCallbackInfo| {
                    callback(&wrap(data, channels, channel), info);
                },
                move |err| {
                    error!("Audio input stream error: {}", err);
                    if matches!(err, StreamError::DeviceNotAvailable) {
                        run_state.request_exit();
                    }
                },
                None,
            )
            .map_err(|e| Error::AudioInput(format!("Failed to build stream: {}", e)))
    }

    /// Stop and release the capture stream. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause audio input stream: {}", e);
            }
            drop(stream);
            info!("Audio input stream stopped");
        }
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Hardware capture latency in samples.
///
/// `callback_delay` is the time between the first sample being captured and
/// the callback running. Part of that is simply the buffer filling up; only
/// the remainder needs compensating.
pub fn hardware_latency_samples(callback_delay: Duration, frames: u32, sample_rate: u32) -> u32 {
    let delay = (callback_delay.as_secs_f64() * sample_rate as f64).round() as i64;
    (delay - frames as i64).clamp(0, u32::MAX as i64) as u32
}

/// Measure capture latency from a callback's timestamps
pub fn measure_capture_latency(info: &InputCallbackInfo, frames: u32, sample_rate: u32) -> Option<u32> {
    let ts = info.timestamp();
    ts.callback
        .duration_since(&ts.capture)
        .map(|delay| hardware_latency_samples(delay, frames, sample_rate))
}
