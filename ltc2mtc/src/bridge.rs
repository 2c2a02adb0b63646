//! Decode bridge: audio callback buffer → LTC decoder
//!
//! Converts one cycle of normalized audio samples to the unsigned 8-bit
//! representation the decoder expects and submits it with the clock
//! position of the first frame.
//!
//! Conversion goes through a fixed staging buffer. A cycle longer than the
//! staging buffer is skipped entirely (never partially decoded) and
//! reported to the caller.

use thiserror::Error;

use crate::ltc::LtcDecoder;

/// Largest cycle, in frames, the bridge will decode
pub const STAGING_LIMIT: usize = 8192;

/// The cycle was not decoded
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    #[error("input buffer of {frames} frames exceeds staging limit of {limit}")]
    Oversized { frames: usize, limit: usize },
}

#[derive(Debug, Clone, Copy)]
enum Samples<'a> {
    F32(&'a [f32]),
    I16(&'a [i16]),
}

/// One cycle of audio input, possibly interleaved.
///
/// Borrowed straight from the audio backend; the LTC channel is picked out
/// while iterating.
#[derive(Debug, Clone, Copy)]
pub struct InputBuffer<'a> {
    samples: Samples<'a>,
    channels: usize,
    channel: usize,
}

impl<'a> InputBuffer<'a> {
    /// Single-channel float samples
    pub fn mono(samples: &'a [f32]) -> Self {
        Self::interleaved(samples, 1, 0)
    }

    /// Interleaved float samples; `channel` is clamped to the last channel
    pub fn interleaved(samples: &'a [f32], channels: usize, channel: usize) -> Self {
        let channels = channels.max(1);
        Self {
            samples: Samples::F32(samples),
            channels,
            channel: channel.min(channels - 1),
        }
    }

    /// Interleaved 16-bit samples
    pub fn interleaved_i16(samples: &'a [i16], channels: usize, channel: usize) -> Self {
        let channels = channels.max(1);
        Self {
            samples: Samples::I16(samples),
            channels,
            channel: channel.min(channels - 1),
        }
    }

    /// Frames in this cycle
    pub fn frames(&self) -> usize {
        let len = match self.samples {
            Samples::F32(s) => s.len(),
            Samples::I16(s) => s.len(),
        };
        len / self.channels
    }

    /// Normalized samples of the selected channel
    pub fn samples(&self) -> impl Iterator<Item = f32> + 'a {
        let (channels, channel, frames) = (self.channels, self.channel, self.frames());
        let (f32s, i16s): (&'a [f32], &'a [i16]) = match self.samples {
            Samples::F32(s) => (s, &[]),
            Samples::I16(s) => (&[], s),
        };
        let f32_iter = f32s.iter().skip(channel).step_by(channels).take(frames).copied();
        let i16_iter = i16s
            .iter()
            .skip(channel)
            .step_by(channels)
            .take(frames)
            .map(|&s| s as f32 / i16::MAX as f32);
        f32_iter.chain(i16_iter)
    }
}

/// Map a normalized sample onto an unsigned byte centered at 128.
pub fn sample_to_byte(sample: f32) -> u8 {
    (127.0 * sample + 128.0).round().clamp(0.0, 255.0) as u8
}

/// Staging buffer between the audio callback and the decoder
pub struct DecodeBridge {
    staging: Box<[u8]>,
}

impl DecodeBridge {
    pub fn new() -> Self {
        Self {
            staging: vec![0u8; STAGING_LIMIT].into_boxed_slice(),
        }
    }

    /// Convert `input` and hand it to `decoder`, tagged with `posinfo`.
    pub fn feed<D>(&mut self, input: &InputBuffer<'_>, posinfo: i64, decoder: &mut D) -> Result<(), BridgeError>
    where
        D: LtcDecoder + ?Sized,
    {
        let frames = input.frames();
        if frames > self.staging.len() {
            return Err(BridgeError::Oversized {
                frames,
                limit: self.staging.len(),
            });
        }

        for (slot, sample) in self.staging.iter_mut().zip(input.samples()) {
            *slot = sample_to_byte(sample);
        }

        decoder.write(&self.staging[..frames], posinfo);
        Ok(())
    }
}

impl Default for DecodeBridge {
    fn default() -> Self {
        Self::new()
    }
}
