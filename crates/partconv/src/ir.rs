// SPDX-License-Identifier: LGPL-3.0-or-later

//! Impulse response sourcing from RIFF-WAVE files.
//!
//! A thin collaborator around `hound`: decodes PCM and float WAV data
//! and exposes typed per-channel reads at either precision. The engine
//! itself only ever consumes the typed samples; all decoding stays on
//! the loader thread.

use std::path::Path;

use split_fft::Sample;
use thiserror::Error;
use tracing::debug;

/// Errors from reading an impulse response file.
#[derive(Debug, Error)]
pub enum IrError {
    #[error("failed to decode impulse response: {0}")]
    Decode(#[from] hound::Error),
    #[error("channel {requested} out of range ({available} available)")]
    ChannelOutOfRange { requested: usize, available: u16 },
    #[error("unsupported sample layout: {bits} bit {format:?}")]
    UnsupportedFormat {
        bits: u16,
        format: hound::SampleFormat,
    },
}

/// A fully decoded impulse response.
#[derive(Debug, Clone)]
pub struct ImpulseResponse<T> {
    sample_rate: u32,
    channels: u16,
    frames: u32,
    samples: Vec<T>,
}

impl<T: Sample> ImpulseResponse<T> {
    /// Read a whole WAV file, converting to the target sample type.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IrError> {
        let mut reader = hound::WavReader::open(path.as_ref())?;
        let spec = reader.spec();
        let frames = reader.duration();

        let samples = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| T::from_f64(f64::from(v))))
                .collect::<Result<Vec<T>, hound::Error>>()?,
            (hound::SampleFormat::Int, bits) if bits <= 32 => {
                let scale = 1.0 / f64::from(1u32 << (bits - 1));
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| T::from_f64(f64::from(v) * scale)))
                    .collect::<Result<Vec<T>, hound::Error>>()?
            }
            (format, bits) => return Err(IrError::UnsupportedFormat { bits, format }),
        };

        debug!(
            path = %path.as_ref().display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            frames,
            "impulse response loaded"
        );

        Ok(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            frames,
            samples,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames per channel.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// The raw interleaved samples.
    pub fn interleaved(&self) -> &[T] {
        &self.samples
    }

    /// Extract one channel as a contiguous buffer.
    pub fn channel(&self, index: usize) -> Result<Vec<T>, IrError> {
        if index >= usize::from(self.channels) {
            return Err(IrError::ChannelOutOfRange {
                requested: index,
                available: self.channels,
            });
        }

        let stride = usize::from(self.channels);
        Ok(self
            .samples
            .iter()
            .skip(index)
            .step_by(stride)
            .copied()
            .collect())
    }
}
