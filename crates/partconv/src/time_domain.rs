// SPDX-License-Identifier: LGPL-3.0-or-later

//! Short direct convolution for the zero-latency head.
//!
//! Covers the first samples of the impulse response so that the hybrid
//! engine's first output sample depends on the current input sample
//! only. The impulse slice is stored reversed and the input history is
//! written twice, one ring length apart, so every per-sample dot
//! product reads a contiguous window.

use split_fft::Sample;
use tracing::warn;

use crate::errors::ConvolveError;
use crate::ops::dot;

/// Hard cap on the head impulse length in samples.
const MAX_IMPULSE_LENGTH: usize = 2048;

/// Input history ring length; twice the maximum impulse so the
/// double-written window never wraps.
const RING_SIZE: usize = 4096;

/// A time-domain convolver for short impulse slices.
#[derive(Debug, Clone)]
pub struct TimeDomainConvolve<T> {
    offset: usize,
    length: usize,
    impulse: Vec<T>,
    impulse_length: usize,
    history: Vec<T>,
    position: usize,
    reset_flag: bool,
}

impl<T: Sample> TimeDomainConvolve<T> {
    /// Create a head convolver for the impulse slice starting at
    /// `offset` and at most `length` samples long (`0` = unbounded).
    pub fn new(offset: usize, length: usize) -> Result<Self, ConvolveError> {
        if length > MAX_IMPULSE_LENGTH {
            return Err(ConvolveError::TimeLengthOutOfRange);
        }

        Ok(Self {
            offset,
            length,
            impulse: vec![T::ZERO; MAX_IMPULSE_LENGTH],
            impulse_length: 0,
            history: vec![T::ZERO; 2 * RING_SIZE],
            position: 0,
            reset_flag: true,
        })
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Set the length clamp (`0` = unbounded up to the head cap).
    pub fn set_length(&mut self, length: usize) -> Result<(), ConvolveError> {
        if length > MAX_IMPULSE_LENGTH {
            return Err(ConvolveError::TimeLengthOutOfRange);
        }
        self.length = length;
        Ok(())
    }

    /// Install the impulse slice, converting the sample type as needed.
    ///
    /// The slice is `input[offset..]` clamped to the length bound; an
    /// overlong slice is clipped to the head cap and reported.
    pub fn set<U: Sample>(&mut self, input: &[U]) -> Result<(), ConvolveError> {
        let mut result = Ok(());

        let mut length = input.len().saturating_sub(self.offset);
        if self.length != 0 {
            length = length.min(self.length);
        }
        if length > MAX_IMPULSE_LENGTH {
            warn!(requested = length, max = MAX_IMPULSE_LENGTH, "head impulse clipped");
            length = MAX_IMPULSE_LENGTH;
            result = Err(ConvolveError::TimeImpulseTooLong);
        }

        // Store reversed so process reads it forward.
        for (j, sample) in self.impulse[..length].iter_mut().enumerate() {
            *sample = T::from_f64(input[self.offset + length - 1 - j].to_f64());
        }
        self.impulse_length = length;

        self.reset();
        result
    }

    /// Flag the input history to be zeroed on the next `process`.
    pub fn reset(&mut self) {
        self.reset_flag = true;
    }

    /// Convolve a block. Returns `false` (output untouched) when no
    /// impulse is loaded.
    pub fn process(&mut self, input: &[T], output: &mut [T]) -> bool {
        if self.reset_flag {
            self.history.fill(T::ZERO);
            self.position = 0;
            self.reset_flag = false;
        }

        let length = self.impulse_length;
        if length == 0 {
            return false;
        }

        for (x, y) in input.iter().zip(output.iter_mut()) {
            self.history[self.position] = *x;
            self.history[self.position + RING_SIZE] = *x;

            let end = self.position + RING_SIZE + 1;
            *y = dot(&self.impulse[..length], &self.history[end - length..end]);

            self.position = (self.position + 1) & (RING_SIZE - 1);
        }

        true
    }
}
