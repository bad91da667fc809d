// SPDX-License-Identifier: LGPL-3.0-or-later

//! Split-complex buffers and interleaved ↔ split layout conversion.
//!
//! Complex data is stored as separate real and imaginary arrays (SOA
//! layout) throughout the crate; hot paths never touch interleaved
//! complex memory. The zip/unzip functions convert at the edges.

use multiversion::multiversion;

use crate::sample::Sample;

/// An owned split-complex buffer: equal-length real and imaginary arrays.
///
/// Used as both FFT input and output. For a packed real spectrum of `N`
/// real samples the buffer holds `N/2` bins, with the Nyquist bin's real
/// part stored in `im[0]`.
#[derive(Debug, Clone)]
pub struct Split<T> {
    pub re: Vec<T>,
    pub im: Vec<T>,
}

impl<T: Sample> Split<T> {
    /// Create a zero-filled split buffer of `len` bins.
    pub fn new(len: usize) -> Self {
        Self {
            re: vec![T::ZERO; len],
            im: vec![T::ZERO; len],
        }
    }

    /// Number of complex bins.
    pub fn len(&self) -> usize {
        self.re.len()
    }

    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    /// Zero both arrays.
    pub fn clear(&mut self) {
        self.re.fill(T::ZERO);
        self.im.fill(T::ZERO);
    }
}

/// Deinterleave `input` (`[re0, im0, re1, im1, ...]`) into split arrays.
///
/// Converts `re.len().min(im.len())` bins; `input` must hold twice that
/// many samples.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn unzip<T: Sample>(input: &[T], re: &mut [T], im: &mut [T]) {
    let bins = re.len().min(im.len());
    for i in 0..bins {
        re[i] = input[2 * i];
        im[i] = input[2 * i + 1];
    }
}

/// Interleave split arrays into `out` (`[re0, im0, re1, im1, ...]`).
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub fn zip<T: Sample>(re: &[T], im: &[T], out: &mut [T]) {
    let bins = re.len().min(im.len());
    for i in 0..bins {
        out[2 * i] = re[i];
        out[2 * i + 1] = im[i];
    }
}

/// Deinterleave `input` into a split buffer of `2^(log2-1)` bins, zero
/// padding when `input` is shorter than the `2^log2` transform size.
///
/// An odd trailing sample lands in the real array with a zero imaginary
/// part, matching the packed real-input layout.
pub fn unzip_zero<T: Sample>(input: &[T], re: &mut [T], im: &mut [T], log2: usize) {
    let fft_size = 1usize << log2;

    if input.is_empty() {
        re[..fft_size >> 1].fill(T::ZERO);
        im[..fft_size >> 1].fill(T::ZERO);
        return;
    }

    let in_length = input.len().min(fft_size);
    let odd_sample = input[in_length - 1];

    unzip(input, &mut re[..in_length >> 1], &mut im[..in_length >> 1]);

    if fft_size > in_length {
        let start = in_length >> 1;
        let end = fft_size >> 1;

        re[start] = if in_length & 1 != 0 {
            odd_sample
        } else {
            T::ZERO
        };
        im[start] = T::ZERO;

        for i in start + 1..end {
            re[i] = T::ZERO;
            im[i] = T::ZERO;
        }
    }
}
