// SPDX-License-Identifier: LGPL-3.0-or-later

//! # split-fft
//!
//! A split-radix FFT kernel operating on split-complex buffers (separate
//! real and imaginary arrays), generic over `f32` and `f64`.
//!
//! This crate provides the transform layer used by `partconv` to build
//! real-time partitioned convolvers. It includes:
//!
//! - **Plans**: [`Setup`] holds precomputed twiddle tables for every
//!   transform size up to a maximum, shareable read-only across threads
//! - **Complex transforms**: in-place forward/inverse FFT on split buffers
//! - **Real transforms**: packed real FFT/IFFT where DC and Nyquist share
//!   the first complex slot (Nyquist real part stored in `im[0]`)
//! - **Zip/unzip**: interleaved ↔ split layout conversion, with a
//!   zero-padding variant for loading short buffers
//!
//! ## Design
//!
//! The passes are written as index-explicit loops compiled for several
//! SIMD targets through the `multiversion` crate (AVX2+FMA, AVX, SSE4.1,
//! NEON); the best variant is selected at runtime. Transform sizes are
//! given as base-2 logarithms (`log2 = 10` → 1024 points).
//!
//! ## Scaling conventions
//!
//! No transform normalizes. `ifft(fft(x))` scales by `N`, and the real
//! pair `rifft(rfft(x))` scales by `2·N` (the forward real transform
//! produces twice the mathematical DFT, matching the common vendor
//! split-real layout). Downstream code compensates once, after the
//! inverse.

pub mod fft;
mod passes;
pub mod sample;
pub mod setup;
pub mod split;

pub use fft::{fft, ifft, rfft, rfft_time, rifft, rifft_time};
pub use sample::Sample;
pub use setup::Setup;
pub use split::{unzip, unzip_zero, zip, Split};
