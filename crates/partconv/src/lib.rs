// SPDX-License-Identifier: LGPL-3.0-or-later

//! # partconv
//!
//! A real-time, zero-latency, multi-rate partitioned convolution engine
//! built on the [`split_fft`] transform kernel. It convolves an input
//! stream with a fixed impulse response of arbitrary length at a
//! worst-case per-block cost independent of that length.
//!
//! The engine is assembled from:
//!
//! - **[`TimeDomainConvolve`]**: short direct convolution covering the
//!   head of the impulse response, so the first output sample depends on
//!   the current input sample only
//! - **[`PartitionedConvolve`]**: overlap-save frequency-domain
//!   convolution at a fixed FFT size, with per-partition work metered
//!   evenly across input blocks
//! - **[`MonoConvolve`]**: the hybrid scheduler gluing one head to up to
//!   four partitioned stages at exponentially increasing FFT sizes
//! - **[`MemorySwap`]**: the loader/audio handoff cell that lets the
//!   tail stage be reallocated without ever blocking the audio thread
//! - **[`ir`]**: a thin WAV loader for sourcing impulse responses
//!
//! ## Threads
//!
//! `process` is for the audio thread: it never blocks, never allocates,
//! and never fails (missing resources produce silence). Loading,
//! resizing, and resetting belong on a non-realtime thread. A single
//! convolver is not re-entrant; independent convolvers may run on
//! parallel audio threads.

pub mod errors;
pub mod ir;
pub mod mem_swap;
pub mod mono;
mod ops;
pub mod partitioned;
pub mod time_domain;

pub use errors::ConvolveError;
pub use mem_swap::MemorySwap;
pub use mono::{LatencyMode, MonoConvolve};
pub use partitioned::PartitionedConvolve;
pub use time_domain::TimeDomainConvolve;
