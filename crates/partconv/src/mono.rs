// SPDX-License-Identifier: LGPL-3.0-or-later

//! The hybrid monophonic convolver.
//!
//! Glues a short time-domain head to up to four partitioned convolvers
//! at strictly increasing FFT sizes so that the partitions tile the
//! impulse response contiguously: each stage's inherent hop latency
//! equals the offset of the impulse segment it is responsible for,
//! which makes the assembly's input-to-output latency zero (with the
//! head) while keeping amortised cost low. The largest stage lives
//! behind a [`MemorySwap`] cell so it can be reallocated for longer
//! impulses without ever blocking the audio thread.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use split_fft::Sample;
use tracing::debug;

use crate::errors::ConvolveError;
use crate::mem_swap::MemorySwap;
use crate::ops::add_into;
use crate::partitioned::PartitionedConvolve;
use crate::time_domain::TimeDomainConvolve;

const MIN_FFT_SIZE: usize = 1 << 5;
const MAX_FFT_SIZE: usize = 1 << 20;

/// Latency/CPU trade-off presets.
///
/// `Zero` and `Short` share the FFT-size ladder (256, 1024, 4096,
/// 16384); `Zero` adds a 128-sample time-domain head. `Medium` uses
/// (1024, 4096, 16384).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyMode {
    Zero,
    Short,
    Medium,
}

type TailAllocator<T> = Box<dyn Fn(usize) -> Box<PartitionedConvolve<T>> + Send + Sync>;

/// A monophonic hybrid convolver.
pub struct MonoConvolve<T: Sample> {
    sizes: Vec<usize>,
    time: Option<TimeDomainConvolve<T>>,
    part_1: Option<Box<PartitionedConvolve<T>>>,
    part_2: Option<Box<PartitionedConvolve<T>>>,
    part_3: Option<Box<PartitionedConvolve<T>>>,
    part_4: MemorySwap<PartitionedConvolve<T>>,
    allocator: TailAllocator<T>,
    length: usize,
    reset_offset: usize,
    reset: bool,
    flags: u32,
    rng: SmallRng,
}

impl<T: Sample> std::fmt::Debug for MonoConvolve<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonoConvolve")
            .field("sizes", &self.sizes)
            .field("length", &self.length)
            .field("reset_offset", &self.reset_offset)
            .finish_non_exhaustive()
    }
}

/// Stagger the reset phases of the partitioned stages so their FFT work
/// lands on different blocks: stage *i* is shifted by an eighth of the
/// next stage's FFT size.
fn stagger_reset_offsets<T: Sample>(
    sizes: &[usize],
    part_1: Option<&mut PartitionedConvolve<T>>,
    part_2: Option<&mut PartitionedConvolve<T>>,
    part_3: Option<&mut PartitionedConvolve<T>>,
    part_4: Option<&mut PartitionedConvolve<T>>,
    offset: usize,
) {
    let n = sizes.len();

    if let Some(part) = part_1 {
        part.set_reset_offset(Some(offset + (sizes[n - 3] >> 3)));
    }
    if let Some(part) = part_2 {
        part.set_reset_offset(Some(offset + (sizes[n - 2] >> 3)));
    }
    if let Some(part) = part_3 {
        part.set_reset_offset(Some(offset + (sizes[n - 1] >> 3)));
    }
    if let Some(part) = part_4 {
        part.set_reset_offset(Some(offset));
    }
}

impl<T: Sample> MonoConvolve<T> {
    /// Create a convolver for impulses up to `max_length` samples in
    /// one of the preset latency modes.
    pub fn new(max_length: usize, latency: LatencyMode) -> Result<Self, ConvolveError> {
        match latency {
            LatencyMode::Zero => Self::with_sizes(max_length, true, &[256, 1024, 4096, 16384]),
            LatencyMode::Short => Self::with_sizes(max_length, false, &[256, 1024, 4096, 16384]),
            LatencyMode::Medium => Self::with_sizes(max_length, false, &[1024, 4096, 16384]),
        }
    }

    /// Create a convolver with an explicit FFT-size ladder: one to four
    /// strictly increasing powers of two within `[2^5, 2^20]`. With
    /// `zero_latency`, a time-domain head of half the first size covers
    /// the start of the impulse.
    pub fn with_sizes(
        max_length: usize,
        zero_latency: bool,
        sizes: &[usize],
    ) -> Result<Self, ConvolveError> {
        if sizes.is_empty() || sizes.len() > 4 {
            return Err(ConvolveError::FftSizeOutOfRange);
        }
        let mut previous = 0;
        for &size in sizes {
            if !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size)
                || !size.is_power_of_two()
                || size <= previous
            {
                return Err(ConvolveError::FftSizeOutOfRange);
            }
            previous = size;
        }

        let n = sizes.len();
        let largest = sizes[n - 1];
        let mut offset = if zero_latency { sizes[0] >> 1 } else { 0 };

        let time = if zero_latency {
            Some(TimeDomainConvolve::new(0, sizes[0] >> 1)?)
        } else {
            None
        };

        // Each stage owns the impulse segment between its own size and
        // the next stage's size, halved (its partition count at steady
        // state), starting where the previous stage stopped.
        let mut make_part = |size: usize, next: usize, offset: &mut usize| {
            let length = (next - size) >> 1;
            let part = Box::new(PartitionedConvolve::new(size, length, *offset, length));
            *offset += length;
            part
        };

        let part_1 = (n == 4).then(|| make_part(sizes[0], sizes[1], &mut offset));
        let part_2 = (n > 2).then(|| make_part(sizes[n - 3], sizes[n - 2], &mut offset));
        let part_3 = (n > 1).then(|| make_part(sizes[n - 2], sizes[n - 1], &mut offset));

        // The resizeable tail covers everything from the final offset.
        let tail_offset = offset;
        let allocator: TailAllocator<T> = Box::new(move |size| {
            Box::new(PartitionedConvolve::new(
                largest,
                size.max(largest) - tail_offset,
                tail_offset,
                0,
            ))
        });

        let mut convolve = Self {
            sizes: sizes.to_vec(),
            time,
            part_1,
            part_2,
            part_3,
            part_4: MemorySwap::empty(),
            allocator,
            length: 0,
            reset_offset: 0,
            reset: false,
            flags: 0,
            rng: SmallRng::from_entropy(),
        };

        let initial_offset = convolve.rng.gen_range(0..(largest >> 1));
        let mut handle = convolve.part_4.equal(&*convolve.allocator, max_length);
        stagger_reset_offsets(
            &convolve.sizes,
            convolve.part_1.as_deref_mut(),
            convolve.part_2.as_deref_mut(),
            convolve.part_3.as_deref_mut(),
            handle.get_mut(),
            initial_offset,
        );
        drop(handle);
        convolve.reset_offset = initial_offset;

        Ok(convolve)
    }

    /// Length of the currently installed impulse response.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Diagnostic bits accumulated from loader-side operations, one bit
    /// per [`ConvolveError::code`]. Poll and clear from the host.
    pub fn error_flags(&self) -> u32 {
        self.flags
    }

    pub fn clear_error_flags(&mut self) {
        self.flags = 0;
    }

    /// Plan the reset phase: a fixed offset, or `None` for a random
    /// one. Stage phases are staggered from it.
    pub fn set_reset_offset(&mut self, offset: Option<usize>) {
        let offset =
            offset.unwrap_or_else(|| self.rng.gen_range(0..(self.sizes[self.sizes.len() - 1] >> 1)));

        let mut handle = self.part_4.access();
        stagger_reset_offsets(
            &self.sizes,
            self.part_1.as_deref_mut(),
            self.part_2.as_deref_mut(),
            self.part_3.as_deref_mut(),
            handle.get_mut(),
            offset,
        );
        drop(handle);

        self.reset_offset = offset;
    }

    /// Reallocate the tail stage for impulses up to `length` samples.
    /// Invalidates the installed impulse until the next `set`.
    pub fn resize(&mut self, length: usize) -> Result<(), ConvolveError> {
        self.length = 0;

        let mut handle = self.part_4.equal(&*self.allocator, length);
        if let Some(part) = handle.get_mut() {
            part.set_reset_offset(Some(self.reset_offset));
        }
        let resized = handle.size() == length;
        drop(handle);

        debug!(length, resized, "tail stage resized");

        if resized {
            Ok(())
        } else {
            self.flags |= ConvolveError::MemUnavailable.flag();
            Err(ConvolveError::MemUnavailable)
        }
    }

    /// Install an impulse response, distributing slices to every stage
    /// at its own offset and length, optionally resizing the tail
    /// first. Flags a reset so the audio thread never splices old and
    /// new spectra.
    pub fn set<U: Sample>(&mut self, input: &[U], request_resize: bool) -> Result<(), ConvolveError> {
        let length = input.len();

        // Lock (or resize) first, so a concurrent audio block finishes
        // before the spectra are replaced.
        self.length = 0;
        let mut handle = if request_resize {
            self.part_4.equal(&*self.allocator, length)
        } else {
            self.part_4.access()
        };

        let mut flags = 0u32;
        let installed = handle.get().is_some();

        if installed {
            if let Some(time) = self.time.as_mut() {
                if let Err(error) = time.set(input) {
                    flags |= error.flag();
                }
            }
            for part in [&mut self.part_1, &mut self.part_2, &mut self.part_3] {
                if let Some(part) = part.as_deref_mut() {
                    if let Err(error) = part.set(input) {
                        flags |= error.flag();
                    }
                }
            }
            if let Some(part_4) = handle.get_mut() {
                if let Err(error) = part_4.set(input) {
                    flags |= error.flag();
                }
                part_4.set_reset_offset(Some(self.reset_offset));
            }

            self.length = length;
            self.reset = true;
            debug!(length, request_resize, "impulse response installed");
        }

        let result = if length > 0 && !installed {
            Err(ConvolveError::MemUnavailable)
        } else if length > handle.size() {
            Err(ConvolveError::MemAllocTooSmall)
        } else {
            Ok(())
        };
        drop(handle);

        if let Err(error) = result {
            flags |= error.flag();
        }
        self.flags |= flags;

        result
    }

    /// Flag all stages to clear their processing state on the next
    /// `process`.
    pub fn reset(&mut self) -> Result<(), ConvolveError> {
        self.reset = true;
        Ok(())
    }

    /// Convolve a block on the audio thread.
    ///
    /// `temp` is scratch of at least the block length. Never blocks: if
    /// the tail stage is held by the loader or no impulse is installed,
    /// the block is silence (or the output is left untouched when
    /// `accumulate` is set).
    pub fn process(&mut self, input: &[T], temp: &mut [T], output: &mut [T], accumulate: bool) {
        let count = input.len().min(temp.len()).min(output.len());
        let input = &input[..count];
        let temp = &mut temp[..count];
        let output = &mut output[..count];

        if let Some(mut handle) = self.part_4.attempt() {
            if self.length != 0 && self.length <= handle.size() {
                if self.reset {
                    if let Some(time) = self.time.as_mut() {
                        time.reset();
                    }
                    if let Some(part) = self.part_1.as_deref_mut() {
                        part.reset();
                    }
                    if let Some(part) = self.part_2.as_deref_mut() {
                        part.reset();
                    }
                    if let Some(part) = self.part_3.as_deref_mut() {
                        part.reset();
                    }
                    if let Some(part) = handle.get_mut() {
                        part.reset();
                    }
                    self.reset = false;
                }

                // Each stage writes the output directly the first time
                // and `temp` thereafter, summed into the output.
                let mut acc = accumulate;

                if let Some(time) = self.time.as_mut() {
                    let wrote = if acc {
                        time.process(input, temp)
                    } else {
                        time.process(input, output)
                    };
                    if wrote && acc {
                        add_into(output, temp);
                    }
                    acc = true;
                }

                for part in [&mut self.part_1, &mut self.part_2, &mut self.part_3] {
                    if let Some(part) = part.as_deref_mut() {
                        let wrote = if acc {
                            part.process(input, temp, false)
                        } else {
                            part.process(input, output, false)
                        };
                        if wrote && acc {
                            add_into(output, temp);
                        }
                        acc = true;
                    }
                }

                if let Some(part) = handle.get_mut() {
                    let wrote = if acc {
                        part.process(input, temp, false)
                    } else {
                        part.process(input, output, false)
                    };
                    if wrote && acc {
                        add_into(output, temp);
                    }
                }

                return;
            }
        }

        if !accumulate {
            output.fill(T::ZERO);
        }
    }
}
