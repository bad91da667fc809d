// SPDX-License-Identifier: LGPL-3.0-or-later

//! Uniformly partitioned frequency-domain convolution (overlap-save).
//!
//! The impulse response is split into partitions of half the FFT size;
//! each partition's zero-padded real FFT is held as one half-spectrum.
//! Input is written into two time rings half an FFT apart, so a full,
//! contiguous frame is always available when a hop boundary is reached.
//! A circular history of input spectra is multiply-accumulated against
//! the impulse spectra; the work is metered across the samples of each
//! hop so per-block cost stays flat, with partition 0 reserved for the
//! step right after the forward transform.
//!
//! Overlap-save: successive frames overlap by 50% and the first half of
//! each inverse transform is discarded (the output ring is written one
//! half behind the input phase).

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use split_fft::{rfft_time, rifft_time, Sample, Setup, Split};
use tracing::{debug, warn};

use crate::errors::ConvolveError;
use crate::ops::{add_into, mac_partition, scale_into};

const MIN_FFT_SIZE_LOG2: usize = 5;
const MAX_FFT_SIZE_LOG2: usize = 20;

/// Base-2 log of `value`, rounding up for non-powers of two.
fn log2_round_up(value: usize) -> usize {
    let mut bit_shift = value;
    let mut bit_count = 0usize;

    while bit_shift != 0 {
        bit_shift >>= 1;
        bit_count += 1;
    }

    if bit_count > 0 && value == 1 << (bit_count - 1) {
        bit_count - 1
    } else {
        bit_count
    }
}

/// A fixed-FFT-size partitioned convolver.
#[derive(Debug)]
pub struct PartitionedConvolve<T: Sample> {
    // Parameters
    offset: usize,
    length: usize,
    max_impulse_length: usize,

    // FFT state
    setup: Setup<T>,
    max_fft_size_log2: usize,
    fft_size_log2: usize,
    rw_counter: usize,

    // Scheduling state
    input_position: usize,
    partitions_done: usize,
    last_partition: usize,
    num_partitions: usize,
    valid_partitions: usize,

    // Buffers: two input rings, the inverse-FFT scratch, the output ring
    fft_buffers: [Vec<T>; 4],
    impulse_buffer: Split<T>,
    input_buffer: Split<T>,
    accum_buffer: Split<T>,
    partition_temp: Vec<T>,

    // Flags
    reset_offset: Option<usize>,
    reset_flag: bool,

    rng: SmallRng,
}

impl<T: Sample> PartitionedConvolve<T> {
    /// Create a convolver with FFT sizes up to `max_fft_size`, able to
    /// hold `max_length` impulse samples, convolving the impulse slice
    /// at `offset` clamped to `length` samples (`0` = unbounded).
    ///
    /// `max_fft_size` is clamped into `[2^5, 2^20]` and rounded up to a
    /// power of two; the FFT size starts at the maximum.
    pub fn new(max_fft_size: usize, max_length: usize, offset: usize, length: usize) -> Self {
        let max_fft_size_log2 =
            log2_round_up(max_fft_size).clamp(MIN_FFT_SIZE_LOG2, MAX_FFT_SIZE_LOG2);
        let max_fft_size = 1usize << max_fft_size_log2;
        let half = max_fft_size >> 1;

        // Round the impulse capacity up to whole partitions so the
        // maximum length loads at any FFT size.
        let mut max_impulse_length = max_length;
        if max_impulse_length % half != 0 {
            max_impulse_length = (max_impulse_length / half + 1) * half;
        }

        Self {
            offset,
            length: length.min(max_impulse_length),
            max_impulse_length,
            setup: Setup::new(max_fft_size_log2),
            max_fft_size_log2,
            fft_size_log2: max_fft_size_log2,
            rw_counter: 0,
            input_position: 0,
            partitions_done: 0,
            last_partition: 0,
            num_partitions: 0,
            valid_partitions: 0,
            fft_buffers: [
                vec![T::ZERO; max_fft_size],
                vec![T::ZERO; max_fft_size],
                vec![T::ZERO; max_fft_size],
                vec![T::ZERO; max_fft_size],
            ],
            impulse_buffer: Split::new(max_impulse_length),
            input_buffer: Split::new(max_impulse_length),
            accum_buffer: Split::new(half),
            partition_temp: vec![T::ZERO; max_fft_size],
            reset_offset: None,
            reset_flag: true,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Current FFT size in samples.
    pub fn fft_size(&self) -> usize {
        1 << self.fft_size_log2
    }

    /// Change the FFT size. Clears the partitioning when the size
    /// actually changes; a non-power-of-two request is rounded up and
    /// reported.
    pub fn set_fft_size(&mut self, fft_size: usize) -> Result<(), ConvolveError> {
        let fft_size_log2 = log2_round_up(fft_size);

        if fft_size_log2 < MIN_FFT_SIZE_LOG2 || fft_size_log2 > self.max_fft_size_log2 {
            return Err(ConvolveError::FftSizeOutOfRange);
        }

        let mut result = Ok(());
        if fft_size != 1 << fft_size_log2 {
            result = Err(ConvolveError::FftSizeNonPowerOfTwo);
        }

        if fft_size_log2 != self.fft_size_log2 {
            self.num_partitions = 0;
            self.fft_size_log2 = fft_size_log2;
        }

        result
    }

    /// Clamp the loadable impulse length (`0` = unbounded); a request
    /// beyond the buffer capacity is clipped and reported.
    pub fn set_length(&mut self, length: usize) -> Result<(), ConvolveError> {
        self.length = length.min(self.max_impulse_length);

        if length > self.max_impulse_length {
            Err(ConvolveError::PartitionLengthTooLarge)
        } else {
            Ok(())
        }
    }

    /// Number of leading impulse samples this instance skips.
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Select the ring phase applied on the next reset; `None` picks a
    /// fresh uniformly random phase each reset, decorrelating the FFT
    /// work of parallel instances.
    pub fn set_reset_offset(&mut self, offset: Option<usize>) {
        self.reset_offset = offset;
    }

    /// Partition the impulse slice and install its spectra, converting
    /// the sample type as needed. Flags a reset.
    pub fn set<U: Sample>(&mut self, input: &[U]) -> Result<(), ConvolveError> {
        let fft_size = self.fft_size();
        let half = fft_size >> 1;

        let mut result = Ok(());

        // How much of the impulse to load.
        let mut length = input.len().saturating_sub(self.offset);
        if self.length != 0 && self.length < length {
            length = self.length;
        }
        if length > self.max_impulse_length {
            warn!(
                requested = length,
                capacity = self.max_impulse_length,
                "impulse truncated to buffer capacity"
            );
            length = self.max_impulse_length;
            result = Err(ConvolveError::MemAllocTooSmall);
        }

        // Partition, zero pad, and transform straight into position.
        let mut num_partitions = 0;
        let mut buffer_position = self.offset;
        let mut spectrum_offset = 0;
        let mut remaining = length;

        while remaining > 0 {
            let num_samples = remaining.min(half);
            remaining -= num_samples;

            for (j, value) in self.partition_temp[..num_samples].iter_mut().enumerate() {
                *value = T::from_f64(input[buffer_position + j].to_f64());
            }
            self.partition_temp[num_samples..fft_size].fill(T::ZERO);

            rfft_time(
                &self.setup,
                &self.partition_temp,
                &mut self.impulse_buffer.re[spectrum_offset..spectrum_offset + half],
                &mut self.impulse_buffer.im[spectrum_offset..spectrum_offset + half],
                self.fft_size_log2,
            );

            buffer_position += half;
            spectrum_offset += half;
            num_partitions += 1;
        }

        debug!(length, num_partitions, fft_size, "impulse partitioned");

        self.num_partitions = num_partitions;
        self.reset();

        result
    }

    /// Flag the processing state to be cleared on the next `process`.
    pub fn reset(&mut self) {
        self.reset_flag = true;
    }

    /// Convolve a block (overlap-save), writing or accumulating into
    /// `output`. Returns `false` when no impulse is loaded; in that
    /// case the output is zeroed unless `accumulate` is set, in which
    /// case it is left untouched.
    pub fn process(&mut self, input: &[T], output: &mut [T], accumulate: bool) -> bool {
        let num_samples = input.len().min(output.len());
        let fft_size = self.fft_size();
        let half = fft_size >> 1;
        let hop_mask = half - 1;

        if self.num_partitions == 0 {
            if !accumulate {
                output[..num_samples].fill(T::ZERO);
            }
            return false;
        }

        // Reset here if needed: the FFT size changed or a new impulse
        // was loaded.
        if self.reset_flag {
            for buffer in &mut self.fft_buffers {
                buffer.fill(T::ZERO);
            }
            self.accum_buffer.clear();

            self.rw_counter = match self.reset_offset {
                Some(offset) => offset % half,
                None => self.rng.gen_range(0..half),
            };

            self.input_position = 0;
            self.partitions_done = 0;
            self.last_partition = 0;
            self.valid_partitions = 1;

            self.reset_flag = false;
        }

        let mut rw_counter = self.rw_counter;
        let mut position = 0;
        let mut samples_remaining = num_samples;

        while samples_remaining > 0 {
            // Samples to deal with before the next FFT is due.
            let till_next_fft = half - (rw_counter & hop_mask);
            let loop_size = samples_remaining.min(till_next_fft);
            let hi_counter = (rw_counter + half) & (fft_size - 1);

            // Load the input into both rings; drain the output ring.
            self.fft_buffers[0][rw_counter..rw_counter + loop_size]
                .copy_from_slice(&input[position..position + loop_size]);
            self.fft_buffers[1][hi_counter..hi_counter + loop_size]
                .copy_from_slice(&input[position..position + loop_size]);

            if accumulate {
                add_into(
                    &mut output[position..position + loop_size],
                    &self.fft_buffers[3][rw_counter..rw_counter + loop_size],
                );
            } else {
                output[position..position + loop_size]
                    .copy_from_slice(&self.fft_buffers[3][rw_counter..rw_counter + loop_size]);
            }

            samples_remaining -= loop_size;
            rw_counter += loop_size;
            position += loop_size;

            let fft_counter = rw_counter & hop_mask;
            let fft_now = fft_counter == 0;

            // Scheduled partition work: on the hop boundary finish all
            // remaining partitions bar partition 0; otherwise advance
            // proportionally to the position within the hop.
            let mut partitions_to_do = if fft_now {
                self.valid_partitions as isize - self.partitions_done as isize - 1
            } else {
                (self.valid_partitions as isize - 1) * fft_counter as isize / half as isize
                    - self.partitions_done as isize
            };

            while partitions_to_do > 0 {
                // One round may wrap the input history once.
                let next_partition = if self.last_partition < self.num_partitions {
                    self.last_partition
                } else {
                    0
                };
                self.last_partition = self
                    .num_partitions
                    .min(next_partition + partitions_to_do as usize);
                partitions_to_do -= (self.last_partition - next_partition) as isize;

                for part in next_partition..self.last_partition {
                    let imp = (self.partitions_done + 1) * half;
                    let inp = part * half;

                    mac_partition(
                        &mut self.accum_buffer.re[..half],
                        &mut self.accum_buffer.im[..half],
                        &self.input_buffer.re[inp..inp + half],
                        &self.input_buffer.im[inp..inp + half],
                        &self.impulse_buffer.re[imp..imp + half],
                        &self.impulse_buffer.im[imp..imp + half],
                    );
                    self.partitions_done += 1;
                }
            }

            if fft_now {
                // Forward transform the full ring into the history slot
                // and add partition 0 (needed now); then inverse, scale
                // and store (overlap-save).
                let buffer_index = usize::from(rw_counter == fft_size);
                let slot = self.input_position * half;

                rfft_time(
                    &self.setup,
                    &self.fft_buffers[buffer_index],
                    &mut self.input_buffer.re[slot..slot + half],
                    &mut self.input_buffer.im[slot..slot + half],
                    self.fft_size_log2,
                );
                mac_partition(
                    &mut self.accum_buffer.re[..half],
                    &mut self.accum_buffer.im[..half],
                    &self.input_buffer.re[slot..slot + half],
                    &self.input_buffer.im[slot..slot + half],
                    &self.impulse_buffer.re[..half],
                    &self.impulse_buffer.im[..half],
                );
                rifft_time(
                    &self.setup,
                    &mut self.accum_buffer.re[..half],
                    &mut self.accum_buffer.im[..half],
                    &mut self.fft_buffers[2][..fft_size],
                    self.fft_size_log2,
                );

                // Two doubled forward spectra and the unnormalized
                // inverse leave a factor of 4·fft_size.
                let scale = T::from_f64(1.0 / ((fft_size << 2) as f64));
                {
                    let (front, back) = self.fft_buffers.split_at_mut(3);
                    let ifft_out = &front[2][..half];
                    if rw_counter != fft_size {
                        scale_into(&mut back[0][half..fft_size], ifft_out, scale);
                    } else {
                        scale_into(&mut back[0][..half], ifft_out, scale);
                    }
                }

                self.accum_buffer.re[..half].fill(T::ZERO);
                self.accum_buffer.im[..half].fill(T::ZERO);

                rw_counter &= fft_size - 1;

                self.valid_partitions = self.num_partitions.min(self.valid_partitions + 1);
                self.input_position = if self.input_position == 0 {
                    self.num_partitions - 1
                } else {
                    self.input_position - 1
                };
                self.last_partition = self.input_position + 1;
                self.partitions_done = 0;
            }
        }

        self.rw_counter = rw_counter;

        true
    }
}
