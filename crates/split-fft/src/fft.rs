// SPDX-License-Identifier: LGPL-3.0-or-later

//! In-place forward and inverse transforms on split buffers.
//!
//! Complex transforms operate on `2^log2` bins; packed real transforms
//! treat `2^log2` real samples as `2^(log2-1)` bins with the Nyquist
//! real part stored in `im[0]`. Nothing normalizes: `ifft(fft(x))`
//! yields `N·x` and `rifft(rfft(x))` yields `2·N·x`.

use crate::passes::{
    pass_1_2_reorder, pass_3, pass_3_reorder, pass_real, pass_trig, pass_trig_reorder, small_fft,
    small_real_fft,
};
use crate::sample::Sample;
use crate::setup::Setup;
use crate::split::{unzip, zip};

/// Run the pass chain for a transform of `2^log2 >= 16` points.
///
/// Reordering variants are used while a later reorder pass will follow;
/// the cutover happens halfway up the pass ladder.
fn fft_passes<T: Sample>(setup: &Setup<T>, re: &mut [T], im: &mut [T], log2: usize) {
    let n = 1usize << log2;

    pass_1_2_reorder(re, im, n);

    if log2 > 5 {
        pass_3_reorder(re, im, n);
    } else {
        pass_3(re, im, n);
    }

    let (tab_re, tab_im) = setup.table(4);
    if 3 < (log2 >> 1) {
        pass_trig_reorder(re, im, tab_re, tab_im, n, 3);
    } else {
        pass_trig(re, im, tab_re, tab_im, n, 3);
    }

    let mut pass = 4;
    while pass < (log2 >> 1) {
        let (tab_re, tab_im) = setup.table(pass + 1);
        pass_trig_reorder(re, im, tab_re, tab_im, n, pass);
        pass += 1;
    }
    while pass < log2 {
        let (tab_re, tab_im) = setup.table(pass + 1);
        pass_trig(re, im, tab_re, tab_im, n, pass);
        pass += 1;
    }
}

/// In-place forward complex FFT of `2^log2` bins.
///
/// # Panics
/// Panics if `log2` exceeds the plan's maximum or the buffers are
/// shorter than `2^log2`.
pub fn fft<T: Sample>(setup: &Setup<T>, re: &mut [T], im: &mut [T], log2: usize) {
    let n = 1usize << log2;
    assert!(log2 <= setup.max_log2(), "transform larger than plan");
    assert!(re.len() >= n && im.len() >= n, "split buffer too short");

    if log2 >= 4 {
        fft_passes(setup, &mut re[..n], &mut im[..n], log2);
    } else {
        small_fft(re, im, log2);
    }
}

/// In-place inverse complex FFT of `2^log2` bins (unnormalized).
///
/// Defined as the forward transform with real and imaginary swapped.
pub fn ifft<T: Sample>(setup: &Setup<T>, re: &mut [T], im: &mut [T], log2: usize) {
    fft(setup, im, re, log2);
}

/// In-place forward packed real FFT: `2^log2` real samples held as
/// `2^(log2-1)` split bins (even samples in `re`, odd in `im`).
///
/// The output packs the Nyquist bin's real part into `im[0]`; every bin
/// carries twice the mathematical DFT value.
pub fn rfft<T: Sample>(setup: &Setup<T>, re: &mut [T], im: &mut [T], log2: usize) {
    if log2 >= 3 {
        fft(setup, re, im, log2 - 1);
        let (tab_re, tab_im) = setup.table(log2);
        pass_real(re, im, tab_re, tab_im, log2, false);
    } else {
        small_real_fft(re, im, log2, false);
    }
}

/// In-place inverse packed real FFT (unnormalized; the forward/inverse
/// pair scales by `2^(log2+1)`).
pub fn rifft<T: Sample>(setup: &Setup<T>, re: &mut [T], im: &mut [T], log2: usize) {
    if log2 >= 3 {
        let (tab_re, tab_im) = setup.table(log2);
        pass_real(re, im, tab_re, tab_im, log2, true);
        ifft(setup, re, im, log2 - 1);
    } else {
        small_real_fft(re, im, log2, true);
    }
}

/// Forward packed real FFT of a contiguous time-domain buffer.
///
/// Deinterleaves the first `2^log2` samples of `input` into the split
/// output and transforms in place. This is the loading path convolvers
/// use for both impulse partitions and input frames.
pub fn rfft_time<T: Sample>(setup: &Setup<T>, input: &[T], re: &mut [T], im: &mut [T], log2: usize) {
    let half = 1usize << (log2 - 1);
    unzip(&input[..1 << log2], &mut re[..half], &mut im[..half]);
    rfft(setup, re, im, log2);
}

/// Inverse packed real FFT into a contiguous time-domain buffer.
///
/// Transforms the split spectrum in place (destroying it) and
/// interleaves the result into `output`.
pub fn rifft_time<T: Sample>(
    setup: &Setup<T>,
    re: &mut [T],
    im: &mut [T],
    output: &mut [T],
    log2: usize,
) {
    let half = 1usize << (log2 - 1);
    rifft(setup, re, im, log2);
    zip(&re[..half], &im[..half], &mut output[..1 << log2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// O(N²) reference DFT on split arrays.
    fn naive_dft(re: &[f64], im: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = re.len();
        let mut out_re = vec![0.0; n];
        let mut out_im = vec![0.0; n];
        for k in 0..n {
            for j in 0..n {
                let angle = -2.0 * core::f64::consts::PI * (k * j) as f64 / n as f64;
                let (s, c) = angle.sin_cos();
                out_re[k] += re[j] * c - im[j] * s;
                out_im[k] += re[j] * s + im[j] * c;
            }
        }
        (out_re, out_im)
    }

    /// Deterministic pseudo-random fill in [-1, 1).
    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_fft_matches_naive_dft() {
        for log2 in 1..=9 {
            let n = 1usize << log2;
            let setup = Setup::<f64>::new(log2.max(3));

            let src_re = noise(n, 1);
            let src_im = noise(n, 2);
            let (want_re, want_im) = naive_dft(&src_re, &src_im);

            let mut re = src_re.clone();
            let mut im = src_im.clone();
            fft(&setup, &mut re, &mut im, log2);

            for k in 0..n {
                assert!(
                    (re[k] - want_re[k]).abs() < 1e-9 * n as f64,
                    "n={} re[{}]: got {}, want {}",
                    n,
                    k,
                    re[k],
                    want_re[k]
                );
                assert!(
                    (im[k] - want_im[k]).abs() < 1e-9 * n as f64,
                    "n={} im[{}]: got {}, want {}",
                    n,
                    k,
                    im[k],
                    want_im[k]
                );
            }
        }
    }

    #[test]
    fn test_fft_ifft_roundtrip_scales_by_n() {
        for log2 in 1..=12 {
            let n = 1usize << log2;
            let setup = Setup::<f64>::new(log2.max(3));

            let src_re = noise(n, 3);
            let src_im = noise(n, 4);

            let mut re = src_re.clone();
            let mut im = src_im.clone();
            fft(&setup, &mut re, &mut im, log2);
            ifft(&setup, &mut re, &mut im, log2);

            for k in 0..n {
                assert!(
                    (re[k] / n as f64 - src_re[k]).abs() < 1e-12,
                    "n={} re[{}]",
                    n,
                    k
                );
                assert!(
                    (im[k] / n as f64 - src_im[k]).abs() < 1e-12,
                    "n={} im[{}]",
                    n,
                    k
                );
            }
        }
    }

    #[test]
    fn test_rfft_delta_is_flat() {
        // An impulse transforms to a flat spectrum of 2s (twice the DFT).
        let setup = Setup::<f64>::new(3);
        let mut re = [1.0, 0.0, 0.0, 0.0];
        let mut im = [0.0, 0.0, 0.0, 0.0];

        rfft(&setup, &mut re, &mut im, 3);

        assert_eq!(re, [2.0, 2.0, 2.0, 2.0]);
        // im[0] holds the Nyquist real part.
        assert!((im[0] - 2.0).abs() < 1e-12);
        for k in 1..4 {
            assert!(im[k].abs() < 1e-12, "im[{}]", k);
        }
    }

    #[test]
    fn test_rfft_matches_naive_dft() {
        for log2 in 1..=10 {
            let n = 1usize << log2;
            let half = n >> 1;
            let setup = Setup::<f64>::new(log2.max(3));

            let signal = noise(n, 5);
            let zeros = vec![0.0; n];
            let (want_re, want_im) = naive_dft(&signal, &zeros);

            let mut re = vec![0.0; half];
            let mut im = vec![0.0; half];
            rfft_time(&setup, &signal, &mut re, &mut im, log2);

            // Bin 0 packs DC (re) and Nyquist (im), both doubled.
            assert!((re[0] - 2.0 * want_re[0]).abs() < 1e-9 * n as f64, "n={} dc", n);
            assert!(
                (im[0] - 2.0 * want_re[half]).abs() < 1e-9 * n as f64,
                "n={} nyquist",
                n
            );
            for k in 1..half {
                assert!(
                    (re[k] - 2.0 * want_re[k]).abs() < 1e-9 * n as f64,
                    "n={} re[{}]",
                    n,
                    k
                );
                assert!(
                    (im[k] - 2.0 * want_im[k]).abs() < 1e-9 * n as f64,
                    "n={} im[{}]",
                    n,
                    k
                );
            }
        }
    }

    #[test]
    fn test_real_roundtrip_scales_by_2n() {
        for log2 in 1..=16 {
            let n = 1usize << log2;
            let setup = Setup::<f64>::new(log2.max(3));

            let signal = noise(n, 6);
            let mut re = vec![0.0; n >> 1];
            let mut im = vec![0.0; n >> 1];
            let mut time = vec![0.0; n];

            rfft_time(&setup, &signal, &mut re, &mut im, log2);
            rifft_time(&setup, &mut re, &mut im, &mut time, log2);

            let scale = 1.0 / (2.0 * n as f64);
            for k in 0..n {
                assert!(
                    (time[k] * scale - signal[k]).abs() < 1e-11,
                    "n={} sample {}: got {}, want {}",
                    n,
                    k,
                    time[k] * scale,
                    signal[k]
                );
            }
        }
    }

    #[test]
    fn test_real_roundtrip_f32() {
        for log2 in [3usize, 6, 10, 14] {
            let n = 1usize << log2;
            let setup = Setup::<f32>::new(log2);

            let signal: Vec<f32> = noise(n, 7).iter().map(|&x| x as f32).collect();
            let mut re = vec![0.0f32; n >> 1];
            let mut im = vec![0.0f32; n >> 1];
            let mut time = vec![0.0f32; n];

            rfft_time(&setup, &signal, &mut re, &mut im, log2);
            rifft_time(&setup, &mut re, &mut im, &mut time, log2);

            let scale = 1.0 / (2.0 * n as f32);
            for k in 0..n {
                assert!(
                    (time[k] * scale - signal[k]).abs() < 2e-5,
                    "n={} sample {}",
                    n,
                    k
                );
            }
        }
    }
}
