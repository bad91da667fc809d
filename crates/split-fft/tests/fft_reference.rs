// SPDX-License-Identifier: LGPL-3.0-or-later
//
// A/B reference tests: compare the split-radix kernel against rustfft
// with identical pseudo-random inputs across a sweep of sizes.

use num_complex::Complex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rustfft::{Fft, FftPlanner};
use split_fft::{fft, ifft, rfft_time, rifft_time, Setup};

fn rustfft_forward(re: &[f64], im: &[f64]) -> Vec<Complex<f64>> {
    let mut planner = FftPlanner::new();
    let plan = planner.plan_fft_forward(re.len());
    let mut buf: Vec<Complex<f64>> = re
        .iter()
        .zip(im.iter())
        .map(|(&r, &i)| Complex::new(r, i))
        .collect();
    plan.process(&mut buf);
    buf
}

fn noise(rng: &mut ChaCha8Rng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

#[test]
fn complex_fft_matches_rustfft() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);

    for log2 in 1..=14 {
        let n = 1usize << log2;
        let setup = Setup::<f64>::new(log2.max(3));

        let src_re = noise(&mut rng, n);
        let src_im = noise(&mut rng, n);
        let want = rustfft_forward(&src_re, &src_im);

        let mut re = src_re.clone();
        let mut im = src_im.clone();
        fft(&setup, &mut re, &mut im, log2);

        let tol = 1e-10 * n as f64;
        for k in 0..n {
            assert!(
                (re[k] - want[k].re).abs() < tol,
                "n={} re[{}]: got {}, want {}",
                n,
                k,
                re[k],
                want[k].re
            );
            assert!(
                (im[k] - want[k].im).abs() < tol,
                "n={} im[{}]: got {}, want {}",
                n,
                k,
                im[k],
                want[k].im
            );
        }
    }
}

#[test]
fn complex_ifft_matches_rustfft() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xf00d);

    for log2 in 1..=12 {
        let n = 1usize << log2;
        let setup = Setup::<f64>::new(log2.max(3));

        let src_re = noise(&mut rng, n);
        let src_im = noise(&mut rng, n);

        let mut planner = FftPlanner::new();
        let plan = planner.plan_fft_inverse(n);
        let mut want: Vec<Complex<f64>> = src_re
            .iter()
            .zip(src_im.iter())
            .map(|(&r, &i)| Complex::new(r, i))
            .collect();
        plan.process(&mut want);

        let mut re = src_re.clone();
        let mut im = src_im.clone();
        ifft(&setup, &mut re, &mut im, log2);

        let tol = 1e-10 * n as f64;
        for k in 0..n {
            assert!((re[k] - want[k].re).abs() < tol, "n={} re[{}]", n, k);
            assert!((im[k] - want[k].im).abs() < tol, "n={} im[{}]", n, k);
        }
    }
}

#[test]
fn real_fft_is_twice_the_half_spectrum() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xbeef);

    for log2 in 3..=16 {
        let n = 1usize << log2;
        let half = n >> 1;
        let setup = Setup::<f64>::new(log2);

        let signal = noise(&mut rng, n);
        let zeros = vec![0.0; n];
        let want = rustfft_forward(&signal, &zeros);

        let mut re = vec![0.0; half];
        let mut im = vec![0.0; half];
        rfft_time(&setup, &signal, &mut re, &mut im, log2);

        let tol = 1e-10 * n as f64;
        assert!((re[0] - 2.0 * want[0].re).abs() < tol, "n={} dc", n);
        assert!((im[0] - 2.0 * want[half].re).abs() < tol, "n={} nyquist", n);
        for k in 1..half {
            assert!((re[k] - 2.0 * want[k].re).abs() < tol, "n={} re[{}]", n, k);
            assert!((im[k] - 2.0 * want[k].im).abs() < tol, "n={} im[{}]", n, k);
        }
    }
}

#[test]
fn real_inverse_recovers_rustfft_spectrum() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xcafe);

    for log2 in 3..=14 {
        let n = 1usize << log2;
        let half = n >> 1;
        let setup = Setup::<f64>::new(log2);

        let signal = noise(&mut rng, n);
        let zeros = vec![0.0; n];
        let spectrum = rustfft_forward(&signal, &zeros);

        // Build the packed doubled half-spectrum rustfft implies, then
        // invert it; the unnormalized inverse pair scales by 2N.
        let mut re: Vec<f64> = (0..half).map(|k| 2.0 * spectrum[k].re).collect();
        let mut im: Vec<f64> = (0..half).map(|k| 2.0 * spectrum[k].im).collect();
        im[0] = 2.0 * spectrum[half].re;

        let mut time = vec![0.0; n];
        rifft_time(&setup, &mut re, &mut im, &mut time, log2);

        let scale = 1.0 / (2.0 * n as f64);
        for k in 0..n {
            assert!(
                (time[k] * scale - signal[k]).abs() < 1e-11,
                "n={} sample {}",
                n,
                k
            );
        }
    }
}

#[test]
fn f32_tracks_f64_kernel() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xd1ce);

    for log2 in [4usize, 7, 10, 13] {
        let n = 1usize << log2;
        let setup32 = Setup::<f32>::new(log2);
        let setup64 = Setup::<f64>::new(log2);

        let src = noise(&mut rng, 2 * n);
        let mut re64: Vec<f64> = src[..n].to_vec();
        let mut im64: Vec<f64> = src[n..].to_vec();
        let mut re32: Vec<f32> = re64.iter().map(|&x| x as f32).collect();
        let mut im32: Vec<f32> = im64.iter().map(|&x| x as f32).collect();

        fft(&setup64, &mut re64, &mut im64, log2);
        fft(&setup32, &mut re32, &mut im32, log2);

        let tol = 1e-3 * n as f64;
        for k in 0..n {
            assert!(
                (f64::from(re32[k]) - re64[k]).abs() < tol,
                "n={} re[{}]",
                n,
                k
            );
            assert!(
                (f64::from(im32[k]) - im64[k]).abs() < tol,
                "n={} im[{}]",
                n,
                k
            );
        }
    }
}
