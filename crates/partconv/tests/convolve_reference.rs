// SPDX-License-Identifier: LGPL-3.0-or-later
//
// End-to-end scenarios for the hybrid mono convolver, compared against
// direct time-domain convolution with identical seeded inputs.

use partconv::{LatencyMode, MonoConvolve};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Direct convolution reference, accumulated in f64.
fn convolve_reference(ir: &[f32], input: &[f32], out_len: usize) -> Vec<f32> {
    let mut output = vec![0.0f64; out_len];
    for (n, out) in output.iter_mut().enumerate() {
        for (k, &h) in ir.iter().enumerate() {
            if n >= k {
                *out += f64::from(h) * f64::from(input[n - k]);
            }
        }
    }
    output.into_iter().map(|x| x as f32).collect()
}

fn noise(rng: &mut ChaCha8Rng, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// Stream `input` through the convolver in fixed-size blocks.
fn run_blocks(conv: &mut MonoConvolve<f32>, input: &[f32], block: usize) -> Vec<f32> {
    let mut output = vec![0.0f32; input.len()];
    let mut temp = vec![0.0f32; block];
    let mut pos = 0;
    while pos < input.len() {
        let end = (pos + block).min(input.len());
        conv.process(
            &input[pos..end],
            &mut temp[..end - pos],
            &mut output[pos..end],
            false,
        );
        pos = end;
    }
    output
}

#[test]
fn unit_impulse_passes_input_through_with_zero_latency() {
    let input: Vec<f32> = (0..8192).map(|i| (i % 337) as f32 / 337.0 - 0.5).collect();

    for &block in &[32usize, 100, 512] {
        let mut conv = MonoConvolve::<f32>::new(1 << 15, LatencyMode::Zero).expect("engine");
        conv.set_reset_offset(Some(0));
        conv.set(&[1.0f32], false).expect("set");

        let output = run_blocks(&mut conv, &input, block);
        for (n, (&got, &want)) in output.iter().zip(input.iter()).enumerate() {
            assert!(
                (got - want).abs() < 1e-5,
                "block={} sample {}: got {}, want {}",
                block,
                n,
                got,
                want
            );
        }
    }
}

#[test]
fn two_tap_impulse_smears_a_delta() {
    let mut conv = MonoConvolve::<f32>::new(1 << 14, LatencyMode::Zero).expect("engine");
    conv.set_reset_offset(Some(0));
    conv.set(&[0.5f32, 0.5], false).expect("set");

    let mut input = vec![0.0f32; 1024];
    input[0] = 1.0;

    let output = run_blocks(&mut conv, &input, 64);

    assert!((output[0] - 0.5).abs() < 1e-6);
    assert!((output[1] - 0.5).abs() < 1e-6);
    for (n, &sample) in output.iter().enumerate().skip(2) {
        assert!(sample.abs() < 1e-6, "sample {}: {}", n, sample);
    }
}

#[test]
fn long_ir_output_is_block_size_invariant_and_correct() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x1234);
    let ir = noise(&mut rng, 10_000);
    let input = noise(&mut rng, 48_000);

    let mut outputs = Vec::new();
    for &block in &[32usize, 64, 128, 441, 1024] {
        let mut conv = MonoConvolve::<f32>::new(1 << 16, LatencyMode::Zero).expect("engine");
        conv.set_reset_offset(Some(0));
        conv.set(&ir, false).expect("set");
        outputs.push((block, run_blocks(&mut conv, &input, block)));
    }

    // All block sizes agree with each other.
    let (_, reference) = &outputs[0];
    for (block, output) in &outputs[1..] {
        for (n, (&got, &want)) in output.iter().zip(reference.iter()).enumerate() {
            assert!(
                (got - want).abs() < 1e-5,
                "block={} sample {}: got {}, want {}",
                block,
                n,
                got,
                want
            );
        }
    }

    // And with the direct convolution over a prefix; the error bound
    // grows with the number of accumulated taps.
    let prefix = 4096;
    let expected = convolve_reference(&ir, &input, prefix);
    for (n, (&got, &want)) in reference[..prefix].iter().zip(expected.iter()).enumerate() {
        assert!(
            (got - want).abs() < 2e-3,
            "sample {}: got {}, want {}",
            n,
            got,
            want
        );
    }
}

#[test]
fn hot_reload_never_mixes_old_and_new_spectra() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x4242);
    let ir_a = noise(&mut rng, 2000);
    let ir_b = noise(&mut rng, 500);
    let input = noise(&mut rng, 48_000);

    let block = 512;
    let switch_at = 24_064; // block boundary past 24000

    // Engine that switches impulse mid-stream.
    let mut conv = MonoConvolve::<f32>::new(1 << 15, LatencyMode::Zero).expect("engine");
    conv.set_reset_offset(Some(5));
    conv.set(&ir_a, false).expect("set A");

    let mut output = vec![0.0f32; input.len()];
    let mut temp = vec![0.0f32; block];
    let mut pos = 0;
    while pos < input.len() {
        if pos == switch_at {
            conv.set(&ir_b, false).expect("set B");
        }
        let end = (pos + block).min(input.len());
        conv.process(
            &input[pos..end],
            &mut temp[..end - pos],
            &mut output[pos..end],
            false,
        );
        pos = end;
    }

    // Reference: a fresh engine with impulse B over the stream suffix.
    // After the reload the state is reset, so the switched engine must
    // match it exactly from the switch point on.
    let mut fresh = MonoConvolve::<f32>::new(1 << 15, LatencyMode::Zero).expect("engine");
    fresh.set_reset_offset(Some(5));
    fresh.set(&ir_b, false).expect("set B");
    let expected = run_blocks(&mut fresh, &input[switch_at..], block);

    for (n, (&got, &want)) in output[switch_at..].iter().zip(expected.iter()).enumerate() {
        assert!(
            (got - want).abs() < 1e-6,
            "sample {} after reload: got {}, want {}",
            switch_at + n,
            got,
            want
        );
    }
}

#[test]
fn resize_then_set_handles_longer_impulses() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x77);
    let ir = noise(&mut rng, 20_000);
    let input = noise(&mut rng, 30_000);

    // Engine allocated short, resized up before the load.
    let mut conv = MonoConvolve::<f32>::new(1 << 12, LatencyMode::Zero).expect("engine");
    conv.set_reset_offset(Some(0));
    conv.set(&ir, true).expect("set with resize");
    let output = run_blocks(&mut conv, &input, 256);

    // Engine allocated at full size from the start.
    let mut full = MonoConvolve::<f32>::new(20_000, LatencyMode::Zero).expect("engine");
    full.set_reset_offset(Some(0));
    full.set(&ir, false).expect("set");
    let expected = run_blocks(&mut full, &input, 256);

    for (n, (&got, &want)) in output.iter().zip(expected.iter()).enumerate() {
        assert!(
            (got - want).abs() < 1e-6,
            "sample {}: got {}, want {}",
            n,
            got,
            want
        );
    }
}

#[test]
fn random_reset_offsets_do_not_change_the_audio() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x99);
    let ir = noise(&mut rng, 100);
    let input = noise(&mut rng, 16_384);

    let mut fixed = MonoConvolve::<f32>::new(1 << 14, LatencyMode::Zero).expect("engine");
    fixed.set_reset_offset(Some(0));
    fixed.set(&ir, false).expect("set");
    let expected = run_blocks(&mut fixed, &input, 512);

    // The random phase staggers *when* each stage transforms, not what
    // it outputs.
    for trial in 0..4 {
        let mut conv = MonoConvolve::<f32>::new(1 << 14, LatencyMode::Zero).expect("engine");
        conv.set_reset_offset(None);
        conv.set(&ir, false).expect("set");
        let output = run_blocks(&mut conv, &input, 512);

        for (n, (&got, &want)) in output.iter().zip(expected.iter()).enumerate() {
            assert!(
                (got - want).abs() < 1e-4,
                "trial {} sample {}: got {}, want {}",
                trial,
                n,
                got,
                want
            );
        }
    }
}

#[test]
fn short_and_zero_modes_agree_after_the_head_region() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xabc);
    let ir = noise(&mut rng, 3000);
    let input = noise(&mut rng, 20_000);

    let mut zero = MonoConvolve::<f32>::new(1 << 14, LatencyMode::Zero).expect("engine");
    zero.set_reset_offset(Some(0));
    zero.set(&ir, false).expect("set");
    let zero_out = run_blocks(&mut zero, &input, 256);

    let mut short = MonoConvolve::<f32>::new(1 << 14, LatencyMode::Short).expect("engine");
    short.set_reset_offset(Some(0));
    short.set(&ir, false).expect("set");
    let short_out = run_blocks(&mut short, &input, 256);

    // Zero mode is the exact convolution; short mode reproduces it 128
    // samples late.
    let expected = convolve_reference(&ir, &input, 4096);
    for (n, &want) in expected.iter().enumerate() {
        assert!(
            (zero_out[n] - want).abs() < 1e-3,
            "zero mode sample {}",
            n
        );
    }
    for n in 128..4096 {
        assert!(
            (short_out[n] - expected[n - 128]).abs() < 1e-3,
            "short mode sample {}",
            n
        );
    }
}
