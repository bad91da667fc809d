// SPDX-License-Identifier: LGPL-3.0-or-later

//! Shared buffer kernels for the convolvers, compiled per SIMD target.

use multiversion::multiversion;
use split_fft::Sample;

/// `dst[i] += src[i]`.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn add_into<T: Sample>(dst: &mut [T], src: &[T]) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d += s;
    }
}

/// Dot product of two equal-length slices.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn dot<T: Sample>(a: &[T], b: &[T]) -> T {
    let mut acc = T::ZERO;
    for (&x, &y) in a.iter().zip(b.iter()) {
        acc += x * y;
    }
    acc
}

/// Complex multiply-accumulate of two packed half-spectra into `acc`.
///
/// Bin 0 packs two real values (DC in `re`, Nyquist in `im`), so it is
/// two real products rather than a complex one; all other bins are the
/// usual split-complex MAC.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn mac_partition<T: Sample>(
    acc_re: &mut [T],
    acc_im: &mut [T],
    a_re: &[T],
    a_im: &[T],
    b_re: &[T],
    b_im: &[T],
) {
    acc_re[0] += a_re[0] * b_re[0];
    acc_im[0] += a_im[0] * b_im[0];

    for i in 1..acc_re.len() {
        let ar = a_re[i];
        let ai = a_im[i];
        let br = b_re[i];
        let bi = b_im[i];
        acc_re[i] += ar * br - ai * bi;
        acc_im[i] += ar * bi + ai * br;
    }
}

/// `dst[i] = src[i] * scale`.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn scale_into<T: Sample>(dst: &mut [T], src: &[T], scale: T) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d = s * scale;
    }
}
