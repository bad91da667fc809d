// SPDX-License-Identifier: LGPL-3.0-or-later

//! Butterfly passes for the decimation-in-time split-radix transform.
//!
//! Pass layout: passes 1 and 2 are fused with a 4-way output shuffle
//! that pre-orders data for pass 3; pass 3 uses hard-coded twiddles;
//! passes 4 and up read the plan's tables. Each table pass comes in a
//! "reorder" variant (stride-interleaved stores so later passes read
//! linearly) and a plain variant; the pass scheduler in [`crate::fft`]
//! picks between them. The real pass recombines the two half-length
//! spectra and never reorders.
//!
//! All passes are index-explicit loops compiled per SIMD target via
//! `multiversion`; a 4-lane [`Quad`] moves groups of values through the
//! shuffle and the fixed-twiddle pass.

use core::ops::{Add, Mul, Sub};

use multiversion::multiversion;

use crate::sample::Sample;

const SQRT_2_2: f64 = 0.707_106_781_186_547_524_400_844_362_104_849_04;

/// Four lanes moved as one unit through the early passes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quad<T>(pub [T; 4]);

impl<T: Sample> Quad<T> {
    #[inline(always)]
    fn load(buf: &[T], at: usize) -> Self {
        Quad([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[inline(always)]
    fn store(self, buf: &mut [T], at: usize) {
        buf[at..at + 4].copy_from_slice(&self.0);
    }
}

impl<T: Sample> Add for Quad<T> {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        let a = self.0;
        let b = rhs.0;
        Quad([a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]])
    }
}

impl<T: Sample> Sub for Quad<T> {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        let a = self.0;
        let b = rhs.0;
        Quad([a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3]])
    }
}

impl<T: Sample> Mul for Quad<T> {
    type Output = Self;

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        let a = self.0;
        let b = rhs.0;
        Quad([a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]])
    }
}

/// Write one shuffled quad group to the four quarters of `buf`.
///
/// The lane permutation re-orders butterfly outputs so pass 3 reads its
/// operands linearly.
#[inline(always)]
fn shuffle4<T: Sample>(a: Quad<T>, b: Quad<T>, c: Quad<T>, d: Quad<T>, buf: &mut [T], at: usize, q: usize) {
    Quad([a.0[0], c.0[0], b.0[0], d.0[0]]).store(buf, at);
    Quad([a.0[2], c.0[2], b.0[2], d.0[2]]).store(buf, q + at);
    Quad([a.0[1], c.0[1], b.0[1], d.0[1]]).store(buf, 2 * q + at);
    Quad([a.0[3], c.0[3], b.0[3], d.0[3]]).store(buf, 3 * q + at);
}

/// Fused passes 1 and 2 with the 4-way output shuffle. Requires `n >= 16`.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn pass_1_2_reorder<T: Sample>(re: &mut [T], im: &mut [T], n: usize) {
    let q = n >> 2;

    for i in 0..(n >> 4) {
        let b = i << 2;

        let r1 = Quad::load(re, b);
        let r2 = Quad::load(re, q + b);
        let r3 = Quad::load(re, 2 * q + b);
        let r4 = Quad::load(re, 3 * q + b);
        let i1 = Quad::load(im, b);
        let i2 = Quad::load(im, q + b);
        let i3 = Quad::load(im, 2 * q + b);
        let i4 = Quad::load(im, 3 * q + b);

        let r5 = r1 + r3;
        let r6 = r2 + r4;
        let r7 = r1 - r3;
        let r8 = r2 - r4;

        let i5 = i1 + i3;
        let i6 = i2 + i4;
        let i7 = i1 - i3;
        let i8 = i2 - i4;

        let ra = r5 + r6;
        let rb = r5 - r6;
        let rc = r7 + i8;
        let rd = r7 - i8;

        let ia = i5 + i6;
        let ib = i5 - i6;
        let ic = i7 - r8;
        let id = i7 + r8;

        shuffle4(ra, rb, rc, rd, re, b, q);
        shuffle4(ia, ib, ic, id, im, b, q);
    }
}

/// The hard-coded pass-3 twiddles `{1, √2/2, 0, -√2/2}` / `{0, -√2/2, -1, -√2/2}`.
#[inline(always)]
fn pass_3_twiddle<T: Sample>() -> (Quad<T>, Quad<T>) {
    let s = T::from_f64(SQRT_2_2);
    (
        Quad([T::ONE, s, T::ZERO, -s]),
        Quad([T::ZERO, -s, -T::ONE, -s]),
    )
}

/// Pass 3 without reordering. Requires `n >= 8`.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn pass_3<T: Sample>(re: &mut [T], im: &mut [T], n: usize) {
    let (tr, ti) = pass_3_twiddle::<T>();

    for i in 0..(n >> 3) {
        let b = i << 3;

        let r1 = Quad::load(re, b);
        let r2 = Quad::load(re, b + 4);
        let i1 = Quad::load(im, b);
        let i2 = Quad::load(im, b + 4);

        let r3 = r2 * tr - i2 * ti;
        let i3 = r2 * ti + i2 * tr;

        (r1 + r3).store(re, b);
        (r1 - r3).store(re, b + 4);
        (i1 + i3).store(im, b);
        (i1 - i3).store(im, b + 4);
    }
}

/// Pass 3 with reordering. Requires `n >= 64`.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn pass_3_reorder<T: Sample>(re: &mut [T], im: &mut [T], n: usize) {
    let offset = n >> 3;
    let outer = n >> 6;
    let (tr, ti) = pass_3_twiddle::<T>();

    let mut p1 = 0usize;
    let mut p2 = offset;
    let mut j = 0usize;

    for _ in 0..(n >> 4) {
        let r1 = Quad::load(re, p1);
        let r2 = Quad::load(re, p1 + 4);
        let i1 = Quad::load(im, p1);
        let i2 = Quad::load(im, p1 + 4);

        let r3 = Quad::load(re, p2);
        let r4 = Quad::load(re, p2 + 4);
        let i3 = Quad::load(im, p2);
        let i4 = Quad::load(im, p2 + 4);

        let r5 = r3 * tr - i3 * ti;
        let i5 = r3 * ti + i3 * tr;
        let r6 = r4 * tr - i4 * ti;
        let i6 = r4 * ti + i4 * tr;

        // Swapped stores: the second quad of each region pairs with the
        // twiddled quad of the other region.
        (r1 + r5).store(re, p1);
        (r1 - r5).store(re, p1 + 4);
        (i1 + i5).store(im, p1);
        (i1 - i5).store(im, p1 + 4);

        (r2 + r6).store(re, p2);
        (r2 - r6).store(re, p2 + 4);
        (i2 + i6).store(im, p2);
        (i2 - i6).store(im, p2 + 4);

        p1 += 8;
        p2 += 8;

        j += 1;
        if j % outer == 0 {
            p1 += offset;
            p2 += offset;
        }
    }
}

/// A table pass without reordering.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn pass_trig<T: Sample>(
    re: &mut [T],
    im: &mut [T],
    tab_re: &[T],
    tab_im: &[T],
    n: usize,
    pass: usize,
) {
    let size = 2usize << pass;
    let incr = size >> 1;

    let mut p1 = 0usize;
    let mut p2 = incr;
    let mut i = 0usize;

    while i < n {
        let end = i + size;
        let mut t = 0usize;

        while i < end {
            let tr = tab_re[t];
            let ti = tab_im[t];
            t += 1;

            let r1 = re[p1];
            let i1 = im[p1];
            let r2 = re[p2];
            let i2 = im[p2];

            let r3 = r2 * tr - i2 * ti;
            let i3 = r2 * ti + i2 * tr;

            re[p1] = r1 + r3;
            im[p1] = i1 + i3;
            p1 += 1;
            re[p2] = r1 - r3;
            im[p2] = i1 - i3;
            p2 += 1;

            i += 2;
        }

        p1 += incr;
        p2 += incr;
    }
}

/// A table pass with reordering.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn pass_trig_reorder<T: Sample>(
    re: &mut [T],
    im: &mut [T],
    tab_re: &[T],
    tab_im: &[T],
    n: usize,
    pass: usize,
) {
    let size = 2usize << pass;
    let incr = size >> 1;
    let offset = (n >> pass) >> 1;
    let outer = ((n >> 1) / size) >> pass;

    let mut p1 = 0usize;
    let mut p2 = offset;
    let mut i = 0usize;
    let mut j = 0usize;

    while i < (n >> 1) {
        let end = i + size;
        let mut t = 0usize;

        while i < end {
            let tr = tab_re[t];
            let ti = tab_im[t];
            t += 1;

            let r1 = re[p1];
            let i1 = im[p1];
            let r2 = re[p2];
            let i2 = im[p2];

            let r3 = re[p1 + incr];
            let i3 = im[p1 + incr];
            let r4 = re[p2 + incr];
            let i4 = im[p2 + incr];

            let r5 = r2 * tr - i2 * ti;
            let i5 = r2 * ti + i2 * tr;
            let r6 = r4 * tr - i4 * ti;
            let i6 = r4 * ti + i4 * tr;

            re[p1] = r1 + r5;
            re[p1 + incr] = r1 - r5;
            im[p1] = i1 + i5;
            im[p1 + incr] = i1 - i5;
            p1 += 1;

            re[p2] = r3 + r6;
            re[p2 + incr] = r3 - r6;
            im[p2] = i3 + i6;
            im[p2 + incr] = i3 - i6;
            p2 += 1;

            i += 2;
        }

        p1 += incr;
        p2 += incr;

        j += 1;
        if j % outer == 0 {
            p1 += offset;
            p2 += offset;
        }
    }
}

/// The real pass: combine (forward) or uncombine (inverse) the two
/// half-length spectra of a packed real transform. Requires `log2 >= 3`.
///
/// DC and Nyquist share bin 0 and need no branch: the half-spectrum is
/// periodic, so the final loop iteration writes the same slot twice.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
pub(crate) fn pass_real<T: Sample>(
    re: &mut [T],
    im: &mut [T],
    tab_re: &[T],
    tab_im: &[T],
    fft_log2: usize,
    inverse: bool,
) {
    let length = 1usize << (fft_log2 - 1);

    let t1 = re[0] + im[0];
    let t2 = re[0] - im[0];

    if inverse {
        re[0] = t1;
        im[0] = t2;
    } else {
        re[0] = t1 + t1;
        im[0] = t2 + t2;
    }

    let mut p1 = 1usize;
    let mut p2 = length - 1;

    for t in 1..=(length >> 1) {
        let tr = if inverse { -tab_re[t] } else { tab_re[t] };
        let ti = tab_im[t];

        let r1 = re[p1];
        let i1 = im[p1];
        let r2 = re[p2];
        let i2 = im[p2];

        let r3 = r1 + r2;
        let i3 = i1 + i2;
        let r4 = r1 - r2;
        let i4 = i1 - i2;

        let t1 = tr * i3 + ti * r4;
        let t2 = ti * i3 - tr * r4;

        re[p1] = r3 + t1;
        im[p1] = t2 + i4;
        re[p2] = r3 - t1;
        im[p2] = t2 - i4;

        p1 += 1;
        p2 -= 1;
    }
}

/// Open-coded complex transforms for `log2 <= 3`.
pub(crate) fn small_fft<T: Sample>(re: &mut [T], im: &mut [T], log2: usize) {
    if log2 == 1 {
        let r1 = re[0];
        let r2 = re[1];
        let i1 = im[0];
        let i2 = im[1];

        re[0] = r1 + r2;
        re[1] = r1 - r2;
        im[0] = i1 + i2;
        im[1] = i1 - i2;
    } else if log2 == 2 {
        let r5 = re[0];
        let r6 = re[1];
        let r7 = re[2];
        let r8 = re[3];
        let i5 = im[0];
        let i6 = im[1];
        let i7 = im[2];
        let i8 = im[3];

        // Pass one
        let r1 = r5 + r7;
        let r2 = r5 - r7;
        let r3 = r6 + r8;
        let r4 = r6 - r8;
        let i1 = i5 + i7;
        let i2 = i5 - i7;
        let i3 = i6 + i8;
        let i4 = i6 - i8;

        // Pass two
        re[0] = r1 + r3;
        re[1] = r2 + i4;
        re[2] = r1 - r3;
        re[3] = r2 - i4;
        im[0] = i1 + i3;
        im[1] = i2 - r4;
        im[2] = i1 - i3;
        im[3] = i2 + r4;
    } else if log2 == 3 {
        // Pass one
        let r1 = re[0] + re[4];
        let r2 = re[0] - re[4];
        let r3 = re[2] + re[6];
        let r4 = re[2] - re[6];
        let r5 = re[1] + re[5];
        let r6 = re[1] - re[5];
        let r7 = re[3] + re[7];
        let r8 = re[3] - re[7];

        let i1 = im[0] + im[4];
        let i2 = im[0] - im[4];
        let i3 = im[2] + im[6];
        let i4 = im[2] - im[6];
        let i5 = im[1] + im[5];
        let i6 = im[1] - im[5];
        let i7 = im[3] + im[7];
        let i8 = im[3] - im[7];

        // Pass two
        re[0] = r1 + r3;
        re[1] = r2 + i4;
        re[2] = r1 - r3;
        re[3] = r2 - i4;
        re[4] = r5 + r7;
        re[5] = r6 + i8;
        re[6] = r5 - r7;
        re[7] = r6 - i8;

        im[0] = i1 + i3;
        im[1] = i2 - r4;
        im[2] = i1 - i3;
        im[3] = i2 + r4;
        im[4] = i5 + i7;
        im[5] = i6 - r8;
        im[6] = i5 - i7;
        im[7] = i6 + r8;

        // Pass three
        pass_3(re, im, 8);
    }
}

/// Open-coded packed real transforms for `log2 <= 2`.
pub(crate) fn small_real_fft<T: Sample>(re: &mut [T], im: &mut [T], log2: usize, inverse: bool) {
    if log2 == 1 {
        let r1 = if inverse { re[0] } else { re[0] + re[0] };
        let r2 = if inverse { im[0] } else { im[0] + im[0] };

        re[0] = r1 + r2;
        im[0] = r1 - r2;
    } else if log2 == 2 {
        if !inverse {
            // Pass one
            let r1 = re[0] + re[1];
            let r2 = re[0] - re[1];
            let i1 = im[0] + im[1];
            let i2 = im[1] - im[0];

            // Pass two
            let r3 = r1 + i1;
            let i3 = r1 - i1;

            re[0] = r3 + r3;
            re[1] = r2 + r2;
            im[0] = i3 + i3;
            im[1] = i2 + i2;
        } else {
            let i1 = re[0];
            let r2 = re[1] + re[1];
            let i2 = im[0];
            let r4 = im[1] + im[1];

            // Pass one
            let r1 = i1 + i2;
            let r3 = i1 - i2;

            // Pass two
            re[0] = r1 + r2;
            re[1] = r1 - r2;
            im[0] = r3 - r4;
            im[1] = r3 + r4;
        }
    }
}
