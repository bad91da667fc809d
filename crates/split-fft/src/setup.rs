// SPDX-License-Identifier: LGPL-3.0-or-later

//! Transform plans: precomputed twiddle tables per transform size.

use crate::sample::Sample;
use crate::split::Split;

/// Table index of the first level that needs a twiddle table.
///
/// Levels 1 and 2 are twiddle-free, level 3 uses hard-coded constants,
/// so the first stored table serves level 3 onward (the real pass for a
/// `2^3` transform reads the level-3 table).
pub(crate) const TRIG_TABLE_OFFSET: usize = 3;

/// An immutable FFT plan for transforms up to `2^max_log2` points.
///
/// Holds one split twiddle table per level from [`TRIG_TABLE_OFFSET`] up
/// to the maximum; the level-`l` table stores `2^(l-1)` unit-circle
/// points `(cos, sin)` of `-jπ / 2^(l-1)`. Creation is the only
/// allocation the transforms ever perform; a plan is safe to share
/// read-only across threads.
#[derive(Debug, Clone)]
pub struct Setup<T> {
    max_log2: usize,
    tables: Vec<Split<T>>,
}

impl<T: Sample> Setup<T> {
    /// Create a plan supporting transforms up to `2^max_log2` points.
    pub fn new(max_log2: usize) -> Self {
        let mut tables = Vec::new();

        for level in TRIG_TABLE_OFFSET..=max_log2 {
            let length = 1usize << (level - 1);
            let mut table = Split::new(length);

            for j in 0..length {
                let angle = -(j as f64) * core::f64::consts::PI / length as f64;
                table.re[j] = T::from_f64(angle.cos());
                table.im[j] = T::from_f64(angle.sin());
            }

            tables.push(table);
        }

        Self { max_log2, tables }
    }

    /// Maximum supported transform size as a base-2 log.
    pub fn max_log2(&self) -> usize {
        self.max_log2
    }

    /// Twiddle table for `level` (the table of `2^(level-1)` points).
    pub(crate) fn table(&self, level: usize) -> (&[T], &[T]) {
        let table = &self.tables[level - TRIG_TABLE_OFFSET];
        (&table.re, &table.im)
    }
}
