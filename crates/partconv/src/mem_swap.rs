// SPDX-License-Identifier: LGPL-3.0-or-later

//! Loader/audio handoff cell for a reallocatable resource.
//!
//! A single-producer/single-consumer swap slot: the loader thread takes
//! blocking, exclusive access to install or replace the resource; the
//! audio thread only ever *attempts* access and tolerates a missed block
//! when the loader holds the cell. A held handle pins the resource for
//! its whole scope, so no audio block is processed on an object replaced
//! mid-block, and replaced objects are dropped on the loader thread.

use parking_lot::{Mutex, MutexGuard};

struct Slot<T> {
    value: Option<Box<T>>,
    size: usize,
}

/// A swap cell holding an optional resource and its nominal size.
pub struct MemorySwap<T> {
    slot: Mutex<Slot<T>>,
}

/// Exclusive handle to the cell's contents for the scope of the borrow.
pub struct SwapHandle<'a, T> {
    guard: MutexGuard<'a, Slot<T>>,
}

impl<T> SwapHandle<'_, T> {
    /// The held resource, if any.
    pub fn get(&self) -> Option<&T> {
        self.guard.value.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.guard.value.as_deref_mut()
    }

    /// The nominal size the resource was allocated for.
    pub fn size(&self) -> usize {
        self.guard.size
    }
}

impl<T> MemorySwap<T> {
    /// Create a cell holding `value` with nominal size `size`.
    pub fn new(value: Box<T>, size: usize) -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: Some(value),
                size,
            }),
        }
    }

    /// Create an empty cell (size 0).
    pub fn empty() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                size: 0,
            }),
        }
    }

    /// Loader side: block until exclusive access is granted.
    pub fn access(&self) -> SwapHandle<'_, T> {
        SwapHandle {
            guard: self.slot.lock(),
        }
    }

    /// Audio side: non-blocking access. `None` means the loader holds
    /// the cell and this block should be skipped.
    pub fn attempt(&self) -> Option<SwapHandle<'_, T>> {
        self.slot
            .try_lock()
            .map(|guard| SwapHandle { guard })
    }

    /// Loader side: ensure the held resource matches `size`, replacing
    /// it through `alloc` when it does not. The previous resource is
    /// dropped here, on the calling thread. Returns the (locked) handle.
    pub fn equal(&self, alloc: &dyn Fn(usize) -> Box<T>, size: usize) -> SwapHandle<'_, T> {
        let mut guard = self.slot.lock();

        if guard.size != size {
            let old = guard.value.replace(alloc(size));
            guard.size = size;
            drop(old);
        }

        SwapHandle { guard }
    }
}
