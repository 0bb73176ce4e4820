// SPDX-License-Identifier: AGPL-3.0-or-later
// VecLab - Named Vector Data Engine
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Vector Storage
//!
//! Resizable array of doubles with amortized doubling growth and a lazily
//! maintained min/max cache.
//!
//! ## Layout
//!
//! ```text
//! buffer:  [ v0 v1 v2 ... v(length-1) | 0 0 0 ... 0 ]
//!            <------- length -------->
//!            <------------------ capacity ------------>
//! ```
//!
//! Capacity starts at 64 and doubles until it covers the requested
//! length. Slots past `length` are always zero. An empty store holds no
//! buffer at all.
//!
//! ## Buffer Ownership
//!
//! | Variant    | On replacement / drop                    |
//! |------------|------------------------------------------|
//! | `Owned`    | freed with the store                     |
//! | `Borrowed` | abandoned, never freed                   |
//! | `External` | handed back to the caller's deallocator  |

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Result, VectorError};
use crate::index::Window;

/// Baseline capacity of any non-empty vector
pub const DEF_ARRAY_SIZE: usize = 64;

/// Receives an externally managed buffer once the store lets go of it
pub type Deallocator = Arc<dyn Fn(Vec<f64>) + Send + Sync>;

/// How the backing buffer is owned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Borrowed,
    Owned,
    External,
}

/// New backing storage handed to [`VectorStore::reset`]
pub enum BufferSource<'a> {
    /// Caller keeps the data; the store takes a private copy
    Volatile(&'a [f64]),
    /// Storage that outlives the store and is never freed by it
    Borrowed(&'static mut [f64]),
    /// The store takes ownership
    Owned(Vec<f64>),
    /// The store uses the buffer and returns it to the deallocator when done
    External(Vec<f64>, Deallocator),
}

enum Buffer {
    Owned(Vec<f64>),
    Borrowed(&'static mut [f64]),
    External { data: Vec<f64>, release: Deallocator },
}

impl Buffer {
    fn as_slice(&self) -> &[f64] {
        match self {
            Buffer::Owned(v) => v,
            Buffer::Borrowed(s) => s,
            Buffer::External { data, .. } => data,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        match self {
            Buffer::Owned(v) => v,
            Buffer::Borrowed(s) => s,
            Buffer::External { data, .. } => data,
        }
    }

    fn ownership(&self) -> Ownership {
        match self {
            Buffer::Owned(_) => Ownership::Owned,
            Buffer::Borrowed(_) => Ownership::Borrowed,
            Buffer::External { .. } => Ownership::External,
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Buffer::External { data, release } = self {
            release(std::mem::take(data));
        }
    }
}

/// Resizable double array backing a named vector
pub struct VectorStore {
    buffer: Buffer,
    length: usize,
    min: f64,
    max: f64,
    dirty: u64,
    offset: i64,
}

impl fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorStore")
            .field("length", &self.length)
            .field("capacity", &self.capacity())
            .field("ownership", &self.buffer.ownership())
            .field("offset", &self.offset)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore {
    /// Create an empty store with no backing buffer
    pub fn new() -> Self {
        Self {
            buffer: Buffer::Owned(Vec::new()),
            length: 0,
            min: f64::NAN,
            max: f64::NAN,
            dirty: 0,
            offset: 0,
        }
    }

    /// Create a store holding a copy of `values`
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let mut store = Self::new();
        store.copy_from(values)?;
        Ok(store)
    }

    /// Capacity needed to hold `length` elements
    pub fn capacity_for(length: usize) -> Result<usize> {
        if length == 0 {
            return Ok(0);
        }
        let mut size = DEF_ARRAY_SIZE;
        while size < length {
            size = size
                .checked_mul(2)
                .ok_or(VectorError::Allocation { requested: length })?;
        }
        Ok(size)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.as_slice().len()
    }

    pub fn ownership(&self) -> Ownership {
        self.buffer.ownership()
    }

    /// Live values `[0, length)`
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.buffer.as_slice()[..self.length]
    }

    /// Mutable live values. Callers mark the vector changed afterwards.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        let length = self.length;
        &mut self.buffer.as_mut_slice()[..length]
    }

    /// Values inside a window, clamped to the live length
    pub fn window(&self, window: Window) -> &[f64] {
        let window = window.clamp(self.length);
        &self.values()[window.start..window.end]
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values().get(index).copied()
    }

    /// User-visible numbering base
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }

    /// Mutation counter, bumped by every [`invalidate`](Self::invalidate)
    pub fn dirty(&self) -> u64 {
        self.dirty
    }

    /// Resize to `new_length`.
    ///
    /// Reuses the buffer when the doubling policy lands on the current
    /// capacity. Newly exposed slots read as zero. Does not touch the
    /// min/max cache or notify anyone.
    pub fn change_length(&mut self, new_length: usize) -> Result<()> {
        let wanted = Self::capacity_for(new_length)?;
        let used = self.length.min(new_length);

        if wanted == self.capacity() {
            let old_length = self.length;
            if new_length < old_length {
                self.buffer.as_mut_slice()[new_length..old_length].fill(0.0);
            }
            self.length = new_length;
            return Ok(());
        }

        let mut fresh: Vec<f64> = Vec::new();
        fresh
            .try_reserve_exact(wanted)
            .map_err(|_| VectorError::Allocation {
                requested: new_length,
            })?;
        fresh.extend_from_slice(&self.buffer.as_slice()[..used]);
        fresh.resize(wanted, 0.0);

        debug!(
            old_capacity = self.capacity(),
            new_capacity = wanted,
            length = new_length,
            "reallocating vector storage"
        );
        // Dropping the previous buffer frees, abandons or returns it per ownership
        self.buffer = Buffer::Owned(fresh);
        self.length = new_length;
        Ok(())
    }

    /// Replace the backing storage wholesale.
    ///
    /// `length` must fit in the supplied buffer. An empty source leaves the
    /// store with no buffer.
    pub fn reset(&mut self, source: BufferSource<'_>, length: usize) -> Result<()> {
        let capacity = match &source {
            BufferSource::Volatile(s) => s.len(),
            BufferSource::Borrowed(s) => s.len(),
            BufferSource::Owned(v) => v.len(),
            BufferSource::External(v, _) => v.len(),
        };
        if length > capacity {
            return Err(VectorError::BufferTooSmall { length, capacity });
        }

        let buffer = match source {
            BufferSource::Volatile(s) => {
                let mut copy = Vec::new();
                copy.try_reserve_exact(s.len())
                    .map_err(|_| VectorError::Allocation { requested: s.len() })?;
                copy.extend_from_slice(s);
                Buffer::Owned(copy)
            }
            BufferSource::Borrowed(s) => Buffer::Borrowed(s),
            BufferSource::Owned(v) => Buffer::Owned(v),
            BufferSource::External(data, release) => Buffer::External { data, release },
        };

        trace!(length, capacity, ownership = ?buffer.ownership(), "resetting vector storage");
        self.buffer = buffer;
        self.length = length;
        self.buffer.as_mut_slice()[length..].fill(0.0);
        Ok(())
    }

    /// Drop the backing buffer and empty the store
    pub fn release(&mut self) {
        self.buffer = Buffer::Owned(Vec::new());
        self.length = 0;
        self.invalidate();
    }

    /// Bump the dirty counter and mark the extrema for recomputation
    pub fn invalidate(&mut self) {
        self.dirty = self.dirty.wrapping_add(1);
        self.min = f64::NAN;
        self.max = f64::NAN;
    }

    /// Recompute min/max over the finite values.
    ///
    /// Both stay NaN when no finite value exists.
    pub fn update_range(&mut self) {
        let (min, max) = finite_extent(self.values());
        self.min = min;
        self.max = max;
    }

    /// Cached extrema without recomputation
    pub fn cached_range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Smallest finite value, recomputed only when the cache is stale
    pub fn min(&mut self) -> f64 {
        if !self.min.is_finite() {
            self.min = finite_extent(self.values()).0;
        }
        self.min
    }

    /// Largest finite value, recomputed only when the cache is stale
    pub fn max(&mut self) -> f64 {
        if !self.max.is_finite() {
            self.max = finite_extent(self.values()).1;
        }
        self.max
    }

    /// Write `value` into every slot of `window`
    pub fn replicate(&mut self, window: Window, value: f64) {
        let window = window.clamp(self.length);
        self.values_mut()[window.start..window.end].fill(value);
    }

    /// Remove every element whose mask entry is set, keeping order.
    ///
    /// Returns the surviving length.
    pub fn delete_mask(&mut self, mask: &[bool]) -> Result<usize> {
        if mask.len() != self.length {
            return Err(VectorError::LengthMismatch {
                left: self.length,
                right: mask.len(),
            });
        }
        let values = self.values_mut();
        let mut count = 0;
        for i in 0..values.len() {
            if mask[i] {
                continue;
            }
            if count < i {
                values[count] = values[i];
            }
            count += 1;
        }
        let old_length = self.length;
        self.buffer.as_mut_slice()[count..old_length].fill(0.0);
        self.length = count;
        Ok(count)
    }

    /// Rotate left by `offset % length`
    pub fn shift_left(&mut self, offset: usize) {
        if self.length == 0 {
            return;
        }
        let offset = offset % self.length;
        self.values_mut().rotate_left(offset);
    }

    /// Rotate right by `offset % length`
    pub fn shift_right(&mut self, offset: usize) {
        if self.length == 0 {
            return;
        }
        let offset = offset % self.length;
        self.values_mut().rotate_right(offset);
    }

    /// Resize to `src.len()` and copy the values in
    pub fn copy_from(&mut self, src: &[f64]) -> Result<()> {
        self.change_length(src.len())?;
        self.values_mut().copy_from_slice(src);
        Ok(())
    }

    /// Grow by `src.len()` and copy the values onto the end
    pub fn extend_from_slice(&mut self, src: &[f64]) -> Result<()> {
        let old_length = self.length;
        self.change_length(old_length + src.len())?;
        self.values_mut()[old_length..].copy_from_slice(src);
        Ok(())
    }
}

/// Min and max over finite values, NaN when there are none
pub fn finite_extent(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::NAN, f64::NAN), |(min, max), v| {
            if min.is_nan() {
                (v, v)
            } else {
                (min.min(v), max.max(v))
            }
        })
}
