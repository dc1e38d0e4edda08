// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Archetype storage with row allocation and removal
//!
//! An archetype owns one packed column per component kind in its signature
//! plus the parallel array of owning entity ids. All arrays share one
//! `row_capacity` and are grown together, so a row index is valid across
//! every column at once.

use std::alloc::{alloc, dealloc, realloc, Layout};
use std::ptr::{self, NonNull};

use crate::component::{ComponentDesc, ComponentKind, MAX_COMPONENT_KINDS};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::signature::Signature;

/// Column allocations are aligned to the platform cache line
pub const CACHE_LINE_ALIGNMENT: usize = 64;

/// Row capacity used when archetype creation passes zero
pub const DEFAULT_ROW_CAPACITY: usize = 256;

/// Index of an archetype within its owning world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// Marks entity records whose entity has been destroyed
    pub(crate) const INVALID: ArchetypeId = ArchetypeId(u32::MAX);

    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type-erased packed storage for one component kind
///
/// Rows are raw bytes of a caller-defined stride; the column never reads or
/// drops them. Capacity is always a power of two and the base address is
/// cache-line aligned.
pub struct ComponentColumn {
    data: NonNull<u8>,
    stride: usize,
    capacity: usize,
}

impl ComponentColumn {
    pub(crate) fn new(stride: usize, capacity: usize) -> Result<Self> {
        debug_assert!(stride > 0, "zero-stride columns are rejected up front");
        let capacity = capacity.max(1).next_power_of_two();
        let layout = Self::layout(stride, capacity)?;
        // SAFETY: layout has non-zero size since stride > 0 and capacity > 0.
        let data = NonNull::new(unsafe { alloc(layout) }).ok_or(EcsError::OutOfMemory)?;
        Ok(Self {
            data,
            stride,
            capacity,
        })
    }

    fn layout(stride: usize, capacity: usize) -> Result<Layout> {
        let size = stride.checked_mul(capacity).ok_or(EcsError::OutOfMemory)?;
        Layout::from_size_align(size, CACHE_LINE_ALIGNMENT).map_err(|_| EcsError::OutOfMemory)
    }

    /// Payload size of one row in bytes
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Row capacity, always a power of two
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Base address of the column
    pub fn as_ptr(&self) -> *mut u8 {
        self.data.as_ptr()
    }

    /// Address of one row
    pub fn row_ptr(&self, row: usize) -> *mut u8 {
        debug_assert!(row < self.capacity);
        // SAFETY: row is within the allocation, checked in debug builds.
        unsafe { self.data.as_ptr().add(row * self.stride) }
    }

    /// Reallocate to at least `new_capacity` rows, keeping the live prefix
    pub(crate) fn grow_to(&mut self, new_capacity: usize) -> Result<()> {
        let new_capacity = new_capacity.next_power_of_two();
        if new_capacity <= self.capacity {
            return Ok(());
        }

        let old_layout = Self::layout(self.stride, self.capacity)?;
        let new_size = self
            .stride
            .checked_mul(new_capacity)
            .ok_or(EcsError::OutOfMemory)?;
        // SAFETY: data was allocated with old_layout; realloc keeps the
        // original alignment.
        let data = unsafe { realloc(self.data.as_ptr(), old_layout, new_size) };
        self.data = NonNull::new(data).ok_or(EcsError::OutOfMemory)?;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Copy the bytes of `src` row over `dst` row
    pub(crate) fn move_row(&mut self, src: usize, dst: usize) {
        if src == dst {
            return;
        }
        debug_assert!(src < self.capacity && dst < self.capacity);
        // SAFETY: distinct rows of equal stride never overlap.
        unsafe { ptr::copy_nonoverlapping(self.row_ptr(src), self.row_ptr(dst), self.stride) }
    }

    /// Exchange the bytes of two rows
    pub(crate) fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        debug_assert!(a < self.capacity && b < self.capacity);
        // SAFETY: distinct rows of equal stride never overlap.
        unsafe { ptr::swap_nonoverlapping(self.row_ptr(a), self.row_ptr(b), self.stride) }
    }

    /// Copy a row out of another column with the same stride
    pub(crate) fn copy_row_from(&mut self, src: &ComponentColumn, src_row: usize, dst_row: usize) {
        debug_assert_eq!(self.stride, src.stride);
        // SAFETY: the columns are distinct allocations.
        unsafe { ptr::copy_nonoverlapping(src.row_ptr(src_row), self.row_ptr(dst_row), self.stride) }
    }
}

impl Drop for ComponentColumn {
    fn drop(&mut self) {
        if let Ok(layout) = Self::layout(self.stride, self.capacity) {
            // SAFETY: data was allocated with this exact layout.
            unsafe { dealloc(self.data.as_ptr(), layout) }
        }
    }
}

// SAFETY: the column exclusively owns its allocation; all access goes through
// &self / &mut self.
unsafe impl Send for ComponentColumn {}
unsafe impl Sync for ComponentColumn {}

/// Structure-of-arrays storage for all entities sharing one component set
pub struct Archetype {
    signature: Signature,
    entities: Vec<EntityId>,
    /// Sparse table addressed by raw kind id, O(1) lookup without hashing
    columns: Box<[Option<ComponentColumn>]>,
    row_capacity: usize,
}

impl Archetype {
    pub(crate) fn new(
        signature: Signature,
        descs: &[ComponentDesc],
        row_capacity: usize,
    ) -> Result<Self> {
        let row_capacity = if row_capacity == 0 {
            DEFAULT_ROW_CAPACITY
        } else {
            row_capacity
        }
        .next_power_of_two();

        let mut columns: Vec<Option<ComponentColumn>> =
            (0..MAX_COMPONENT_KINDS).map(|_| None).collect();
        for desc in descs {
            columns[desc.kind as usize] = Some(ComponentColumn::new(desc.stride, row_capacity)?);
        }

        Ok(Self {
            signature,
            entities: Vec::with_capacity(row_capacity),
            columns: columns.into_boxed_slice(),
            row_capacity,
        })
    }

    /// Get signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Number of live rows
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn row_capacity(&self) -> usize {
        self.row_capacity
    }

    /// Owning entity id per row
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn has_kind(&self, kind: ComponentKind) -> bool {
        (kind as usize) < MAX_COMPONENT_KINDS && self.columns[kind as usize].is_some()
    }

    /// Get column for a kind in this signature
    pub fn column(&self, kind: ComponentKind) -> Option<&ComponentColumn> {
        self.columns.get(kind as usize)?.as_ref()
    }

    pub(crate) fn column_mut(&mut self, kind: ComponentKind) -> Option<&mut ComponentColumn> {
        self.columns.get_mut(kind as usize)?.as_mut()
    }

    /// Recorded stride of a kind, if present
    pub fn stride_of(&self, kind: ComponentKind) -> Option<usize> {
        self.column(kind).map(ComponentColumn::stride)
    }

    /// Constant-time address of one component
    pub fn component_ptr(&self, kind: ComponentKind, row: usize) -> Option<*mut u8> {
        self.column(kind).map(|column| column.row_ptr(row))
    }

    /// Grow all arrays ahead of a row append
    ///
    /// One trailing capacity slot stays free as scratch space for row swaps,
    /// hence the `+ 2` trigger.
    pub(crate) fn reserve_one(&mut self) -> Result<()> {
        while self.entities.len() + 2 >= self.row_capacity {
            self.grow_rows(self.row_capacity * 2)?;
        }
        Ok(())
    }

    /// Make room for `additional` more rows beyond the current count
    pub(crate) fn reserve_rows(&mut self, additional: usize) -> Result<()> {
        let mut capacity = self.row_capacity;
        while self.entities.len() + additional + 2 >= capacity {
            capacity *= 2;
        }
        if capacity > self.row_capacity {
            self.grow_rows(capacity)?;
        }
        Ok(())
    }

    fn grow_rows(&mut self, new_capacity: usize) -> Result<()> {
        let signature = self.signature;
        for &kind in signature.kinds() {
            if let Some(column) = self.columns[kind as usize].as_mut() {
                column.grow_to(new_capacity)?;
            }
        }
        self.entities.reserve(new_capacity - self.entities.len());
        self.row_capacity = new_capacity;
        Ok(())
    }

    /// Append a row for `entity`; caller must have called `reserve_one`
    pub(crate) fn push_row(&mut self, entity: EntityId) -> u32 {
        debug_assert!(self.entities.len() + 1 < self.row_capacity);
        let row = self.entities.len() as u32;
        self.entities.push(entity);
        row
    }

    /// Swap-remove a row and return the entity that was moved into it
    ///
    /// The last row's bytes are copied over `row` in every column of the
    /// signature, keeping the arrays packed. Returns `None` when `row` was
    /// already the last.
    pub(crate) fn swap_remove_row(&mut self, row: usize) -> Option<EntityId> {
        debug_assert!(row < self.entities.len());
        let last = self.entities.len() - 1;
        if row != last {
            let signature = self.signature;
            for &kind in signature.kinds() {
                if let Some(column) = self.columns[kind as usize].as_mut() {
                    column.move_row(last, row);
                }
            }
        }
        self.entities.swap_remove(row);

        if row < self.entities.len() {
            Some(self.entities[row])
        } else {
            None
        }
    }

    /// Exchange two rows across every column and the entity-id array
    pub(crate) fn swap_rows(&mut self, a: usize, b: usize) {
        debug_assert!(a < self.entities.len() && b < self.entities.len());
        if a == b {
            return;
        }
        self.entities.swap(a, b);
        let signature = self.signature;
        for &kind in signature.kinds() {
            if let Some(column) = self.columns[kind as usize].as_mut() {
                column.swap_rows(a, b);
            }
        }
    }

    /// Bytes held by this archetype's columns
    pub(crate) fn column_bytes(&self) -> usize {
        self.signature
            .kinds()
            .iter()
            .filter_map(|&kind| self.column(kind))
            .map(|column| column.stride() * column.capacity())
            .sum()
    }
}
