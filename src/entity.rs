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

//! Entity identifiers and location records
//!
//! Entity ids are issued from a dense append-only counter and are never
//! recycled; operations on a destroyed id fail with `EntityNotFound`.

use crate::archetype::ArchetypeId;
use crate::error::{EcsError, Result};

/// Unique entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Entity location in archetype storage plus the caller-owned tag fields
///
/// `sort_order` and `flags` belong to the caller and survive every
/// structural change; the engine only writes `archetype` and `row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRecord {
    pub(crate) archetype: ArchetypeId,
    pub(crate) row: u32,
    pub sort_order: u32,
    pub flags: u32,
}

impl EntityRecord {
    pub fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.archetype != ArchetypeId::INVALID
    }
}

/// Dense table mapping entity id to its record
pub(crate) struct EntityTable {
    records: Vec<EntityRecord>,
    alive: usize,
}

impl EntityTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            alive: 0,
        }
    }

    /// The id the next `insert` will return
    pub fn next_id(&self) -> EntityId {
        EntityId::new(self.records.len())
    }

    pub fn insert(&mut self, archetype: ArchetypeId, row: u32) -> EntityId {
        let id = self.next_id();
        self.records.push(EntityRecord {
            archetype,
            row,
            sort_order: 0,
            flags: 0,
        });
        self.alive += 1;
        id
    }

    pub fn get(&self, entity: EntityId) -> Result<&EntityRecord> {
        self.records
            .get(entity.index())
            .filter(|record| record.is_alive())
            .ok_or(EcsError::EntityNotFound)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Result<&mut EntityRecord> {
        self.records
            .get_mut(entity.index())
            .filter(|record| record.is_alive())
            .ok_or(EcsError::EntityNotFound)
    }

    /// Move a record to a new archetype location, keeping the caller fields
    pub fn relocate(&mut self, entity: EntityId, archetype: ArchetypeId, row: u32) {
        if let Some(record) = self.records.get_mut(entity.index()) {
            record.archetype = archetype;
            record.row = row;
        }
    }

    /// Patch the row of an entity moved by a swap-remove
    pub fn set_row(&mut self, entity: EntityId, row: u32) {
        if let Some(record) = self.records.get_mut(entity.index()) {
            debug_assert!(record.is_alive());
            record.row = row;
        }
    }

    pub fn mark_dead(&mut self, entity: EntityId) {
        if let Some(record) = self.records.get_mut(entity.index()) {
            record.archetype = ArchetypeId::INVALID;
            record.row = u32::MAX;
            self.alive -= 1;
        }
    }

    /// Count of live entities
    pub fn alive(&self) -> usize {
        self.alive
    }

    pub fn reserve(&mut self, additional: usize) {
        self.records.reserve(additional);
    }

    pub fn capacity_bytes(&self) -> usize {
        self.records.capacity() * std::mem::size_of::<EntityRecord>()
    }
}
