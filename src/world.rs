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

//! World: central entity, archetype, and query storage
//!
//! The `World` is an explicit value owned by the caller; several independent
//! worlds can coexist. It owns the archetype storage, the entity table, and
//! the registered queries, and every mutation goes through it.
//!
//! Raw component pointers handed out by lookup or iteration stay valid until
//! the next structural change on the entity's archetype (spawn, despawn,
//! add/remove component, archetype creation). `QueryIter` encodes that
//! contract in its borrow; pointers obtained through `get_component` rely on
//! the caller honoring it.

use ahash::AHashMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::{Archetype, ArchetypeId, ComponentColumn};
use crate::component::{
    sorted_descs, ComponentDesc, ComponentKind, ComponentView, MAX_COMPONENT_KINDS,
};
use crate::entity::{EntityId, EntityRecord, EntityTable};
use crate::error::{EcsError, Result};
use crate::query::{Query, QueryId, QueryIter, MAX_QUERY_COMPONENTS};
use crate::signature::{Signature, MAX_COMPONENTS_PER_ARCHETYPE};

/// Initial entity table capacity
pub const DEFAULT_ENTITY_CAPACITY: usize = 65536;

/// Initial archetype container capacity
pub const DEFAULT_ARCHETYPE_CAPACITY: usize = 512;

/// Initial query container capacity
pub const DEFAULT_QUERY_CAPACITY: usize = 256;

/// Central ECS world
pub struct World {
    /// Dense entity records keyed by id
    entities: EntityTable,

    /// All archetypes in the world, in creation order
    archetypes: Vec<Archetype>,

    /// Maps component signatures to archetype indices
    archetype_index: AHashMap<Signature, ArchetypeId>,

    /// Registered queries; ids are indices and stay stable
    queries: Vec<Query>,

    /// Cache for archetype transitions when adding/removing components
    transitions: FxHashMap<(ArchetypeId, ComponentKind, bool), ArchetypeId>,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self {
            entities: EntityTable::with_capacity(DEFAULT_ENTITY_CAPACITY),
            archetypes: Vec::with_capacity(DEFAULT_ARCHETYPE_CAPACITY),
            archetype_index: AHashMap::with_capacity(DEFAULT_ARCHETYPE_CAPACITY),
            queries: Vec::with_capacity(DEFAULT_QUERY_CAPACITY),
            transitions: FxHashMap::default(),
        }
    }

    // ========== Archetypes ==========

    /// Create an archetype from component descriptors
    ///
    /// Descriptors may arrive in any order; they are sorted by kind before
    /// the signature is built. An empty descriptor list creates a tag
    /// archetype that stores entity ids only. Passing `row_capacity = 0`
    /// selects [`crate::archetype::DEFAULT_ROW_CAPACITY`].
    ///
    /// Every call allocates a fresh archetype, even for a signature that was
    /// created before; signature lookups during component moves resolve to
    /// the first archetype registered with that signature.
    pub fn create_archetype(
        &mut self,
        descs: &[ComponentDesc],
        row_capacity: usize,
    ) -> Result<ArchetypeId> {
        let sorted = sorted_descs(descs)?;
        let kinds: SmallVec<[ComponentKind; MAX_COMPONENTS_PER_ARCHETYPE]> =
            sorted.iter().map(|desc| desc.kind).collect();
        let signature = Signature::from_sorted(&kinds)?;
        self.register_archetype(signature, &sorted, row_capacity)
    }

    /// Register a new archetype and re-match it against live queries
    fn register_archetype(
        &mut self,
        signature: Signature,
        descs: &[ComponentDesc],
        row_capacity: usize,
    ) -> Result<ArchetypeId> {
        let archetype = Archetype::new(signature, descs, row_capacity)?;
        let id = ArchetypeId::new(self.archetypes.len());
        self.archetypes.push(archetype);
        // the index keeps the first archetype registered for a signature, so
        // lookups behave like a front-to-back scan of the signature table
        self.archetype_index.entry(signature).or_insert(id);

        // queries created before this archetype must still see it
        for query in &mut self.queries {
            if query.matches(&signature) {
                query.bind(id);
            }
        }

        Ok(id)
    }

    /// Get archetype by id
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    /// Signature of an archetype
    pub fn signature_of(&self, id: ArchetypeId) -> Option<&Signature> {
        self.archetypes.get(id.index()).map(Archetype::signature)
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    // ========== Queries ==========

    /// Create a query over a set of component kinds
    ///
    /// The kind order is significant: iteration yields component pointers in
    /// exactly this order. Matching is subset-based, so archetypes carrying
    /// additional kinds are included. A query with the same kind set as an
    /// existing one returns the existing id.
    pub fn create_query(&mut self, kinds: &[ComponentKind]) -> Result<QueryId> {
        if kinds.is_empty() {
            return Err(EcsError::EmptyQuery);
        }
        if kinds.len() > MAX_QUERY_COMPONENTS {
            return Err(EcsError::TooManyQueryComponents);
        }
        for &kind in kinds {
            if kind as usize >= MAX_COMPONENT_KINDS {
                return Err(EcsError::KindOutOfRange(kind));
            }
        }

        for (index, query) in self.queries.iter().enumerate() {
            if query.same_kind_set(kinds) {
                tracing::warn!(
                    query = index,
                    "create_query: component set already registered, returning existing query"
                );
                return Ok(QueryId::new(index));
            }
        }

        let mut query = Query::new(kinds);
        for (index, archetype) in self.archetypes.iter().enumerate() {
            if query.matches(archetype.signature()) {
                query.bind(ArchetypeId::new(index));
            }
        }
        if query.matched().is_empty() {
            tracing::warn!(
                "create_query: no archetype currently matches; archetypes created later will be bound"
            );
        }

        let id = QueryId::new(self.queries.len());
        self.queries.push(query);
        Ok(id)
    }

    /// Get query by id
    pub fn query(&self, id: QueryId) -> Option<&Query> {
        self.queries.get(id.index())
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Iterate a query's entities in packed order
    ///
    /// The iterator holds the world borrow, so structural changes cannot run
    /// while it is alive.
    pub fn query_iter(&mut self, query: QueryId) -> Result<QueryIter<'_>> {
        let query = self.queries.get(query.index()).ok_or(EcsError::QueryNotFound)?;
        Ok(QueryIter::new(&self.archetypes, query))
    }

    /// Callback-style traversal of a query
    pub fn for_each<F>(&mut self, query: QueryId, mut callback: F) -> Result<()>
    where
        F: FnMut(&[*mut u8]),
    {
        for row in self.query_iter(query)? {
            callback(row.components());
        }
        Ok(())
    }

    /// Callback-style traversal that also hands over the entity id
    pub fn for_each_with_entity<F>(&mut self, query: QueryId, mut callback: F) -> Result<()>
    where
        F: FnMut(EntityId, &[*mut u8]),
    {
        for row in self.query_iter(query)? {
            callback(row.entity(), row.components());
        }
        Ok(())
    }

    // ========== Entities ==========

    /// Create an entity in an archetype
    ///
    /// Component bytes at the new row are uninitialized; the caller writes
    /// them through `get_component` or `components_of`.
    pub fn spawn(&mut self, archetype: ArchetypeId) -> Result<EntityId> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.spawn", archetype = archetype.index());
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        let arch = self
            .archetypes
            .get_mut(archetype.index())
            .ok_or(EcsError::ArchetypeNotFound)?;

        // growth happens before the record is written, so a failed
        // allocation leaves the world unchanged
        arch.reserve_one()?;

        let entity = self.entities.next_id();
        let row = arch.push_row(entity);
        self.entities.insert(archetype, row);
        Ok(entity)
    }

    /// Create `count` entities in one archetype, growing storage once
    pub fn spawn_many(&mut self, archetype: ArchetypeId, count: usize) -> Result<Vec<EntityId>> {
        let arch = self
            .archetypes
            .get_mut(archetype.index())
            .ok_or(EcsError::ArchetypeNotFound)?;
        arch.reserve_rows(count)?;
        self.entities.reserve(count);

        let mut spawned = Vec::with_capacity(count);
        for _ in 0..count {
            let entity = self.entities.next_id();
            let row = arch.push_row(entity);
            self.entities.insert(archetype, row);
            spawned.push(entity);
        }
        Ok(spawned)
    }

    /// Destroy an entity
    ///
    /// The last row of its archetype is swap-removed into its slot and the
    /// moved entity's record is patched. The id is never reissued.
    pub fn despawn(&mut self, entity: EntityId) -> Result<()> {
        let record = *self.entities.get(entity)?;
        self.entities.mark_dead(entity);

        let arch = &mut self.archetypes[record.archetype().index()];
        if let Some(moved) = arch.swap_remove_row(record.row() as usize) {
            self.entities.set_row(moved, record.row());
        }
        Ok(())
    }

    /// Check if an entity is alive
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.get(entity).is_ok()
    }

    /// Current location and caller fields of an entity
    pub fn entity_record(&self, entity: EntityId) -> Result<EntityRecord> {
        self.entities.get(entity).copied()
    }

    /// Count of live entities
    pub fn entity_count(&self) -> usize {
        self.entities.alive()
    }

    // ========== Components ==========

    /// Add a component kind to an entity, relocating it between archetypes
    ///
    /// This is the costliest structural operation: every existing component
    /// of the entity is byte-copied into the destination archetype. The new
    /// component's bytes are uninitialized. Adding a kind the entity already
    /// carries succeeds without any effect.
    pub fn add_component(
        &mut self,
        entity: EntityId,
        kind: ComponentKind,
        stride: usize,
    ) -> Result<()> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.add_component", entity = entity.index(), kind);
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        if kind as usize >= MAX_COMPONENT_KINDS {
            return Err(EcsError::KindOutOfRange(kind));
        }
        if stride == 0 {
            return Err(EcsError::InvalidStride(kind));
        }

        let record = *self.entities.get(entity)?;
        let src_id = record.archetype();

        // idempotent when the kind is already on the entity
        if self.archetypes[src_id.index()].has_kind(kind) {
            tracing::debug!(
                entity = entity.index(),
                kind,
                "add_component: kind already present"
            );
            return Ok(());
        }

        let dst_id = match self.transitions.get(&(src_id, kind, true)).copied() {
            Some(id) => id,
            None => {
                let src = &self.archetypes[src_id.index()];
                let signature = src.signature().inserted(kind)?;
                let dst = match self.archetype_index.get(&signature).copied() {
                    Some(id) => id,
                    None => {
                        let mut descs: SmallVec<[ComponentDesc; MAX_COMPONENTS_PER_ARCHETYPE]> =
                            SmallVec::new();
                        for &sig_kind in signature.kinds() {
                            // the only kind absent from the source is the one
                            // being added
                            let sig_stride = src.stride_of(sig_kind).unwrap_or(stride);
                            descs.push(ComponentDesc::new(sig_kind, sig_stride));
                        }
                        let capacity = src.row_capacity();
                        self.register_archetype(signature, &descs, capacity)?
                    }
                };
                self.transitions.insert((src_id, kind, true), dst);
                dst
            }
        };

        // a pre-existing destination must agree on the stride
        if let Some(dst_stride) = self.archetypes[dst_id.index()].stride_of(kind) {
            if dst_stride != stride {
                return Err(EcsError::StrideMismatch {
                    kind,
                    expected: dst_stride,
                    found: stride,
                });
            }
        }

        self.move_entity(entity, record, dst_id)
    }

    /// Remove a component kind from an entity
    ///
    /// Relocates the entity to the archetype without `kind`; removing the
    /// last kind moves it into the tag archetype with an empty signature.
    pub fn remove_component(&mut self, entity: EntityId, kind: ComponentKind) -> Result<()> {
        let record = *self.entities.get(entity)?;
        let src_id = record.archetype();

        if !self.archetypes[src_id.index()].has_kind(kind) {
            return Err(EcsError::ComponentNotFound);
        }

        let dst_id = match self.transitions.get(&(src_id, kind, false)).copied() {
            Some(id) => id,
            None => {
                let src = &self.archetypes[src_id.index()];
                let signature = src.signature().removed(kind)?;
                let dst = match self.archetype_index.get(&signature).copied() {
                    Some(id) => id,
                    None => {
                        let mut descs: SmallVec<[ComponentDesc; MAX_COMPONENTS_PER_ARCHETYPE]> =
                            SmallVec::new();
                        for &sig_kind in signature.kinds() {
                            if let Some(sig_stride) = src.stride_of(sig_kind) {
                                descs.push(ComponentDesc::new(sig_kind, sig_stride));
                            }
                        }
                        let capacity = src.row_capacity();
                        self.register_archetype(signature, &descs, capacity)?
                    }
                };
                self.transitions.insert((src_id, kind, false), dst);
                dst
            }
        };

        self.move_entity(entity, record, dst_id)
    }

    /// Internal: move an entity's row between two distinct archetypes
    ///
    /// The destination is grown and written before the source row is
    /// removed, so a failure on the way leaves the entity where it was.
    fn move_entity(
        &mut self,
        entity: EntityId,
        record: EntityRecord,
        dst_id: ArchetypeId,
    ) -> Result<()> {
        let src_id = record.archetype();
        debug_assert_ne!(src_id.index(), dst_id.index());
        let src_row = record.row() as usize;

        let (src, dst) = archetype_pair_mut(&mut self.archetypes, src_id.index(), dst_id.index());

        dst.reserve_one()?;
        let dst_row = dst.push_row(entity);

        // copy the kinds both archetypes share; a freshly added kind stays
        // uninitialized in the destination
        let dst_signature = *dst.signature();
        for &kind in dst_signature.kinds() {
            if let (Some(src_column), Some(dst_column)) = (src.column(kind), dst.column_mut(kind)) {
                dst_column.copy_row_from(src_column, src_row, dst_row as usize);
            }
        }

        self.entities.relocate(entity, dst_id, dst_row);

        if let Some(moved) = src.swap_remove_row(src_row) {
            self.entities.set_row(moved, src_row as u32);
        }
        Ok(())
    }

    /// Raw pointer to one component of an entity
    ///
    /// Valid until the next structural change on the entity's archetype.
    pub fn get_component(&self, entity: EntityId, kind: ComponentKind) -> Result<*mut u8> {
        let record = self.entities.get(entity)?;
        let archetype = &self.archetypes[record.archetype().index()];
        archetype
            .component_ptr(kind, record.row() as usize)
            .ok_or(EcsError::ComponentNotFound)
    }

    /// All components of an entity as `(kind, stride, ptr)` views
    pub fn components_of(
        &self,
        entity: EntityId,
    ) -> Result<SmallVec<[ComponentView; MAX_COMPONENTS_PER_ARCHETYPE]>> {
        let record = self.entities.get(entity)?;
        let archetype = &self.archetypes[record.archetype().index()];

        let mut views = SmallVec::new();
        for &kind in archetype.signature().kinds() {
            if let Some(column) = archetype.column(kind) {
                views.push(ComponentView {
                    kind,
                    stride: column.stride(),
                    ptr: column.row_ptr(record.row() as usize),
                });
            }
        }
        Ok(views)
    }

    // ========== Caller fields and row order ==========

    /// Exchange the storage rows of two entities in the same archetype
    ///
    /// Useful for callers maintaining an iteration order via `sort_order`.
    /// The caller fields stay with their entities.
    pub fn swap_entities(&mut self, a: EntityId, b: EntityId) -> Result<()> {
        if a == b {
            return Ok(());
        }
        let record_a = *self.entities.get(a)?;
        let record_b = *self.entities.get(b)?;
        if record_a.archetype() != record_b.archetype() {
            return Err(EcsError::ArchetypeMismatch);
        }

        let archetype = &mut self.archetypes[record_a.archetype().index()];
        archetype.swap_rows(record_a.row() as usize, record_b.row() as usize);
        self.entities.set_row(a, record_b.row());
        self.entities.set_row(b, record_a.row());
        Ok(())
    }

    pub fn sort_order(&self, entity: EntityId) -> Result<u32> {
        Ok(self.entities.get(entity)?.sort_order)
    }

    pub fn set_sort_order(&mut self, entity: EntityId, sort_order: u32) -> Result<()> {
        self.entities.get_mut(entity)?.sort_order = sort_order;
        Ok(())
    }

    pub fn flags(&self, entity: EntityId) -> Result<u32> {
        Ok(self.entities.get(entity)?.flags)
    }

    pub fn set_flags(&mut self, entity: EntityId, flags: u32) -> Result<()> {
        self.entities.get_mut(entity)?.flags = flags;
        Ok(())
    }

    // ========== Capacity ==========

    pub fn reserve_entities(&mut self, additional: usize) {
        self.entities.reserve(additional);
    }

    pub fn reserve_archetypes(&mut self, additional: usize) {
        self.archetypes.reserve(additional);
        self.archetype_index.reserve(additional);
    }

    pub fn reserve_queries(&mut self, additional: usize) {
        self.queries.reserve(additional);
    }

    /// Pre-size an archetype for `additional` more rows
    pub fn reserve_rows(&mut self, archetype: ArchetypeId, additional: usize) -> Result<()> {
        self.archetypes
            .get_mut(archetype.index())
            .ok_or(EcsError::ArchetypeNotFound)?
            .reserve_rows(additional)
    }

    /// Get memory usage statistics
    pub fn memory_stats(&self) -> MemoryStats {
        let entity_table_bytes = self.entities.capacity_bytes();
        let archetype_bytes: usize = self
            .archetypes
            .iter()
            .map(|archetype| {
                archetype.row_capacity() * std::mem::size_of::<EntityId>()
                    + MAX_COMPONENT_KINDS * std::mem::size_of::<Option<ComponentColumn>>()
            })
            .sum();
        let column_bytes: usize = self.archetypes.iter().map(Archetype::column_bytes).sum();

        MemoryStats {
            entity_table_bytes,
            archetype_bytes,
            column_bytes,
            total_bytes: entity_table_bytes + archetype_bytes + column_bytes,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Memory statistics for the world
#[derive(Debug, Clone, Copy)]
pub struct MemoryStats {
    pub entity_table_bytes: usize,
    pub archetype_bytes: usize,
    pub column_bytes: usize,
    pub total_bytes: usize,
}

/// Mutable access to two distinct archetypes at once
fn archetype_pair_mut(
    archetypes: &mut [Archetype],
    a: usize,
    b: usize,
) -> (&mut Archetype, &mut Archetype) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = archetypes.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = archetypes.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
