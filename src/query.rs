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

//! Query system with archetype pre-binding
//!
//! A query names a set of component kinds and records every archetype whose
//! signature is a superset of that set. Matching happens once, at query or
//! archetype creation time, so iteration walks a pre-resolved archetype list
//! and never allocates.

use std::ptr;

use smallvec::SmallVec;

use crate::archetype::{Archetype, ArchetypeId};
use crate::component::ComponentKind;
use crate::entity::EntityId;
use crate::signature::Signature;

/// Components one query may name
pub const MAX_QUERY_COMPONENTS: usize = 16;

/// Index of a query within its owning world; stable for the world's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(u32);

impl QueryId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Pre-resolved component query
pub struct Query {
    /// Requested kinds in the order the caller named them; iteration yields
    /// pointers in this order
    kinds: SmallVec<[ComponentKind; MAX_QUERY_COMPONENTS]>,
    /// Archetypes whose signature contains every requested kind, in
    /// archetype-creation order
    matched: Vec<ArchetypeId>,
}

impl Query {
    pub(crate) fn new(kinds: &[ComponentKind]) -> Self {
        Self {
            kinds: SmallVec::from_slice(kinds),
            matched: Vec::new(),
        }
    }

    pub fn kinds(&self) -> &[ComponentKind] {
        &self.kinds
    }

    pub fn matched(&self) -> &[ArchetypeId] {
        &self.matched
    }

    pub(crate) fn matches(&self, signature: &Signature) -> bool {
        signature.contains_all(&self.kinds)
    }

    /// Record a newly created archetype that matches this query
    pub(crate) fn bind(&mut self, archetype: ArchetypeId) {
        self.matched.push(archetype);
    }

    /// Multiset equality of requested kinds, ignoring order
    pub(crate) fn same_kind_set(&self, kinds: &[ComponentKind]) -> bool {
        if self.kinds.len() != kinds.len() {
            return false;
        }
        let mut a: SmallVec<[ComponentKind; MAX_QUERY_COMPONENTS]> =
            SmallVec::from_slice(&self.kinds);
        let mut b: SmallVec<[ComponentKind; MAX_QUERY_COMPONENTS]> = SmallVec::from_slice(kinds);
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

/// One matched entity: its id plus a pointer per queried kind
///
/// Pointers are ordered exactly as the kinds were named at query creation and
/// stay valid until the next structural change on the entity's archetype.
#[derive(Debug, Clone, Copy)]
pub struct Row {
    entity: EntityId,
    ptrs: [*mut u8; MAX_QUERY_COMPONENTS],
    len: usize,
}

impl Row {
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Pointer for the `index`-th kind of the query
    pub fn component(&self, index: usize) -> *mut u8 {
        debug_assert!(index < self.len);
        self.ptrs[index]
    }

    pub fn components(&self) -> &[*mut u8] {
        &self.ptrs[..self.len]
    }
}

/// Cursor over a query's archetypes, rows ascending within each
///
/// The iterator borrows the world for its whole lifetime, so no structural
/// change can run while it is alive.
pub struct QueryIter<'w> {
    archetypes: &'w [Archetype],
    matched: &'w [ArchetypeId],
    kinds: &'w [ComponentKind],
    arch_cursor: usize,
    row_cursor: usize,
}

impl<'w> QueryIter<'w> {
    pub(crate) fn new(archetypes: &'w [Archetype], query: &'w Query) -> Self {
        Self {
            archetypes,
            matched: query.matched(),
            kinds: query.kinds(),
            arch_cursor: 0,
            row_cursor: 0,
        }
    }
}

impl Iterator for QueryIter<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        loop {
            let archetype_id = *self.matched.get(self.arch_cursor)?;
            let archetype = &self.archetypes[archetype_id.index()];

            if self.row_cursor < archetype.len() {
                let row = self.row_cursor;
                self.row_cursor += 1;

                let mut ptrs = [ptr::null_mut(); MAX_QUERY_COMPONENTS];
                for (slot, &kind) in self.kinds.iter().enumerate() {
                    if let Some(component) = archetype.component_ptr(kind, row) {
                        ptrs[slot] = component;
                    }
                }

                return Some(Row {
                    entity: archetype.entities()[row],
                    ptrs,
                    len: self.kinds.len(),
                });
            }

            // next archetype; empty ones are skipped without yielding
            self.arch_cursor += 1;
            self.row_cursor = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_kind_set_ignores_order() {
        let query = Query::new(&[3, 1, 2]);
        assert!(query.same_kind_set(&[1, 2, 3]));
        assert!(query.same_kind_set(&[3, 1, 2]));
        assert!(!query.same_kind_set(&[1, 2]));
        assert!(!query.same_kind_set(&[1, 2, 4]));
    }

    #[test]
    fn test_matches_is_superset_check() {
        let query = Query::new(&[0, 2]);
        let superset = Signature::from_sorted(&[0, 1, 2]).unwrap();
        let disjoint = Signature::from_sorted(&[1, 2]).unwrap();
        assert!(query.matches(&superset));
        assert!(!query.matches(&disjoint));
    }
}
