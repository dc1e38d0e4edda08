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

//! Archetype signatures
//!
//! A signature is the canonical identity of an archetype: the sorted set of
//! component kinds it stores, packed into a fixed-length array padded with
//! [`INVALID_KIND`]. The fixed representation makes equality a plain
//! comparison of the arrays and lets signatures key a hash map directly.

use std::fmt;

use crate::component::{ComponentKind, INVALID_KIND};
use crate::error::{EcsError, Result};

/// Length of a signature; upper bound on kinds per archetype
pub const MAX_COMPONENTS_PER_ARCHETYPE: usize = 16;

/// Sorted, sentinel-padded component kind set
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    kinds: [ComponentKind; MAX_COMPONENTS_PER_ARCHETYPE],
}

impl Signature {
    /// The signature of a tag archetype with no component kinds
    pub const EMPTY: Signature = Signature {
        kinds: [INVALID_KIND; MAX_COMPONENTS_PER_ARCHETYPE],
    };

    /// Build a signature from strictly ascending kind ids
    ///
    /// Input that is not strictly ascending is flagged as
    /// `DuplicateComponent` on the offending id.
    pub fn from_sorted(kinds: &[ComponentKind]) -> Result<Self> {
        if kinds.len() > MAX_COMPONENTS_PER_ARCHETYPE {
            return Err(EcsError::TooManyComponents);
        }
        for pair in kinds.windows(2) {
            if pair[0] >= pair[1] {
                return Err(EcsError::DuplicateComponent(pair[1]));
            }
        }

        let mut signature = Self::EMPTY;
        signature.kinds[..kinds.len()].copy_from_slice(kinds);
        Ok(signature)
    }

    /// Number of kinds in the live prefix
    pub fn len(&self) -> usize {
        self.kinds
            .iter()
            .position(|&kind| kind == INVALID_KIND)
            .unwrap_or(MAX_COMPONENTS_PER_ARCHETYPE)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds[0] == INVALID_KIND
    }

    /// The live prefix of kind ids, in ascending order
    pub fn kinds(&self) -> &[ComponentKind] {
        &self.kinds[..self.len()]
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.kinds().binary_search(&kind).is_ok()
    }

    /// True when every requested kind appears in this signature
    pub fn contains_all(&self, kinds: &[ComponentKind]) -> bool {
        kinds.iter().all(|&kind| self.contains(kind))
    }

    /// A copy of this signature with `kind` inserted in sorted position
    pub fn inserted(&self, kind: ComponentKind) -> Result<Self> {
        let len = self.len();
        if self.contains(kind) {
            return Err(EcsError::DuplicateComponent(kind));
        }
        if len == MAX_COMPONENTS_PER_ARCHETYPE {
            return Err(EcsError::TooManyComponents);
        }

        let mut signature = *self;
        let slot = self.kinds[..len]
            .iter()
            .position(|&existing| existing > kind)
            .unwrap_or(len);
        signature.kinds.copy_within(slot..len, slot + 1);
        signature.kinds[slot] = kind;
        Ok(signature)
    }

    /// A copy of this signature with `kind` removed
    pub fn removed(&self, kind: ComponentKind) -> Result<Self> {
        let len = self.len();
        let slot = self.kinds[..len]
            .binary_search(&kind)
            .map_err(|_| EcsError::ComponentNotFound)?;

        let mut signature = *self;
        signature.kinds.copy_within(slot + 1..len, slot);
        signature.kinds[len - 1] = INVALID_KIND;
        Ok(signature)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}
