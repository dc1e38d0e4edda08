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

//! Columnar ECS - stride-indexed archetype storage
//!
//! Entities are grouped by the exact set of component kinds they carry; each
//! kind is stored in a packed, cache-line-aligned column per archetype.
//! Component kinds are small integer ids assigned by the caller, and payloads
//! are opaque byte rows of a caller-declared stride, so the engine works
//! without any compile-time component registry.
//!
//! Queries pre-bind the archetypes matching their kind set and iteration
//! yields one raw pointer per queried kind in packed row order, with no
//! allocation on the hot path.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod prelude;
pub mod query;
pub mod signature;
pub mod world;

// Re-exports for convenience
pub use archetype::{Archetype, ArchetypeId, ComponentColumn, CACHE_LINE_ALIGNMENT, DEFAULT_ROW_CAPACITY};
pub use component::{ComponentDesc, ComponentKind, ComponentView, INVALID_KIND, MAX_COMPONENT_KINDS};
pub use entity::{EntityId, EntityRecord};
pub use error::{EcsError, Result};
pub use query::{Query, QueryId, QueryIter, Row, MAX_QUERY_COMPONENTS};
pub use signature::{Signature, MAX_COMPONENTS_PER_ARCHETYPE};
pub use world::{
    MemoryStats, World, DEFAULT_ARCHETYPE_CAPACITY, DEFAULT_ENTITY_CAPACITY, DEFAULT_QUERY_CAPACITY,
};
