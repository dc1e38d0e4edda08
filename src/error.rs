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

//! Error types

use std::fmt;

use crate::component::ComponentKind;

/// ECS error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Entity id was never issued or the entity has been destroyed
    EntityNotFound,

    /// Component kind is not part of the entity's archetype
    ComponentNotFound,

    /// Archetype id out of range
    ArchetypeNotFound,

    /// Query id out of range
    QueryNotFound,

    /// Operation requires both entities to live in the same archetype
    ArchetypeMismatch,

    /// Component kind listed twice in an archetype description
    DuplicateComponent(ComponentKind),

    /// Component kind id is outside `[0, MAX_COMPONENT_KINDS)`
    KindOutOfRange(ComponentKind),

    /// Component stride must be non-zero
    InvalidStride(ComponentKind),

    /// Supplied stride disagrees with the stride already recorded for the kind
    StrideMismatch {
        kind: ComponentKind,
        expected: usize,
        found: usize,
    },

    /// Signature capacity exceeded
    TooManyComponents,

    /// Query names more kinds than `MAX_QUERY_COMPONENTS`
    TooManyQueryComponents,

    /// Query must name at least one component kind
    EmptyQuery,

    /// Column allocation failed
    OutOfMemory,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotFound => write!(f, "Entity not found"),
            EcsError::ComponentNotFound => write!(f, "Component not found"),
            EcsError::ArchetypeNotFound => write!(f, "Archetype not found"),
            EcsError::QueryNotFound => write!(f, "Query not found"),
            EcsError::ArchetypeMismatch => {
                write!(f, "Entities belong to different archetypes")
            }
            EcsError::DuplicateComponent(kind) => {
                write!(f, "Duplicate component kind {kind}")
            }
            EcsError::KindOutOfRange(kind) => {
                write!(f, "Component kind {kind} out of range")
            }
            EcsError::InvalidStride(kind) => {
                write!(f, "Component kind {kind} has zero stride")
            }
            EcsError::StrideMismatch {
                kind,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Stride mismatch for component kind {kind}: expected {expected}, found {found}"
                )
            }
            EcsError::TooManyComponents => write!(f, "Too many components for one archetype"),
            EcsError::TooManyQueryComponents => write!(f, "Too many components for one query"),
            EcsError::EmptyQuery => write!(f, "Query names no component kinds"),
            EcsError::OutOfMemory => write!(f, "Out of memory"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
