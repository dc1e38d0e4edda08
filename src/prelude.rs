//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use columnar_ecs::prelude::*;
//! ```

pub use crate::archetype::{Archetype, ArchetypeId};
pub use crate::component::{ComponentDesc, ComponentKind, ComponentView};
pub use crate::entity::{EntityId, EntityRecord};
pub use crate::error::{EcsError, Result};
pub use crate::query::{QueryId, QueryIter, Row};
pub use crate::signature::Signature;
pub use crate::world::World;
