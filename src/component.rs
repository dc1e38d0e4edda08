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

//! Component kinds and descriptors
//!
//! A component kind is a small integer id assigned by the caller; the engine
//! only cares about equality, ordering, and the stride of the payload. The
//! mapping from kind id to an actual struct is the caller's responsibility.

use smallvec::SmallVec;

use crate::error::{EcsError, Result};
use crate::signature::MAX_COMPONENTS_PER_ARCHETYPE;

/// User-assigned component kind id
pub type ComponentKind = u32;

/// Upper bound on distinct component kinds; fixes the sparse column table
/// size in each archetype.
pub const MAX_COMPONENT_KINDS: usize = 256;

/// Sentinel kind id, also the signature padding value
pub const INVALID_KIND: ComponentKind = ComponentKind::MAX;

/// Describes one component kind for archetype creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentDesc {
    pub kind: ComponentKind,
    /// Payload size in bytes, immutable once an archetype records it
    pub stride: usize,
}

impl ComponentDesc {
    pub fn new(kind: ComponentKind, stride: usize) -> Self {
        Self { kind, stride }
    }
}

/// One component of an entity as seen through `World::components_of`
///
/// The pointer stays valid until the next structural change on the entity's
/// archetype.
#[derive(Debug, Clone, Copy)]
pub struct ComponentView {
    pub kind: ComponentKind,
    pub stride: usize,
    pub ptr: *mut u8,
}

/// Sort descriptors by kind and validate them for archetype creation
pub(crate) fn sorted_descs(
    descs: &[ComponentDesc],
) -> Result<SmallVec<[ComponentDesc; MAX_COMPONENTS_PER_ARCHETYPE]>> {
    if descs.len() > MAX_COMPONENTS_PER_ARCHETYPE {
        return Err(EcsError::TooManyComponents);
    }
    for desc in descs {
        if desc.kind as usize >= MAX_COMPONENT_KINDS {
            return Err(EcsError::KindOutOfRange(desc.kind));
        }
        if desc.stride == 0 {
            return Err(EcsError::InvalidStride(desc.kind));
        }
    }

    let mut sorted: SmallVec<[ComponentDesc; MAX_COMPONENTS_PER_ARCHETYPE]> =
        SmallVec::from_slice(descs);
    sorted.sort_by_key(|desc| desc.kind);

    for pair in sorted.windows(2) {
        if pair[0].kind == pair[1].kind {
            return Err(EcsError::DuplicateComponent(pair[0].kind));
        }
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_descs_orders_by_kind() {
        let descs = [
            ComponentDesc::new(7, 4),
            ComponentDesc::new(2, 16),
            ComponentDesc::new(5, 8),
        ];
        let sorted = sorted_descs(&descs).unwrap();
        let kinds: Vec<ComponentKind> = sorted.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![2, 5, 7]);
    }

    #[test]
    fn test_sorted_descs_rejects_duplicates() {
        let descs = [ComponentDesc::new(3, 4), ComponentDesc::new(3, 4)];
        assert_eq!(
            sorted_descs(&descs),
            Err(EcsError::DuplicateComponent(3))
        );
    }

    #[test]
    fn test_sorted_descs_rejects_out_of_range_kind() {
        let descs = [ComponentDesc::new(MAX_COMPONENT_KINDS as ComponentKind, 4)];
        assert!(matches!(
            sorted_descs(&descs),
            Err(EcsError::KindOutOfRange(_))
        ));
    }

    #[test]
    fn test_sorted_descs_rejects_zero_stride() {
        let descs = [ComponentDesc::new(1, 0)];
        assert_eq!(sorted_descs(&descs), Err(EcsError::InvalidStride(1)));
    }

    #[test]
    fn test_empty_desc_list_is_valid() {
        assert!(sorted_descs(&[]).unwrap().is_empty());
    }
}
