use columnar_ecs::prelude::*;
use columnar_ecs::CACHE_LINE_ALIGNMENT;

use std::mem::size_of;

const TRANSFORM: ComponentKind = 4;
const PHYSICS: ComponentKind = 9;
const TAG: ComponentKind = 200;

unsafe fn write<T>(ptr: *mut u8, value: T) {
    (ptr as *mut T).write(value);
}

unsafe fn read<T: Copy>(ptr: *mut u8) -> T {
    *(ptr as *const T)
}

#[test]
fn test_column_bases_are_cache_line_aligned() -> Result<()> {
    let mut world = World::new();
    let arch = world.create_archetype(
        &[
            ComponentDesc::new(TRANSFORM, 36), // deliberately odd stride
            ComponentDesc::new(PHYSICS, 8),
            ComponentDesc::new(TAG, 1),
        ],
        0,
    )?;

    let archetype = world.archetype(arch).unwrap();
    for &kind in archetype.signature().kinds() {
        let base = archetype.column(kind).unwrap().as_ptr() as usize;
        assert_eq!(base % CACHE_LINE_ALIGNMENT, 0, "kind {kind} misaligned");
    }

    // alignment survives growth
    world.spawn_many(arch, 4096)?;
    let archetype = world.archetype(arch).unwrap();
    for &kind in archetype.signature().kinds() {
        let base = archetype.column(kind).unwrap().as_ptr() as usize;
        assert_eq!(base % CACHE_LINE_ALIGNMENT, 0, "kind {kind} misaligned after growth");
    }
    Ok(())
}

#[test]
fn test_components_of_lists_every_descriptor() -> Result<()> {
    let mut world = World::new();
    let arch = world.create_archetype(
        &[
            ComponentDesc::new(PHYSICS, 8),
            ComponentDesc::new(TRANSFORM, 36),
        ],
        0,
    )?;
    let entity = world.spawn(arch)?;

    let views = world.components_of(entity)?;
    assert_eq!(views.len(), 2);

    // signature order, with recorded strides and live pointers
    assert_eq!(views[0].kind, TRANSFORM);
    assert_eq!(views[0].stride, 36);
    assert_eq!(views[1].kind, PHYSICS);
    assert_eq!(views[1].stride, 8);
    for view in &views {
        assert_eq!(view.ptr, world.get_component(entity, view.kind)?);
    }
    Ok(())
}

#[test]
fn test_payloads_survive_repeated_growth() -> Result<()> {
    let mut world = World::new();
    // tiny initial capacity forces several doublings
    let arch = world.create_archetype(&[ComponentDesc::new(PHYSICS, size_of::<u64>())], 2)?;

    let mut entities = Vec::new();
    for i in 0..10_000u64 {
        let entity = world.spawn(arch)?;
        unsafe { write(world.get_component(entity, PHYSICS)?, i.wrapping_mul(31)) };
        entities.push(entity);
    }

    assert!(world.archetype(arch).unwrap().row_capacity() >= 10_000);
    for (i, &entity) in entities.iter().enumerate() {
        let value: u64 = unsafe { read(world.get_component(entity, PHYSICS)?) };
        assert_eq!(value, (i as u64).wrapping_mul(31));
    }
    Ok(())
}

#[test]
fn test_spawn_many_matches_individual_spawns() -> Result<()> {
    let mut world = World::new();
    let arch = world.create_archetype(&[ComponentDesc::new(PHYSICS, 8)], 0)?;

    let bulk = world.spawn_many(arch, 100)?;
    assert_eq!(bulk.len(), 100);
    assert_eq!(world.entity_count(), 100);

    // ids are sequential and rows are packed in spawn order
    for (i, &entity) in bulk.iter().enumerate() {
        assert_eq!(entity.index(), i);
        assert_eq!(world.entity_record(entity)?.row() as usize, i);
    }

    let next = world.spawn(arch)?;
    assert_eq!(next.index(), 100);
    Ok(())
}

#[test]
fn test_row_capacity_keeps_scratch_slot_free() -> Result<()> {
    let mut world = World::new();
    let arch = world.create_archetype(&[ComponentDesc::new(PHYSICS, 8)], 4)?;

    for _ in 0..64 {
        world.spawn(arch)?;
    }
    let archetype = world.archetype(arch).unwrap();
    assert!(archetype.len() + 1 < archetype.row_capacity());
    Ok(())
}

#[test]
fn test_reserve_capacity_upfront() -> Result<()> {
    let mut world = World::new();
    world.reserve_entities(1 << 16);
    world.reserve_archetypes(32);
    world.reserve_queries(8);

    let arch = world.create_archetype(&[ComponentDesc::new(TRANSFORM, 36)], 0)?;
    world.reserve_rows(arch, 5000)?;
    let capacity = world.archetype(arch).unwrap().row_capacity();
    assert!(capacity > 5000);

    world.spawn_many(arch, 5000)?;
    assert_eq!(world.archetype(arch).unwrap().row_capacity(), capacity);
    Ok(())
}
