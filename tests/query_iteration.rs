use columnar_ecs::prelude::*;

use std::mem::size_of;

const POSITION: ComponentKind = 0;
const VELOCITY: ComponentKind = 1;
const HEALTH: ComponentKind = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

unsafe fn write<T>(ptr: *mut u8, value: T) {
    (ptr as *mut T).write(value);
}

unsafe fn read<T: Copy>(ptr: *mut u8) -> T {
    *(ptr as *const T)
}

#[test]
fn test_single_archetype_iteration_in_row_order() -> Result<()> {
    let mut world = World::new();
    let arch = world.create_archetype(
        &[
            ComponentDesc::new(POSITION, 16),
            ComponentDesc::new(VELOCITY, 16),
        ],
        0,
    )?;

    for row in 0..3 {
        let entity = world.spawn(arch)?;
        unsafe {
            write(
                world.get_component(entity, POSITION)?,
                Position {
                    x: row as f32,
                    y: 0.0,
                    z: 0.0,
                    w: 0.0,
                },
            );
        }
    }

    let query = world.create_query(&[POSITION])?;
    let xs: Vec<f32> = world
        .query_iter(query)?
        .map(|row| unsafe { read::<Position>(row.component(0)).x })
        .collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    Ok(())
}

#[test]
fn test_subset_matching_excludes_partial_overlap() -> Result<()> {
    let mut world = World::new();
    let a = world.create_archetype(
        &[ComponentDesc::new(POSITION, 16), ComponentDesc::new(VELOCITY, 16)],
        0,
    )?;
    let b = world.create_archetype(
        &[
            ComponentDesc::new(POSITION, 16),
            ComponentDesc::new(VELOCITY, 16),
            ComponentDesc::new(HEALTH, 8),
        ],
        0,
    )?;
    let c = world.create_archetype(
        &[ComponentDesc::new(VELOCITY, 16), ComponentDesc::new(HEALTH, 8)],
        0,
    )?;

    let query = world.create_query(&[POSITION, VELOCITY])?;
    let matched = world.query(query).unwrap().matched();
    assert_eq!(matched, &[a, b]);
    assert!(!matched.contains(&c));
    Ok(())
}

#[test]
fn test_late_archetype_is_bound_to_existing_query() -> Result<()> {
    let mut world = World::new();

    // query first; nothing matches yet
    let query = world.create_query(&[POSITION])?;
    assert!(world.query(query).unwrap().matched().is_empty());

    let late = world.create_archetype(
        &[ComponentDesc::new(POSITION, 16), ComponentDesc::new(HEALTH, 8)],
        0,
    )?;
    let entity = world.spawn(late)?;

    let visited: Vec<EntityId> = world.query_iter(query)?.map(|row| row.entity()).collect();
    assert_eq!(visited, vec![entity]);
    Ok(())
}

#[test]
fn test_iteration_spans_archetypes_and_skips_empty_ones() -> Result<()> {
    let mut world = World::new();
    let a = world.create_archetype(&[ComponentDesc::new(POSITION, 16)], 0)?;
    // matches the query but never holds an entity
    world.create_archetype(
        &[ComponentDesc::new(POSITION, 16), ComponentDesc::new(VELOCITY, 16)],
        0,
    )?;
    let c = world.create_archetype(
        &[ComponentDesc::new(POSITION, 16), ComponentDesc::new(HEALTH, 8)],
        0,
    )?;

    let mut expected = world.spawn_many(a, 2)?;
    expected.extend(world.spawn_many(c, 2)?);

    let query = world.create_query(&[POSITION])?;
    let visited: Vec<EntityId> = world.query_iter(query)?.map(|row| row.entity()).collect();
    assert_eq!(visited, expected);
    Ok(())
}

#[test]
fn test_pointers_follow_query_kind_order() -> Result<()> {
    let mut world = World::new();
    let arch = world.create_archetype(
        &[ComponentDesc::new(POSITION, 16), ComponentDesc::new(VELOCITY, 16)],
        0,
    )?;
    let entity = world.spawn(arch)?;

    let position_ptr = world.get_component(entity, POSITION)?;
    let velocity_ptr = world.get_component(entity, VELOCITY)?;

    // kind order in the query is reversed relative to the signature
    let query = world.create_query(&[VELOCITY, POSITION])?;
    let row = world.query_iter(query)?.next().unwrap();
    assert_eq!(row.component(0), velocity_ptr);
    assert_eq!(row.component(1), position_ptr);
    Ok(())
}

#[test]
fn test_callback_iteration_matches_cursor_iteration() -> Result<()> {
    let mut world = World::new();
    let arch = world.create_archetype(&[ComponentDesc::new(VELOCITY, size_of::<u64>())], 0)?;
    let entities = world.spawn_many(arch, 5)?;
    for (i, &entity) in entities.iter().enumerate() {
        unsafe { write(world.get_component(entity, VELOCITY)?, i as u64 * 3) };
    }

    let query = world.create_query(&[VELOCITY])?;

    let mut sum = 0u64;
    world.for_each(query, |components| {
        sum += unsafe { read::<u64>(components[0]) };
    })?;
    assert_eq!(sum, 3 * (0 + 1 + 2 + 3 + 4));

    let mut visited = Vec::new();
    world.for_each_with_entity(query, |entity, components| {
        visited.push((entity, unsafe { read::<u64>(components[0]) }));
    })?;
    let expected: Vec<(EntityId, u64)> = entities
        .iter()
        .enumerate()
        .map(|(i, &entity)| (entity, i as u64 * 3))
        .collect();
    assert_eq!(visited, expected);
    Ok(())
}

#[test]
fn test_writes_through_iteration_pointers_land_in_storage() -> Result<()> {
    let mut world = World::new();
    let arch = world.create_archetype(&[ComponentDesc::new(HEALTH, size_of::<u32>())], 0)?;
    let entities = world.spawn_many(arch, 4)?;
    for &entity in &entities {
        unsafe { write(world.get_component(entity, HEALTH)?, 100u32) };
    }

    let query = world.create_query(&[HEALTH])?;
    world.for_each(query, |components| unsafe {
        let health = components[0] as *mut u32;
        *health -= 25;
    })?;

    for &entity in &entities {
        let health: u32 = unsafe { read(world.get_component(entity, HEALTH)?) };
        assert_eq!(health, 75);
    }
    Ok(())
}
