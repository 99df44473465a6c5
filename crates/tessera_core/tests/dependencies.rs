//! # Component Dependency Tests
//!
//! A car is assembled from parts that depend on each other:
//!
//! ```text
//! Chassis <- Engine <- Turbo
//! Chassis <- Wheels
//! ```
//!
//! Run with: cargo test --test dependencies

// Marker types exist only as type parameters
#![allow(dead_code)]

use tessera_core::{key, EcsError, ErrorKind, World, WorldConfig};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Chassis {
    mass: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Engine {
    power: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Wheels {
    count: u8,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Turbo;

fn garage() -> World {
    let mut world = World::new(WorldConfig::testing().with_auto_register(false)).unwrap();
    world.register::<Chassis>(&[]).unwrap();
    world.register::<Engine>(&[key::<Chassis>()]).unwrap();
    world.register::<Wheels>(&[key::<Chassis>()]).unwrap();
    world.register::<Turbo>(&[key::<Engine>()]).unwrap();
    world
}

#[test]
fn registration_wires_both_masks() {
    let world = garage();

    let chassis = world.bit_of::<Chassis>().unwrap();
    let engine = world.bit_of::<Engine>().unwrap();
    let wheels = world.bit_of::<Wheels>().unwrap();
    let turbo = world.bit_of::<Turbo>().unwrap();
    assert_eq!([chassis, engine, wheels, turbo], [0, 1, 2, 3]);

    let engine_required = world.required_mask_of::<Engine>().unwrap();
    assert!(engine_required.contains(chassis));
    assert_eq!(engine_required.len(), 1);

    let chassis_sustained = world.sustained_mask_of::<Chassis>().unwrap();
    assert!(chassis_sustained.contains(engine));
    assert!(chassis_sustained.contains(wheels));
    assert!(!chassis_sustained.contains(turbo));

    assert!(world.required_mask_of::<Chassis>().unwrap().is_empty());
    assert!(world.sustained_mask_of::<Turbo>().unwrap().is_empty());
}

#[test]
fn registering_with_unknown_dependency_fails() {
    let mut world = World::new(WorldConfig::testing()).unwrap();
    let err = world.register::<Engine>(&[key::<Chassis>()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnregisteredType);
    assert_eq!(world.bit_of::<Engine>(), None);
}

#[test]
fn registering_twice_fails() {
    let mut world = garage();
    let err = world.register::<Chassis>(&[]).unwrap_err();
    assert!(matches!(err, EcsError::AlreadyRegistered { .. }));
}

#[test]
fn component_capacity_is_enforced() {
    struct A;
    struct B;
    struct C;

    let config = WorldConfig {
        max_components: 2,
        ..WorldConfig::testing()
    };
    let mut world = World::new(config).unwrap();
    world.register::<A>(&[]).unwrap();
    world.register::<B>(&[]).unwrap();
    let err = world.register::<C>(&[]).unwrap_err();
    assert_eq!(err, EcsError::ComponentCapacityExceeded { capacity: 2 });
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
}

#[test]
fn add_needs_required_components_present() {
    let mut world = garage();
    let car = world.create_named("car").unwrap();

    let err = world
        .add(car, Engine { power: 90 }, &[key::<Chassis>()])
        .unwrap_err();
    assert!(matches!(err, EcsError::RequiredMissing { .. }));
    assert!(!world.has::<Engine>(car));

    world.add(car, Chassis { mass: 1200 }, &[]).unwrap();
    world
        .add(car, Engine { power: 90 }, &[key::<Chassis>()])
        .unwrap();
    assert!(world.has_all(car, &[key::<Chassis>(), key::<Engine>()]));
}

#[test]
fn add_rejects_a_declared_list_that_drifted() {
    let mut world = garage();
    let car = world.create().unwrap();
    world.add(car, Chassis::default(), &[]).unwrap();

    let err = world.add(car, Engine::default(), &[]).unwrap_err();
    assert!(matches!(err, EcsError::RequiredMismatch { .. }));

    let err = world
        .add(car, Engine::default(), &[key::<Chassis>(), key::<Wheels>()])
        .unwrap_err();
    assert!(matches!(err, EcsError::RequiredMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::ContractViolation);

    assert!(!world.has::<Engine>(car));
}

#[test]
fn duplicate_add_is_rejected_and_keeps_the_original() {
    let mut world = garage();
    let car = world.create().unwrap();
    world.add(car, Chassis { mass: 1 }, &[]).unwrap();

    let err = world.add(car, Chassis { mass: 2 }, &[]).unwrap_err();
    assert!(matches!(err, EcsError::DuplicateComponent { .. }));
    assert_eq!(world.get::<Chassis>(car), Ok(&Chassis { mass: 1 }));
}

#[test]
fn remove_waits_for_dependents() {
    let mut world = garage();
    let car = world.create().unwrap();
    world.add(car, Chassis::default(), &[]).unwrap();
    world.add(car, Engine::default(), &[key::<Chassis>()]).unwrap();
    world.add(car, Wheels { count: 4 }, &[key::<Chassis>()]).unwrap();

    let sustained = [key::<Engine>(), key::<Wheels>()];
    let err = world.remove::<Chassis>(car, &sustained).unwrap_err();
    assert!(matches!(err, EcsError::SustainedPresent { .. }));
    assert!(world.has::<Chassis>(car));

    assert_eq!(world.remove::<Wheels>(car, &[]), Ok(Wheels { count: 4 }));
    let err = world.remove::<Chassis>(car, &sustained).unwrap_err();
    assert!(matches!(err, EcsError::SustainedPresent { .. }));

    world.remove::<Engine>(car, &[key::<Turbo>()]).unwrap();
    world.remove::<Chassis>(car, &sustained).unwrap();
    assert_eq!(world.component_names(car).unwrap().len(), 0);
}

#[test]
fn remove_rejects_a_declared_list_that_drifted() {
    let mut world = garage();
    let car = world.create().unwrap();
    world.add(car, Chassis::default(), &[]).unwrap();

    let err = world.remove::<Chassis>(car, &[key::<Engine>()]).unwrap_err();
    assert!(matches!(err, EcsError::SustainedMismatch { .. }));
    assert!(world.has::<Chassis>(car));
}

#[test]
fn remove_of_absent_component_fails() {
    let mut world = garage();
    let car = world.create_named("empty").unwrap();

    let err = world.remove::<Turbo>(car, &[]).unwrap_err();
    assert!(matches!(err, EcsError::MissingComponent { .. }));
    assert!(err.to_string().starts_with("['empty', ID: 0]"));
}

#[test]
fn destroy_drops_dependents_before_their_requirements() {
    let mut world = garage();
    let mut car = world.create().unwrap();
    world.add(car, Chassis::default(), &[]).unwrap();
    world.add(car, Engine::default(), &[key::<Chassis>()]).unwrap();
    world.add(car, Turbo, &[key::<Engine>()]).unwrap();

    world.destroy(&mut car).unwrap();
    assert!(car.is_null());
    assert!(world.storage::<Chassis>().unwrap().is_empty());
    assert!(world.storage::<Engine>().unwrap().is_empty());
    assert!(world.storage::<Turbo>().unwrap().is_empty());
}
