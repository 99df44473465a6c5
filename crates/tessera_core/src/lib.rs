//! # TESSERA Core Engine
//!
//! In-process entity/component store for simulation workloads:
//! - Entities are opaque integer handles composed from plain data components
//! - O(1) add/get/remove through paged sparse sets
//! - Dense, cache-friendly iteration one component type at a time
//! - Declared component dependencies enforced on add and remove
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{key, World, WorldConfig};
//!
//! let mut world = World::new(WorldConfig::default())?;
//! world.register::<Chassis>(&[])?;
//! world.register::<Engine>(&[key::<Chassis>()])?;
//!
//! let car = world.create_named("car")?;
//! world.add(car, Chassis::default(), &[])?;
//! world.add(car, Engine::default(), &[key::<Chassis>()])?;
//!
//! world.for_each2::<Engine, Chassis, _>(|_, engine, chassis| {
//!     chassis.load += engine.mass;
//! })?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::WorldConfig;
pub use ecs::{
    key, CommandBuffer, Component, ComponentInfo, ComponentKey, ComponentMask, ComponentRegistry,
    Entity, EntityAllocator, EntityId, ErasedPool, SparseSet, World,
};
pub use error::{EcsError, EcsResult, EntityLabel, ErrorKind};
