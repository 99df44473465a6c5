//! # Entity Component System
//!
//! A sparse-set ECS with component dependency contracts.
//!
//! ## Design Philosophy
//!
//! - One paged sparse set per component type; dense arrays drive iteration
//! - Entity IDs are plain indices, recycled through a free pool
//! - Every component type owns one bit; masks record presence and dependencies
//! - Structural changes during iteration go through a [`CommandBuffer`]

mod commands;
mod component;
mod entity;
mod registry;
mod sparse_set;
mod world;

pub use commands::CommandBuffer;
pub use component::{key, Component, ComponentKey, ComponentMask};
pub use entity::{Entity, EntityAllocator, EntityId};
pub use registry::{ComponentInfo, ComponentRegistry};
pub use sparse_set::{ErasedPool, SparseSet};
pub use world::World;
