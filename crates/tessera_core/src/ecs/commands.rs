//! # Deferred Commands
//!
//! Structural changes cannot happen while an iteration pass borrows the
//! world. Record them here during the pass, then run them with
//! [`World::apply`] once it ends.
//!
//! ```rust,ignore
//! let mut commands = CommandBuffer::new();
//! world.for_each::<Health, _>(|id, hp| {
//!     if hp.0 <= 0 {
//!         commands.destroy(id);
//!     }
//! })?;
//! world.apply(&mut commands)?;
//! ```

use std::fmt;

use super::component::{Component, ComponentKey};
use super::entity::EntityId;
use super::world::World;
use crate::error::EcsResult;

/// One queued operation.
pub(crate) type Command = Box<dyn FnOnce(&mut World) -> EcsResult<()>>;

/// FIFO list of structural changes applied later by [`World::apply`].
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Checks whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drops every queued command without running it.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Queues destruction of `id`.
    pub fn destroy(&mut self, id: EntityId) {
        self.commands.push(Box::new(move |world: &mut World| {
            let mut id = id;
            world.destroy(&mut id)
        }));
    }

    /// Queues attaching `value` to `id`. See [`World::add`].
    pub fn add<T: Component>(&mut self, id: EntityId, value: T, required: &[ComponentKey]) {
        let required = required.to_vec();
        self.commands.push(Box::new(move |world: &mut World| {
            world.add(id, value, &required).map(|_| ())
        }));
    }

    /// Queues detaching the `T` of `id`. See [`World::remove`].
    pub fn remove<T: Component>(&mut self, id: EntityId, sustained: &[ComponentKey]) {
        let sustained = sustained.to_vec();
        self.commands.push(Box::new(move |world: &mut World| {
            world.remove::<T>(id, &sustained).map(|_| ())
        }));
    }

    pub(crate) fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub(crate) fn requeue(&mut self, rest: impl IntoIterator<Item = Command>) {
        let mut rest: Vec<Command> = rest.into_iter().collect();
        rest.append(&mut self.commands);
        self.commands = rest;
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("len", &self.commands.len())
            .finish()
    }
}
