//! # Entity Management
//!
//! Entities are plain integer handles. Freed ids go back to a pool and are
//! handed out again before the high-water mark grows.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::component::ComponentMask;
use crate::config::DEFAULT_ENTITY_NAME;
use crate::error::{EcsError, EcsResult, EntityLabel};

/// Unique identifier for an entity.
///
/// `u64::MAX` is reserved as [`EntityId::NULL`], meaning "no entity".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns the id as an index into per-entity tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("NULL")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Bookkeeping for one id slot.
///
/// Tracks which components are attached via a bitmask, so presence checks
/// never touch the pools.
#[derive(Clone, Copy, Debug, Default)]
pub struct Entity {
    /// Bits of the component types currently attached.
    pub component_mask: ComponentMask,
    /// Whether this id is currently handed out.
    pub alive: bool,
    /// Whether this entity is queued for deferred destruction.
    pub flagged: bool,
}

impl Entity {
    /// Creates a live entity with no components.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            component_mask: ComponentMask::EMPTY,
            alive: true,
            flagged: false,
        }
    }

    /// Checks if this entity has a specific component bit.
    #[inline]
    #[must_use]
    pub const fn has_component(&self, bit: u8) -> bool {
        self.component_mask.contains(bit)
    }
}

/// Issues entity ids, recycling freed ones first.
///
/// The high-water mark is bounded by `capacity`; once it is reached and
/// the free pool is empty, creation fails.
#[derive(Debug)]
pub struct EntityAllocator {
    /// One record per id below the high-water mark.
    entities: Vec<Entity>,
    /// Ids destroyed and available for reuse (LIFO).
    free_ids: Vec<EntityId>,
    /// Debug names, only for entities created with one.
    names: HashMap<EntityId, String>,
    /// Number of ids currently alive.
    alive_count: usize,
    /// Bound on the high-water mark.
    capacity: usize,
}

impl EntityAllocator {
    /// Creates an allocator that hands out at most `capacity` distinct ids.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entities: Vec::new(),
            free_ids: Vec::new(),
            names: HashMap::new(),
            alive_count: 0,
            capacity,
        }
    }

    /// Returns the id capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of ids ever handed out (the high-water mark).
    #[inline]
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.entities.len()
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Returns the number of ids waiting in the free pool.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_ids.len()
    }

    /// Creates an entity, reusing the most recently freed id if any.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityCapacityExceeded`] when the free pool is
    /// empty and the high-water mark has reached the capacity.
    pub fn create(&mut self, name: Option<&str>) -> EcsResult<EntityId> {
        let id = if let Some(id) = self.free_ids.pop() {
            self.entities[id.index()] = Entity::new();
            id
        } else {
            if self.entities.len() >= self.capacity {
                return Err(EcsError::EntityCapacityExceeded {
                    capacity: self.capacity,
                });
            }
            let id = EntityId::from_raw(self.entities.len() as u64);
            self.entities.push(Entity::new());
            id
        };

        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.names.insert(id, name.to_owned());
        }
        self.alive_count += 1;

        debug!("Created entity {}", self.label(id));
        Ok(id)
    }

    /// Returns an id to the free pool, clears its name, and overwrites the
    /// caller's handle with [`EntityId::NULL`].
    ///
    /// Component storage is not touched here; the world empties the pools
    /// before calling this.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidHandle`] for the null id, an id never
    /// handed out, or an id that is already free.
    pub fn destroy(&mut self, id: &mut EntityId) -> EcsResult<()> {
        self.validate(*id)?;

        debug!("Deleted entity {}", self.label(*id));

        self.entities[id.index()] = Entity::default();
        self.names.remove(id);
        self.free_ids.push(*id);
        self.alive_count -= 1;

        *id = EntityId::NULL;
        Ok(())
    }

    /// Checks that `id` is alive.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidHandle`] otherwise.
    #[inline]
    pub fn validate(&self, id: EntityId) -> EcsResult<()> {
        if self.is_alive(id) {
            Ok(())
        } else {
            Err(EcsError::InvalidHandle { entity: id })
        }
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        !id.is_null() && self.entities.get(id.index()).is_some_and(|e| e.alive)
    }

    /// Gets the record of a live entity.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        if id.is_null() {
            return None;
        }
        self.entities.get(id.index()).filter(|e| e.alive)
    }

    /// Gets the mutable record of a live entity.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if id.is_null() {
            return None;
        }
        self.entities.get_mut(id.index()).filter(|e| e.alive)
    }

    /// Returns the debug name, or the placeholder when unnamed.
    #[must_use]
    pub fn name_of(&self, id: EntityId) -> &str {
        self.names.get(&id).map_or(DEFAULT_ENTITY_NAME, String::as_str)
    }

    /// Id and name, as printed in diagnostics.
    #[must_use]
    pub fn label(&self, id: EntityId) -> EntityLabel {
        EntityLabel {
            id,
            name: self.name_of(id).to_owned(),
        }
    }

    /// Iterates over all alive entity ids in id order.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.alive)
            .map(|(i, _)| EntityId::from_raw(i as u64))
    }
}
