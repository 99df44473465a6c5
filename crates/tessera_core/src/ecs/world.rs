//! # ECS World
//!
//! The central container for all entities and components. Routes every
//! component operation to the pool of its type and enforces the
//! dependency contracts recorded at registration.
//!
//! ## Contracts
//!
//! - `add::<T>` needs every type in `T`'s required mask already present,
//!   and the call site must list exactly that set.
//! - `remove::<T>` needs every type in `T`'s sustained mask already gone,
//!   and the call site must list exactly that set.
//! - Listing the set at the call site keeps callers in step with the
//!   registration; drift shows up as a mismatch error.

use std::any::type_name;

use tracing::{debug, trace, warn};

use super::commands::CommandBuffer;
use super::component::{Component, ComponentKey, ComponentMask};
use super::entity::{EntityAllocator, EntityId};
use super::registry::{downcast_mut, ComponentRegistry};
use super::sparse_set::SparseSet;
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};

/// Logs a rejected operation on its way back to the caller.
fn reject(err: EcsError) -> EcsError {
    warn!("{err}");
    err
}

/// Fails with [`EcsError::AliasedComponent`] if a bit appears twice.
fn check_disjoint(bits: &[u8], registry: &ComponentRegistry) -> EcsResult<()> {
    for (i, bit) in bits.iter().enumerate() {
        if bits[..i].contains(bit) {
            let component = registry.info_at(*bit).map_or("?", |info| info.key.name());
            return Err(reject(EcsError::AliasedComponent { component }));
        }
    }
    Ok(())
}

/// Generates a `for_each` variant driven by `M` with the given siblings.
macro_rules! for_each_impl {
    ($(#[$meta:meta])* $name:ident $(, $sib:ident => $pool:ident)*) => {
        $(#[$meta])*
        pub fn $name<M: Component, $($sib: Component,)* F>(&mut self, mut f: F) -> EcsResult<()>
        where
            F: FnMut(EntityId, &mut M, $(&mut $sib),*),
        {
            let bits = [
                self.registry.registered_bit::<M>()?,
                $(self.registry.registered_bit::<$sib>()?,)*
            ];
            check_disjoint(&bits, &self.registry)?;

            let [main, $($pool),*] = self.registry.pools_disjoint_mut(bits);
            let main = downcast_mut::<M>(main);
            $(let $pool = downcast_mut::<$sib>($pool);)*
            trace!("Iterating {} '{}' records", main.len(), type_name::<M>());

            for index in 0..main.len() {
                let id = main.entities()[index];
                $(
                    let Some($pool) = $pool.get_mut(id) else {
                        return Err(reject(EcsError::MissingComponent {
                            entity: self.entities.label(id),
                            component: type_name::<$sib>(),
                        }));
                    };
                )*
                f(id, &mut main.dense_mut()[index], $($pool),*);
            }
            Ok(())
        }
    };
}

/// The ECS World - owner of all entities, registrations, and pools.
///
/// Single-threaded. References returned by [`World::add`], [`World::get`]
/// and friends borrow the world, so the borrow checker forces callers to
/// re-fetch after any structural change.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new(WorldConfig::default())?;
/// world.register::<Chassis>(&[])?;
/// world.register::<Engine>(&[key::<Chassis>()])?;
///
/// let car = world.create_named("car")?;
/// world.add(car, Chassis::default(), &[])?;
/// world.add(car, Engine { power: 90 }, &[key::<Chassis>()])?;
/// ```
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    entities: EntityAllocator,
    registry: ComponentRegistry,
}

impl Default for World {
    fn default() -> Self {
        let config = WorldConfig::default();
        Self {
            entities: EntityAllocator::new(config.max_entities),
            registry: ComponentRegistry::new(&config),
            config,
        }
    }
}

impl World {
    /// Creates a world from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: WorldConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self {
            entities: EntityAllocator::new(config.max_entities),
            registry: ComponentRegistry::new(&config),
            config,
        })
    }

    /// The config this world was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The component registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The entity allocator.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &EntityAllocator {
        &self.entities
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an unnamed entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityCapacityExceeded`] when no id is left.
    pub fn create(&mut self) -> EcsResult<EntityId> {
        self.entities.create(None).map_err(reject)
    }

    /// Creates an entity with a debug name.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityCapacityExceeded`] when no id is left.
    pub fn create_named(&mut self, name: &str) -> EcsResult<EntityId> {
        self.entities.create(Some(name)).map_err(reject)
    }

    /// Destroys an entity: drops all its components, frees its id, and
    /// overwrites the handle with [`EntityId::NULL`].
    ///
    /// Components go in reverse registration order, so dependents are
    /// dropped before the types they require. Do not call this from inside
    /// an iteration pass; queue it on a [`CommandBuffer`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidHandle`] for a null, unknown, or dead id.
    pub fn destroy(&mut self, id: &mut EntityId) -> EcsResult<()> {
        let mask = self.mask(*id)?;
        for bit in mask.iter().rev() {
            let removed = self
                .registry
                .erased_mut(bit)
                .is_some_and(|pool| pool.delete_entity(*id));
            debug_assert!(removed, "entity mask and pool disagree at bit {bit}");
        }
        self.entities.destroy(id)
    }

    /// Checks whether `id` is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Number of alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Ids of all alive entities, in id order.
    #[must_use]
    pub fn alive_entities(&self) -> Vec<EntityId> {
        self.entities.iter_alive().collect()
    }

    /// Debug name of `id`, or the placeholder name.
    #[must_use]
    pub fn name_of(&self, id: EntityId) -> &str {
        self.entities.name_of(id)
    }

    /// Marks or unmarks an entity for deferred destruction.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidHandle`] for a null, unknown, or dead id.
    pub fn flag_entity(&mut self, id: EntityId, flagged: bool) -> EcsResult<()> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or_else(|| reject(EcsError::InvalidHandle { entity: id }))?;
        entity.flagged = flagged;
        Ok(())
    }

    /// Destroys every flagged entity. Returns how many were destroyed.
    ///
    /// # Errors
    ///
    /// Propagates the first destruction failure.
    pub fn destroy_flagged(&mut self) -> EcsResult<usize> {
        let flagged: Vec<EntityId> = self
            .entities
            .iter_alive()
            .filter(|&id| self.entities.get(id).is_some_and(|e| e.flagged))
            .collect();

        for mut id in flagged.iter().copied() {
            self.destroy(&mut id)?;
        }
        Ok(flagged.len())
    }

    /// Drops every entity and every component. Registrations and their
    /// bit positions are kept.
    pub fn clear(&mut self) {
        self.registry.clear_pools();
        self.entities = EntityAllocator::new(self.config.max_entities);
        debug!("Cleared world");
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers `T`, requiring every type in `required` to be present
    /// before `T` can be added. Returns `T`'s bit position.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyRegistered`],
    /// [`EcsError::ComponentCapacityExceeded`], or
    /// [`EcsError::Unregistered`] for an unknown required type.
    pub fn register<T: Component>(&mut self, required: &[ComponentKey]) -> EcsResult<u8> {
        self.registry.register::<T>(required).map_err(reject)
    }

    /// Number of registered component types.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Bit position of `T`.
    #[must_use]
    pub fn bit_of<T: Component>(&self) -> Option<u8> {
        self.registry.bit_of::<T>()
    }

    /// Types that must be present before `T` is added.
    #[must_use]
    pub fn required_mask_of<T: Component>(&self) -> Option<ComponentMask> {
        self.registry.required_mask_of::<T>()
    }

    /// Types that must be removed before `T` is removed.
    #[must_use]
    pub fn sustained_mask_of<T: Component>(&self) -> Option<ComponentMask> {
        self.registry.sustained_mask_of::<T>()
    }

    /// Mask with exactly the bits of `keys`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] for an unknown key.
    pub fn mask_of(&self, keys: &[ComponentKey]) -> EcsResult<ComponentMask> {
        self.registry.mask_of(keys)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches `value` to `id`. `required` must list exactly the types
    /// registered as `T`'s requirements, and `id` must hold all of them.
    ///
    /// With `auto_register` on, an unknown `T` is registered here with no
    /// requirements.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidHandle`] for a null, unknown, or dead id
    /// - [`EcsError::Unregistered`] for an unknown `T` with auto-registration off
    /// - [`EcsError::DuplicateComponent`] if `id` already holds a `T`
    /// - [`EcsError::RequiredMismatch`] if `required` differs from the registration
    /// - [`EcsError::RequiredMissing`] if `id` lacks a required type
    pub fn add<T: Component>(
        &mut self,
        id: EntityId,
        value: T,
        required: &[ComponentKey],
    ) -> EcsResult<&mut T> {
        let mask = self.mask(id)?;
        let bit = match self.registry.bit_of::<T>() {
            Some(bit) => bit,
            None if self.config.auto_register => self.register::<T>(&[])?,
            None => {
                return Err(reject(EcsError::Unregistered {
                    component: type_name::<T>(),
                }))
            }
        };

        if mask.contains(bit) {
            return Err(reject(EcsError::DuplicateComponent {
                entity: self.entities.label(id),
                component: type_name::<T>(),
            }));
        }

        let declared = self.registry.mask_of(required).map_err(reject)?;
        let registered = self.required_at(bit);
        if !declared.symmetric_difference(registered).is_empty() {
            return Err(reject(EcsError::RequiredMismatch {
                component: type_name::<T>(),
                declared,
                registered,
            }));
        }

        let missing = registered.difference(mask);
        if !missing.is_empty() {
            return Err(reject(EcsError::RequiredMissing {
                entity: self.entities.label(id),
                component: type_name::<T>(),
                missing,
            }));
        }

        debug!("Attached '{}' to {}", type_name::<T>(), self.entities.label(id));
        self.set_mask_bit(id, bit, true);
        Ok(self.registry.pool_mut::<T>()?.set(id, value))
    }

    /// The `T` of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidHandle`], [`EcsError::Unregistered`], or
    /// [`EcsError::MissingComponent`].
    pub fn get<T: Component>(&self, id: EntityId) -> EcsResult<&T> {
        self.entities.validate(id)?;
        self.registry
            .pool::<T>()?
            .get(id)
            .ok_or_else(|| self.missing::<T>(id))
    }

    /// The `T` of `id`, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidHandle`], [`EcsError::Unregistered`], or
    /// [`EcsError::MissingComponent`].
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        self.entities.validate(id)?;
        if !self.has::<T>(id) {
            self.registry.registered_bit::<T>()?;
            return Err(self.missing::<T>(id));
        }
        Ok(self.registry.pool_mut::<T>()?.get_required(id))
    }

    /// Overwrites the `T` of `id` in place and returns the previous value.
    /// The record keeps its dense slot.
    ///
    /// # Errors
    ///
    /// Same as [`World::get_mut`].
    pub fn replace<T: Component>(&mut self, id: EntityId, value: T) -> EcsResult<T> {
        Ok(std::mem::replace(self.get_mut::<T>(id)?, value))
    }

    /// Detaches and returns the `T` of `id`. `sustained` must list exactly
    /// the types registered as depending on `T`, and `id` must hold none
    /// of them.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidHandle`] for a null, unknown, or dead id
    /// - [`EcsError::Unregistered`] for an unknown `T`
    /// - [`EcsError::MissingComponent`] if `id` holds no `T`
    /// - [`EcsError::SustainedMismatch`] if `sustained` differs from the registration
    /// - [`EcsError::SustainedPresent`] if `id` still holds a dependent type
    pub fn remove<T: Component>(
        &mut self,
        id: EntityId,
        sustained: &[ComponentKey],
    ) -> EcsResult<T> {
        let mask = self.mask(id)?;
        let bit = self.registry.registered_bit::<T>().map_err(reject)?;
        if !mask.contains(bit) {
            return Err(reject(self.missing::<T>(id)));
        }

        let declared = self.registry.mask_of(sustained).map_err(reject)?;
        let registered = self.sustained_at(bit);
        if !declared.symmetric_difference(registered).is_empty() {
            return Err(reject(EcsError::SustainedMismatch {
                component: type_name::<T>(),
                declared,
                registered,
            }));
        }

        let present = registered.intersection(mask);
        if !present.is_empty() {
            return Err(reject(EcsError::SustainedPresent {
                entity: self.entities.label(id),
                component: type_name::<T>(),
                present,
            }));
        }

        self.set_mask_bit(id, bit, false);
        let Some(value) = self.registry.pool_mut::<T>()?.delete(id) else {
            panic!("(Internal): '{}' mask set for {id} without a record", type_name::<T>());
        };
        debug!("Removed '{}' from {}", type_name::<T>(), self.entities.label(id));
        Ok(value)
    }

    /// Checks whether `id` holds a `T`. Never fails.
    #[must_use]
    pub fn has<T: Component>(&self, id: EntityId) -> bool {
        match (self.registry.bit_of::<T>(), self.entities.get(id)) {
            (Some(bit), Some(entity)) => entity.has_component(bit),
            _ => false,
        }
    }

    /// Checks whether `id` holds every listed type. Never fails; unknown
    /// types and dead ids yield `false`.
    #[must_use]
    pub fn has_all(&self, id: EntityId, keys: &[ComponentKey]) -> bool {
        match (self.registry.mask_of(keys), self.entities.get(id)) {
            (Ok(wanted), Some(entity)) => entity.component_mask.contains_all(wanted),
            _ => false,
        }
    }

    /// Names of the component types attached to `id`, in bit order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidHandle`] for a null, unknown, or dead id.
    pub fn component_names(&self, id: EntityId) -> EcsResult<Vec<&'static str>> {
        let mask = self.mask(id)?;
        Ok(mask
            .iter()
            .filter_map(|bit| self.registry.info_at(bit))
            .map(|info| info.key.name())
            .collect())
    }

    /// Read access to the pool of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] for an unknown `T`.
    pub fn storage<T: Component>(&self) -> EcsResult<&SparseSet<T>> {
        self.registry.pool::<T>()
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Ids of alive entities holding every listed type, in id order.
    /// Entities flagged for destruction are skipped unless `include_flagged`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] for an unknown key.
    pub fn view_ids(
        &self,
        keys: &[ComponentKey],
        include_flagged: bool,
    ) -> EcsResult<Vec<EntityId>> {
        let wanted = self.registry.mask_of(keys)?;
        Ok(self
            .entities
            .iter_alive()
            .filter(|&id| {
                self.entities.get(id).is_some_and(|e| {
                    (include_flagged || !e.flagged) && e.component_mask.contains_all(wanted)
                })
            })
            .collect())
    }

    for_each_impl!(
        /// Visits every `M` in dense order with its owner.
        ///
        /// Dense order is insertion order until the first removal.
        ///
        /// # Errors
        ///
        /// Returns [`EcsError::Unregistered`] for an unknown `M`.
        for_each
    );

    for_each_impl!(
        /// Visits every `M` in dense order together with the owner's `A`.
        ///
        /// The pass stops at the first entity lacking a sibling; declare
        /// siblings guaranteed by `M`'s requirements.
        ///
        /// # Errors
        ///
        /// Returns [`EcsError::Unregistered`], [`EcsError::AliasedComponent`]
        /// when a type is listed twice, or [`EcsError::MissingComponent`].
        for_each2, A => pool_a
    );

    for_each_impl!(
        /// Visits every `M` with the owner's `A` and `B`. See [`World::for_each2`].
        ///
        /// # Errors
        ///
        /// Same as [`World::for_each2`].
        for_each3, A => pool_a, B => pool_b
    );

    for_each_impl!(
        /// Visits every `M` with the owner's `A`, `B` and `C`. See [`World::for_each2`].
        ///
        /// # Errors
        ///
        /// Same as [`World::for_each2`].
        for_each4, A => pool_a, B => pool_b, C => pool_c
    );

    /// Runs every queued command in order and returns how many succeeded.
    ///
    /// On success the buffer is left empty. On failure the failing command
    /// is dropped and the ones after it stay queued.
    ///
    /// # Errors
    ///
    /// Propagates the error of the failing command.
    pub fn apply(&mut self, buffer: &mut CommandBuffer) -> EcsResult<usize> {
        let mut pending = buffer.take().into_iter();
        let mut applied = 0;
        while let Some(command) = pending.next() {
            if let Err(err) = command(self) {
                buffer.requeue(pending);
                return Err(err);
            }
            applied += 1;
        }
        Ok(applied)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn mask(&self, id: EntityId) -> EcsResult<ComponentMask> {
        self.entities
            .get(id)
            .map(|e| e.component_mask)
            .ok_or_else(|| reject(EcsError::InvalidHandle { entity: id }))
    }

    fn set_mask_bit(&mut self, id: EntityId, bit: u8, present: bool) {
        if let Some(entity) = self.entities.get_mut(id) {
            if present {
                entity.component_mask.insert(bit);
            } else {
                entity.component_mask.remove(bit);
            }
        }
    }

    fn required_at(&self, bit: u8) -> ComponentMask {
        self.registry.info_at(bit).map_or(ComponentMask::EMPTY, |info| info.required)
    }

    fn sustained_at(&self, bit: u8) -> ComponentMask {
        self.registry.info_at(bit).map_or(ComponentMask::EMPTY, |info| info.sustained)
    }

    fn missing<T: Component>(&self, id: EntityId) -> EcsError {
        EcsError::MissingComponent {
            entity: self.entities.label(id),
            component: type_name::<T>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::key;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Position {
        x: i32,
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Velocity {
        dx: i32,
    }

    fn world() -> World {
        World::new(WorldConfig::testing()).unwrap()
    }

    #[test]
    fn test_world_creation() {
        let world = world();
        assert_eq!(world.alive_count(), 0);
        assert!(World::new(WorldConfig::testing().with_max_entities(0)).is_err());
    }

    #[test]
    fn test_add_get_roundtrip() {
        let mut world = world();
        let e = world.create().unwrap();
        world.add(e, Position { x: 3 }, &[]).unwrap();
        assert_eq!(world.get::<Position>(e), Ok(&Position { x: 3 }));
        assert!(world.has::<Position>(e));
        assert!(!world.has::<Velocity>(e));
    }

    #[test]
    fn test_auto_register_off() {
        let mut world = World::new(WorldConfig::testing().with_auto_register(false)).unwrap();
        let e = world.create().unwrap();
        let err = world.add(e, Position::default(), &[]).unwrap_err();
        assert!(matches!(err, EcsError::Unregistered { .. }));
        assert_eq!(world.bit_of::<Position>(), None);
    }

    #[test]
    fn test_get_mut_and_replace() {
        let mut world = world();
        let e = world.create().unwrap();
        world.add(e, Position { x: 1 }, &[]).unwrap();
        world.get_mut::<Position>(e).unwrap().x = 2;
        assert_eq!(world.replace(e, Position { x: 5 }), Ok(Position { x: 2 }));
        assert_eq!(world.get::<Position>(e).unwrap().x, 5);

        let other = world.create().unwrap();
        assert!(matches!(
            world.get_mut::<Position>(other),
            Err(EcsError::MissingComponent { .. })
        ));
        assert!(matches!(
            world.get_mut::<Velocity>(other),
            Err(EcsError::Unregistered { .. })
        ));
    }

    #[test]
    fn test_for_each_visits_dense_order() {
        let mut world = world();
        for x in 1..=3 {
            let e = world.create().unwrap();
            world.add(e, Position { x }, &[]).unwrap();
        }

        let mut seen = Vec::new();
        world
            .for_each::<Position, _>(|id, p| seen.push((id.raw(), p.x)))
            .unwrap();
        assert_eq!(seen, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_for_each2_mutates_main() {
        let mut world = world();
        let e = world.create().unwrap();
        world.add(e, Position { x: 1 }, &[]).unwrap();
        world.add(e, Velocity { dx: 4 }, &[]).unwrap();

        world
            .for_each2::<Position, Velocity, _>(|_, p, v| p.x += v.dx)
            .unwrap();
        assert_eq!(world.get::<Position>(e).unwrap().x, 5);
    }

    #[test]
    fn test_for_each_rejects_aliasing() {
        let mut world = world();
        world.register::<Position>(&[]).unwrap();
        let err = world
            .for_each2::<Position, Position, _>(|_, _, _| {})
            .unwrap_err();
        assert!(matches!(err, EcsError::AliasedComponent { .. }));
    }

    #[test]
    fn test_component_names() {
        let mut world = world();
        let e = world.create().unwrap();
        world.add(e, Velocity::default(), &[]).unwrap();
        world.add(e, Position::default(), &[]).unwrap();
        let names = world.component_names(e).unwrap();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("Velocity"));
        assert!(names[1].ends_with("Position"));
    }

    #[test]
    fn test_clear_keeps_registrations() {
        let mut world = world();
        let e = world.create().unwrap();
        world.add(e, Position::default(), &[]).unwrap();
        world.clear();

        assert_eq!(world.alive_count(), 0);
        assert_eq!(world.registered_count(), 1);
        assert_eq!(world.bit_of::<Position>(), Some(0));
        assert!(world.storage::<Position>().unwrap().is_empty());

        let fresh = world.create().unwrap();
        assert_eq!(fresh.raw(), 0);
        assert!(!world.has::<Position>(fresh));
    }

    #[test]
    fn test_has_all() {
        let mut world = world();
        let e = world.create().unwrap();
        world.add(e, Position::default(), &[]).unwrap();
        assert!(world.has_all(e, &[key::<Position>()]));
        assert!(world.has_all(e, &[]));
        assert!(!world.has_all(e, &[key::<Position>(), key::<Velocity>()]));
        assert!(!world.has_all(EntityId::NULL, &[]));
    }
}
