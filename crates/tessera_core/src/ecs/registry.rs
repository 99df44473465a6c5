//! # Component Registry
//!
//! Assigns every component type a permanent bit position and owns one
//! [`SparseSet`] per registered type, indexed by that bit.
//!
//! Registration also wires the dependency masks:
//!
//! ```text
//! register::<Engine>(&[key::<Chassis>()])
//!
//! Engine.required   = {Chassis}   must be present before Engine is added
//! Chassis.sustained = {Engine}    must be gone before Chassis is removed
//! ```
//!
//! Bits are never reclaimed, so masks stay meaningful for the lifetime of
//! the registry.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use tracing::debug;

use super::component::{Component, ComponentKey, ComponentMask};
use super::sparse_set::{ErasedPool, SparseSet};
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};

/// Registration record of one component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Type token.
    pub key: ComponentKey,
    /// Bit position in every [`ComponentMask`].
    pub bit: u8,
    /// Types that must be present before this one is added.
    pub required: ComponentMask,
    /// Types that must be removed before this one is removed.
    pub sustained: ComponentMask,
}

/// Registry of component types and owner of their pools.
pub struct ComponentRegistry {
    /// Type id -> bit position.
    bits: HashMap<TypeId, u8>,
    /// Registration records, indexed by bit.
    infos: Vec<ComponentInfo>,
    /// One pool per registered type, indexed by bit.
    pools: Vec<Box<dyn ErasedPool>>,
    /// Maximum number of registered types.
    capacity: usize,
    /// Page size handed to new pools.
    page_size: usize,
    /// Dense reservation handed to new pools.
    dense_initial_capacity: usize,
}

impl ComponentRegistry {
    /// Creates an empty registry sized by `config`.
    #[must_use]
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            bits: HashMap::new(),
            infos: Vec::new(),
            pools: Vec::new(),
            capacity: config.max_components,
            page_size: config.page_size,
            dense_initial_capacity: config.dense_initial_capacity,
        }
    }

    /// Maximum number of component types.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Checks whether no type is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Registers `T` with the given required types and creates its pool.
    ///
    /// Every required type gains `T` in its sustained mask. Required types
    /// must already be registered, so dependencies always point at lower
    /// bits than their dependents.
    ///
    /// # Errors
    ///
    /// - [`EcsError::AlreadyRegistered`] if `T` is known
    /// - [`EcsError::ComponentCapacityExceeded`] if the registry is full
    /// - [`EcsError::Unregistered`] if a required type is unknown
    pub fn register<T: Component>(&mut self, required: &[ComponentKey]) -> EcsResult<u8> {
        let key = ComponentKey::of::<T>();
        if self.bits.contains_key(&key.type_id()) {
            return Err(EcsError::AlreadyRegistered { component: key.name() });
        }
        if self.infos.len() >= self.capacity {
            return Err(EcsError::ComponentCapacityExceeded {
                capacity: self.capacity,
            });
        }

        let required_mask = self.mask_of(required)?;
        let bit = u8::try_from(self.infos.len()).map_err(|_| EcsError::ComponentCapacityExceeded {
            capacity: self.capacity,
        })?;

        for dependency in required_mask.iter() {
            self.infos[usize::from(dependency)].sustained.insert(bit);
        }

        self.bits.insert(key.type_id(), bit);
        self.infos.push(ComponentInfo {
            key,
            bit,
            required: required_mask,
            sustained: ComponentMask::EMPTY,
        });
        self.pools.push(Box::new(SparseSet::<T>::new(
            self.page_size,
            self.dense_initial_capacity,
        )));

        debug!("Registered component '{}' at bit {bit}, requires {required_mask}", key.name());
        Ok(bit)
    }

    /// Bit position of `T`.
    #[inline]
    #[must_use]
    pub fn bit_of<T: Component>(&self) -> Option<u8> {
        self.bits.get(&TypeId::of::<T>()).copied()
    }

    /// Bit position of the type behind `key`.
    #[inline]
    #[must_use]
    pub fn bit_of_key(&self, key: &ComponentKey) -> Option<u8> {
        self.bits.get(&key.type_id()).copied()
    }

    /// Bit position of `T`, or an error naming it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] if `T` is unknown.
    #[inline]
    pub fn registered_bit<T: Component>(&self) -> EcsResult<u8> {
        self.bit_of::<T>().ok_or(EcsError::Unregistered {
            component: type_name::<T>(),
        })
    }

    /// Registration record of `T`.
    #[must_use]
    pub fn info<T: Component>(&self) -> Option<&ComponentInfo> {
        self.bit_of::<T>().map(|bit| &self.infos[usize::from(bit)])
    }

    /// Registration record at `bit`.
    #[must_use]
    pub fn info_at(&self, bit: u8) -> Option<&ComponentInfo> {
        self.infos.get(usize::from(bit))
    }

    /// All registration records in bit order.
    #[must_use]
    pub fn infos(&self) -> &[ComponentInfo] {
        &self.infos
    }

    /// Types that must be present before `T` is added.
    #[must_use]
    pub fn required_mask_of<T: Component>(&self) -> Option<ComponentMask> {
        self.info::<T>().map(|info| info.required)
    }

    /// Types that must be removed before `T` is removed.
    #[must_use]
    pub fn sustained_mask_of<T: Component>(&self) -> Option<ComponentMask> {
        self.info::<T>().map(|info| info.sustained)
    }

    /// Assembles a mask with exactly the bits of `keys` set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] for the first unknown key.
    pub fn mask_of(&self, keys: &[ComponentKey]) -> EcsResult<ComponentMask> {
        let mut mask = ComponentMask::EMPTY;
        for key in keys {
            let bit = self
                .bit_of_key(key)
                .ok_or(EcsError::Unregistered { component: key.name() })?;
            mask.insert(bit);
        }
        Ok(mask)
    }

    /// The pool of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] if `T` is unknown.
    pub fn pool<T: Component>(&self) -> EcsResult<&SparseSet<T>> {
        let bit = self.registered_bit::<T>()?;
        Ok(downcast_ref(&*self.pools[usize::from(bit)]))
    }

    /// The pool of `T`, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Unregistered`] if `T` is unknown.
    pub fn pool_mut<T: Component>(&mut self) -> EcsResult<&mut SparseSet<T>> {
        let bit = self.registered_bit::<T>()?;
        Ok(downcast_mut(&mut self.pools[usize::from(bit)]))
    }

    /// The type-erased pool at `bit`.
    pub(crate) fn erased_mut(&mut self, bit: u8) -> Option<&mut Box<dyn ErasedPool>> {
        self.pools.get_mut(usize::from(bit))
    }

    /// Mutable access to several distinct pools at once, in `bits` order.
    ///
    /// # Panics
    ///
    /// Panics if a bit is repeated or unknown; callers check both first.
    pub(crate) fn pools_disjoint_mut<const N: usize>(
        &mut self,
        bits: [u8; N],
    ) -> [&mut Box<dyn ErasedPool>; N] {
        let mut slots: [Option<&mut Box<dyn ErasedPool>>; N] = std::array::from_fn(|_| None);
        for (bit, pool) in self.pools.iter_mut().enumerate() {
            if let Some(slot) = bits.iter().position(|&b| usize::from(b) == bit) {
                slots[slot] = Some(pool);
            }
        }

        assert!(
            slots.iter().all(Option::is_some),
            "(Internal): pool bits {bits:?} are not distinct registered bits"
        );
        slots.map(|slot| slot.unwrap_or_else(|| unreachable!()))
    }

    /// Empties every pool. Registrations are kept.
    pub fn clear_pools(&mut self) {
        for pool in &mut self.pools {
            pool.clear();
        }
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("infos", &self.infos)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Recovers the concrete set behind an erased pool.
///
/// # Panics
///
/// Panics if the pool stores another type, which means the registry is corrupted.
pub(crate) fn downcast_ref<T: Component>(pool: &dyn ErasedPool) -> &SparseSet<T> {
    let stored = pool.component_name();
    match pool.as_any().downcast_ref::<SparseSet<T>>() {
        Some(set) => set,
        None => panic!("(Internal): pool of '{}' holds '{stored}'", type_name::<T>()),
    }
}

/// Mutable form of [`downcast_ref`].
///
/// # Panics
///
/// Panics if the pool stores another type, which means the registry is corrupted.
pub(crate) fn downcast_mut<T: Component>(pool: &mut Box<dyn ErasedPool>) -> &mut SparseSet<T> {
    let stored = pool.component_name();
    match pool.as_any_mut().downcast_mut::<SparseSet<T>>() {
        Some(set) => set,
        None => panic!("(Internal): pool of '{}' holds '{stored}'", type_name::<T>()),
    }
}
