//! # Sparse Set Storage
//!
//! Per-type component storage mapping entity ids to densely packed records.
//!
//! ```text
//! sparse pages: [page 0][  None  ][page 2]     entity id -> dense index
//! dense:        [T0, T1, T2, T3]               packed components
//! dense_to_entity: [e7, e2, e2001, e0]         dense index -> entity id
//! ```
//!
//! Pages are allocated lazily, so one entity with a huge id does not force
//! a sparse array of that length.
//!
//! ## Performance
//!
//! - `set` / `get` / `delete`: O(1)
//! - Iteration: linear over the dense array
//! - `delete` swaps the last record into the hole, so dense order is not
//!   insertion order once anything has been removed

use std::any::{type_name, Any};

use super::entity::EntityId;

/// Marks a sparse slot with no dense record.
const TOMBSTONE: usize = usize::MAX;

/// A paged sparse set mapping [`EntityId`] -> `T`.
///
/// References handed out by this type are only valid until the next
/// structural change (`set` of a new entity, `delete`, `clear`): growth and
/// swap-remove both move records.
#[derive(Debug)]
pub struct SparseSet<T> {
    /// Lazily allocated pages of dense indices.
    pages: Vec<Option<Box<[usize]>>>,
    /// The packed components.
    dense: Vec<T>,
    /// Owner of each dense slot; always as long as `dense`.
    dense_to_entity: Vec<EntityId>,
    /// Entity ids per page.
    page_size: usize,
}

impl<T> SparseSet<T> {
    /// Creates an empty set with the given page size and dense reservation.
    ///
    /// # Panics
    ///
    /// Panics if `page_size` is zero.
    #[must_use]
    pub fn new(page_size: usize, dense_capacity: usize) -> Self {
        assert!(page_size > 0, "Page size must be greater than zero");
        Self {
            pages: Vec::new(),
            dense: Vec::with_capacity(dense_capacity),
            dense_to_entity: Vec::with_capacity(dense_capacity),
            page_size,
        }
    }

    #[inline]
    fn locate(&self, id: EntityId) -> (usize, usize) {
        let raw = id.index();
        (raw / self.page_size, raw % self.page_size)
    }

    /// Records `index` as the dense slot of `id`, allocating its page on demand.
    fn set_dense_index(&mut self, id: EntityId, index: usize) {
        let (page, offset) = self.locate(id);
        if page >= self.pages.len() {
            self.pages.resize_with(page + 1, || None);
        }
        let page_size = self.page_size;
        let slots = self.pages[page].get_or_insert_with(|| vec![TOMBSTONE; page_size].into_boxed_slice());
        slots[offset] = index;
    }

    /// Returns the dense slot of `id`, if it has one.
    #[inline]
    #[must_use]
    pub fn dense_index(&self, id: EntityId) -> Option<usize> {
        if id.is_null() {
            return None;
        }
        let (page, offset) = self.locate(id);
        match self.pages.get(page) {
            Some(Some(slots)) if slots[offset] != TOMBSTONE => Some(slots[offset]),
            _ => None,
        }
    }

    /// Inserts or overwrites the record of `id` and returns it.
    ///
    /// Overwriting keeps the record in its current dense slot.
    ///
    /// # Panics
    ///
    /// Panics if `id` is [`EntityId::NULL`].
    pub fn set(&mut self, id: EntityId, value: T) -> &mut T {
        assert!(!id.is_null(), "'{}' pool cannot store the null entity", type_name::<T>());
        if let Some(index) = self.dense_index(id) {
            self.dense[index] = value;
            return &mut self.dense[index];
        }

        let index = self.dense.len();
        self.set_dense_index(id, index);
        self.dense.push(value);
        self.dense_to_entity.push(id);
        debug_assert_eq!(self.dense.len(), self.dense_to_entity.len());

        &mut self.dense[index]
    }

    /// Gets the record of `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.dense_index(id).map(|index| &self.dense[index])
    }

    /// Gets the mutable record of `id`.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.dense_index(id).map(|index| &mut self.dense[index])
    }

    /// Gets the record of an entity the caller already knows is present.
    ///
    /// # Panics
    ///
    /// Panics if `id` has no record.
    #[inline]
    pub fn get_required(&mut self, id: EntityId) -> &mut T {
        let Some(index) = self.dense_index(id) else {
            panic!("'{}' pool has no record for entity {id}", type_name::<T>());
        };
        &mut self.dense[index]
    }

    /// Checks whether `id` has a record.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.dense_index(id).is_some()
    }

    /// Removes the record of `id` by swapping the last record into its slot.
    ///
    /// Returns the removed value, or `None` if `id` had no record.
    pub fn delete(&mut self, id: EntityId) -> Option<T> {
        let index = self.dense_index(id)?;
        let last = self.dense.len() - 1;
        let moved = self.dense_to_entity[last];

        self.set_dense_index(moved, index);
        self.set_dense_index(id, TOMBSTONE);

        let value = self.dense.swap_remove(index);
        self.dense_to_entity.swap_remove(index);
        debug_assert_eq!(self.dense.len(), self.dense_to_entity.len());

        Some(value)
    }

    /// Drops every record and every sparse page.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.dense_to_entity.clear();
        self.pages.clear();
    }

    /// Number of records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Checks whether there are no records.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Owner of the record in `dense_index`.
    #[inline]
    #[must_use]
    pub fn entity_of(&self, dense_index: usize) -> Option<EntityId> {
        self.dense_to_entity.get(dense_index).copied()
    }

    /// The packed records, in current dense order.
    #[inline]
    #[must_use]
    pub fn dense(&self) -> &[T] {
        &self.dense
    }

    /// The packed records, mutably. Values may change; layout may not.
    #[inline]
    pub fn dense_mut(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// Owners of the packed records, parallel to [`SparseSet::dense`].
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.dense_to_entity
    }

    /// Iterates over `(owner, record)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.dense_to_entity.iter().copied().zip(self.dense.iter())
    }

    /// Iterates mutably over `(owner, record)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.dense_to_entity.iter().copied().zip(self.dense.iter_mut())
    }
}

/// Type-erased handle to one [`SparseSet`], stored per registered type.
///
/// The world recovers the concrete set through [`ErasedPool::as_any_mut`];
/// a failed downcast means the registry is corrupted.
pub trait ErasedPool: Any {
    /// Removes the record of `id`; returns whether one existed.
    fn delete_entity(&mut self, id: EntityId) -> bool;
    /// Checks whether `id` has a record.
    fn contains_entity(&self, id: EntityId) -> bool;
    /// Drops every record.
    fn clear(&mut self);
    /// Number of records.
    fn len(&self) -> usize;
    /// Checks whether there are no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Rust name of the stored type.
    fn component_name(&self) -> &'static str;
    /// Upcast for downcasting to the concrete set.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for downcasting to the concrete set.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedPool for SparseSet<T> {
    fn delete_entity(&mut self, id: EntityId) -> bool {
        self.delete(id).is_some()
    }

    fn contains_entity(&self, id: EntityId) -> bool {
        self.contains(id)
    }

    fn clear(&mut self) {
        SparseSet::clear(self);
    }

    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> EntityId {
        EntityId::from_raw(raw)
    }

    /// Every dense slot must point back at itself through the sparse pages.
    fn assert_consistent<T>(set: &SparseSet<T>) {
        assert_eq!(set.dense().len(), set.entities().len());
        for (i, &owner) in set.entities().iter().enumerate() {
            assert_eq!(set.dense_index(owner), Some(i));
        }
    }

    #[test]
    fn test_set_get() {
        let mut set = SparseSet::new(4, 0);
        *set.set(id(9), 1) += 1;
        assert_eq!(set.get(id(9)), Some(&2));
        assert_eq!(set.get(id(8)), None);
        assert_eq!(set.get(id(1_000)), None);
        assert_eq!(set.get(EntityId::NULL), None);
        assert_consistent(&set);
    }

    #[test]
    fn test_pages_allocated_lazily() {
        let mut set = SparseSet::new(4, 0);
        set.set(id(17), 'x');
        assert_eq!(set.pages.len(), 5);
        assert_eq!(set.pages.iter().filter(|p| p.is_some()).count(), 1);
    }

    #[test]
    fn test_overwrite_keeps_dense_slot() {
        let mut set = SparseSet::new(4, 0);
        set.set(id(0), "a");
        set.set(id(5), "b");
        set.set(id(2), "c");
        let before = set.dense_index(id(5));

        set.set(id(5), "B");
        assert_eq!(set.dense_index(id(5)), before);
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(id(5)), Some(&"B"));
    }

    #[test]
    fn test_delete_swaps_last_into_hole() {
        let mut set = SparseSet::new(4, 0);
        for raw in 0..4 {
            set.set(id(raw), raw * 10);
        }

        assert_eq!(set.delete(id(1)), Some(10));
        assert_eq!(set.entities(), &[id(0), id(3), id(2)]);
        assert_eq!(set.dense(), &[0, 30, 20]);
        assert!(!set.contains(id(1)));
        assert_consistent(&set);

        assert_eq!(set.delete(id(1)), None);
    }

    #[test]
    fn test_delete_last_and_only() {
        let mut set = SparseSet::new(4, 0);
        set.set(id(3), ());
        assert_eq!(set.delete(id(3)), Some(()));
        assert!(set.is_empty());
        assert!(!set.contains(id(3)));
        assert_eq!(set.delete(id(3)), None);
    }

    #[test]
    fn test_entity_of() {
        let mut set = SparseSet::new(4, 0);
        set.set(id(6), 'a');
        set.set(id(2), 'b');
        assert_eq!(set.entity_of(0), Some(id(6)));
        assert_eq!(set.entity_of(1), Some(id(2)));
        assert_eq!(set.entity_of(2), None);
    }

    #[test]
    fn test_get_required() {
        let mut set = SparseSet::new(4, 0);
        set.set(id(1), 5);
        *set.get_required(id(1)) = 6;
        assert_eq!(set.get(id(1)), Some(&6));
    }

    #[test]
    #[should_panic(expected = "has no record")]
    fn test_get_required_panics_when_absent() {
        let mut set: SparseSet<i32> = SparseSet::new(4, 0);
        set.get_required(id(1));
    }

    #[test]
    #[should_panic(expected = "cannot store the null entity")]
    fn test_set_rejects_null() {
        let mut set = SparseSet::<u32>::new(4, 0);
        set.set(EntityId::NULL, 1);
    }

    #[test]
    fn test_clear() {
        let mut set = SparseSet::new(4, 0);
        set.set(id(1), 1);
        set.set(id(9), 9);
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(id(9)));
        assert_consistent(&set);
    }

    #[test]
    fn test_erased_roundtrip() {
        let mut pool: Box<dyn ErasedPool> = Box::new(SparseSet::<u32>::new(4, 0));
        pool.as_any_mut()
            .downcast_mut::<SparseSet<u32>>()
            .unwrap()
            .set(id(2), 7);

        assert!(pool.contains_entity(id(2)));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.component_name(), "u32");
        assert!(pool.as_any().downcast_ref::<SparseSet<i64>>().is_none());
        assert!(pool.delete_entity(id(2)));
        assert!(!pool.delete_entity(id(2)));
    }
}
