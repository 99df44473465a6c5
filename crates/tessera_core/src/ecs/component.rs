//! # Component System
//!
//! Components are plain data records with no behavior. Each registered
//! type owns one bit of a [`ComponentMask`]; dependency lists are passed as
//! slices of [`ComponentKey`] tokens.

use std::any::{type_name, TypeId};
use std::fmt;

use crate::config::MAX_COMPONENTS;

/// Marker trait for ECS components.
///
/// Implemented for every `'static` type, so any plain struct can be
/// attached without ceremony.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Debug, Default, PartialEq)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// world.register::<Position>(&[])?;
/// ```
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

/// Type token identifying a component type at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentKey {
    /// Returns the token for `T`.
    #[inline]
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns the underlying type id.
    #[inline]
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the Rust type name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Shorthand for [`ComponentKey::of`].
///
/// ```rust,ignore
/// world.register::<Engine>(&[key::<Chassis>()])?;
/// ```
#[inline]
#[must_use]
pub fn key<T: Component>() -> ComponentKey {
    ComponentKey::of::<T>()
}

/// Fixed-width set of component bits (up to 64 component types).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Number of bits a mask can hold.
    pub const WIDTH: usize = MAX_COMPONENTS;

    /// Wraps raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Checks whether `bit` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, bit: u8) -> bool {
        (self.0 & (1 << bit)) != 0
    }

    /// Sets `bit`.
    #[inline]
    pub fn insert(&mut self, bit: u8) {
        self.0 |= 1 << bit;
    }

    /// Clears `bit`.
    #[inline]
    pub fn remove(&mut self, bit: u8) {
        self.0 &= !(1 << bit);
    }

    /// Checks whether no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Bits set in `self` but not in `other`.
    #[inline]
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Bits set in both masks.
    #[inline]
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Bits set in exactly one of the masks. Empty iff the masks are equal.
    #[inline]
    #[must_use]
    pub const fn symmetric_difference(self, other: Self) -> Self {
        Self(self.0 ^ other.0)
    }

    /// Checks whether every bit of `other` is set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Iterates over set bits, lowest first.
    pub fn iter(self) -> impl DoubleEndedIterator<Item = u8> {
        (0..Self::WIDTH as u8).filter(move |&bit| self.contains(bit))
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#066b})", self.0)
    }
}

impl fmt::Display for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
