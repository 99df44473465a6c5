//! # ECS Error Types
//!
//! All errors that can occur while creating entities, registering component
//! types, or attaching and detaching components.
//!
//! Every variant here is caller-triggerable. Hosts decide the policy: bubble
//! them up with `?`, recover, or abort on the spot with `unwrap`. Corrupted
//! internal state is never reported through this type; it panics.

use std::fmt;

use thiserror::Error;

use crate::ecs::{ComponentMask, EntityId};

/// Broad classification of an [`EcsError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Entity or component-type capacity reached.
    CapacityExceeded,
    /// A component dependency or presence contract was broken.
    ContractViolation,
    /// A sentinel, out-of-range, or dead entity id was used.
    InvalidHandle,
    /// A component type was used before being registered.
    UnregisteredType,
}

/// Entity id plus its debug name, as printed in diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityLabel {
    /// The entity id.
    pub id: EntityId,
    /// The debug name, or the placeholder name when unnamed.
    pub name: String,
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "['{}', ID: {}]", self.name, self.id)
    }
}

/// Errors that can occur in the ECS.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// No free id is left and the high-water mark reached the capacity.
    #[error("entity limit exceeded: capacity {capacity}")]
    EntityCapacityExceeded {
        /// Configured entity capacity.
        capacity: usize,
    },

    /// The registry already holds the maximum number of component types.
    #[error("exceeded max number of registered components: capacity {capacity}")]
    ComponentCapacityExceeded {
        /// Configured component-type capacity.
        capacity: usize,
    },

    /// The component type was registered twice.
    #[error("component '{component}' already registered")]
    AlreadyRegistered {
        /// Component type name.
        component: &'static str,
    },

    /// The component type was never registered.
    #[error("attempting to operate on unregistered component '{component}'")]
    Unregistered {
        /// Component type name.
        component: &'static str,
    },

    /// The entity id is the sentinel, out of range, or not alive.
    #[error("invalid entity handle {entity}")]
    InvalidHandle {
        /// The offending id.
        entity: EntityId,
    },

    /// The entity already holds a component of this type.
    #[error("{entity} already has component '{component}' added")]
    DuplicateComponent {
        /// The entity.
        entity: EntityLabel,
        /// Component type name.
        component: &'static str,
    },

    /// The entity does not hold a component of this type.
    #[error("{entity} has no component '{component}'")]
    MissingComponent {
        /// The entity.
        entity: EntityLabel,
        /// Component type name.
        component: &'static str,
    },

    /// The required list given at the call site differs from the registered one.
    #[error("'{component}' required components mismatch: declared {declared}, registered {registered}")]
    RequiredMismatch {
        /// Component type name.
        component: &'static str,
        /// Mask assembled from the call site.
        declared: ComponentMask,
        /// Mask recorded at registration.
        registered: ComponentMask,
    },

    /// The sustained list given at the call site differs from the registered one.
    #[error("'{component}' sustained components mismatch: declared {declared}, registered {registered}")]
    SustainedMismatch {
        /// Component type name.
        component: &'static str,
        /// Mask assembled from the call site.
        declared: ComponentMask,
        /// Mask recorded at registration.
        registered: ComponentMask,
    },

    /// The entity lacks some component that this type requires.
    #[error("{entity} is missing required components {missing} for '{component}'")]
    RequiredMissing {
        /// The entity.
        entity: EntityLabel,
        /// Component type being added.
        component: &'static str,
        /// Required bits the entity does not hold.
        missing: ComponentMask,
    },

    /// The entity still holds components that depend on this type.
    #[error("{entity} must first remove sustained components {present} of '{component}'")]
    SustainedPresent {
        /// The entity.
        entity: EntityLabel,
        /// Component type being removed.
        component: &'static str,
        /// Dependent bits the entity still holds.
        present: ComponentMask,
    },

    /// The same component type was requested twice in one iteration pass.
    #[error("component '{component}' borrowed more than once in one pass")]
    AliasedComponent {
        /// Component type name.
        component: &'static str,
    },

    /// Configuration rejected by validation or parsing.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EcsError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EntityCapacityExceeded { .. } | Self::ComponentCapacityExceeded { .. } => {
                ErrorKind::CapacityExceeded
            }
            Self::InvalidHandle { .. } => ErrorKind::InvalidHandle,
            Self::Unregistered { .. } => ErrorKind::UnregisteredType,
            Self::AlreadyRegistered { .. }
            | Self::DuplicateComponent { .. }
            | Self::MissingComponent { .. }
            | Self::RequiredMismatch { .. }
            | Self::SustainedMismatch { .. }
            | Self::RequiredMissing { .. }
            | Self::SustainedPresent { .. }
            | Self::AliasedComponent { .. }
            | Self::InvalidConfig(_) => ErrorKind::ContractViolation,
        }
    }
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_display() {
        let label = EntityLabel {
            id: EntityId::from_raw(7),
            name: "player".to_owned(),
        };
        assert_eq!(label.to_string(), "['player', ID: 7]");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            EcsError::EntityCapacityExceeded { capacity: 4 }.kind(),
            ErrorKind::CapacityExceeded
        );
        assert_eq!(
            EcsError::InvalidHandle { entity: EntityId::NULL }.kind(),
            ErrorKind::InvalidHandle
        );
        assert_eq!(
            EcsError::Unregistered { component: "A" }.kind(),
            ErrorKind::UnregisteredType
        );
        assert_eq!(
            EcsError::AliasedComponent { component: "A" }.kind(),
            ErrorKind::ContractViolation
        );
    }

    #[test]
    fn test_missing_component_message() {
        let err = EcsError::MissingComponent {
            entity: EntityLabel {
                id: EntityId::from_raw(3),
                name: "Entity".to_owned(),
            },
            component: "Position",
        };
        assert_eq!(err.to_string(), "['Entity', ID: 3] has no component 'Position'");
    }
}
