//! # World Configuration
//!
//! Compile-time defaults plus a runtime [`WorldConfig`] that can be loaded
//! once at startup from TOML.
//!
//! ```toml
//! max_entities = 10_000
//! page_size = 512
//! auto_register = false
//! ```

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

// =============================================================================
// COMPILE-TIME DEFAULTS
// =============================================================================

/// Maximum number of entity ids ever handed out by one world.
pub const MAX_ENTITIES: usize = 1_000_000;

/// Width of the component bitmask, and so the component-type capacity.
pub const MAX_COMPONENTS: usize = 64;

/// Entity ids covered by one lazily allocated sparse page.
pub const SPARSE_PAGE_SIZE: usize = 1_000;

/// Dense slots reserved up front by every new pool.
pub const DENSE_INITIAL_CAPACITY: usize = 100;

/// Name reported for entities created without one.
pub const DEFAULT_ENTITY_NAME: &str = "Entity";

/// Runtime configuration for a [`crate::World`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Upper bound on the entity high-water mark.
    pub max_entities: usize,
    /// Upper bound on registered component types (at most [`MAX_COMPONENTS`]).
    pub max_components: usize,
    /// Entity ids per sparse page.
    pub page_size: usize,
    /// Dense capacity reserved per pool.
    pub dense_initial_capacity: usize,
    /// Register unknown component types on their first `add`.
    pub auto_register: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entities: MAX_ENTITIES,
            max_components: MAX_COMPONENTS,
            page_size: SPARSE_PAGE_SIZE,
            dense_initial_capacity: DENSE_INITIAL_CAPACITY,
            auto_register: true,
        }
    }
}

impl WorldConfig {
    /// Small limits for tests: 16 entities, 8 component types, 4-id pages.
    #[must_use]
    pub fn testing() -> Self {
        Self {
            max_entities: 16,
            max_components: 8,
            page_size: 4,
            dense_initial_capacity: 0,
            auto_register: true,
        }
    }

    /// Returns this config with a different entity capacity.
    #[must_use]
    pub const fn with_max_entities(mut self, max_entities: usize) -> Self {
        self.max_entities = max_entities;
        self
    }

    /// Returns this config with auto-registration switched on or off.
    #[must_use]
    pub const fn with_auto_register(mut self, auto_register: bool) -> Self {
        self.auto_register = auto_register;
        self
    }

    /// Parses and validates a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML, unknown keys,
    /// or values rejected by [`WorldConfig::validate`].
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] when a limit is zero, when
    /// `max_components` exceeds the mask width, or when `max_entities`
    /// would collide with the null sentinel.
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_entities == 0 {
            return Err(EcsError::InvalidConfig("max_entities must be greater than zero".into()));
        }
        match u64::try_from(self.max_entities) {
            Ok(n) if n < u64::MAX => {}
            _ => {
                return Err(EcsError::InvalidConfig(
                    "max_entities collides with the null entity".into(),
                ))
            }
        }
        if self.max_components == 0 || self.max_components > MAX_COMPONENTS {
            return Err(EcsError::InvalidConfig(format!(
                "max_components must be in 1..={MAX_COMPONENTS}, got {}",
                self.max_components
            )));
        }
        if self.page_size == 0 {
            return Err(EcsError::InvalidConfig("page_size must be greater than zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(WorldConfig::default().validate().is_ok());
        assert!(WorldConfig::testing().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WorldConfig::from_toml_str("max_entities = 32\nauto_register = false\n").unwrap();
        assert_eq!(config.max_entities, 32);
        assert!(!config.auto_register);
        assert_eq!(config.page_size, SPARSE_PAGE_SIZE);
        assert_eq!(config.max_components, MAX_COMPONENTS);
    }

    #[test]
    fn test_rejects_wide_mask() {
        let err = WorldConfig::from_toml_str("max_components = 65").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_unknown_key() {
        assert!(WorldConfig::from_toml_str("max_entitys = 3").is_err());
    }

    #[test]
    fn test_rejects_zero_page() {
        let config = WorldConfig {
            page_size: 0,
            ..WorldConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
