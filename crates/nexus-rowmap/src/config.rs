//! Mapper configuration.

use serde::{Deserialize, Serialize};

/// What happens when two fields of a record resolve to the same column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The field visited last wins.
    #[default]
    Overwrite,
    /// Building the mapping table fails with
    /// [`ScanError::DuplicateColumn`](crate::ScanError::DuplicateColumn).
    Reject,
}

/// Configuration for a [`Mapper`](crate::Mapper) and its mapping cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Column collision handling when building mapping tables.
    pub collision: CollisionPolicy,
    /// Whether the mapping cache collects statistics.
    pub record_stats: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            collision: CollisionPolicy::Overwrite,
            record_stats: true,
        }
    }
}

impl MapperConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that rejects column collisions.
    pub fn strict() -> Self {
        Self {
            collision: CollisionPolicy::Reject,
            ..Default::default()
        }
    }

    /// Sets the collision policy.
    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    /// Enables or disables statistics collection.
    pub fn with_stats(mut self, enable: bool) -> Self {
        self.record_stats = enable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MapperConfig::default();
        assert_eq!(config.collision, CollisionPolicy::Overwrite);
        assert!(config.record_stats);
        assert_eq!(MapperConfig::strict().collision, CollisionPolicy::Reject);
    }

    #[test]
    fn test_builder() {
        let config = MapperConfig::new()
            .with_collision(CollisionPolicy::Reject)
            .with_stats(false);
        assert_eq!(config.collision, CollisionPolicy::Reject);
        assert!(!config.record_stats);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: MapperConfig = serde_json::from_str(r#"{"collision":"reject"}"#).unwrap();
        assert_eq!(config, MapperConfig::strict());

        let json = serde_json::to_string(&MapperConfig::default()).unwrap();
        assert_eq!(json, r#"{"collision":"overwrite","record_stats":true}"#);
    }
}
