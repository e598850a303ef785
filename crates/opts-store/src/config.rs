//! # Store Configuration
//!
//! Built from defaults or from the environment:
//!
//! | Variable                   | Default     |
//! |----------------------------|-------------|
//! | `OPTS_SCHEMA_SET`          | `project`   |
//! | `OPTS_MAX_ANCESTOR_DEPTH`  | `64`        |

use opts_schema::DEFAULT_SCHEMA_SET;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cap on the ancestor chain walked by the projection.
pub const DEFAULT_MAX_ANCESTOR_DEPTH: usize = 64;

/// Configuration error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Option store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Schema set used for groups without a table binding.
    pub default_schema_set: String,
    /// Longest ancestor chain the projection will walk.
    pub max_ancestor_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_schema_set: DEFAULT_SCHEMA_SET.to_string(),
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }
}

impl StoreConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(set) = lookup("OPTS_SCHEMA_SET") {
            let trimmed = set.trim();
            if trimmed.is_empty() || trimmed.contains('.') {
                return Err(ConfigError::InvalidValue {
                    var: "OPTS_SCHEMA_SET",
                    value: set,
                    reason: "must be a non-empty name without dots".to_string(),
                });
            }
            config.default_schema_set = trimmed.to_string();
        }

        if let Some(depth) = lookup("OPTS_MAX_ANCESTOR_DEPTH") {
            config.max_ancestor_depth =
                depth
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        var: "OPTS_MAX_ANCESTOR_DEPTH",
                        value: depth.clone(),
                        reason: e.to_string(),
                    })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(StoreConfig::from_lookup(lookup(&[])).unwrap(), StoreConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("OPTS_SCHEMA_SET", "billing"),
            ("OPTS_MAX_ANCESTOR_DEPTH", " 8 "),
        ]))
        .unwrap();
        assert_eq!(config.default_schema_set, "billing");
        assert_eq!(config.max_ancestor_depth, 8);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(StoreConfig::from_lookup(lookup(&[("OPTS_MAX_ANCESTOR_DEPTH", "deep")])).is_err());
        assert!(StoreConfig::from_lookup(lookup(&[("OPTS_SCHEMA_SET", "a.b")])).is_err());
        assert!(StoreConfig::from_lookup(lookup(&[("OPTS_SCHEMA_SET", "  ")])).is_err());
    }

    #[test]
    fn deserializes_partial_documents() {
        let config: StoreConfig =
            serde_json::from_value(serde_json::json!({ "max_ancestor_depth": 3 })).unwrap();
        assert_eq!(config.default_schema_set, "project");
        assert_eq!(config.max_ancestor_depth, 3);
    }
}
