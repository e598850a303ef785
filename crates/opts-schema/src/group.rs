//! # Owner Groups
//!
//! The top level of every schema tree is grouped by namespace: one group
//! per owner kind plus two reserved groups. [`ANY_OWNER_GROUP`] declares
//! keys valid on every owner kind; [`GLOBAL_GROUP`] declares keys that live
//! without an owner at all.

use serde::{Deserialize, Serialize};

/// Reserved group holding keys accepted for any owner kind.
pub const ANY_OWNER_GROUP: &str = "any";

/// Reserved group holding keys written with a null owner.
pub const GLOBAL_GROUP: &str = "global";

/// A top-level schema namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "group", content = "kind")]
pub enum OwnerGroup {
    /// Keys specific to one registered owner kind.
    Kind(String),
    /// The "any owner" fallback group.
    Any,
    /// The "no owner" group.
    Global,
}

impl OwnerGroup {
    /// Map a group name to its variant; reserved names map to `Any`/`Global`.
    pub fn from_name(name: &str) -> Self {
        match name {
            ANY_OWNER_GROUP => Self::Any,
            GLOBAL_GROUP => Self::Global,
            other => Self::Kind(other.to_string()),
        }
    }

    /// The group's name as it appears at the top of a schema tree.
    pub fn name(&self) -> &str {
        match self {
            Self::Kind(kind) => kind,
            Self::Any => ANY_OWNER_GROUP,
            Self::Global => GLOBAL_GROUP,
        }
    }

    /// Whether `name` is one of the two reserved group names.
    pub fn is_reserved(name: &str) -> bool {
        name == ANY_OWNER_GROUP || name == GLOBAL_GROUP
    }
}

impl std::fmt::Display for OwnerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_map_to_wildcards() {
        assert_eq!(OwnerGroup::from_name("any"), OwnerGroup::Any);
        assert_eq!(OwnerGroup::from_name("global"), OwnerGroup::Global);
        assert_eq!(
            OwnerGroup::from_name("teams"),
            OwnerGroup::Kind("teams".to_string())
        );
    }

    #[test]
    fn name_roundtrips() {
        for name in ["any", "global", "projects"] {
            assert_eq!(OwnerGroup::from_name(name).name(), name);
        }
        assert!(OwnerGroup::is_reserved("any"));
        assert!(!OwnerGroup::is_reserved("projects"));
    }
}
