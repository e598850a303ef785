//! # Identifier Newtypes
//!
//! Newtype wrappers for the identifiers that flow through the options store.
//! An `OwnerId` is an opaque reference to an entity owned by an external
//! collaborator; the store never learns its kind from the id itself.
//!
//! All three serialize as the bare UUID string. `Display` adds a namespace
//! prefix for logs and error messages, and `parse` accepts either form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Namespace prefix used by `Display`.
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse from a bare UUID or a `<prefix>:<uuid>` string.
            pub fn parse(s: &str) -> Result<Self, CoreError> {
                let raw = s
                    .strip_prefix(concat!($prefix, ":"))
                    .unwrap_or(s);
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|e| CoreError::InvalidIdentifier {
                        namespace: $prefix,
                        value: s.to_string(),
                        reason: e.to_string(),
                    })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of the entity an option is attached to.
    OwnerId,
    "owner"
);

uuid_newtype!(
    /// Identifier of a stored option record.
    OptionId,
    "option"
);

uuid_newtype!(
    /// Identifier of the user who wrote an option record.
    UserId,
    "user"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_namespace_prefix() {
        let id = Uuid::nil();
        assert_eq!(
            OwnerId::from_uuid(id).to_string(),
            "owner:00000000-0000-0000-0000-000000000000"
        );
        assert!(OptionId::from_uuid(id).to_string().starts_with("option:"));
        assert!(UserId::from_uuid(id).to_string().starts_with("user:"));
    }

    #[test]
    fn parse_accepts_bare_and_prefixed() {
        let owner = OwnerId::new();
        assert_eq!(OwnerId::parse(&owner.0.to_string()).unwrap(), owner);
        assert_eq!(OwnerId::parse(&owner.to_string()).unwrap(), owner);
    }

    #[test]
    fn parse_rejects_foreign_prefix() {
        let id = OptionId::new();
        let err = OwnerId::parse(&id.to_string()).unwrap_err();
        match err {
            CoreError::InvalidIdentifier { namespace, .. } => assert_eq!(namespace, "owner"),
            other => panic!("expected InvalidIdentifier, got {other:?}"),
        }
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let id = OwnerId::from_uuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
        let parsed: OwnerId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn new_ids_are_distinct() {
        assert_ne!(OwnerId::new(), OwnerId::new());
    }
}
