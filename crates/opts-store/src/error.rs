//! # Option Store Errors
//!
//! One variant per failure kind of the write path. Every variant names the
//! offending key, owner, or record so callers can point at the field.
//! Authorization failures stay a distinct variant from validation
//! failures so the two can be rendered differently.

use opts_core::{OptionId, OwnerId};
use opts_schema::{SchemaError, Violations};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AuthorizationDenied;

/// Error returned by option store operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionError {
    /// The option key is empty.
    #[error("option key must not be empty")]
    EmptyKey,

    /// A schema set, group binding, or path is missing. Configuration bug.
    #[error("schema not found: {0}")]
    SchemaNotFound(#[from] SchemaError),

    /// A null owner was used with a key not declared in the global group.
    #[error("key '{key}' is not a global key and requires an owner")]
    OwnerRequired {
        /// The option key.
        key: String,
    },

    /// No registered owner kind recognizes the owner id.
    #[error("{owner_id} does not exist in any registered owner kind (probed: {})", probed.join(", "))]
    OwnerNotFound {
        /// The unresolved owner.
        owner_id: OwnerId,
        /// Owner kinds probed, in probe order.
        probed: Vec<String>,
    },

    /// The key is declared neither for the owner kind nor the wildcard group.
    #[error("key '{key}' is not declared for owner kind '{owner_kind}'")]
    UnknownKey {
        /// The option key.
        key: String,
        /// The resolved owner kind.
        owner_kind: String,
    },

    /// Wrong number of value fields, or reference/scalar mismatch.
    #[error("invalid value for key '{key}': {reason}")]
    ValueShape {
        /// The option key.
        key: String,
        /// What was wrong with the value fields.
        reason: String,
    },

    /// A second record for a non-multiple key on the same owner.
    #[error("key '{key}' allows a single value per owner and already has {existing}")]
    DuplicateKey {
        /// The option key.
        key: String,
        /// The owner, `None` for global options.
        owner_id: Option<OwnerId>,
        /// The record already holding the key.
        existing: OptionId,
    },

    /// The reference id exists in none of the candidate tables.
    #[error("reference {reference_id} for key '{key}' not found in tables [{}]", tables.join(", "))]
    ReferenceNotFound {
        /// The option key.
        key: String,
        /// The dangling reference.
        reference_id: Uuid,
        /// Candidate tables, in declaration order.
        tables: Vec<String>,
    },

    /// The value violates the key's schema.
    #[error("value for key '{key}' failed validation: {violations}")]
    Validation {
        /// The option key.
        key: String,
        /// Every violation found.
        violations: Violations,
    },

    /// The authorization gate rejected the write.
    #[error(transparent)]
    Authorization(#[from] AuthorizationDenied),

    /// No record with this id exists.
    #[error("{0} not found")]
    RecordNotFound(OptionId),
}

impl OptionError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyKey => "EMPTY_KEY",
            Self::SchemaNotFound(_) => "SCHEMA_NOT_FOUND",
            Self::OwnerRequired { .. } => "OWNER_REQUIRED",
            Self::OwnerNotFound { .. } => "OWNER_NOT_FOUND",
            Self::UnknownKey { .. } => "UNKNOWN_KEY",
            Self::ValueShape { .. } => "VALUE_SHAPE",
            Self::DuplicateKey { .. } => "DUPLICATE_KEY",
            Self::ReferenceNotFound { .. } => "REFERENCE_NOT_FOUND",
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::Authorization(_) => "FORBIDDEN",
            Self::RecordNotFound(_) => "NOT_FOUND",
        }
    }

    /// Whether the failure came from the authorization gate.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let owner = OwnerId::from_uuid(Uuid::nil());
        let err = OptionError::OwnerNotFound {
            owner_id: owner,
            probed: vec!["teams".into(), "projects".into()],
        };
        assert_eq!(
            err.to_string(),
            "owner:00000000-0000-0000-0000-000000000000 does not exist in any registered owner kind (probed: teams, projects)"
        );

        let err = OptionError::ReferenceNotFound {
            key: "avatar".into(),
            reference_id: Uuid::nil(),
            tables: vec!["files".into(), "images".into()],
        };
        assert!(err.to_string().contains("[files, images]"));
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            OptionError::EmptyKey,
            OptionError::OwnerRequired { key: "k".into() },
            OptionError::UnknownKey { key: "k".into(), owner_kind: "t".into() },
            OptionError::ValueShape { key: "k".into(), reason: "r".into() },
            OptionError::RecordNotFound(OptionId::new()),
        ];
        let mut codes: Vec<_> = errors.iter().map(OptionError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
