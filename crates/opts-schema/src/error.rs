//! # Schema Errors
//!
//! Every variant here is a configuration problem: a correctly configured
//! deployment never surfaces them to end users.

use thiserror::Error;

/// Error resolving or registering schemas.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No schema set with this name has been registered.
    #[error("schema set '{set}' not found")]
    SchemaSetNotFound {
        /// Requested schema set name.
        set: String,
    },

    /// The schema set exists but the dotted path does not resolve.
    #[error("schema path '{path}' not found in schema set '{set}'")]
    PathNotFound {
        /// Schema set that was searched.
        set: String,
        /// The unresolved dotted path.
        path: String,
    },

    /// A schema tree handed to `replace_schema_set` is not a mapping of groups.
    #[error("invalid schema tree for set '{set}': {reason}")]
    InvalidTree {
        /// Target schema set name.
        set: String,
        /// Why the tree was rejected.
        reason: String,
    },

    /// No table binding exists for the owner kind / column pair.
    #[error("no table binding for owner kind '{owner_kind}' column {column:?}")]
    BindingNotFound {
        /// Owner kind that was looked up.
        owner_kind: String,
        /// Column that was looked up (`None` for the option store itself).
        column: Option<String>,
    },
}
