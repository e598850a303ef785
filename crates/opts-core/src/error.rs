//! # Core Error Type
//!
//! Errors raised while constructing core primitives from untrusted input.

use thiserror::Error;

/// Error constructing a core primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The string is not a valid identifier for the named namespace.
    #[error("invalid {namespace} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Identifier namespace (`owner`, `option`, `user`).
        namespace: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The string is not an accepted timestamp.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
