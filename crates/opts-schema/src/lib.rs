//! # opts-schema — Schema Registry & Rule Interpreter
//!
//! Holds the declarative schemas that decide which option keys exist, what
//! their values may look like, and whether a key is a reference or allows
//! multiple records per owner.
//!
//! ## Components
//!
//! - [`fragment`] — the closed schema AST (`Type`, `Enum`, `String`,
//!   `Number`, `ArrayOf`, `ObjectShape`) parsed from JSON-like trees.
//!   Parsing never fails; unsupported keywords are dropped.
//! - [`validate`] — the rule interpreter. A pure function from
//!   `(value, fragment)` to an accumulated list of violations.
//! - [`registry`] — named schema sets behind an immutable snapshot that is
//!   swapped atomically on `replace_schema_set`. Dotted path resolution.
//! - [`binding`] — `(owner_kind, column)` → schema location table.
//! - [`catalog`] — registry + bindings, answering "which fragment governs
//!   key K for owner group G".
//!
//! ## Crate Policy
//!
//! - Depends only on `opts-core` internally.
//! - Validation does no I/O and takes no locks; the registry lock is held
//!   only for the pointer read or swap.

pub mod binding;
pub mod catalog;
pub mod error;
pub mod fragment;
pub mod group;
pub mod registry;
pub mod validate;

pub use binding::{BindingRegistry, TableBinding};
pub use catalog::{GroupLocation, SchemaCatalog};
pub use error::SchemaError;
pub use fragment::{
    FragmentMeta, JsonType, NumberConstraints, Rule, SchemaFragment, StringConstraints,
    StringFormat,
};
pub use group::{OwnerGroup, ANY_OWNER_GROUP, GLOBAL_GROUP};
pub use registry::{SchemaEntry, SchemaRegistry, SchemaSnapshot, DEFAULT_SCHEMA_SET};
pub use validate::{validate, Violation, Violations};
