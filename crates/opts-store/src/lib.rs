//! # opts-store — Schema-Validated Option Store
//!
//! Stores typed key/value "options" attached to arbitrary owner entities
//! and enforces, at write time, everything the schema catalog declares
//! about each key.
//!
//! ## Write path
//!
//! ```text
//! put(ctx, input)
//!   │
//!   ├─ Authorizer::authorize            (AuthorizationDenied)
//!   ├─ key non-empty                    (EmptyKey)
//!   ├─ owner kind via ProbeRegistry     (OwnerRequired / OwnerNotFound)
//!   ├─ key fragment: kind → any         (UnknownKey / SchemaNotFound)
//!   ├─ value shape vs meta.tables       (ValueShape)
//!   ├─ reference existence              (ReferenceNotFound)
//!   ├─ ── transaction begins ──
//!   ├─ uniqueness unless meta.multiple  (DuplicateKey)
//!   ├─ rule interpreter                 (Validation)
//!   └─ commit
//! ```
//!
//! Any failure aborts before commit; nothing is persisted.
//!
//! ## Read path
//!
//! [`OptionStore::list_visible`] projects an owner's own options (level 0)
//! and those of each ancestor (level = position in the ancestor chain),
//! without deduplication.
//!
//! ## Crate Policy
//!
//! - Owner entities are external: the store sees them only through
//!   [`ExistenceProbe`] and [`AncestorSource`].
//! - No `unwrap()`/`expect()` outside tests.

pub mod auth;
pub mod config;
pub mod error;
pub mod probe;
pub mod projection;
pub mod record;
pub mod storage;
pub mod store;

pub use auth::{
    AllowAll, AuthorizationDenied, Authorizer, CallerContext, RequireRole, Role, WriteAction,
};
pub use config::{ConfigError, StoreConfig};
pub use error::OptionError;
pub use probe::{ExistenceProbe, MemoryTable, ProbeRegistry, RegistrationError};
pub use projection::{closest_per_key, AncestorSource, Entity, EntityTree, NoAncestors, VisibleOption};
pub use record::{OptionInput, OptionRecord, OptionValue};
pub use storage::{MemoryStorage, StorageReader, Transaction};
pub use store::OptionStore;
