//! # opts-core — Foundational Types for the Options Store
//!
//! Leaf crate of the workspace. Defines the identifier newtypes and the
//! timestamp type shared by the schema layer and the attribute store.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `OwnerId`, `OptionId`, `UserId`
//!    are distinct types over `Uuid`. An option id cannot be passed where an
//!    owner id is expected.
//!
//! 2. **Wire-transparent serialization.** Identifiers serialize as the bare
//!    UUID string so the attribute wire contract stays a flat JSON record.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `opts-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::CoreError;
pub use identity::{OptionId, OwnerId, UserId};
pub use temporal::Timestamp;
