//! Abstract storage traits for the case resolution engine.
//!
//! Every storage backend (in-memory for testing, or an embedded database)
//! implements [`CaseStore`]. Values are opaque bytes: encoding belongs to the
//! caller. The rest of the codebase depends only on the trait.

pub mod batch;
pub mod case;
pub mod error;

pub use batch::{WriteBatch, WriteOp};
pub use case::{CaseStore, SCHEMA_VERSION};
pub use error::StoreError;
