//! Storage abstraction for hearth.
//!
//! Backend crates (e.g., hearth-store-memory) implement the [`DocumentStore`]
//! trait so the service layer doesn't depend on any specific database engine
//! or schema details. Documents are schema-less JSON bodies organized into
//! two collections (`households` and `users`) and carry a monotonic revision
//! used for optimistic-concurrency writes.

use thiserror::Error;

pub mod patch;
pub mod store;
pub mod types;

pub use patch::FieldOp;
#[cfg(feature = "test-support")]
pub use store::MockDocumentStore;
pub use store::{Collection, DocumentBody, DocumentStore, Revision, VersionedDocument};
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("revision conflict")]
    Conflict,
    #[error("corrupt document: {0}")]
    Corrupted(String),
    #[error("backend error: {0}")]
    Backend(String),
}
