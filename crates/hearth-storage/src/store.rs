//! The DocumentStore trait that backends implement.

use serde_json::Value;

use crate::patch::FieldOp;
use crate::StoreError;

/// Collections the store is organized into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Households,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Households => "households",
            Collection::Users => "users",
        }
    }
}

/// Per-document revision. Starts at 1 on first write and increments on
/// every subsequent write to the same document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(pub u64);

/// Schema-less document body.
pub type DocumentBody = serde_json::Map<String, Value>;

/// A stored document together with its current revision.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedDocument {
    pub revision: Revision,
    pub body: DocumentBody,
}

/// The storage trait the service layer depends on.
///
/// All writes are atomic per document. Cross-document atomicity is NOT
/// offered; callers sequence their writes and reconcile the gap.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id. An absent document is `Ok(None)`, not an
    /// error.
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<VersionedDocument>, StoreError>;

    /// Create or replace a document, returning its new revision.
    async fn put(
        &self,
        collection: Collection,
        id: &str,
        body: DocumentBody,
    ) -> Result<Revision, StoreError>;

    /// Apply field-level patches to an existing document, in order.
    ///
    /// Fails `NotFound` if the document does not exist. When `expected` is
    /// given the patch only commits if it matches the stored revision;
    /// otherwise `Conflict` is returned and nothing is written.
    async fn update_fields(
        &self,
        collection: Collection,
        id: &str,
        ops: &[FieldOp],
        expected: Option<Revision>,
    ) -> Result<Revision, StoreError>;

    /// All documents whose field at `path` (dotted) equals `value`.
    async fn query_eq(
        &self,
        collection: Collection,
        path: &str,
        value: &Value,
    ) -> Result<Vec<(String, VersionedDocument)>, StoreError>;

    /// Every document in a collection. Intended for consistency sweeps,
    /// not request paths.
    async fn scan(
        &self,
        collection: Collection,
    ) -> Result<Vec<(String, VersionedDocument)>, StoreError>;
}
