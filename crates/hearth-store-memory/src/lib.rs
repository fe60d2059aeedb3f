//! In-memory document store backed by DashMap.
//!
//! This implementation is suitable for:
//! - Tests
//! - Development and single-process deployments
//!
//! Writes are atomic per document: the shard lock is held across the
//! revision check and the patch application, so a revision-conditioned
//! `update_fields` is a real compare-and-swap.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use hearth_storage::patch;
use hearth_storage::{
    Collection, DocumentBody, DocumentStore, FieldOp, Revision, StoreError, VersionedDocument,
};

type DocKey = (Collection, String);

/// In-memory `DocumentStore` over two collections of versioned JSON
/// documents.
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<DocKey, VersionedDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<VersionedDocument>, StoreError> {
        Ok(self
            .docs
            .get(&(collection, id.to_owned()))
            .map(|doc| doc.clone()))
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        body: DocumentBody,
    ) -> Result<Revision, StoreError> {
        let mut entry = self
            .docs
            .entry((collection, id.to_owned()))
            .or_insert_with(|| VersionedDocument {
                revision: Revision(0),
                body: DocumentBody::new(),
            });
        entry.revision = Revision(entry.revision.0 + 1);
        entry.body = body;
        Ok(entry.revision)
    }

    async fn update_fields(
        &self,
        collection: Collection,
        id: &str,
        ops: &[FieldOp],
        expected: Option<Revision>,
    ) -> Result<Revision, StoreError> {
        let mut doc = self
            .docs
            .get_mut(&(collection, id.to_owned()))
            .ok_or(StoreError::NotFound)?;
        if let Some(expected) = expected {
            if doc.revision != expected {
                return Err(StoreError::Conflict);
            }
        }
        patch::apply_ops(&mut doc.body, ops);
        doc.revision = Revision(doc.revision.0 + 1);
        Ok(doc.revision)
    }

    async fn query_eq(
        &self,
        collection: Collection,
        path: &str,
        value: &Value,
    ) -> Result<Vec<(String, VersionedDocument)>, StoreError> {
        let mut out = Vec::new();
        for item in self.docs.iter() {
            let (coll, id) = item.key();
            if *coll != collection {
                continue;
            }
            if patch::lookup_path(&item.value().body, path) == Some(value) {
                out.push((id.clone(), item.value().clone()));
            }
        }
        Ok(out)
    }

    async fn scan(
        &self,
        collection: Collection,
    ) -> Result<Vec<(String, VersionedDocument)>, StoreError> {
        let mut out = Vec::new();
        for item in self.docs.iter() {
            let (coll, id) = item.key();
            if *coll == collection {
                out.push((id.clone(), item.value().clone()));
            }
        }
        Ok(out)
    }
}
