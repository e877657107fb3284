//! Shared in-process document store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use serde_json::Value;

use crate::{marker::Document, types::MarkerId};

use super::{DocumentStore, StoreResult, new_document_id, now_ms, stamp_created_at};

/// In-memory [`DocumentStore`]. Clones share the same collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
}

impl MemoryDocumentStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Document>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes a document under a caller-chosen id, replacing any existing one.
    pub fn seed(&self, collection: &str, id: impl Into<MarkerId>, fields: Value) {
        let id = id.into();
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        docs.retain(|d| d.id != id);
        docs.push(Document { id, fields });
    }

    /// Snapshot of `collection` in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock().get(collection).cloned().unwrap_or_default()
    }

    /// Ids in `collection`.
    pub fn ids(&self, collection: &str) -> Vec<MarkerId> {
        self.lock()
            .get(collection)
            .map(|docs| docs.iter().map(|d| d.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, Vec::len)
    }

    /// True when `collection` holds nothing.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get_all(&mut self, collection: &str) -> StoreResult<Vec<Document>> {
        Ok(self.documents(collection))
    }

    fn insert(&mut self, collection: &str, fields: Value) -> StoreResult<MarkerId> {
        let fields = stamp_created_at(fields, now_ms())?;
        let id = new_document_id();
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    fn delete(&mut self, collection: &str, id: &MarkerId) -> StoreResult<()> {
        if let Some(docs) = self.lock().get_mut(collection) {
            docs.retain(|d| &d.id != id);
        }
        Ok(())
    }

    fn batch_delete(&mut self, collection: &str, ids: &[MarkerId]) -> StoreResult<()> {
        if let Some(docs) = self.lock().get_mut(collection) {
            docs.retain(|d| !ids.contains(&d.id));
        }
        Ok(())
    }
}
