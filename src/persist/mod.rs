//! Document store abstraction and its implementations.

/// Shared in-process collections.
pub mod memory;
/// SQLite-backed collections.
pub mod sqlite;

use serde_json::Value;

use crate::{marker::Document, types::MarkerId};

/// Document store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite backend error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Payload could not be encoded or decoded.
    #[error("document encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Insert fields were not a JSON object.
    #[error("document fields must be a JSON object: {0}")]
    InvalidFields(String),
    /// Any other store failure.
    #[error("{0}")]
    Message(String),
}

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Remote collection store holding marker documents.
///
/// Calls block; the controller drives them from a blocking task so it only
/// ever awaits their completion.
pub trait DocumentStore: Send {
    /// Every document in `collection`, in no particular order.
    fn get_all(&mut self, collection: &str) -> StoreResult<Vec<Document>>;
    /// Stores `fields` under a fresh id, adding the server creation timestamp.
    fn insert(&mut self, collection: &str, fields: Value) -> StoreResult<MarkerId>;
    /// Deletes one document. Deleting a missing id succeeds.
    fn delete(&mut self, collection: &str, id: &MarkerId) -> StoreResult<()>;
    /// Deletes all `ids` at once: either every delete applies or none does.
    fn batch_delete(&mut self, collection: &str, ids: &[MarkerId]) -> StoreResult<()>;
}

pub(crate) fn stamp_created_at(mut fields: Value, ts_ms: u64) -> StoreResult<Value> {
    if !fields.is_object() {
        return Err(StoreError::InvalidFields(fields.to_string()));
    }
    if let Some(obj) = fields.as_object_mut() {
        obj.insert(
            crate::marker::CREATED_AT_FIELD.to_string(),
            Value::from(ts_ms),
        );
    }
    Ok(fields)
}

pub(crate) fn new_document_id() -> MarkerId {
    uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
