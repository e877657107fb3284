//! SQLite-backed document collections.

use std::path::Path;

use rusqlite::{Connection, params};
use serde_json::Value;

use crate::{marker::Document, types::MarkerId};

use super::{DocumentStore, StoreResult, new_document_id, now_ms, stamp_created_at};

/// SQLite implementation of [`crate::persist::DocumentStore`].
pub struct SqliteDocumentStore {
    conn: Connection,
}

impl SqliteDocumentStore {
    /// Opens or creates a store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Number of documents in `collection`.
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get_all(&mut self, collection: &str) -> StoreResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payload FROM documents WHERE collection = ?1 ORDER BY created_at_ms ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            let id: String = row.get(0)?;
            let payload: Vec<u8> = row.get(1)?;
            Ok((id, payload))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            let fields: Value = serde_json::from_slice(&payload)?;
            out.push(Document { id, fields });
        }
        Ok(out)
    }

    fn insert(&mut self, collection: &str, fields: Value) -> StoreResult<MarkerId> {
        let ts_ms = now_ms();
        let fields = stamp_created_at(fields, ts_ms)?;
        let payload = serde_json::to_vec(&fields)?;
        let id = new_document_id();
        self.conn.execute(
            "INSERT INTO documents(collection, id, created_at_ms, payload) VALUES (?1, ?2, ?3, ?4)",
            params![collection, id, ts_ms as i64, payload],
        )?;
        Ok(id)
    }

    fn delete(&mut self, collection: &str, id: &MarkerId) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(())
    }

    fn batch_delete(&mut self, collection: &str, ids: &[MarkerId]) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM documents WHERE collection = ?1 AND id = ?2")?;
            for id in ids {
                stmt.execute(params![collection, id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
