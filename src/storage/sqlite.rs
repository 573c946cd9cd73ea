//! SQLite-backed key-value store
//!
//! Every key lives in one `kv` table scoped by namespace. An edit batch runs
//! inside a single transaction, so the id-set and per-id entries written by
//! the cache never diverge on disk.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

use super::{EditOp, KeyValueStore, StorageError, StorageResult, StoreEdit, StoredValue, ValueKind};

/// Namespaced key-value store persisted in SQLite
pub struct SqliteStore {
    conn: Connection,
    namespace: String,
}

impl SqliteStore {
    /// Open (or create) a store at `path`
    pub fn open(path: &Path, namespace: impl Into<String>) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Unavailable(format!(
                        "failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn, namespace)
    }

    /// Open a transient in-memory database
    pub fn open_in_memory(namespace: impl Into<String>) -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, namespace)
    }

    fn with_connection(conn: Connection, namespace: impl Into<String>) -> StorageResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                kind TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            )",
            [],
        )?;

        let namespace = namespace.into();
        tracing::debug!(namespace = %namespace, "SQLite store ready");

        Ok(Self { conn, namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

fn encode(key: &str, value: &StoredValue) -> StorageResult<String> {
    match value {
        StoredValue::String(s) => Ok(s.clone()),
        StoredValue::Integer(v) => Ok(v.to_string()),
        StoredValue::StringSet(set) => {
            let mut sorted: Vec<&String> = set.iter().collect();
            sorted.sort();
            serde_json::to_string(&sorted).map_err(|e| StorageError::Serialization {
                key: key.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

fn decode(key: &str, kind: &str, raw: String) -> StorageResult<StoredValue> {
    let corrupt = |reason: String| StorageError::Serialization {
        key: key.to_string(),
        reason,
    };

    match ValueKind::parse(kind) {
        Some(ValueKind::String) => Ok(StoredValue::String(raw)),
        Some(ValueKind::Integer) => raw
            .parse::<i64>()
            .map(StoredValue::Integer)
            .map_err(|e| corrupt(e.to_string())),
        Some(ValueKind::StringSet) => serde_json::from_str::<HashSet<String>>(&raw)
            .map(StoredValue::StringSet)
            .map_err(|e| corrupt(e.to_string())),
        None => Err(corrupt(format!("unknown value kind '{kind}'"))),
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StorageResult<Option<StoredValue>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT kind, value FROM kv WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(kind, raw)| decode(key, &kind, raw)).transpose()
    }

    fn apply(&mut self, edit: StoreEdit) -> StorageResult<()> {
        if edit.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        for op in edit.into_ops() {
            match op {
                EditOp::Put(key, value) => {
                    let raw = encode(&key, &value)?;
                    tx.execute(
                        "INSERT INTO kv (namespace, key, kind, value) VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(namespace, key) DO UPDATE SET kind = excluded.kind, value = excluded.value",
                        params![self.namespace, key, value.kind().as_str(), raw],
                    )?;
                }
                EditOp::Remove(key) => {
                    tx.execute(
                        "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
                        params![self.namespace, key],
                    )?;
                }
            }
        }
        tx.commit()?;

        Ok(())
    }
}
