//! Durable key-value storage for the geofence cache
//!
//! The cache only needs a namespaced string/set/integer store with batched
//! edits. [`KeyValueStore`] captures that shape; [`SqliteStore`] persists to
//! disk and [`MemoryStore`] backs tests and embedders that bring their own
//! persistence.

pub mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a key-value store
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored value could not be encoded or decoded
    #[error("Serialization error for key '{key}': {reason}")]
    Serialization { key: String, reason: String },

    /// Key holds a value of another kind
    #[error("Key '{key}' holds a {found} value, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// Store lock was poisoned or the store is otherwise unusable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Kind of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    StringSet,
    Integer,
}

impl ValueKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::StringSet => "string_set",
            Self::Integer => "integer",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "string_set" => Some(Self::StringSet),
            "integer" => Some(Self::Integer),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stored value
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    String(String),
    StringSet(HashSet<String>),
    Integer(i64),
}

impl StoredValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::StringSet(_) => ValueKind::StringSet,
            Self::Integer(_) => ValueKind::Integer,
        }
    }
}

/// One operation inside a [`StoreEdit`]
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    Put(String, StoredValue),
    Remove(String),
}

/// Ordered batch of writes applied as one unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreEdit {
    ops: Vec<EditOp>,
}

impl StoreEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops
            .push(EditOp::Put(key.into(), StoredValue::String(value.into())));
        self
    }

    pub fn put_string_set(mut self, key: impl Into<String>, value: HashSet<String>) -> Self {
        self.ops
            .push(EditOp::Put(key.into(), StoredValue::StringSet(value)));
        self
    }

    pub fn put_i64(mut self, key: impl Into<String>, value: i64) -> Self {
        self.ops
            .push(EditOp::Put(key.into(), StoredValue::Integer(value)));
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.ops.push(EditOp::Remove(key.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<EditOp> {
        self.ops
    }
}

/// Durable namespaced key-value store
///
/// Implementations need not be thread-safe; the cache serializes access.
pub trait KeyValueStore: Send {
    /// Read a raw value
    fn get(&self, key: &str) -> StorageResult<Option<StoredValue>>;

    /// Apply every operation of `edit`, all or nothing
    fn apply(&mut self, edit: StoreEdit) -> StorageResult<()>;

    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        match self.get(key)? {
            None => Ok(None),
            Some(StoredValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(mismatch(key, ValueKind::String, &other)),
        }
    }

    fn get_string_set(&self, key: &str) -> StorageResult<Option<HashSet<String>>> {
        match self.get(key)? {
            None => Ok(None),
            Some(StoredValue::StringSet(set)) => Ok(Some(set)),
            Some(other) => Err(mismatch(key, ValueKind::StringSet, &other)),
        }
    }

    fn get_i64(&self, key: &str) -> StorageResult<Option<i64>> {
        match self.get(key)? {
            None => Ok(None),
            Some(StoredValue::Integer(v)) => Ok(Some(v)),
            Some(other) => Err(mismatch(key, ValueKind::Integer, &other)),
        }
    }
}

fn mismatch(key: &str, expected: ValueKind, found: &StoredValue) -> StorageError {
    StorageError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Non-durable store held entirely in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<StoredValue>> {
        Ok(self.values.get(key).cloned())
    }

    fn apply(&mut self, edit: StoreEdit) -> StorageResult<()> {
        for op in edit.into_ops() {
            match op {
                EditOp::Put(key, value) => {
                    self.values.insert(key, value);
                }
                EditOp::Remove(key) => {
                    self.values.remove(&key);
                }
            }
        }
        Ok(())
    }
}
