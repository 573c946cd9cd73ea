//! Persistent cache of registered geofences
//!
//! The cache keeps two views of the same data in the backing store:
//!
//! - `persistent_geofences_ids`: set of every tracked geofence id
//! - `persistent_geofence/<id>`: the serialized [`GeofenceSpec`] for that id
//!
//! Both are rewritten in a single [`StoreEdit`] under one process-wide lock,
//! so an id is in the set exactly when its entry exists. The same lock also
//! guards the dispatcher token.
//!
//! # Example
//!
//! ```rust,ignore
//! use geofencing::cache::GeofenceCache;
//! use geofencing::storage::MemoryStore;
//!
//! let cache = GeofenceCache::new(MemoryStore::new());
//! cache.put(&spec).await?;
//! assert!(cache.list_ids().await?.contains(&spec.id));
//! ```

use std::collections::HashSet;
use tokio::sync::Mutex;

use crate::models::GeofenceSpec;
use crate::storage::{KeyValueStore, StorageError, StorageResult, StoreEdit};

/// Default storage namespace
pub const DEFAULT_NAMESPACE: &str = "geofencing_plugin_cache";

/// Key holding the dispatcher token
pub const CALLBACK_DISPATCHER_HANDLE_KEY: &str = "callback_dispatch_handler";

/// Key holding the set of tracked ids
pub const PERSISTENT_GEOFENCES_IDS_KEY: &str = "persistent_geofences_ids";

/// Prefix of per-id spec keys
pub const PERSISTENT_GEOFENCE_PREFIX: &str = "persistent_geofence/";

/// Storage key of the serialized spec for `id`
pub fn persistent_geofence_key(id: &str) -> String {
    format!("{PERSISTENT_GEOFENCE_PREFIX}{id}")
}

// ============================================================================
// Integrity Gaps
// ============================================================================

/// Why a tracked id could not be restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapKind {
    /// The id is tracked but has no stored spec
    MissingEntry,
    /// The stored spec does not decode
    Unreadable(String),
}

/// A tracked id without a usable spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityGap {
    pub id: String,
    pub kind: GapKind,
}

impl std::fmt::Display for IntegrityGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            GapKind::MissingEntry => write!(f, "geofence '{}' has no stored spec", self.id),
            GapKind::Unreadable(reason) => {
                write!(f, "geofence '{}' has an unreadable spec: {reason}", self.id)
            }
        }
    }
}

/// Everything recovery needs, read under one lock acquisition
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    /// Specs that decoded successfully
    pub specs: Vec<GeofenceSpec>,
    /// Tracked ids that could not be restored
    pub gaps: Vec<IntegrityGap>,
}

impl CacheSnapshot {
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty() && self.gaps.is_empty()
    }
}

// ============================================================================
// Geofence Cache
// ============================================================================

/// Lock-guarded cache of registered geofences
pub struct GeofenceCache {
    store: Mutex<Box<dyn KeyValueStore>>,
}

impl GeofenceCache {
    /// Wrap a backing store
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
        }
    }

    /// Insert or overwrite the spec for `spec.id` and track the id
    pub async fn put(&self, spec: &GeofenceSpec) -> StorageResult<()> {
        let key = persistent_geofence_key(&spec.id);
        let serialized = spec.to_json().map_err(|e| StorageError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;

        let mut store = self.store.lock().await;
        let mut ids = store
            .get_string_set(PERSISTENT_GEOFENCES_IDS_KEY)?
            .unwrap_or_default();
        ids.insert(spec.id.clone());

        store.apply(
            StoreEdit::new()
                .put_string_set(PERSISTENT_GEOFENCES_IDS_KEY, ids)
                .put_string(key, serialized),
        )?;

        tracing::debug!(id = %spec.id, "Geofence cached");
        Ok(())
    }

    /// Read the spec stored for `id`
    pub async fn get(&self, id: &str) -> StorageResult<Option<GeofenceSpec>> {
        let key = persistent_geofence_key(id);
        let store = self.store.lock().await;

        match store.get_string(&key)? {
            None => Ok(None),
            Some(text) => GeofenceSpec::from_json(&text)
                .map(Some)
                .map_err(|e| StorageError::Serialization {
                    key,
                    reason: e.to_string(),
                }),
        }
    }

    /// Stop tracking `id` and drop its spec
    pub async fn remove(&self, id: &str) -> StorageResult<()> {
        let mut store = self.store.lock().await;
        let mut edit = StoreEdit::new().remove(persistent_geofence_key(id));

        if let Some(mut ids) = store.get_string_set(PERSISTENT_GEOFENCES_IDS_KEY)? {
            ids.remove(id);
            edit = edit.put_string_set(PERSISTENT_GEOFENCES_IDS_KEY, ids);
        }

        store.apply(edit)?;

        tracing::debug!(id = %id, "Geofence evicted from cache");
        Ok(())
    }

    /// Currently tracked ids
    pub async fn list_ids(&self) -> StorageResult<HashSet<String>> {
        let store = self.store.lock().await;
        Ok(store
            .get_string_set(PERSISTENT_GEOFENCES_IDS_KEY)?
            .unwrap_or_default())
    }

    /// Read every tracked spec, collecting ids that cannot be restored
    pub async fn snapshot(&self) -> StorageResult<CacheSnapshot> {
        let store = self.store.lock().await;
        let Some(ids) = store.get_string_set(PERSISTENT_GEOFENCES_IDS_KEY)? else {
            return Ok(CacheSnapshot::default());
        };

        let mut ids: Vec<String> = ids.into_iter().collect();
        ids.sort();

        let mut snapshot = CacheSnapshot::default();
        for id in ids {
            let raw = match store.get_string(&persistent_geofence_key(&id)) {
                Ok(raw) => raw,
                Err(e) => {
                    snapshot.gaps.push(IntegrityGap {
                        id,
                        kind: GapKind::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };

            match raw.map(|text| GeofenceSpec::from_json(&text)) {
                None => snapshot.gaps.push(IntegrityGap {
                    id,
                    kind: GapKind::MissingEntry,
                }),
                Some(Err(e)) => snapshot.gaps.push(IntegrityGap {
                    id,
                    kind: GapKind::Unreadable(e.to_string()),
                }),
                Some(Ok(spec)) => snapshot.specs.push(spec),
            }
        }

        Ok(snapshot)
    }

    /// Overwrite the process-wide dispatcher token
    pub async fn set_dispatcher_token(&self, token: i64) -> StorageResult<()> {
        let mut store = self.store.lock().await;
        store.apply(StoreEdit::new().put_i64(CALLBACK_DISPATCHER_HANDLE_KEY, token))
    }

    /// Read the dispatcher token, if initialized
    pub async fn dispatcher_token(&self) -> StorageResult<Option<i64>> {
        let store = self.store.lock().await;
        store.get_i64(CALLBACK_DISPATCHER_HANDLE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn seeded_store(ids: &[&str], specs: &[GeofenceSpec]) -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut edit = StoreEdit::new().put_string_set(
            PERSISTENT_GEOFENCES_IDS_KEY,
            ids.iter().map(|s| s.to_string()).collect(),
        );
        for spec in specs {
            edit = edit.put_string(persistent_geofence_key(&spec.id), spec.to_json().unwrap());
        }
        store.apply(edit).unwrap();
        store
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(persistent_geofence_key("gf1"), "persistent_geofence/gf1");
    }

    #[tokio::test]
    async fn test_put_tracks_id_and_spec() {
        let cache = GeofenceCache::new(MemoryStore::new());
        let spec = GeofenceSpec::new("gf1", 37.0, -122.0, 100.0);

        cache.put(&spec).await.unwrap();

        assert_eq!(cache.list_ids().await.unwrap().len(), 1);
        assert_eq!(cache.get("gf1").await.unwrap(), Some(spec));
    }

    #[tokio::test]
    async fn test_put_same_id_overwrites() {
        let cache = GeofenceCache::new(MemoryStore::new());
        cache
            .put(&GeofenceSpec::new("gf1", 1.0, 2.0, 50.0))
            .await
            .unwrap();
        let newer = GeofenceSpec::new("gf1", 3.0, 4.0, 75.0).with_callback_token(9);
        cache.put(&newer).await.unwrap();

        let ids = cache.list_ids().await.unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(cache.get("gf1").await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn test_remove_drops_both_views() {
        let cache = GeofenceCache::new(MemoryStore::new());
        cache
            .put(&GeofenceSpec::new("gf1", 1.0, 2.0, 50.0))
            .await
            .unwrap();
        cache
            .put(&GeofenceSpec::new("gf2", 1.0, 2.0, 50.0))
            .await
            .unwrap();

        cache.remove("gf1").await.unwrap();

        let ids = cache.list_ids().await.unwrap();
        assert!(!ids.contains("gf1"));
        assert!(ids.contains("gf2"));
        assert!(cache.get("gf1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_untracked_is_noop() {
        let cache = GeofenceCache::new(MemoryStore::new());
        cache.remove("nope").await.unwrap();
        assert!(cache.list_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_reports_gaps() {
        let good = GeofenceSpec::new("good", 1.0, 1.0, 10.0);
        let mut store = seeded_store(&["good", "missing", "garbled"], &[good.clone()]);
        store
            .apply(StoreEdit::new().put_string(persistent_geofence_key("garbled"), "{oops"))
            .unwrap();

        let cache = GeofenceCache::new(store);
        let snapshot = cache.snapshot().await.unwrap();

        assert_eq!(snapshot.specs, vec![good]);
        assert_eq!(snapshot.gaps.len(), 2);
        assert!(snapshot
            .gaps
            .iter()
            .any(|g| g.id == "missing" && g.kind == GapKind::MissingEntry));
        assert!(snapshot
            .gaps
            .iter()
            .any(|g| g.id == "garbled" && matches!(g.kind, GapKind::Unreadable(_))));
    }

    #[tokio::test]
    async fn test_snapshot_of_empty_cache() {
        let cache = GeofenceCache::new(MemoryStore::new());
        assert!(cache.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatcher_token_overwrite() {
        let cache = GeofenceCache::new(MemoryStore::new());
        assert_eq!(cache.dispatcher_token().await.unwrap(), None);

        cache.set_dispatcher_token(42).await.unwrap();
        cache.set_dispatcher_token(7).await.unwrap();
        assert_eq!(cache.dispatcher_token().await.unwrap(), Some(7));
    }
}
