//! geofencing - Geofence registration coordinator
//!
//! Registers geofences with vendor location providers, failing over from
//! one provider to the next, and keeps a persistent cache of registrations
//! so they can be replayed after a device reboot.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`] - Geofence spec and its fixed argument layout
//! - [`storage`] - Durable key-value stores (SQLite, in-memory)
//! - [`cache`] - Lock-guarded cache of registered geofences
//! - [`provider`] - Provider capability and vendor adapters
//! - [`coordinator`] - Failover protocol and cache updates
//! - [`recovery`] - Reboot replay of cached registrations
//! - [`channel`] - Inbound method-call decoding and dispatch
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use geofencing::cache::GeofenceCache;
//! use geofencing::coordinator::GeofenceCoordinator;
//! use geofencing::models::GeofenceSpec;
//! use geofencing::storage::MemoryStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = Arc::new(GeofenceCache::new(MemoryStore::new()));
//! let coordinator = GeofenceCoordinator::new(cache, Vec::new());
//!
//! coordinator.initialize(42).await?;
//! let spec = GeofenceSpec::new("home", 37.0, -122.0, 100.0);
//! // With no providers configured this fails with `FailureKind::NoProviders`.
//! let _ = coordinator.register(&spec, true).await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod recovery;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::GeofenceCache;
    pub use crate::config::Config;
    pub use crate::coordinator::{Ack, FailureKind, GeofenceCoordinator, PermissionGate};
    pub use crate::error::{Error, ErrorCategory, GeofenceErrorTrait, Result};
    pub use crate::models::{Expiration, GeofenceSpec, LatLng, TriggerMask};
    pub use crate::provider::{GeofenceProvider, PendingCallback, ProviderError};
    pub use crate::recovery::{recover, RecoveryReport};
    pub use crate::storage::{KeyValueStore, MemoryStore, SqliteStore};
}

pub use models::{Expiration, GeofenceSpec, LatLng, TriggerMask};
