//! Common test utilities

use async_trait::async_trait;
use geofencing::cache::GeofenceCache;
use geofencing::coordinator::GeofenceCoordinator;
use geofencing::models::{Expiration, GeofenceSpec, TriggerMask};
use geofencing::provider::{GeofenceProvider, PendingCallback, ProviderError, ProviderResult};
use geofencing::storage::MemoryStore;
use std::sync::{Arc, Mutex};

/// Provider with a fixed outcome that records every call
pub struct ScriptedProvider {
    name: String,
    failure: Option<ProviderError>,
    added: Mutex<Vec<(GeofenceSpec, PendingCallback)>>,
    removed: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn succeeding(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            failure: None,
            added: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str, failure: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            failure: Some(failure),
            added: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        })
    }

    #[allow(dead_code)]
    pub fn added(&self) -> Vec<(GeofenceSpec, PendingCallback)> {
        self.added.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn removed(&self) -> Vec<Vec<String>> {
        self.removed.lock().unwrap().clone()
    }

    fn outcome(&self) -> ProviderResult<()> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GeofenceProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_geofences(
        &self,
        spec: &GeofenceSpec,
        callback: &PendingCallback,
    ) -> ProviderResult<()> {
        self.added.lock().unwrap().push((spec.clone(), *callback));
        self.outcome()
    }

    async fn remove_geofences(&self, ids: &[String]) -> ProviderResult<()> {
        self.removed.lock().unwrap().push(ids.to_vec());
        self.outcome()
    }
}

/// Upcast scripted providers into a failover list
pub fn provider_list(providers: &[&Arc<ScriptedProvider>]) -> Vec<Arc<dyn GeofenceProvider>> {
    providers
        .iter()
        .map(|p| Arc::clone(*p) as Arc<dyn GeofenceProvider>)
        .collect()
}

/// Coordinator over an empty in-memory cache
#[allow(dead_code)]
pub fn coordinator_with(providers: &[&Arc<ScriptedProvider>]) -> GeofenceCoordinator {
    let cache = Arc::new(GeofenceCache::new(MemoryStore::new()));
    GeofenceCoordinator::new(cache, provider_list(providers))
}

/// A fully populated spec
#[allow(dead_code)]
pub fn create_test_spec(id: &str) -> GeofenceSpec {
    GeofenceSpec::new(id, 37.0, -122.0, 100.0)
        .with_callback_token(1234)
        .with_triggers(TriggerMask::ENTER | TriggerMask::EXIT, TriggerMask::ENTER)
        .with_expiration(Expiration::After(86_400_000))
        .with_loitering_delay_ms(60_000)
        .with_notification_responsiveness_ms(10_000)
}
