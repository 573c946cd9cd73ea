//! Secondary provider adapter
//!
//! The secondary vendor names the same concepts differently: a geofence is
//! a round area keyed by `unique_id`, transitions are "conversions", the
//! lifetime is a valid-continue-time and the dwell delay and responsiveness
//! are a dwell delay time and notification interval.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{GeofenceProvider, PendingCallback, ProviderResult};
use crate::models::GeofenceSpec;

/// Round-area geofence in the secondary vendor's shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundGeofence {
    pub unique_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f32,
    pub conversions: i32,
    pub valid_continue_time_ms: i64,
    pub dwell_delay_time_ms: i32,
    pub notification_interval_ms: i32,
}

/// Create-list request submitted to the secondary vendor SDK
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceListRequest {
    pub init_conversions: i32,
    pub geofences: Vec<RoundGeofence>,
}

impl From<&GeofenceSpec> for GeofenceListRequest {
    fn from(spec: &GeofenceSpec) -> Self {
        Self {
            init_conversions: spec.initial_triggers.bits(),
            geofences: vec![RoundGeofence {
                unique_id: spec.id.clone(),
                latitude: spec.center.latitude,
                longitude: spec.center.longitude,
                radius: spec.radius_meters,
                conversions: spec.transition_triggers.bits(),
                valid_continue_time_ms: spec.expiration.as_millis(),
                dwell_delay_time_ms: spec.loitering_delay_ms,
                notification_interval_ms: spec.notification_responsiveness_ms,
            }],
        }
    }
}

/// Binding to the secondary vendor SDK
#[async_trait]
pub trait SecondaryBackend: Send + Sync {
    async fn create_geofence_list(
        &self,
        request: GeofenceListRequest,
        callback: PendingCallback,
    ) -> ProviderResult<()>;

    async fn delete_geofence_list(&self, unique_ids: Vec<String>) -> ProviderResult<()>;
}

/// [`GeofenceProvider`] over a [`SecondaryBackend`]
pub struct SecondaryProvider<B> {
    name: String,
    backend: B,
}

impl<B: SecondaryBackend> SecondaryProvider<B> {
    pub fn new(backend: B) -> Self {
        Self {
            name: "secondary".to_string(),
            backend,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: SecondaryBackend> GeofenceProvider for SecondaryProvider<B> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_geofences(
        &self,
        spec: &GeofenceSpec,
        callback: &PendingCallback,
    ) -> ProviderResult<()> {
        let request = GeofenceListRequest::from(spec);
        tracing::trace!(provider = %self.name, request = ?request, "Submitting geofence list request");
        self.backend.create_geofence_list(request, *callback).await
    }

    async fn remove_geofences(&self, ids: &[String]) -> ProviderResult<()> {
        self.backend.delete_geofence_list(ids.to_vec()).await
    }
}
