//! Primary provider adapter
//!
//! Encodes a spec into the primary vendor's builder-style request: one
//! circular geofence keyed by `request_id`, wrapped in a request carrying
//! the initial trigger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{GeofenceProvider, PendingCallback, ProviderResult};
use crate::models::GeofenceSpec;

/// Circular region in the primary vendor's shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularGeofence {
    pub request_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f32,
    pub transition_types: i32,
    pub loitering_delay_ms: i32,
    pub notification_responsiveness_ms: i32,
    pub expiration_duration_ms: i64,
}

/// Add request submitted to the primary vendor SDK
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofencingRequest {
    pub initial_trigger: i32,
    pub geofences: Vec<CircularGeofence>,
}

impl From<&GeofenceSpec> for GeofencingRequest {
    fn from(spec: &GeofenceSpec) -> Self {
        Self {
            initial_trigger: spec.initial_triggers.bits(),
            geofences: vec![CircularGeofence {
                request_id: spec.id.clone(),
                latitude: spec.center.latitude,
                longitude: spec.center.longitude,
                radius: spec.radius_meters,
                transition_types: spec.transition_triggers.bits(),
                loitering_delay_ms: spec.loitering_delay_ms,
                notification_responsiveness_ms: spec.notification_responsiveness_ms,
                expiration_duration_ms: spec.expiration.as_millis(),
            }],
        }
    }
}

/// Binding to the primary vendor SDK
#[async_trait]
pub trait PrimaryBackend: Send + Sync {
    async fn add_geofences(
        &self,
        request: GeofencingRequest,
        callback: PendingCallback,
    ) -> ProviderResult<()>;

    async fn remove_geofences(&self, request_ids: Vec<String>) -> ProviderResult<()>;
}

/// [`GeofenceProvider`] over a [`PrimaryBackend`]
pub struct PrimaryProvider<B> {
    name: String,
    backend: B,
}

impl<B: PrimaryBackend> PrimaryProvider<B> {
    pub fn new(backend: B) -> Self {
        Self {
            name: "primary".to_string(),
            backend,
        }
    }

    /// Override the name reported in logs and metrics
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: PrimaryBackend> GeofenceProvider for PrimaryProvider<B> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_geofences(
        &self,
        spec: &GeofenceSpec,
        callback: &PendingCallback,
    ) -> ProviderResult<()> {
        let request = GeofencingRequest::from(spec);
        tracing::trace!(provider = %self.name, request = ?request, "Submitting geofencing request");
        self.backend.add_geofences(request, *callback).await
    }

    async fn remove_geofences(&self, ids: &[String]) -> ProviderResult<()> {
        self.backend.remove_geofences(ids.to_vec()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Expiration, TriggerMask};
    use crate::provider::ProviderError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        added: Mutex<Vec<(GeofencingRequest, PendingCallback)>>,
        removed: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl PrimaryBackend for RecordingBackend {
        async fn add_geofences(
            &self,
            request: GeofencingRequest,
            callback: PendingCallback,
        ) -> ProviderResult<()> {
            self.added.lock().unwrap().push((request, callback));
            if self.fail {
                Err(ProviderError::rejected(1000, "GEOFENCE_NOT_AVAILABLE"))
            } else {
                Ok(())
            }
        }

        async fn remove_geofences(&self, request_ids: Vec<String>) -> ProviderResult<()> {
            self.removed.lock().unwrap().push(request_ids);
            Ok(())
        }
    }

    #[test]
    fn test_request_encoding() {
        let spec = GeofenceSpec::new("office", 52.5, 13.4, 250.0)
            .with_triggers(TriggerMask::DWELL, TriggerMask::ENTER)
            .with_expiration(Expiration::After(60_000))
            .with_loitering_delay_ms(1_000)
            .with_notification_responsiveness_ms(2_000);

        let request = GeofencingRequest::from(&spec);
        assert_eq!(request.initial_trigger, 1);
        assert_eq!(request.geofences.len(), 1);

        let fence = &request.geofences[0];
        assert_eq!(fence.request_id, "office");
        assert_eq!(fence.radius, 250.0);
        assert_eq!(fence.transition_types, 4);
        assert_eq!(fence.expiration_duration_ms, 60_000);
        assert_eq!(fence.loitering_delay_ms, 1_000);
        assert_eq!(fence.notification_responsiveness_ms, 2_000);
    }

    #[tokio::test]
    async fn test_adapter_forwards_to_backend() {
        let provider = PrimaryProvider::new(RecordingBackend::default());
        let spec = GeofenceSpec::new("gf", 1.0, 2.0, 3.0).with_callback_token(5);

        provider
            .add_geofences(&spec, &PendingCallback::for_spec(&spec))
            .await
            .unwrap();
        provider.remove_geofences(&["gf".to_string()]).await.unwrap();

        let added = provider.backend().added.lock().unwrap();
        assert_eq!(added[0].1.callback_token, 5);
        assert_eq!(provider.backend().removed.lock().unwrap()[0], vec!["gf"]);
        assert_eq!(provider.name(), "primary");
    }

    #[tokio::test]
    async fn test_adapter_surfaces_backend_failure() {
        let provider = PrimaryProvider::new(RecordingBackend {
            fail: true,
            ..Default::default()
        })
        .with_name("play-services");
        let spec = GeofenceSpec::new("gf", 1.0, 2.0, 3.0);

        let result = provider
            .add_geofences(&spec, &PendingCallback::for_spec(&spec))
            .await;
        assert!(matches!(result, Err(ProviderError::Rejected { code: Some(1000), .. })));
        assert_eq!(provider.name(), "play-services");
    }
}
