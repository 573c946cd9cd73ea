//! Geofencing provider adapters
//!
//! A provider is a vendor location service that monitors geofences on the
//! device. The coordinator only sees the narrow [`GeofenceProvider`]
//! capability; each adapter re-encodes a [`GeofenceSpec`] into its vendor's
//! native request shape and hands it to a backend SDK binding.

pub mod primary;
pub mod secondary;

pub use primary::{CircularGeofence, GeofencingRequest, PrimaryBackend, PrimaryProvider};
pub use secondary::{GeofenceListRequest, RoundGeofence, SecondaryBackend, SecondaryProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::GeofenceSpec;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure signalled by a provider's completion callback
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Service missing or disabled on this device
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Provider refused the request
    #[error("Provider rejected request{}: {message}", .code.map(|c| format!(" (code {c})")).unwrap_or_default())]
    Rejected { code: Option<i32>, message: String },

    /// Binder/IPC/network failure reaching the provider
    #[error("Provider transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    pub fn rejected(code: i32, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// Reference the provider fires when a geofence transition occurs
///
/// Carries the callback token so the event dispatcher can route the
/// transition to the handler registered with the geofence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingCallback {
    pub callback_token: i64,
}

impl PendingCallback {
    pub fn for_spec(spec: &GeofenceSpec) -> Self {
        Self {
            callback_token: spec.callback_token,
        }
    }
}

/// Uniform capability over a vendor geofencing backend
#[async_trait]
pub trait GeofenceProvider: Send + Sync {
    /// Provider name used in logs, metrics and diagnostics
    fn name(&self) -> &str;

    /// Start monitoring `spec`, firing `callback` on transitions
    async fn add_geofences(
        &self,
        spec: &GeofenceSpec,
        callback: &PendingCallback,
    ) -> ProviderResult<()>;

    /// Stop monitoring the given ids
    async fn remove_geofences(&self, ids: &[String]) -> ProviderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display() {
        let err = ProviderError::rejected(1000, "GEOFENCE_NOT_AVAILABLE");
        assert_eq!(
            err.to_string(),
            "Provider rejected request (code 1000): GEOFENCE_NOT_AVAILABLE"
        );

        let err = ProviderError::Rejected {
            code: None,
            message: "too many geofences".to_string(),
        };
        assert_eq!(err.to_string(), "Provider rejected request: too many geofences");
    }

    #[test]
    fn test_pending_callback_from_spec() {
        let spec = GeofenceSpec::new("gf", 0.0, 0.0, 1.0).with_callback_token(99);
        assert_eq!(PendingCallback::for_spec(&spec).callback_token, 99);
    }
}
