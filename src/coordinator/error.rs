//! Failure kinds surfaced by the registration coordinator

use std::time::Duration;
use thiserror::Error;

use crate::storage::StorageError;

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, FailureKind>;

/// Terminal failure of a coordinator request
///
/// Provider failures are absorbed by failover; only the outcome of the last
/// provider in the chain reaches the caller.
#[derive(Error, Debug)]
pub enum FailureKind {
    /// Caller lacks the location permission
    #[error("'{operation}' requires the ACCESS_FINE_LOCATION permission.")]
    PermissionDenied { operation: &'static str },

    /// Every provider failed; carries the last provider's diagnostic
    #[error("{message}")]
    ProviderRejected { provider: String, message: String },

    /// The last provider never signalled completion within the bound
    #[error("Provider '{provider}' did not complete within {}ms", .timeout.as_millis())]
    Timeout { provider: String, timeout: Duration },

    /// Coordinator was built without providers
    #[error("No geofence providers configured")]
    NoProviders,

    /// Persistent cache read or write failed
    #[error("Geofence cache error: {0}")]
    Storage(#[from] StorageError),
}

impl FailureKind {
    /// Stable short code for the method-call error channel
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "permission_denied",
            Self::ProviderRejected { .. } => "provider_rejected",
            Self::Timeout { .. } => "timeout",
            Self::NoProviders => "no_providers",
            Self::Storage(_) => "storage",
        }
    }
}
