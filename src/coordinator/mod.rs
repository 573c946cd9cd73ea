//! Geofence registration coordinator
//!
//! The coordinator submits add/remove requests to an ordered list of
//! providers, moving on to the next provider whenever one fails and stopping
//! at the first success. On success it updates the persistent cache.
//!
//! # Failover
//!
//! Every failure is treated the same: a provider rejection, a transport
//! error and (when a timeout is configured) a provider that never completes
//! all move the request to the next provider. Only the last provider's
//! failure reaches the caller. There is no backoff and no second pass over
//! the list.
//!
//! # Concurrency
//!
//! The cache lock is taken only inside the cache mutation that follows a
//! provider success, never across a provider call. Requests for different
//! ids run their provider calls concurrently. Two racing requests for the
//! same id are not ordered: whichever completes last decides the cached
//! state.

pub mod error;

pub use error::{CoordinatorResult, FailureKind};

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::GeofenceCache;
use crate::config::CoordinatorConfig;
use crate::metrics;
use crate::models::GeofenceSpec;
use crate::provider::{GeofenceProvider, PendingCallback};

// ============================================================================
// Supporting Types
// ============================================================================

/// Location permission check owned by the host platform
pub trait PermissionGate: Send + Sync {
    fn has_location_permission(&self) -> bool;
}

/// Coordinator request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Unregister,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Unregister => "unregister",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful completion of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Provider that accepted the request
    pub provider: String,
    /// Providers tried, including the one that succeeded
    pub attempts: usize,
}

impl Ack {
    /// Whether an earlier provider failed first
    pub fn failed_over(&self) -> bool {
        self.attempts > 1
    }
}

enum ProviderCall<'a> {
    Add {
        spec: &'a GeofenceSpec,
        callback: PendingCallback,
    },
    Remove {
        ids: &'a [String],
    },
}

// ============================================================================
// Coordinator
// ============================================================================

/// Orchestrates provider failover and cache updates
pub struct GeofenceCoordinator {
    providers: Vec<Arc<dyn GeofenceProvider>>,
    cache: Arc<GeofenceCache>,
    permission_gate: Option<Arc<dyn PermissionGate>>,
    provider_timeout: Option<Duration>,
}

impl GeofenceCoordinator {
    /// Create a coordinator trying `providers` in order
    pub fn new(cache: Arc<GeofenceCache>, providers: Vec<Arc<dyn GeofenceProvider>>) -> Self {
        Self {
            providers,
            cache,
            permission_gate: None,
            provider_timeout: None,
        }
    }

    /// Create a coordinator with settings from configuration
    pub fn from_config(
        config: &CoordinatorConfig,
        cache: Arc<GeofenceCache>,
        providers: Vec<Arc<dyn GeofenceProvider>>,
    ) -> Self {
        let coordinator = Self::new(cache, providers);
        match config.provider_timeout() {
            Some(timeout) => coordinator.with_timeout(timeout),
            None => coordinator,
        }
    }

    /// Bound each provider call; an elapsed call counts as a failure
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    /// Check the location permission before registering
    pub fn with_permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.permission_gate = Some(gate);
        self
    }

    pub fn cache(&self) -> &Arc<GeofenceCache> {
        &self.cache
    }

    /// Provider names in failover order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout
    }

    /// Store the dispatcher token, replacing any previous one
    pub async fn initialize(&self, dispatcher_token: i64) -> CoordinatorResult<()> {
        tracing::debug!(dispatcher_token, "Initializing geofencing service");
        self.cache.set_dispatcher_token(dispatcher_token).await?;
        Ok(())
    }

    pub async fn dispatcher_token(&self) -> CoordinatorResult<Option<i64>> {
        Ok(self.cache.dispatcher_token().await?)
    }

    /// Register `spec` with the first provider that accepts it
    ///
    /// With `persist` the spec is upserted into the cache after success.
    /// A failed registration never touches the cache.
    pub async fn register(&self, spec: &GeofenceSpec, persist: bool) -> CoordinatorResult<Ack> {
        let operation = Operation::Register;

        if let Some(gate) = &self.permission_gate {
            if !gate.has_location_permission() {
                let failure = FailureKind::PermissionDenied {
                    operation: "registerGeofence",
                };
                tracing::warn!(id = %spec.id, "{failure}");
                metrics::record_request(operation.as_str(), failure.code());
                return Err(failure);
            }
        }

        let call = ProviderCall::Add {
            spec,
            callback: PendingCallback::for_spec(spec),
        };
        let ack = self.submit(operation, &spec.id, call).await?;

        if persist {
            if let Err(e) = self.cache.put(spec).await {
                tracing::error!(id = %spec.id, error = %e, "Geofence registered but not cached");
                metrics::record_request(operation.as_str(), "storage");
                return Err(e.into());
            }
            self.refresh_tracked_gauge().await;
        }

        metrics::record_request(operation.as_str(), "success");
        Ok(ack)
    }

    /// Remove `id` from the first provider that accepts the request
    pub async fn unregister(&self, id: &str) -> CoordinatorResult<Ack> {
        let operation = Operation::Unregister;
        let ids = [id.to_string()];

        let ack = self
            .submit(operation, id, ProviderCall::Remove { ids: &ids })
            .await?;

        if let Err(e) = self.cache.remove(id).await {
            tracing::error!(id = %id, error = %e, "Geofence removed but still cached");
            metrics::record_request(operation.as_str(), "storage");
            return Err(e.into());
        }
        self.refresh_tracked_gauge().await;

        metrics::record_request(operation.as_str(), "success");
        Ok(ack)
    }

    /// Ids of every persisted registration
    pub async fn list_registered_ids(&self) -> CoordinatorResult<HashSet<String>> {
        Ok(self.cache.list_ids().await?)
    }

    /// Persisted spec for `id`
    pub async fn registered_spec(&self, id: &str) -> CoordinatorResult<Option<GeofenceSpec>> {
        Ok(self.cache.get(id).await?)
    }

    async fn submit(
        &self,
        operation: Operation,
        id: &str,
        call: ProviderCall<'_>,
    ) -> CoordinatorResult<Ack> {
        let total = self.providers.len();
        let mut last_failure = None;

        for (index, provider) in self.providers.iter().enumerate() {
            if index > 0 {
                metrics::record_failover(operation.as_str());
            }

            let started = Instant::now();
            let outcome = self.invoke(provider.as_ref(), &call).await;
            let elapsed = started.elapsed().as_secs_f64();

            match outcome {
                Ok(()) => {
                    metrics::record_provider_attempt(
                        provider.name(),
                        operation.as_str(),
                        "success",
                        elapsed,
                    );
                    tracing::info!(
                        id = %id,
                        provider = %provider.name(),
                        operation = %operation,
                        attempts = index + 1,
                        "Geofence request accepted"
                    );
                    return Ok(Ack {
                        provider: provider.name().to_string(),
                        attempts: index + 1,
                    });
                }
                Err(failure) => {
                    metrics::record_provider_attempt(
                        provider.name(),
                        operation.as_str(),
                        failure.code(),
                        elapsed,
                    );
                    if index + 1 < total {
                        tracing::warn!(
                            id = %id,
                            provider = %provider.name(),
                            operation = %operation,
                            error = %failure,
                            "Provider failed, retrying with next provider"
                        );
                    } else {
                        tracing::error!(
                            id = %id,
                            provider = %provider.name(),
                            operation = %operation,
                            error = %failure,
                            "Geofence request failed on every provider"
                        );
                    }
                    last_failure = Some(failure);
                }
            }
        }

        let failure = last_failure.unwrap_or(FailureKind::NoProviders);
        metrics::record_request(operation.as_str(), failure.code());
        Err(failure)
    }

    async fn invoke(
        &self,
        provider: &dyn GeofenceProvider,
        call: &ProviderCall<'_>,
    ) -> CoordinatorResult<()> {
        let pending = async {
            match call {
                ProviderCall::Add { spec, callback } => provider.add_geofences(spec, callback).await,
                ProviderCall::Remove { ids } => provider.remove_geofences(ids).await,
            }
        };

        let result = match self.provider_timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(FailureKind::Timeout {
                        provider: provider.name().to_string(),
                        timeout: limit,
                    })
                }
            },
            None => pending.await,
        };

        result.map_err(|e| FailureKind::ProviderRejected {
            provider: provider.name().to_string(),
            message: e.to_string(),
        })
    }

    async fn refresh_tracked_gauge(&self) {
        if !metrics::metrics_initialized() {
            return;
        }
        if let Ok(ids) = self.cache.list_ids().await {
            metrics::set_tracked_geofences(ids.len());
        }
    }
}
