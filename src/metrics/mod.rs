//! Prometheus metrics for geofence registration
//!
//! Tracks provider attempts, failovers, terminal request outcomes, the number
//! of tracked geofences and reboot recovery results.
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! Until then (or if registration fails) every recording call is a no-op.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

struct GeofenceMetrics {
    provider_attempts: CounterVec,
    provider_duration: HistogramVec,
    failovers: CounterVec,
    requests: CounterVec,
    tracked_geofences: Gauge,
    recovery_replayed: Counter,
    recovery_failed: Counter,
    recovery_gaps: Counter,
}

static METRICS: OnceLock<GeofenceMetrics> = OnceLock::new();

static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Register all metrics with the default Prometheus registry
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = GeofenceMetrics {
        provider_attempts: register_counter_vec!(
            "geofencing_provider_attempts_total",
            "Provider calls by provider, operation and outcome",
            &["provider", "operation", "outcome"]
        )?,
        provider_duration: register_histogram_vec!(
            "geofencing_provider_call_duration_seconds",
            "Time until a provider signalled completion",
            &["provider", "operation"],
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
        failovers: register_counter_vec!(
            "geofencing_failovers_total",
            "Requests retried on a later provider after a failure",
            &["operation"]
        )?,
        requests: register_counter_vec!(
            "geofencing_requests_total",
            "Terminal request outcomes by operation and status",
            &["operation", "status"]
        )?,
        tracked_geofences: register_gauge!(
            "geofencing_tracked_geofences",
            "Number of geofences in the persistent cache"
        )?,
        recovery_replayed: register_counter!(
            "geofencing_recovery_replayed_total",
            "Geofences re-registered after reboot"
        )?,
        recovery_failed: register_counter!(
            "geofencing_recovery_failed_total",
            "Geofences that failed re-registration after reboot"
        )?,
        recovery_gaps: register_counter!(
            "geofencing_recovery_integrity_gaps_total",
            "Tracked ids skipped during recovery for lack of a usable spec"
        )?,
    };

    METRICS
        .set(metrics)
        .map_err(|_| "Geofencing metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

pub fn metrics_initialized() -> bool {
    METRICS.get().is_some()
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

// ============================================================================
// Recording
// ============================================================================

/// Record one provider call
pub fn record_provider_attempt(provider: &str, operation: &str, outcome: &str, duration_secs: f64) {
    let Some(m) = METRICS.get() else {
        return;
    };

    m.provider_attempts
        .with_label_values(&[provider, operation, outcome])
        .inc();
    m.provider_duration
        .with_label_values(&[provider, operation])
        .observe(duration_secs);
}

pub fn record_failover(operation: &str) {
    if let Some(m) = METRICS.get() {
        m.failovers.with_label_values(&[operation]).inc();
    }
}

/// Record the final outcome of a coordinator request
pub fn record_request(operation: &str, status: &str) {
    if let Some(m) = METRICS.get() {
        m.requests.with_label_values(&[operation, status]).inc();
    }
}

pub fn set_tracked_geofences(count: usize) {
    if let Some(m) = METRICS.get() {
        m.tracked_geofences.set(count as f64);
    }
}

/// Record the results of one recovery pass
pub fn record_recovery(replayed: usize, failed: usize, gaps: usize) {
    let Some(m) = METRICS.get() else {
        return;
    };

    m.recovery_replayed.inc_by(replayed as f64);
    m.recovery_failed.inc_by(failed as f64);
    m.recovery_gaps.inc_by(gaps as f64);
}
