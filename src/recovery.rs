//! Reboot recovery
//!
//! Providers forget their geofences when the device restarts. On the boot
//! signal every cached registration is replayed through the coordinator
//! without re-persisting it. The cache is read once under its lock; the
//! replays run after the lock is released.

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::cache::IntegrityGap;
use crate::coordinator::{CoordinatorResult, FailureKind, GeofenceCoordinator};
use crate::metrics;

/// A cached geofence whose replay failed on every provider
#[derive(Debug)]
pub struct ReplayFailure {
    pub id: String,
    pub error: FailureKind,
}

/// Outcome of one recovery pass
#[derive(Debug)]
pub struct RecoveryReport {
    /// When the pass began
    pub started_at: DateTime<Utc>,
    /// Ids re-registered with a provider
    pub replayed: Vec<String>,
    /// Ids every provider refused
    pub failed: Vec<ReplayFailure>,
    /// Tracked ids skipped for lack of a usable spec
    pub gaps: Vec<IntegrityGap>,
}

impl RecoveryReport {
    /// Number of cached registrations found, replayable or not
    pub fn total(&self) -> usize {
        self.replayed.len() + self.failed.len() + self.gaps.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.gaps.is_empty()
    }
}

/// Re-register every cached geofence after a reboot
///
/// Integrity gaps and individual replay failures are logged and reported;
/// they never abort the pass. Only a failure to read the cache is an error.
pub async fn recover(coordinator: &GeofenceCoordinator) -> CoordinatorResult<RecoveryReport> {
    let mut report = RecoveryReport {
        started_at: Utc::now(),
        replayed: Vec::new(),
        failed: Vec::new(),
        gaps: Vec::new(),
    };
    let snapshot = coordinator.cache().snapshot().await?;

    if snapshot.is_empty() {
        tracing::debug!("No cached geofences to recover");
        return Ok(report);
    }

    for gap in &snapshot.gaps {
        tracing::warn!(id = %gap.id, "Skipping cached geofence: {gap}");
    }
    report.gaps = snapshot.gaps;

    let replays = snapshot
        .specs
        .iter()
        .map(|spec| async move { (spec.id.clone(), coordinator.register(spec, false).await) });

    for (id, result) in join_all(replays).await {
        match result {
            Ok(_) => report.replayed.push(id),
            Err(error) => {
                tracing::error!(id = %id, error = %error, "Failed to re-register geofence after reboot");
                report.failed.push(ReplayFailure { id, error });
            }
        }
    }

    metrics::record_recovery(report.replayed.len(), report.failed.len(), report.gaps.len());
    tracing::info!(
        replayed = report.replayed.len(),
        failed = report.failed.len(),
        skipped = report.gaps.len(),
        "Geofence recovery finished"
    );

    Ok(report)
}
