//! Health aggregation cycle
//!
//! Runs the probe set, rebuilds the shared health snapshot, and hands failed
//! components to the recovery coordinator on a detached task so a slow
//! recovery never stretches the poll cycle.

use crate::config::{MonitorConfig, OperatingMode};
use crate::monitoring::fallback::FallbackLogger;
use crate::monitoring::probes::ComponentProbe;
use crate::monitoring::recovery::RecoveryCoordinator;
use crate::monitoring::types::{HealthStatus, ProbeReport};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Aggregates probe results into the shared health snapshot
pub struct HealthAggregator {
    config: MonitorConfig,
    probes: Vec<Arc<dyn ComponentProbe>>,
    snapshot: Arc<RwLock<HealthStatus>>,
    recovery: Arc<RecoveryCoordinator>,
    fallback: Arc<FallbackLogger>,
}

impl HealthAggregator {
    pub fn new(
        config: MonitorConfig,
        probes: Vec<Arc<dyn ComponentProbe>>,
        recovery: Arc<RecoveryCoordinator>,
        fallback: Arc<FallbackLogger>,
    ) -> Self {
        Self {
            config,
            probes,
            snapshot: Arc::new(RwLock::new(HealthStatus::all_healthy())),
            recovery,
            fallback,
        }
    }

    /// Shared snapshot handle; readers clone, never hold the lock
    pub fn snapshot_handle(&self) -> Arc<RwLock<HealthStatus>> {
        Arc::clone(&self.snapshot)
    }

    /// Defensive copy of the latest snapshot
    pub fn current(&self) -> HealthStatus {
        self.snapshot.read().clone()
    }

    /// Run one full health-check cycle and return the new snapshot
    ///
    /// Simulated mode short-circuits before any probe runs: every cycle
    /// reports all components healthy so demos need no live infrastructure.
    pub async fn run_cycle(&self) -> HealthStatus {
        if self.config.mode == OperatingMode::Simulated {
            let status = HealthStatus::all_healthy();
            *self.snapshot.write() = status.clone();
            debug!("Simulated health check cycle, all components healthy");
            return status;
        }

        let started = Instant::now();
        let mut reports = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            reports.push(self.run_probe(probe.as_ref()).await);
        }

        let mut status = HealthStatus::all_healthy();
        for report in &reports {
            status.set_component(report.component, report.healthy);
            if !report.healthy {
                status.errors.push(report.error_message());
            }
        }
        status.overall = self
            .config
            .critical_components
            .iter()
            .all(|c| status.component(*c));
        status.last_check = chrono::Utc::now();

        // Replace, never merge: each cycle's snapshot stands alone
        *self.snapshot.write() = status.clone();

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if status.errors.is_empty() {
            debug!("Health check cycle completed in {}ms, all healthy", elapsed_ms);
        } else {
            warn!(
                "Health check cycle completed in {}ms with {} issue(s): {:?}",
                elapsed_ms,
                status.errors.len(),
                status.errors
            );
            // Probe failures are routine taxonomy, not a failure of the
            // monitoring loop itself
            self.fallback
                .log_security_event(
                    "health_check_issues",
                    serde_json::json!({
                        "status": status,
                        "cycle_ms": elapsed_ms,
                    }),
                )
                .await;
        }

        if !status.overall {
            let failures: Vec<ProbeReport> =
                reports.into_iter().filter(|r| !r.healthy).collect();
            info!(
                "Overall health degraded, scheduling recovery for {} component(s)",
                failures.len()
            );
            let recovery = Arc::clone(&self.recovery);
            tokio::spawn(async move {
                recovery.attempt_all(&failures).await;
            });
        }

        status
    }

    async fn run_probe(&self, probe: &dyn ComponentProbe) -> ProbeReport {
        let component = probe.component();
        match self.config.probe_timeout() {
            Some(limit) => match tokio::time::timeout(limit, probe.check()).await {
                Ok(report) => report,
                Err(_) => ProbeReport::failed(
                    component,
                    format!("probe timed out after {}s", limit.as_secs()),
                ),
            },
            // No deadline configured: a hung probe stalls the cycle
            None => probe.check().await,
        }
    }
}
