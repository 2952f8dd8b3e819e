//! Resilient security monitor
//!
//! Owns the poll scheduler, the degradation controller, and the
//! swallow-everything ingestion wrappers. Monitoring must never take the
//! mail pipeline down with it: every public entry point here absorbs
//! collaborator failures into the fallback log instead of propagating them.

use crate::config::MonitorConfig;
use crate::monitoring::aggregator::HealthAggregator;
use crate::monitoring::alerts::AlertManager;
use crate::monitoring::fallback::FallbackLogger;
use crate::monitoring::recovery::RecoveryCoordinator;
use crate::monitoring::types::{Alert, AlertSeverity, HealthStatus};
use crate::services::{ApiUsageEvent, AuthEvent, ThreatDetection};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Tracks degraded polling state and the active poll interval
pub struct DegradationController {
    degraded: AtomicBool,
    poll_interval_ms: AtomicU64,
    normal_ms: u64,
    degraded_ms: u64,
}

impl DegradationController {
    fn new(config: &MonitorConfig) -> Self {
        let normal_ms = config.poll_interval().as_millis() as u64;
        Self {
            degraded: AtomicBool::new(false),
            poll_interval_ms: AtomicU64::new(normal_ms),
            normal_ms,
            degraded_ms: config.degraded_poll_interval().as_millis() as u64,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.load(Ordering::SeqCst))
    }

    /// Returns true when this call flipped the state
    fn enter(&self) -> bool {
        let flipped = !self.degraded.swap(true, Ordering::SeqCst);
        if flipped {
            self.poll_interval_ms.store(self.degraded_ms, Ordering::SeqCst);
        }
        flipped
    }

    /// Returns true when this call flipped the state
    fn leave(&self) -> bool {
        let flipped = self.degraded.swap(false, Ordering::SeqCst);
        if flipped {
            self.poll_interval_ms.store(self.normal_ms, Ordering::SeqCst);
        }
        flipped
    }
}

/// Top-level security monitor: scheduler, degradation, ingestion wrappers
pub struct ResilientMonitor {
    config: MonitorConfig,
    aggregator: Arc<HealthAggregator>,
    recovery: Arc<RecoveryCoordinator>,
    alerts: Option<Arc<AlertManager>>,
    threat: Arc<dyn ThreatDetection>,
    fallback: Arc<FallbackLogger>,
    degradation: DegradationController,
    active: AtomicBool,
    /// Serializes cycles; a tick that finds it held is skipped
    cycle_guard: tokio::sync::Mutex<()>,
    scheduler: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ResilientMonitor {
    pub fn new(
        config: MonitorConfig,
        aggregator: Arc<HealthAggregator>,
        recovery: Arc<RecoveryCoordinator>,
        alerts: Option<Arc<AlertManager>>,
        threat: Arc<dyn ThreatDetection>,
        fallback: Arc<FallbackLogger>,
    ) -> Self {
        Self {
            degradation: DegradationController::new(&config),
            config,
            aggregator,
            recovery,
            alerts,
            threat,
            fallback,
            active: AtomicBool::new(false),
            cycle_guard: tokio::sync::Mutex::new(()),
            scheduler: parking_lot::Mutex::new(None),
        }
    }

    /// Start the polling scheduler; idempotent
    pub fn start(self: &Arc<Self>) {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!("Monitor already started");
            return;
        }
        info!(
            "Starting security monitor, poll interval {:?}",
            self.degradation.poll_interval()
        );

        let monitor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(monitor.degradation.poll_interval()).await;
                if !monitor.active.load(Ordering::SeqCst) {
                    break;
                }
                monitor.run_cycle_once().await;
            }
            debug!("Monitor scheduler stopped");
        });
        *self.scheduler.lock() = Some(handle);
    }

    /// Stop the scheduler and shut down collaborators
    pub async fn destroy(&self) {
        info!("Destroying security monitor");
        self.active.store(false, Ordering::SeqCst);
        if let Some(handle) = self.scheduler.lock().take() {
            handle.abort();
        }
        if let Some(alerts) = &self.alerts {
            alerts.stop().await;
        }
        if let Err(e) = self.threat.shutdown().await {
            warn!("Threat detection shutdown failed: {}", e);
        }
    }

    /// Defensive copy of the latest health snapshot
    pub fn health_status(&self) -> HealthStatus {
        self.aggregator.current()
    }

    pub fn is_degraded(&self) -> bool {
        self.degradation.is_degraded()
    }

    pub fn fallback_logger(&self) -> &Arc<FallbackLogger> {
        &self.fallback
    }

    /// Run one cycle unless a previous one is still in flight
    pub async fn run_cycle_once(&self) {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            debug!("Previous health check cycle still running, skipping tick");
            return;
        };
        let status = self.aggregator.run_cycle().await;
        self.evaluate_degradation(&status).await;
    }

    /// Clear every recovery counter and run one synchronous cycle
    pub async fn trigger_manual_recovery(&self) -> HealthStatus {
        info!("Manual recovery triggered, resetting attempt counters");
        self.recovery.clear_attempts();
        let _guard = self.cycle_guard.lock().await;
        let status = self.aggregator.run_cycle().await;
        self.evaluate_degradation(&status).await;
        status
    }

    /// Manually force degraded polling, independent of probe results
    pub async fn enable_graceful_degradation(&self) {
        self.enter_degradation("manual request").await;
    }

    /// Manually restore normal polling
    pub async fn disable_graceful_degradation(&self) {
        self.leave_degradation("manual request").await;
    }

    /// Record an authentication event; failures never reach the caller
    pub async fn monitor_authentication_events(&self, event: &AuthEvent) {
        let payload = serde_json::json!({
            "tenant": event.tenant,
            "user": event.user,
            "success": event.success,
            "source_ip": event.source_ip,
        });
        if self.config.mode.is_simulated() {
            self.fallback.log_security_event("auth_event", payload).await;
            return;
        }
        if let Err(e) = self.threat.record_auth_event(event).await {
            error!("Failed to record authentication event: {}", e);
            self.fallback
                .log_threat_detection_failure("record_auth_event", &e.to_string())
                .await;
            // The event itself still gets durably captured
            self.fallback.log_security_event("auth_event", payload).await;
        }
    }

    /// Record an API usage event; failures never reach the caller
    pub async fn monitor_api_usage(&self, event: &ApiUsageEvent) {
        let payload = serde_json::json!({
            "tenant": event.tenant,
            "endpoint": event.endpoint,
            "status": event.status,
        });
        if self.config.mode.is_simulated() {
            self.fallback.log_security_event("api_usage", payload).await;
            return;
        }
        if let Err(e) = self.threat.record_api_usage(event).await {
            error!("Failed to record API usage event: {}", e);
            self.fallback
                .log_threat_detection_failure("record_api_usage", &e.to_string())
                .await;
            self.fallback.log_security_event("api_usage", payload).await;
        }
    }

    async fn evaluate_degradation(&self, status: &HealthStatus) {
        let should_degrade = status.errors.len() >= self.config.degradation_error_threshold
            || !status.database
            || !status.audit_logging;

        if should_degrade {
            self.enter_degradation("health check results").await;
        } else {
            self.leave_degradation("health check results").await;
        }
    }

    async fn enter_degradation(&self, reason: &str) {
        if !self.degradation.enter() {
            return;
        }
        warn!(
            "Entering graceful degradation ({}), poll interval now {:?}",
            reason,
            self.degradation.poll_interval()
        );
        self.fallback
            .log_security_event(
                "graceful_degradation_enabled",
                serde_json::json!({
                    "reason": reason,
                    "poll_interval_secs": self.config.degraded_poll_interval_secs,
                }),
            )
            .await;
        if let Some(alerts) = &self.alerts {
            alerts
                .send_alert(Alert::new(
                    AlertSeverity::High,
                    "Graceful degradation enabled",
                    format!("Monitor switched to degraded polling ({})", reason),
                    "resilient-monitor",
                ))
                .await;
        }
    }

    async fn leave_degradation(&self, reason: &str) {
        if !self.degradation.leave() {
            return;
        }
        info!(
            "Leaving graceful degradation ({}), poll interval now {:?}",
            reason,
            self.degradation.poll_interval()
        );
        self.fallback
            .log_security_event(
                "graceful_degradation_disabled",
                serde_json::json!({
                    "reason": reason,
                    "poll_interval_secs": self.config.poll_interval_secs,
                }),
            )
            .await;
        if let Some(alerts) = &self.alerts {
            alerts
                .send_alert(Alert::new(
                    AlertSeverity::Low,
                    "Graceful degradation disabled",
                    format!("Monitor restored normal polling ({})", reason),
                    "resilient-monitor",
                ))
                .await;
        }
    }
}
