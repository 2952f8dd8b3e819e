//! Bounded automatic recovery for failed components
//!
//! Each failed probe gets a typed recovery action, at most
//! `max_recovery_attempts` times per component. Counters are cleared on
//! success or by a manual recovery request; an exhausted component is left
//! for operator intervention.

use crate::config::MonitorConfig;
use crate::monitoring::alerts::AlertManager;
use crate::monitoring::fallback::FallbackLogger;
use crate::monitoring::types::{
    Alert, AlertSeverity, ComponentId, FallbackLogEntry, FallbackLogLevel, ProbeReport,
};
use crate::services::{AuditLog, ThreatDetection};
use crate::storage::{Database, RedisPool};
use crate::utils::error::{MonitorError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Drives recovery actions for components the aggregator reports as failed
pub struct RecoveryCoordinator {
    config: MonitorConfig,
    database: Arc<Database>,
    redis: Option<Arc<RedisPool>>,
    audit: Arc<dyn AuditLog>,
    threat: Arc<dyn ThreatDetection>,
    alerts: Option<Arc<AlertManager>>,
    fallback: Arc<FallbackLogger>,
    /// Per-component attempt counters; lock is never held across an await
    attempts: Mutex<HashMap<ComponentId, u32>>,
}

impl RecoveryCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: MonitorConfig,
        database: Arc<Database>,
        redis: Option<Arc<RedisPool>>,
        audit: Arc<dyn AuditLog>,
        threat: Arc<dyn ThreatDetection>,
        alerts: Option<Arc<AlertManager>>,
        fallback: Arc<FallbackLogger>,
    ) -> Self {
        Self {
            config,
            database,
            redis,
            audit,
            threat,
            alerts,
            fallback,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Run one recovery pass over the failed probes of a cycle, sequentially
    pub async fn attempt_all(&self, failures: &[ProbeReport]) {
        for report in failures.iter().filter(|r| !r.healthy) {
            self.attempt_one(report).await;
        }
    }

    /// Current attempt count for a component
    pub fn attempt_count(&self, component: ComponentId) -> u32 {
        self.attempts.lock().get(&component).copied().unwrap_or(0)
    }

    /// Drop every attempt counter; used by manual recovery
    pub fn clear_attempts(&self) {
        self.attempts.lock().clear();
    }

    async fn attempt_one(&self, report: &ProbeReport) {
        let component = report.component;
        let max = self.config.max_recovery_attempts;

        // None means the component is exhausted; the guard must not
        // survive past this block
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(component).or_insert(0);
            if *count >= max {
                None
            } else {
                *count += 1;
                Some(*count)
            }
        };
        let Some(attempt) = attempt else {
            self.log_exhausted(component, max).await;
            return;
        };

        info!(
            "Attempting recovery for {} (attempt {} of {})",
            component, attempt, max
        );
        self.fallback
            .log_event(FallbackLogEntry::new(
                FallbackLogLevel::Warn,
                "recovery-coordinator",
                "recovery_attempt",
                serde_json::json!({
                    "component": component.as_str(),
                    "attempt": attempt,
                    "max_attempts": max,
                }),
            ))
            .await;
        self.send_alert(Alert::new(
            AlertSeverity::Medium,
            format!("Recovery attempt for {}", component),
            format!(
                "Automatic recovery of {} started, attempt {} of {}",
                component, attempt, max
            ),
            "recovery-coordinator",
        ))
        .await;

        // Fixed cooldown before touching the dependency again
        tokio::time::sleep(self.config.recovery_cooldown()).await;

        match self.run_action(component).await {
            Ok(()) => {
                self.attempts.lock().remove(&component);
                info!("Recovery succeeded for {}", component);
                self.fallback
                    .log_system_recovery(component, self.config.recovery_cooldown())
                    .await;
                self.send_alert(Alert::new(
                    AlertSeverity::Low,
                    format!("{} recovered", component),
                    format!("{} recovered after {} attempt(s)", component, attempt),
                    "recovery-coordinator",
                ))
                .await;
            }
            Err(e) => {
                warn!("Recovery failed for {}: {}", component, e);
                self.fallback
                    .log_monitoring_failure(
                        &format!("recovery-{}", component.as_str()),
                        &e.to_string(),
                        AlertSeverity::High,
                    )
                    .await;
                self.send_alert(Alert::new(
                    AlertSeverity::High,
                    format!("Recovery failed for {}", component),
                    format!("Attempt {} of {} failed: {}", attempt, max, e),
                    "recovery-coordinator",
                ))
                .await;
                if attempt >= max {
                    self.send_alert(
                        Alert::new(
                            AlertSeverity::Critical,
                            format!("{} requires manual intervention", component),
                            format!(
                                "Automatic recovery of {} exhausted after {} attempts",
                                component, max
                            ),
                            "recovery-coordinator",
                        )
                        .with_metadata(serde_json::json!({
                            "component": component.as_str(),
                            "attempts": max,
                        })),
                    )
                    .await;
                }
            }
        }
    }

    async fn run_action(&self, component: ComponentId) -> Result<()> {
        match component {
            ComponentId::Database => self.database.health_check().await,
            ComponentId::Cache => match &self.redis {
                Some(pool) => pool.ping().await,
                None => Err(MonitorError::recovery(
                    "no cache client configured, nothing to recover",
                )),
            },
            ComponentId::AuditLog => self.audit.reset().await,
            ComponentId::ThreatDetection => self.threat.reset().await,
            ComponentId::Alerting => match &self.alerts {
                Some(alerts) => alerts.reinitialize().await,
                None => Err(MonitorError::recovery(
                    "no alerting collaborator configured, nothing to recover",
                )),
            },
            // A report without a typed component is a hard error, never
            // silently dropped
            ComponentId::Unknown => Err(MonitorError::recovery(
                "unknown component reported unhealthy, no recovery action exists",
            )),
        }
    }

    async fn log_exhausted(&self, component: ComponentId, max: u32) {
        warn!(
            "Recovery attempts exhausted for {} ({} attempts), skipping",
            component, max
        );
        self.fallback
            .log_event(
                FallbackLogEntry::new(
                    FallbackLogLevel::Critical,
                    "recovery-coordinator",
                    "recovery_exhausted",
                    serde_json::json!({
                        "component": component.as_str(),
                        "attempts": max,
                    }),
                )
                .with_error(format!("{} still failing after {} attempts", component, max)),
            )
            .await;
    }

    async fn send_alert(&self, alert: Alert) {
        if let Some(alerts) = &self.alerts {
            alerts.send_alert(alert).await;
        }
    }
}
