//! Shared test harness: a full monitor wired against stubbed collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use mailsentry::config::{DatabaseConfig, FallbackLogConfig, MonitorConfig, OperatingMode};
use mailsentry::monitoring::fallback::FallbackLogger;
use mailsentry::monitoring::probes::ComponentProbe;
use mailsentry::monitoring::types::{ComponentId, ProbeReport};
use mailsentry::monitoring::{HealthAggregator, RecoveryCoordinator, ResilientMonitor};
use mailsentry::services::{
    ApiUsageEvent, AuditLog, AuthEvent, ThreatDetection, ThreatMetricsSummary,
};
use mailsentry::storage::Database;
use mailsentry::{MonitorError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Probe whose health can be toggled mid-test
pub struct StubProbe {
    pub component: ComponentId,
    pub healthy: AtomicBool,
    pub calls: AtomicUsize,
}

impl StubProbe {
    pub fn new(component: ComponentId, healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            component,
            healthy: AtomicBool::new(healthy),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ComponentProbe for StubProbe {
    fn component(&self) -> ComponentId {
        self.component
    }

    async fn check(&self) -> ProbeReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            ProbeReport::healthy(self.component)
        } else {
            ProbeReport::failed(self.component, "stub failure")
        }
    }
}

/// Audit stub with a switchable failure mode
pub struct StubAudit {
    pub fail: bool,
    pub resets: AtomicUsize,
}

#[async_trait]
impl AuditLog for StubAudit {
    async fn record_event(
        &self,
        _actor: &str,
        _action: &str,
        _detail: serde_json::Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn record_health_check(&self) -> Result<()> {
        if self.fail {
            Err(MonitorError::Audit("stub audit failure".to_string()))
        } else {
            Ok(())
        }
    }

    async fn reset(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(MonitorError::Audit("stub audit failure".to_string()))
        } else {
            Ok(())
        }
    }
}

pub fn healthy_audit() -> Arc<StubAudit> {
    Arc::new(StubAudit {
        fail: false,
        resets: AtomicUsize::new(0),
    })
}

pub fn failing_audit() -> Arc<StubAudit> {
    Arc::new(StubAudit {
        fail: true,
        resets: AtomicUsize::new(0),
    })
}

/// Threat-detection stub with call counters
pub struct StubThreat {
    pub fail: bool,
    pub auth_events: AtomicUsize,
    pub api_events: AtomicUsize,
}

impl StubThreat {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            auth_events: AtomicUsize::new(0),
            api_events: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            auth_events: AtomicUsize::new(0),
            api_events: AtomicUsize::new(0),
        })
    }

    fn outcome(&self) -> Result<()> {
        if self.fail {
            Err(MonitorError::ThreatDetection(
                "stub threat failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ThreatDetection for StubThreat {
    async fn metrics_summary(&self, tenant: &str) -> Result<ThreatMetricsSummary> {
        self.outcome()?;
        Ok(ThreatMetricsSummary {
            tenant: tenant.to_string(),
            auth_failures_last_hour: 0,
            api_requests_last_hour: 0,
            generated_at: chrono::Utc::now(),
        })
    }

    async fn record_auth_event(&self, _event: &AuthEvent) -> Result<()> {
        self.auth_events.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    async fn record_api_usage(&self, _event: &ApiUsageEvent) -> Result<()> {
        self.api_events.fetch_add(1, Ordering::SeqCst);
        self.outcome()
    }

    async fn reset(&self) -> Result<()> {
        self.outcome()
    }
}

/// A fully wired monitor plus handles into its collaborators
pub struct TestHarness {
    pub monitor: Arc<ResilientMonitor>,
    pub recovery: Arc<RecoveryCoordinator>,
    _logs: TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }
}

#[derive(Default)]
pub struct TestHarnessBuilder {
    probes: Vec<Arc<dyn ComponentProbe>>,
    audit: Option<Arc<StubAudit>>,
    threat: Option<Arc<StubThreat>>,
    simulated: bool,
}

impl TestHarnessBuilder {
    pub fn probe(mut self, probe: Arc<StubProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn audit(mut self, audit: Arc<StubAudit>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn threat(mut self, threat: Arc<StubThreat>) -> Self {
        self.threat = Some(threat);
        self
    }

    pub fn simulated(mut self) -> Self {
        self.simulated = true;
        self
    }

    pub async fn build(self) -> TestHarness {
        let logs = TempDir::new().unwrap();

        let config = MonitorConfig {
            mode: if self.simulated {
                OperatingMode::Simulated
            } else {
                OperatingMode::Live
            },
            recovery_cooldown_secs: 0,
            ..MonitorConfig::default()
        };

        let db_config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            ..DatabaseConfig::default()
        };
        let database = Arc::new(Database::new(&db_config).await.unwrap());

        let fallback_config = FallbackLogConfig {
            log_dir: logs.path().join("primary").to_string_lossy().into_owned(),
            emergency_dir: logs.path().join("emergency").to_string_lossy().into_owned(),
            ..FallbackLogConfig::default()
        };
        let fallback = Arc::new(FallbackLogger::new(&fallback_config));

        let audit: Arc<dyn AuditLog> = self.audit.unwrap_or_else(healthy_audit);
        let threat: Arc<dyn ThreatDetection> = self.threat.unwrap_or_else(StubThreat::healthy);

        let recovery = Arc::new(RecoveryCoordinator::new(
            config.clone(),
            Arc::clone(&database),
            None,
            Arc::clone(&audit),
            Arc::clone(&threat),
            None,
            Arc::clone(&fallback),
        ));

        let aggregator = Arc::new(HealthAggregator::new(
            config.clone(),
            self.probes,
            Arc::clone(&recovery),
            Arc::clone(&fallback),
        ));

        let monitor = Arc::new(ResilientMonitor::new(
            config,
            aggregator,
            Arc::clone(&recovery),
            None,
            threat,
            fallback,
        ));

        TestHarness {
            monitor,
            recovery,
            _logs: logs,
        }
    }
}
