//! Component health probes
//!
//! One async probe per monitored dependency. Probes never return errors;
//! every failure is folded into a typed `ProbeReport` so the aggregator and
//! the recovery coordinator route on `ComponentId`, not on message text.

use crate::monitoring::alerts::AlertManager;
use crate::monitoring::types::{ComponentId, ProbeReport};
use crate::services::{AuditLog, ThreatDetection};
use crate::storage::{Database, RedisPool};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Synthetic tenant used for threat-detection round trips
pub const HEALTH_CHECK_TENANT: &str = "health-check";

/// A single async health check for one dependency
#[async_trait]
pub trait ComponentProbe: Send + Sync {
    fn component(&self) -> ComponentId;

    async fn check(&self) -> ProbeReport;
}

/// Database probe: acquire a connection, run a trivial round-trip query
pub struct DatabaseProbe {
    database: Arc<Database>,
}

impl DatabaseProbe {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl ComponentProbe for DatabaseProbe {
    fn component(&self) -> ComponentId {
        ComponentId::Database
    }

    async fn check(&self) -> ProbeReport {
        match self.database.health_check().await {
            Ok(()) => ProbeReport::healthy(ComponentId::Database),
            Err(e) => ProbeReport::failed(ComponentId::Database, e.to_string()),
        }
    }
}

/// Cache probe: PING; an absent client is unhealthy, not an internal error
pub struct CacheProbe {
    redis: Option<Arc<RedisPool>>,
}

impl CacheProbe {
    pub fn new(redis: Option<Arc<RedisPool>>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl ComponentProbe for CacheProbe {
    fn component(&self) -> ComponentId {
        ComponentId::Cache
    }

    async fn check(&self) -> ProbeReport {
        match &self.redis {
            Some(pool) => match pool.ping().await {
                Ok(()) => ProbeReport::healthy(ComponentId::Cache),
                Err(e) => ProbeReport::failed(ComponentId::Cache, e.to_string()),
            },
            None => ProbeReport::failed(ComponentId::Cache, "no cache client configured"),
        }
    }
}

/// Audit probe: write one health-check audit record
pub struct AuditProbe {
    audit: Arc<dyn AuditLog>,
}

impl AuditProbe {
    pub fn new(audit: Arc<dyn AuditLog>) -> Self {
        Self { audit }
    }
}

#[async_trait]
impl ComponentProbe for AuditProbe {
    fn component(&self) -> ComponentId {
        ComponentId::AuditLog
    }

    async fn check(&self) -> ProbeReport {
        match self.audit.record_health_check().await {
            Ok(()) => ProbeReport::healthy(ComponentId::AuditLog),
            Err(e) => ProbeReport::failed(ComponentId::AuditLog, e.to_string()),
        }
    }
}

/// Threat-detection probe: request a metrics summary for a synthetic tenant
pub struct ThreatProbe {
    threat: Arc<dyn ThreatDetection>,
}

impl ThreatProbe {
    pub fn new(threat: Arc<dyn ThreatDetection>) -> Self {
        Self { threat }
    }
}

#[async_trait]
impl ComponentProbe for ThreatProbe {
    fn component(&self) -> ComponentId {
        ComponentId::ThreatDetection
    }

    async fn check(&self) -> ProbeReport {
        match self.threat.metrics_summary(HEALTH_CHECK_TENANT).await {
            Ok(summary) => {
                debug!(
                    "Threat metrics summary generated at {}",
                    summary.generated_at
                );
                ProbeReport::healthy(ComponentId::ThreatDetection)
            }
            Err(e) => ProbeReport::failed(ComponentId::ThreatDetection, e.to_string()),
        }
    }
}

/// Alerting probe: list configured rules; an absent manager is unhealthy
pub struct AlertingProbe {
    alerts: Option<Arc<AlertManager>>,
}

impl AlertingProbe {
    pub fn new(alerts: Option<Arc<AlertManager>>) -> Self {
        Self { alerts }
    }
}

#[async_trait]
impl ComponentProbe for AlertingProbe {
    fn component(&self) -> ComponentId {
        ComponentId::Alerting
    }

    async fn check(&self) -> ProbeReport {
        match &self.alerts {
            Some(alerts) => {
                let rules = alerts.list_rules().await;
                debug!("Alerting probe listed {} rules", rules.len());
                ProbeReport::healthy(ComponentId::Alerting)
            }
            None => ProbeReport::failed(
                ComponentId::Alerting,
                "no alerting collaborator configured",
            ),
        }
    }
}

/// Assemble the standard probe set in its canonical order
pub fn standard_probes(
    database: Arc<Database>,
    redis: Option<Arc<RedisPool>>,
    audit: Arc<dyn AuditLog>,
    threat: Arc<dyn ThreatDetection>,
    alerts: Option<Arc<AlertManager>>,
) -> Vec<Arc<dyn ComponentProbe>> {
    vec![
        Arc::new(DatabaseProbe::new(database)),
        Arc::new(CacheProbe::new(redis)),
        Arc::new(AuditProbe::new(audit)),
        Arc::new(ThreatProbe::new(threat)),
        Arc::new(AlertingProbe::new(alerts)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_probe_without_client_is_unhealthy() {
        let probe = CacheProbe::new(None);
        let report = probe.check().await;

        assert_eq!(report.component, ComponentId::Cache);
        assert!(!report.healthy);
        assert_eq!(report.error_message(), "Cache failed");
    }

    #[tokio::test]
    async fn test_alerting_probe_without_manager_is_unhealthy() {
        let probe = AlertingProbe::new(None);
        let report = probe.check().await;

        assert_eq!(report.component, ComponentId::Alerting);
        assert!(!report.healthy);
        assert!(report.error.as_deref().unwrap().contains("no alerting"));
    }
}
