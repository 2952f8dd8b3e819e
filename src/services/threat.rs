//! Threat-detection collaborator
//!
//! The heuristics themselves (spam scoring, brute-force counting) are
//! threshold checks on counted rows owned by the wider platform; the monitor
//! only needs their call shape: record events, fetch a lightweight metrics
//! summary, prove the service can be reconstructed.

use crate::storage::Database;
use crate::utils::error::{MonitorError, Result};
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use std::sync::Arc;
use tracing::debug;

/// Lightweight metrics summary for one tenant
#[derive(Debug, Clone, serde::Serialize)]
pub struct ThreatMetricsSummary {
    pub tenant: String,
    pub auth_failures_last_hour: u64,
    pub api_requests_last_hour: u64,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// Authentication event forwarded by the platform's auth layer
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthEvent {
    pub tenant: String,
    pub user: String,
    pub success: bool,
    pub source_ip: String,
}

/// API usage event forwarded by the platform's request layer
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiUsageEvent {
    pub tenant: String,
    pub endpoint: String,
    pub status: u16,
}

/// Threat-detection service
#[async_trait]
pub trait ThreatDetection: Send + Sync {
    /// Metrics summary for a tenant; backs the threat-detection probe
    async fn metrics_summary(&self, tenant: &str) -> Result<ThreatMetricsSummary>;

    /// Record an authentication event
    async fn record_auth_event(&self, event: &AuthEvent) -> Result<()>;

    /// Record an API usage event
    async fn record_api_usage(&self, event: &ApiUsageEvent) -> Result<()>;

    /// Re-establish the service; recovery action for this component
    async fn reset(&self) -> Result<()>;

    /// Release resources during monitor teardown
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Database-backed threat detection
pub struct DbThreatDetection {
    database: Arc<Database>,
}

impl DbThreatDetection {
    pub async fn new(database: Arc<Database>) -> Result<Self> {
        let detector = Self { database };
        detector.ensure_schema().await?;
        Ok(detector)
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.database
            .execute(
                "CREATE TABLE IF NOT EXISTS security_auth_events (\
                 tenant TEXT NOT NULL, \
                 username TEXT NOT NULL, \
                 success INTEGER NOT NULL, \
                 source_ip TEXT NOT NULL, \
                 created_at TIMESTAMP NOT NULL)",
            )
            .await?;
        self.database
            .execute(
                "CREATE TABLE IF NOT EXISTS security_api_usage (\
                 tenant TEXT NOT NULL, \
                 endpoint TEXT NOT NULL, \
                 status INTEGER NOT NULL, \
                 created_at TIMESTAMP NOT NULL)",
            )
            .await
    }

    async fn count_since(
        &self,
        table: &str,
        tenant: &str,
        extra_predicate: &str,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64> {
        let conn = self.database.connection();
        let backend = conn.get_database_backend();
        let sql = match backend {
            DbBackend::Postgres => format!(
                "SELECT COUNT(*) AS cnt FROM {} WHERE tenant = $1 AND created_at >= $2{}",
                table, extra_predicate
            ),
            _ => format!(
                "SELECT COUNT(*) AS cnt FROM {} WHERE tenant = ? AND created_at >= ?{}",
                table, extra_predicate
            ),
        };

        let row = conn
            .query_one(Statement::from_sql_and_values(
                backend,
                sql,
                [tenant.into(), cutoff.into()],
            ))
            .await
            .map_err(MonitorError::Database)?
            .ok_or_else(|| MonitorError::ThreatDetection("count query returned no row".into()))?;

        let count: i64 = row
            .try_get("", "cnt")
            .map_err(MonitorError::Database)?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl ThreatDetection for DbThreatDetection {
    async fn metrics_summary(&self, tenant: &str) -> Result<ThreatMetricsSummary> {
        debug!("Building threat metrics summary for tenant {}", tenant);

        let cutoff = chrono::Utc::now() - chrono::Duration::hours(1);
        let auth_failures = self
            .count_since("security_auth_events", tenant, " AND success = 0", cutoff)
            .await?;
        let api_requests = self
            .count_since("security_api_usage", tenant, "", cutoff)
            .await?;

        Ok(ThreatMetricsSummary {
            tenant: tenant.to_string(),
            auth_failures_last_hour: auth_failures,
            api_requests_last_hour: api_requests,
            generated_at: chrono::Utc::now(),
        })
    }

    async fn record_auth_event(&self, event: &AuthEvent) -> Result<()> {
        let conn = self.database.connection();
        let backend = conn.get_database_backend();
        let sql = match backend {
            DbBackend::Postgres => {
                "INSERT INTO security_auth_events \
                 (tenant, username, success, source_ip, created_at) \
                 VALUES ($1, $2, $3, $4, $5)"
            }
            _ => {
                "INSERT INTO security_auth_events \
                 (tenant, username, success, source_ip, created_at) \
                 VALUES (?, ?, ?, ?, ?)"
            }
        };

        conn.execute(Statement::from_sql_and_values(
            backend,
            sql,
            [
                event.tenant.as_str().into(),
                event.user.as_str().into(),
                (event.success as i32).into(),
                event.source_ip.as_str().into(),
                chrono::Utc::now().into(),
            ],
        ))
        .await
        .map_err(MonitorError::Database)?;
        Ok(())
    }

    async fn record_api_usage(&self, event: &ApiUsageEvent) -> Result<()> {
        let conn = self.database.connection();
        let backend = conn.get_database_backend();
        let sql = match backend {
            DbBackend::Postgres => {
                "INSERT INTO security_api_usage (tenant, endpoint, status, created_at) \
                 VALUES ($1, $2, $3, $4)"
            }
            _ => {
                "INSERT INTO security_api_usage (tenant, endpoint, status, created_at) \
                 VALUES (?, ?, ?, ?)"
            }
        };

        conn.execute(Statement::from_sql_and_values(
            backend,
            sql,
            [
                event.tenant.as_str().into(),
                event.endpoint.as_str().into(),
                (event.status as i32).into(),
                chrono::Utc::now().into(),
            ],
        ))
        .await
        .map_err(MonitorError::Database)?;
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.ensure_schema().await?;
        self.metrics_summary("health-check").await.map(|_| ())
    }
}
