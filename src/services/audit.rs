//! Audit-log collaborator
//!
//! The monitor owns only the call shape: write one record, prove the write
//! path works. The platform's GDPR/audit pipeline consumes the same table.

use crate::storage::Database;
use crate::utils::error::{MonitorError, Result};
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use std::sync::Arc;
use tracing::debug;

/// Audit record writer
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record an arbitrary security event
    async fn record_event(&self, actor: &str, action: &str, detail: serde_json::Value)
        -> Result<()>;

    /// Record the monitor's own health-check event; backs the audit probe
    async fn record_health_check(&self) -> Result<()>;

    /// Re-establish the write path; recovery action for the audit component
    async fn reset(&self) -> Result<()>;
}

/// Database-backed audit log
pub struct DbAuditLog {
    database: Arc<Database>,
}

impl DbAuditLog {
    pub async fn new(database: Arc<Database>) -> Result<Self> {
        let audit = Self { database };
        audit.ensure_schema().await?;
        Ok(audit)
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.database
            .execute(
                "CREATE TABLE IF NOT EXISTS security_audit_log (\
                 actor TEXT NOT NULL, \
                 action TEXT NOT NULL, \
                 detail TEXT NOT NULL, \
                 created_at TIMESTAMP NOT NULL)",
            )
            .await
    }

    async fn insert(&self, actor: &str, action: &str, detail: &serde_json::Value) -> Result<()> {
        let conn = self.database.connection();
        let backend = conn.get_database_backend();
        let sql = match backend {
            DbBackend::Postgres => {
                "INSERT INTO security_audit_log (actor, action, detail, created_at) \
                 VALUES ($1, $2, $3, $4)"
            }
            _ => {
                "INSERT INTO security_audit_log (actor, action, detail, created_at) \
                 VALUES (?, ?, ?, ?)"
            }
        };

        conn.execute(Statement::from_sql_and_values(
            backend,
            sql,
            [
                actor.into(),
                action.into(),
                detail.to_string().into(),
                chrono::Utc::now().into(),
            ],
        ))
        .await
        .map_err(MonitorError::Database)?;

        Ok(())
    }
}

#[async_trait]
impl AuditLog for DbAuditLog {
    async fn record_event(
        &self,
        actor: &str,
        action: &str,
        detail: serde_json::Value,
    ) -> Result<()> {
        debug!("Recording audit event: {} {}", actor, action);
        self.insert(actor, action, &detail).await
    }

    async fn record_health_check(&self) -> Result<()> {
        self.insert(
            "security-monitor",
            "health_check",
            &serde_json::json!({ "synthetic": true }),
        )
        .await
    }

    async fn reset(&self) -> Result<()> {
        self.ensure_schema().await?;
        self.record_health_check().await
    }
}
