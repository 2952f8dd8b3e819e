//! Database connectivity
//!
//! Thin wrapper around a sea-orm connection pool. The monitor only needs a
//! trivial round-trip query; the platform's CRUD layers own their own
//! schemas and are out of scope here.

use crate::config::DatabaseConfig;
use crate::utils::error::{MonitorError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, DatabaseConnection, Statement};
use std::time::Duration;
use tracing::{debug, info};

/// Pooled database connection
#[derive(Debug, Clone)]
pub struct Database {
    db: DatabaseConnection,
}

impl Database {
    /// Create a new database connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut opt = ConnectOptions::new(config.url.clone());
        opt.max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.connection_timeout))
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .sqlx_logging(false);

        let db = sea_orm::Database::connect(opt)
            .await
            .map_err(MonitorError::Database)?;

        info!("Database connection established");
        Ok(Self { db })
    }

    /// Trivial round-trip query; healthy iff it completes
    pub async fn health_check(&self) -> Result<()> {
        debug!("Performing database health check");

        let backend = self.db.get_database_backend();
        self.db
            .query_one(Statement::from_string(backend, "SELECT 1"))
            .await
            .map_err(MonitorError::Database)?;

        debug!("Database health check passed");
        Ok(())
    }

    /// Execute a statement against the pool
    pub async fn execute(&self, sql: &str) -> Result<()> {
        let backend = self.db.get_database_backend();
        self.db
            .execute(Statement::from_string(backend, sql))
            .await
            .map_err(MonitorError::Database)?;
        Ok(())
    }

    /// The underlying connection, for collaborators issuing their own queries
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}
