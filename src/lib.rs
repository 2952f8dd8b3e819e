//! # MailSentry
//!
//! Resilient security-monitoring service for a bulk-email platform.
//!
//! The monitor polls five dependencies (database, cache, audit logging,
//! threat detection, alerting), drives bounded automatic recovery for the
//! ones that fail, slows its own polling under sustained failure, and
//! records every monitoring event through a multi-tier fallback logger
//! that never throws back at its caller.
//!
//! ```rust,no_run
//! use mailsentry::config::Config;
//! use mailsentry::server::HttpServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let monitor = mailsentry::bootstrap_monitor(&config).await?;
//!     monitor.start();
//!     HttpServer::new(&config, Some(monitor)).start().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod monitoring;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use monitoring::{HealthStatus, ResilientMonitor};
pub use utils::error::{MonitorError, Result};

use crate::monitoring::alerts::AlertManager;
use crate::monitoring::fallback::FallbackLogger;
use crate::monitoring::{standard_probes, HealthAggregator, RecoveryCoordinator};
use crate::services::{AuditLog, DbAuditLog, DbThreatDetection, ThreatDetection};
use crate::storage::StorageLayer;
use std::sync::Arc;
use tracing::info;

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Wire up storage, collaborator services and the monitor itself
///
/// The returned monitor is not started; call [`ResilientMonitor::start`]
/// to begin polling.
pub async fn bootstrap_monitor(config: &Config) -> Result<Arc<ResilientMonitor>> {
    info!("Bootstrapping security monitor in {:?} mode", config.monitor.mode);

    let fallback = Arc::new(FallbackLogger::new(&config.logging));

    let storage = StorageLayer::new(&config.storage).await?;
    let database = Arc::clone(&storage.database);
    let redis = storage.redis.clone();

    let audit: Arc<dyn AuditLog> = Arc::new(DbAuditLog::new(Arc::clone(&database)).await?);
    let threat: Arc<dyn ThreatDetection> =
        Arc::new(DbThreatDetection::new(Arc::clone(&database)).await?);

    let alerts = if config.alerting.enabled {
        let manager = Arc::new(AlertManager::new(&config.alerting, Arc::clone(&fallback)));
        manager.start().await;
        Some(manager)
    } else {
        None
    };

    let probes = standard_probes(
        Arc::clone(&database),
        redis.clone(),
        Arc::clone(&audit),
        Arc::clone(&threat),
        alerts.clone(),
    );

    let recovery = Arc::new(RecoveryCoordinator::new(
        config.monitor.clone(),
        Arc::clone(&database),
        redis,
        Arc::clone(&audit),
        Arc::clone(&threat),
        alerts.clone(),
        Arc::clone(&fallback),
    ));

    let aggregator = Arc::new(HealthAggregator::new(
        config.monitor.clone(),
        probes,
        Arc::clone(&recovery),
        Arc::clone(&fallback),
    ));

    Ok(Arc::new(ResilientMonitor::new(
        config.monitor.clone(),
        aggregator,
        recovery,
        alerts,
        threat,
        fallback,
    )))
}
