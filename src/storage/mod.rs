//! Storage layer
//!
//! Connectivity to the platform's database and cache, as consumed by the
//! health probes and the collaborator services.

pub mod database;
pub mod redis;

use crate::config::StorageConfig;
use crate::utils::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub use database::Database;
pub use redis::RedisPool;

/// Storage backends shared across the service
#[derive(Clone)]
pub struct StorageLayer {
    /// Database connection pool
    pub database: Arc<Database>,
    /// Redis connection pool; `None` when no cache client is configured
    pub redis: Option<Arc<RedisPool>>,
}

impl StorageLayer {
    /// Connect to the configured backends
    ///
    /// A Redis connection failure downgrades to "no cache client" rather
    /// than aborting startup; the cache probe will report it unhealthy.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        info!("Initializing storage layer");

        let database = Arc::new(Database::new(&config.database).await?);

        let redis = if config.redis.enabled {
            match RedisPool::new(&config.redis).await {
                Ok(pool) => Some(Arc::new(pool)),
                Err(e) => {
                    warn!("Redis connection failed, continuing without cache: {}", e);
                    None
                }
            }
        } else {
            None
        };

        info!("Storage layer initialized");
        Ok(Self { database, redis })
    }
}
