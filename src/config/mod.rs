//! Configuration management
//!
//! Serde-backed configuration models with YAML loading and environment
//! overrides.

mod loader;
mod models;

pub use models::{
    AlertingConfig, Config, DatabaseConfig, FallbackLogConfig, MonitorConfig, OperatingMode,
    RedisConfig, ServerConfig, StorageConfig,
};
