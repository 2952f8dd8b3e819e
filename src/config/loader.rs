//! Configuration loading utilities
//!
//! Loads the YAML configuration file (when present) and applies
//! environment-variable overrides on top.

use super::models::{Config, OperatingMode};
use crate::utils::error::{MonitorError, Result};
use std::env;
use std::path::Path;
use tracing::{debug, warn};

impl Config {
    /// Load configuration from an optional YAML file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                debug!("Loading configuration from {}", path.display());
                let raw = std::fs::read_to_string(path)?;
                serde_yaml::from_str(&raw)?
            }
            Some(path) => {
                warn!(
                    "Configuration file {} not found, using defaults",
                    path.display()
                );
                Config::default()
            }
            None => Config::default(),
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment-variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = env::var("MAILSENTRY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("MAILSENTRY_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| MonitorError::Config(format!("Invalid port: {}", e)))?;
        }

        if let Ok(db_url) = env::var("DATABASE_URL") {
            self.storage.database.url = db_url;
        }
        if let Ok(redis_url) = env::var("REDIS_URL") {
            self.storage.redis.url = redis_url;
            self.storage.redis.enabled = true;
        }

        if let Ok(mode) = env::var("MAILSENTRY_MODE") {
            self.monitor.mode = match mode.to_lowercase().as_str() {
                "live" => OperatingMode::Live,
                "simulated" | "demo" | "offline" => OperatingMode::Simulated,
                other => {
                    return Err(MonitorError::Config(format!(
                        "Invalid operating mode: {}",
                        other
                    )))
                }
            };
        }
        if let Ok(timeout) = env::var("MAILSENTRY_PROBE_TIMEOUT_SECS") {
            self.monitor.probe_timeout_secs = Some(
                timeout
                    .parse()
                    .map_err(|e| MonitorError::Config(format!("Invalid probe timeout: {}", e)))?,
            );
        }

        if let Ok(log_dir) = env::var("MAILSENTRY_LOG_DIR") {
            self.logging.log_dir = log_dir;
        }
        if let Ok(webhook) = env::var("MAILSENTRY_SLACK_WEBHOOK") {
            self.alerting.slack_webhook = Some(webhook);
        }

        Ok(())
    }
}
