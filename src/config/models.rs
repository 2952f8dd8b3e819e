//! Configuration models for the monitoring service

use crate::monitoring::types::{AlertSeverity, ComponentId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backends (database, cache)
    #[serde(default)]
    pub storage: StorageConfig,
    /// Health monitor configuration
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Fallback logger configuration
    #[serde(default)]
    pub logging: FallbackLogConfig,
    /// Alerting configuration
    #[serde(default)]
    pub alerting: AlertingConfig,
}

/// Operating mode for the monitor
///
/// `Simulated` is the demo/offline mode: health cycles report everything
/// healthy without touching any collaborator. Injected at construction
/// rather than checked from the environment inside each probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    #[default]
    Live,
    Simulated,
}

impl OperatingMode {
    #[inline]
    pub fn is_simulated(&self) -> bool {
        matches!(self, OperatingMode::Simulated)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Worker count (defaults to actix's choice)
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Redis cache configuration
    #[serde(default)]
    pub redis: RedisConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pool connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connect timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

/// Redis cache configuration
///
/// `enabled = false` means no cache client is configured; the cache probe
/// then reports unhealthy without treating it as an internal error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Whether a cache client is configured
    #[serde(default)]
    pub enabled: bool,
    /// Connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Connect timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

/// Health monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Operating mode
    #[serde(default)]
    pub mode: OperatingMode,
    /// Poll interval while healthy, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Poll interval while degraded, in seconds
    #[serde(default = "default_degraded_poll_interval")]
    pub degraded_poll_interval_secs: u64,
    /// Maximum automatic recovery attempts per component
    #[serde(default = "default_max_recovery_attempts")]
    pub max_recovery_attempts: u32,
    /// Cooldown before each recovery attempt, in seconds
    #[serde(default = "default_recovery_cooldown")]
    pub recovery_cooldown_secs: u64,
    /// Per-probe timeout in seconds; `None` lets a hung probe stall the cycle
    pub probe_timeout_secs: Option<u64>,
    /// Distinct component errors in one cycle that trigger degradation
    #[serde(default = "default_degradation_error_threshold")]
    pub degradation_error_threshold: usize,
    /// Components whose health feeds the `overall` flag
    #[serde(default = "default_critical_components")]
    pub critical_components: Vec<ComponentId>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            poll_interval_secs: default_poll_interval(),
            degraded_poll_interval_secs: default_degraded_poll_interval(),
            max_recovery_attempts: default_max_recovery_attempts(),
            recovery_cooldown_secs: default_recovery_cooldown(),
            probe_timeout_secs: None,
            degradation_error_threshold: default_degradation_error_threshold(),
            critical_components: default_critical_components(),
        }
    }
}

impl MonitorConfig {
    /// Poll interval while healthy
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Poll interval while degraded
    pub fn degraded_poll_interval(&self) -> Duration {
        Duration::from_secs(self.degraded_poll_interval_secs)
    }

    /// Cooldown before a recovery attempt
    pub fn recovery_cooldown(&self) -> Duration {
        Duration::from_secs(self.recovery_cooldown_secs)
    }

    /// Optional per-probe timeout
    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_secs.map(Duration::from_secs)
    }

    /// Whether a component participates in the `overall` computation
    pub fn is_critical(&self, component: ComponentId) -> bool {
        self.critical_components.contains(&component)
    }
}

/// Fallback logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackLogConfig {
    /// Primary log directory
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// Emergency (secondary sink) directory
    #[serde(default = "default_emergency_dir")]
    pub emergency_dir: String,
    /// Rotation threshold for the primary file, in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Default number of recent entries returned by readers
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for FallbackLogConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            emergency_dir: default_emergency_dir(),
            max_file_size: default_max_file_size(),
            recent_limit: default_recent_limit(),
        }
    }
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Whether an alerting collaborator is configured
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Slack webhook URL for notifications
    pub slack_webhook: Option<String>,
    /// Lowest severity any channel will deliver
    #[serde(default = "default_min_severity")]
    pub min_severity: AlertSeverity,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slack_webhook: None,
            min_severity: default_min_severity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_severity() -> AlertSeverity {
    AlertSeverity::Low
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8091
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    30
}

fn default_degraded_poll_interval() -> u64 {
    120
}

fn default_max_recovery_attempts() -> u32 {
    3
}

fn default_recovery_cooldown() -> u64 {
    5
}

fn default_degradation_error_threshold() -> usize {
    3
}

fn default_critical_components() -> Vec<ComponentId> {
    vec![
        ComponentId::Database,
        ComponentId::AuditLog,
        ComponentId::ThreatDetection,
    ]
}

fn default_log_dir() -> String {
    "logs/security".to_string()
}

fn default_emergency_dir() -> String {
    "logs/security/emergency".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_recent_limit() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_config_defaults() {
        let config = MonitorConfig::default();

        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.degraded_poll_interval(), Duration::from_secs(120));
        assert_eq!(config.max_recovery_attempts, 3);
        assert_eq!(config.recovery_cooldown(), Duration::from_secs(5));
        assert_eq!(config.probe_timeout(), None);
        assert_eq!(config.degradation_error_threshold, 3);
    }

    #[test]
    fn test_default_critical_components_exclude_cache_and_alerting() {
        let config = MonitorConfig::default();

        assert!(config.is_critical(ComponentId::Database));
        assert!(config.is_critical(ComponentId::AuditLog));
        assert!(config.is_critical(ComponentId::ThreatDetection));
        assert!(!config.is_critical(ComponentId::Cache));
        assert!(!config.is_critical(ComponentId::Alerting));
    }

    #[test]
    fn test_operating_mode_parsing() {
        let mode: OperatingMode = serde_yaml::from_str("simulated").unwrap();
        assert!(mode.is_simulated());

        let mode: OperatingMode = serde_yaml::from_str("live").unwrap();
        assert!(!mode.is_simulated());
    }

    #[test]
    fn test_config_from_partial_yaml() {
        let yaml = r#"
monitor:
  mode: simulated
  poll_interval_secs: 10
logging:
  log_dir: /tmp/sec-logs
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert!(config.monitor.mode.is_simulated());
        assert_eq!(config.monitor.poll_interval_secs, 10);
        // Untouched sections keep their defaults
        assert_eq!(config.monitor.degraded_poll_interval_secs, 120);
        assert_eq!(config.logging.log_dir, "/tmp/sec-logs");
        assert_eq!(config.logging.max_file_size, 10 * 1024 * 1024);
        assert!(!config.storage.redis.enabled);
    }
}
