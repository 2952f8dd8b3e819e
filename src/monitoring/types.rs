//! Type definitions for health state, probes, alerts and fallback logs

use serde::{Deserialize, Serialize};

/// Identity of a monitored dependency
///
/// Typed classification replaces the error-message substring matching the
/// platform previously used to route recovery; probes report their own
/// component so routing never depends on text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentId {
    Database,
    Cache,
    AuditLog,
    ThreatDetection,
    Alerting,
    Unknown,
}

impl ComponentId {
    /// Short tag used in log events and recovery labels
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentId::Database => "database",
            ComponentId::Cache => "cache",
            ComponentId::AuditLog => "audit",
            ComponentId::ThreatDetection => "threat-detection",
            ComponentId::Alerting => "alerting",
            ComponentId::Unknown => "unknown",
        }
    }

    /// All probe-backed components, in probe order
    pub fn probed() -> [ComponentId; 5] {
        [
            ComponentId::Database,
            ComponentId::Cache,
            ComponentId::AuditLog,
            ComponentId::ThreatDetection,
            ComponentId::Alerting,
        ]
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentId::Database => write!(f, "Database"),
            ComponentId::Cache => write!(f, "Cache"),
            ComponentId::AuditLog => write!(f, "Audit logging"),
            ComponentId::ThreatDetection => write!(f, "Threat detection"),
            ComponentId::Alerting => write!(f, "Alerting"),
            ComponentId::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Outcome of a single probe invocation
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Which dependency was probed
    pub component: ComponentId,
    /// Whether the dependency answered
    pub healthy: bool,
    /// Error detail when unhealthy
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn healthy(component: ComponentId) -> Self {
        Self {
            component,
            healthy: true,
            error: None,
        }
    }

    pub fn failed(component: ComponentId, error: impl Into<String>) -> Self {
        Self {
            component,
            healthy: false,
            error: Some(error.into()),
        }
    }

    /// Human-readable entry for the health snapshot's error list
    pub fn error_message(&self) -> String {
        format!("{} failed", self.component)
    }
}

/// Aggregate health snapshot, rebuilt at the end of every poll cycle
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub database: bool,
    pub cache: bool,
    pub audit_logging: bool,
    pub threat_detection: bool,
    pub alerting: bool,
    /// Combined health of the configured critical components
    pub overall: bool,
    /// Timestamp of the most recently completed cycle
    pub last_check: chrono::DateTime<chrono::Utc>,
    /// One entry per failed probe this cycle; replaced, never appended
    pub errors: Vec<String>,
}

impl HealthStatus {
    /// Snapshot with every component healthy
    pub fn all_healthy() -> Self {
        Self {
            database: true,
            cache: true,
            audit_logging: true,
            threat_detection: true,
            alerting: true,
            overall: true,
            last_check: chrono::Utc::now(),
            errors: Vec::new(),
        }
    }

    /// Read a per-component flag
    pub fn component(&self, id: ComponentId) -> bool {
        match id {
            ComponentId::Database => self.database,
            ComponentId::Cache => self.cache,
            ComponentId::AuditLog => self.audit_logging,
            ComponentId::ThreatDetection => self.threat_detection,
            ComponentId::Alerting => self.alerting,
            ComponentId::Unknown => false,
        }
    }

    /// Write a per-component flag
    pub fn set_component(&mut self, id: ComponentId, healthy: bool) {
        match id {
            ComponentId::Database => self.database = healthy,
            ComponentId::Cache => self.cache = healthy,
            ComponentId::AuditLog => self.audit_logging = healthy,
            ComponentId::ThreatDetection => self.threat_detection = healthy,
            ComponentId::Alerting => self.alerting = healthy,
            ComponentId::Unknown => {}
        }
    }
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Low => write!(f, "LOW"),
            AlertSeverity::Medium => write!(f, "MEDIUM"),
            AlertSeverity::High => write!(f, "HIGH"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Alert information
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    /// Alert ID
    pub id: String,
    /// Alert severity
    pub severity: AlertSeverity,
    /// Alert title
    pub title: String,
    /// Alert description
    pub description: String,
    /// Alert timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Alert source
    pub source: String,
    /// Alert metadata
    pub metadata: serde_json::Value,
    /// Whether the alert is resolved
    pub resolved: bool,
}

impl Alert {
    pub fn new(
        severity: AlertSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            severity,
            title: title.into(),
            description: description.into(),
            timestamp: chrono::Utc::now(),
            source: source.into(),
            metadata: serde_json::json!({}),
            resolved: false,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Severity of a fallback log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackLogLevel {
    Info,
    Warn,
    Error,
    Critical,
}

impl std::fmt::Display for FallbackLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackLogLevel::Info => write!(f, "info"),
            FallbackLogLevel::Warn => write!(f, "warn"),
            FallbackLogLevel::Error => write!(f, "error"),
            FallbackLogLevel::Critical => write!(f, "critical"),
        }
    }
}

/// One durably recorded monitoring event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackLogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: FallbackLogLevel,
    /// Originating service tag
    pub service: String,
    /// Event tag, e.g. `recovery_attempt` or `health_check_issues`
    pub event: String,
    /// Free-form payload
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FallbackLogEntry {
    pub fn new(
        level: FallbackLogLevel,
        service: impl Into<String>,
        event: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            level,
            service: service.into(),
            event: event.into(),
            data,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_report_error_message() {
        let report = ProbeReport::failed(ComponentId::Database, "connection refused");
        assert_eq!(report.error_message(), "Database failed");

        let report = ProbeReport::failed(ComponentId::AuditLog, "insert failed");
        assert_eq!(report.error_message(), "Audit logging failed");

        let report = ProbeReport::failed(ComponentId::ThreatDetection, "query failed");
        assert_eq!(report.error_message(), "Threat detection failed");
    }

    #[test]
    fn test_component_tags() {
        assert_eq!(ComponentId::Database.as_str(), "database");
        assert_eq!(ComponentId::Cache.as_str(), "cache");
        assert_eq!(ComponentId::AuditLog.as_str(), "audit");
        assert_eq!(ComponentId::ThreatDetection.as_str(), "threat-detection");
        assert_eq!(ComponentId::Alerting.as_str(), "alerting");
        assert_eq!(ComponentId::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_health_status_component_accessors() {
        let mut status = HealthStatus::all_healthy();
        assert!(status.component(ComponentId::Cache));

        status.set_component(ComponentId::Cache, false);
        assert!(!status.cache);
        assert!(!status.component(ComponentId::Cache));
        // Unknown is never healthy and never writable
        assert!(!status.component(ComponentId::Unknown));
    }

    #[test]
    fn test_alert_severity_ordering() {
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert!(AlertSeverity::Medium < AlertSeverity::High);
        assert!(AlertSeverity::High < AlertSeverity::Critical);
        assert_eq!(AlertSeverity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_alert_creation() {
        let alert = Alert::new(
            AlertSeverity::Medium,
            "Recovery attempt",
            "Attempting automatic recovery for database",
            "recovery-coordinator",
        )
        .with_metadata(serde_json::json!({"attempt": 1}));

        assert_eq!(alert.severity, AlertSeverity::Medium);
        assert!(!alert.resolved);
        assert_eq!(alert.metadata["attempt"], 1);
    }

    #[test]
    fn test_fallback_entry_roundtrip() {
        let entry = FallbackLogEntry::new(
            FallbackLogLevel::Error,
            "security-monitoring",
            "health_check_issues",
            serde_json::json!({"errors": ["Database failed"]}),
        )
        .with_error("connection refused");

        let line = serde_json::to_string(&entry).unwrap();
        let parsed: FallbackLogEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.event, "health_check_issues");
        assert_eq!(parsed.error.as_deref(), Some("connection refused"));
    }
}
