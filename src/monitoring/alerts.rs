//! Alert management
//!
//! Queues, dispatches and records alerts raised by the health monitor and
//! the recovery coordinator. Delivery failures are routed to the fallback
//! logger so they are never silently lost.

use crate::config::AlertingConfig;
use crate::monitoring::fallback::FallbackLogger;
use crate::monitoring::types::{Alert, AlertSeverity, ComponentId};
use crate::utils::error::{MonitorError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Alerts retained in history
const HISTORY_CAPACITY: usize = 1000;

/// Alert manager for handling and dispatching alerts
pub struct AlertManager {
    /// Configuration
    config: AlertingConfig,
    /// Pending alerts queue
    pending_alerts: Arc<Mutex<VecDeque<Alert>>>,
    /// Alert history
    alert_history: Arc<RwLock<VecDeque<Alert>>>,
    /// Alert rules
    alert_rules: Arc<RwLock<HashMap<String, AlertRule>>>,
    /// Notification channels
    notification_channels: Arc<RwLock<Vec<Box<dyn NotificationChannel>>>>,
    /// Whether the alert manager is active
    active: Arc<RwLock<bool>>,
    /// Alert statistics
    stats: Arc<RwLock<AlertStats>>,
    /// Fallback logger for delivery failures
    fallback: Arc<FallbackLogger>,
}

/// Alert rule describing an automated alerting condition
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertRule {
    /// Rule ID
    pub id: String,
    /// Rule name
    pub name: String,
    /// Rule description
    pub description: String,
    /// Component the rule watches, if component-scoped
    pub component: Option<ComponentId>,
    /// Alert severity
    pub severity: AlertSeverity,
    /// Whether the rule is enabled
    pub enabled: bool,
}

/// Notification channel trait
#[async_trait::async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Send a notification
    async fn send(&self, alert: &Alert) -> Result<()>;

    /// Get channel name
    fn name(&self) -> &str;

    /// Check if channel supports severity level
    fn supports_severity(&self, severity: AlertSeverity) -> bool;
}

/// Slack notification channel
pub struct SlackChannel {
    webhook_url: String,
    min_severity: AlertSeverity,
}

/// Console notification channel; always available
pub struct ConsoleChannel {
    min_severity: AlertSeverity,
}

/// Alert statistics
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct AlertStats {
    /// Total alerts sent
    pub total_alerts: u64,
    /// Alerts by severity
    pub alerts_by_severity: HashMap<String, u64>,
    /// Alerts by source
    pub alerts_by_source: HashMap<String, u64>,
    /// Failed notifications
    pub failed_notifications: u64,
    /// Last alert timestamp
    pub last_alert: Option<chrono::DateTime<chrono::Utc>>,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: &AlertingConfig, fallback: Arc<FallbackLogger>) -> Self {
        let notification_channels = Self::build_channels(config);

        let mut rules = HashMap::new();
        for rule in Self::default_rules() {
            rules.insert(rule.id.clone(), rule);
        }

        Self {
            config: config.clone(),
            pending_alerts: Arc::new(Mutex::new(VecDeque::new())),
            alert_history: Arc::new(RwLock::new(VecDeque::new())),
            alert_rules: Arc::new(RwLock::new(rules)),
            notification_channels: Arc::new(RwLock::new(notification_channels)),
            active: Arc::new(RwLock::new(false)),
            stats: Arc::new(RwLock::new(AlertStats::default())),
            fallback,
        }
    }

    fn build_channels(config: &AlertingConfig) -> Vec<Box<dyn NotificationChannel>> {
        let mut channels: Vec<Box<dyn NotificationChannel>> =
            vec![Box::new(ConsoleChannel::new(config.min_severity))];

        // Slack never receives anything below Medium regardless of config
        if let Some(webhook_url) = &config.slack_webhook {
            channels.push(Box::new(SlackChannel::new(
                webhook_url.clone(),
                config.min_severity.max(AlertSeverity::Medium),
            )));
        }

        channels
    }

    fn default_rules() -> Vec<AlertRule> {
        vec![
            AlertRule {
                id: "degraded-mode".to_string(),
                name: "Graceful degradation".to_string(),
                description: "Monitor entered or left degraded polling".to_string(),
                component: None,
                severity: AlertSeverity::High,
                enabled: true,
            },
            AlertRule {
                id: "recovery-exhausted".to_string(),
                name: "Recovery exhausted".to_string(),
                description: "A component exhausted its automatic recovery attempts".to_string(),
                component: None,
                severity: AlertSeverity::Critical,
                enabled: true,
            },
        ]
    }

    /// Start the alert processing task
    pub async fn start(&self) {
        info!("Starting alert manager");
        *self.active.write().await = true;

        let manager = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            loop {
                interval.tick().await;
                if !*manager.active.read().await {
                    break;
                }
                manager.process_pending().await;
            }
        });
    }

    /// Stop the alert manager
    pub async fn stop(&self) {
        info!("Stopping alert manager");
        *self.active.write().await = false;
    }

    /// Queue an alert for delivery
    pub async fn send_alert(&self, alert: Alert) {
        debug!("Queuing alert: {} - {}", alert.severity, alert.title);

        {
            let mut pending = self.pending_alerts.lock().await;
            pending.push_back(alert.clone());
        }

        {
            let mut stats = self.stats.write().await;
            stats.total_alerts += 1;
            *stats
                .alerts_by_severity
                .entry(alert.severity.to_string())
                .or_insert(0) += 1;
            *stats
                .alerts_by_source
                .entry(alert.source.clone())
                .or_insert(0) += 1;
            stats.last_alert = Some(alert.timestamp);
        }

        {
            let mut history = self.alert_history.write().await;
            history.push_back(alert);
            if history.len() > HISTORY_CAPACITY {
                history.pop_front();
            }
        }
    }

    /// Deliver all queued alerts
    pub async fn process_pending(&self) {
        let mut alerts_to_process = Vec::new();
        {
            let mut pending = self.pending_alerts.lock().await;
            while let Some(alert) = pending.pop_front() {
                alerts_to_process.push(alert);
            }
        }

        for alert in alerts_to_process {
            self.process_alert(&alert).await;
        }
    }

    /// Deliver a single alert through every matching channel
    async fn process_alert(&self, alert: &Alert) {
        let channels = self.notification_channels.read().await;

        for channel in channels.iter() {
            if !channel.supports_severity(alert.severity) {
                continue;
            }
            if let Err(e) = channel.send(alert).await {
                warn!("Failed to send alert via {}: {}", channel.name(), e);
                {
                    let mut stats = self.stats.write().await;
                    stats.failed_notifications += 1;
                }
                self.fallback
                    .log_alert_delivery_failure(channel.name(), &e.to_string())
                    .await;
            } else {
                debug!("Alert sent via {}", channel.name());
            }
        }
    }

    /// Add an alert rule
    pub async fn add_rule(&self, rule: AlertRule) {
        info!("Adding alert rule: {}", rule.name);
        let mut rules = self.alert_rules.write().await;
        rules.insert(rule.id.clone(), rule);
    }

    /// Remove an alert rule
    pub async fn remove_rule(&self, rule_id: &str) {
        info!("Removing alert rule: {}", rule_id);
        let mut rules = self.alert_rules.write().await;
        rules.remove(rule_id);
    }

    /// List configured alert rules; backs the alerting health probe
    pub async fn list_rules(&self) -> Vec<AlertRule> {
        let rules = self.alert_rules.read().await;
        rules.values().cloned().collect()
    }

    /// Get alert statistics
    pub async fn get_stats(&self) -> AlertStats {
        self.stats.read().await.clone()
    }

    /// Get alert history, most recent first
    pub async fn get_history(&self, limit: usize) -> Vec<Alert> {
        let history = self.alert_history.read().await;
        history.iter().rev().take(limit).cloned().collect()
    }

    /// Rebuild the notification channels from configuration
    ///
    /// Recovery action for the alerting component: proves a fresh client can
    /// be constructed, without touching queued alerts or history.
    pub async fn reinitialize(&self) -> Result<()> {
        if !self.config.enabled {
            return Err(MonitorError::Alert(
                "alerting is disabled in configuration".to_string(),
            ));
        }

        let channels = Self::build_channels(&self.config);
        if channels.is_empty() {
            return Err(MonitorError::Alert(
                "no notification channels configured".to_string(),
            ));
        }

        *self.notification_channels.write().await = channels;
        info!("Alert notification channels reinitialized");
        Ok(())
    }
}

impl Clone for AlertManager {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            pending_alerts: self.pending_alerts.clone(),
            alert_history: self.alert_history.clone(),
            alert_rules: self.alert_rules.clone(),
            notification_channels: self.notification_channels.clone(),
            active: self.active.clone(),
            stats: self.stats.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl SlackChannel {
    /// Create a new Slack notification channel
    pub fn new(webhook_url: String, min_severity: AlertSeverity) -> Self {
        Self {
            webhook_url,
            min_severity,
        }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for SlackChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let color = match alert.severity {
            AlertSeverity::Low => "#36a64f",      // Green
            AlertSeverity::Medium => "#ff9500",   // Orange
            AlertSeverity::High => "#ff0000",     // Red
            AlertSeverity::Critical => "#8b0000", // Dark Red
        };

        let payload = serde_json::json!({
            "username": "mailsentry",
            "attachments": [{
                "color": color,
                "title": alert.title,
                "text": alert.description,
                "fields": [
                    {
                        "title": "Severity",
                        "value": alert.severity.to_string(),
                        "short": true
                    },
                    {
                        "title": "Source",
                        "value": alert.source,
                        "short": true
                    },
                    {
                        "title": "Time",
                        "value": alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                        "short": true
                    }
                ],
                "footer": "Security Monitoring",
                "ts": alert.timestamp.timestamp()
            }]
        });

        let client = reqwest::Client::new();
        let response = client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MonitorError::Alert(format!("Failed to send Slack notification: {}", e)))?;

        if !response.status().is_success() {
            return Err(MonitorError::Alert(format!(
                "Slack webhook returned status: {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "slack"
    }

    fn supports_severity(&self, severity: AlertSeverity) -> bool {
        severity >= self.min_severity
    }
}

impl ConsoleChannel {
    pub fn new(min_severity: AlertSeverity) -> Self {
        Self { min_severity }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for ConsoleChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        match alert.severity {
            AlertSeverity::Low => info!("[alert] {}: {}", alert.title, alert.description),
            AlertSeverity::Medium => warn!("[alert] {}: {}", alert.title, alert.description),
            AlertSeverity::High | AlertSeverity::Critical => {
                tracing::error!(
                    "[alert:{}] {}: {}",
                    alert.severity,
                    alert.title,
                    alert.description
                )
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }

    fn supports_severity(&self, severity: AlertSeverity) -> bool {
        severity >= self.min_severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FallbackLogConfig;

    fn test_manager() -> (AlertManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let log_config = FallbackLogConfig {
            log_dir: dir.path().join("logs").to_string_lossy().into_owned(),
            emergency_dir: dir.path().join("em").to_string_lossy().into_owned(),
            ..Default::default()
        };
        let fallback = Arc::new(FallbackLogger::new(&log_config));
        let manager = AlertManager::new(&AlertingConfig::default(), fallback);
        (manager, dir)
    }

    #[tokio::test]
    async fn test_send_alert_updates_stats_and_history() {
        let (manager, _dir) = test_manager();

        manager
            .send_alert(Alert::new(
                AlertSeverity::Medium,
                "Recovery attempt",
                "attempt 1 of 3",
                "recovery-coordinator",
            ))
            .await;
        manager
            .send_alert(Alert::new(
                AlertSeverity::Critical,
                "Recovery exhausted",
                "manual intervention required",
                "recovery-coordinator",
            ))
            .await;

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_alerts, 2);
        assert_eq!(stats.alerts_by_severity.get("MEDIUM"), Some(&1));
        assert_eq!(stats.alerts_by_severity.get("CRITICAL"), Some(&1));
        assert_eq!(
            stats.alerts_by_source.get("recovery-coordinator"),
            Some(&2)
        );

        let history = manager.get_history(10).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].title, "Recovery exhausted");
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let (manager, _dir) = test_manager();

        for i in 0..(HISTORY_CAPACITY + 10) {
            manager
                .send_alert(Alert::new(
                    AlertSeverity::Low,
                    format!("alert {}", i),
                    "",
                    "test",
                ))
                .await;
        }

        let history = manager.get_history(HISTORY_CAPACITY + 10).await;
        assert_eq!(history.len(), HISTORY_CAPACITY);
    }

    #[tokio::test]
    async fn test_default_rules_listed() {
        let (manager, _dir) = test_manager();

        let rules = manager.list_rules().await;
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().any(|r| r.id == "recovery-exhausted"));
        assert!(rules.iter().all(|r| r.enabled));
    }

    #[tokio::test]
    async fn test_rule_management() {
        let (manager, _dir) = test_manager();

        manager
            .add_rule(AlertRule {
                id: "database-down".to_string(),
                name: "Database unreachable".to_string(),
                description: "database probe failing".to_string(),
                component: Some(ComponentId::Database),
                severity: AlertSeverity::High,
                enabled: true,
            })
            .await;
        assert_eq!(manager.list_rules().await.len(), 3);

        manager.remove_rule("database-down").await;
        assert_eq!(manager.list_rules().await.len(), 2);
    }

    #[tokio::test]
    async fn test_reinitialize_rebuilds_channels() {
        let (manager, _dir) = test_manager();
        assert!(manager.reinitialize().await.is_ok());
    }

    #[tokio::test]
    async fn test_reinitialize_fails_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let log_config = FallbackLogConfig {
            log_dir: dir.path().join("logs").to_string_lossy().into_owned(),
            emergency_dir: dir.path().join("em").to_string_lossy().into_owned(),
            ..Default::default()
        };
        let fallback = Arc::new(FallbackLogger::new(&log_config));
        let config = AlertingConfig {
            enabled: false,
            ..AlertingConfig::default()
        };
        let manager = AlertManager::new(&config, fallback);

        assert!(manager.reinitialize().await.is_err());
    }

    #[tokio::test]
    async fn test_console_delivery_succeeds() {
        let (manager, _dir) = test_manager();

        manager
            .send_alert(Alert::new(
                AlertSeverity::High,
                "Component failed",
                "database probe failed",
                "health-monitor",
            ))
            .await;
        manager.process_pending().await;

        let stats = manager.get_stats().await;
        assert_eq!(stats.failed_notifications, 0);
    }

    #[test]
    fn test_severity_filtering() {
        let channel = SlackChannel::new("https://hooks.slack.com/test".to_string(), AlertSeverity::Medium);
        assert!(!channel.supports_severity(AlertSeverity::Low));
        assert!(channel.supports_severity(AlertSeverity::Medium));
        assert!(channel.supports_severity(AlertSeverity::Critical));
    }
}
