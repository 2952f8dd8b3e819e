//! Security monitoring subsystem
//!
//! Health aggregation, bounded recovery, alerting and the cascading
//! fallback logger.

pub mod aggregator;
pub mod alerts;
pub mod fallback;
pub mod monitor;
pub mod probes;
pub mod recovery;
pub mod types;

pub use aggregator::HealthAggregator;
pub use alerts::{AlertManager, AlertRule, AlertStats};
pub use fallback::{FallbackLogger, FallbackLoggerStats, MemoryRingLogger};
pub use monitor::{DegradationController, ResilientMonitor};
pub use probes::{standard_probes, ComponentProbe};
pub use recovery::RecoveryCoordinator;
pub use types::{
    Alert, AlertSeverity, ComponentId, FallbackLogEntry, FallbackLogLevel, HealthStatus,
    ProbeReport,
};
