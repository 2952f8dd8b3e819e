//! Collaborator services consumed by the monitor
//!
//! Thin, reconstructible clients for the platform's audit-log and
//! threat-detection subsystems. The monitor owns their call shapes only.

pub mod audit;
pub mod threat;

pub use audit::{AuditLog, DbAuditLog};
pub use threat::{ApiUsageEvent, AuthEvent, DbThreatDetection, ThreatDetection, ThreatMetricsSummary};
