//! Shared application state

use crate::config::Config;
use crate::monitoring::ResilientMonitor;
use std::sync::Arc;

/// State handed to every request handler
///
/// The monitor is optional: the control surface stays up even when monitor
/// initialization failed, answering 503 instead of taking the process down.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// The security monitor, when initialization succeeded
    pub monitor: Option<Arc<ResilientMonitor>>,
}

impl AppState {
    pub fn new(config: Config, monitor: Option<Arc<ResilientMonitor>>) -> Self {
        Self { config, monitor }
    }
}
