use std::sync::Arc;
use std::time::Duration;

use axbridge_relay::{Relay, DEFAULT_COMMAND_TIMEOUT};
use chrono::{DateTime, Local};

/// Shared state accessible from all route handlers.
#[derive(Debug)]
pub struct AppState {
    pub relay: Arc<Relay>,
    /// Deadline for each relayed command.
    pub command_timeout: Duration,
    pub started_at: DateTime<Local>,
    pub pid: u32,
}

impl AppState {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            started_at: Local::now(),
            pid: std::process::id(),
        }
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn uptime_seconds(&self) -> f64 {
        let elapsed = Local::now().signed_duration_since(self.started_at);
        elapsed.num_milliseconds().max(0) as f64 / 1000.0
    }
}
