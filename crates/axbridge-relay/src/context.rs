use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};
use serde::Serialize;

/// Lifecycle of the native-messaging connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Operator-initiated and terminal.
    Stopped,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection state and liveness counters for one relay.
///
/// Counters only ever increase; they are reset by constructing a new context.
#[derive(Debug)]
pub struct ConnectionContext {
    state: Mutex<ConnectionState>,
    request_counter: AtomicU64,
    message_count: AtomicU64,
    heartbeat_count: AtomicU64,
    last_message_time: Mutex<Option<DateTime<Local>>>,
    last_heartbeat_time: Mutex<Option<DateTime<Local>>>,
    started_at: DateTime<Local>,
}

/// Point-in-time copy of a [`ConnectionContext`].
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub running: bool,
    pub started_at: DateTime<Local>,
    pub last_message_time: Option<DateTime<Local>>,
    pub message_count: u64,
    pub request_counter: u64,
    pub pending_requests: usize,
    pub heartbeat_count: u64,
    pub last_heartbeat_time: Option<DateTime<Local>>,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            request_counter: AtomicU64::new(0),
            message_count: AtomicU64::new(0),
            heartbeat_count: AtomicU64::new(0),
            last_message_time: Mutex::new(None),
            last_heartbeat_time: Mutex::new(None),
            started_at: Local::now(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `next`, unless the connection is already `stopped`.
    ///
    /// Returns the previous state when the transition happened.
    pub fn transition(&self, next: ConnectionState) -> Option<ConnectionState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == ConnectionState::Stopped {
            return None;
        }
        let previous = *state;
        *state = next;
        if previous != next {
            tracing::info!(from = %previous, to = %next, "connection state changed");
        }
        Some(previous)
    }

    /// True while a reader is starting or running.
    pub fn is_running(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        )
    }

    /// Allocate the next correlation id ("1", "2", ...).
    pub fn next_request_id(&self) -> String {
        let id = self.request_counter.fetch_add(1, Ordering::SeqCst) + 1;
        id.to_string()
    }

    /// Record one successfully decoded inbound message.
    pub fn record_message(&self) -> u64 {
        *self
            .last_message_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Local::now());
        self.message_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record one heartbeat; returns the new count and the time it was recorded.
    pub fn record_heartbeat(&self) -> (u64, DateTime<Local>) {
        let now = Local::now();
        let mut last = self
            .last_heartbeat_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = self.heartbeat_count.fetch_add(1, Ordering::SeqCst) + 1;
        *last = Some(now);
        (count, now)
    }

    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::SeqCst)
    }

    pub fn heartbeat_count(&self) -> u64 {
        self.heartbeat_count.load(Ordering::SeqCst)
    }

    pub fn request_counter(&self) -> u64 {
        self.request_counter.load(Ordering::SeqCst)
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn last_heartbeat_time(&self) -> Option<DateTime<Local>> {
        *self
            .last_heartbeat_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_message_time(&self) -> Option<DateTime<Local>> {
        *self
            .last_message_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot the context; `pending_requests` comes from the correlation table.
    pub fn snapshot(&self, pending_requests: usize) -> ConnectionStatus {
        let state = self.state();
        ConnectionStatus {
            state,
            running: matches!(
                state,
                ConnectionState::Connecting | ConnectionState::Connected
            ),
            started_at: self.started_at,
            last_message_time: self.last_message_time(),
            message_count: self.message_count(),
            request_counter: self.request_counter(),
            pending_requests,
            heartbeat_count: self.heartbeat_count(),
            last_heartbeat_time: self.last_heartbeat_time(),
        }
    }
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}
