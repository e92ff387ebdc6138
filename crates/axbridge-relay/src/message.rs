use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Heartbeat request sent by the extension.
pub const ACTION_PING: &str = "PING";
/// Heartbeat reply sent by the host.
pub const ACTION_PONG: &str = "PONG";

/// Outbound command frame: `{id, action, params}`.
#[derive(Debug, Serialize)]
pub struct Command<'a> {
    pub id: &'a str,
    pub action: &'a str,
    pub params: &'a Value,
}

/// Outbound heartbeat reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pong {
    pub action: String,
    /// Echo of the ping's `timestamp`, passed through untouched.
    pub timestamp: Value,
    /// Host clock when the ping was answered (RFC 3339).
    pub server_time: String,
    pub heartbeat_count: u64,
}

impl Pong {
    /// Create a pong answering a ping.
    pub fn new(timestamp: Value, server_time: String, heartbeat_count: u64) -> Self {
        Self {
            action: ACTION_PONG.to_string(),
            timestamp,
            server_time,
            heartbeat_count,
        }
    }
}

/// An inbound message, classified before any routing takes place.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// `{action: "PING", timestamp}`.
    Ping { timestamp: Value },
    /// `{action: "PONG", ...}`; not expected from the extension.
    Pong(Value),
    /// Any message carrying a string `id`; the full message is kept.
    Response { id: String, message: Map<String, Value> },
    /// Anything else: push notifications, unknown actions, non-objects.
    Event(Value),
}

impl Inbound {
    /// Classify a decoded inbound message.
    pub fn classify(message: Value) -> Self {
        let Value::Object(map) = message else {
            return Inbound::Event(message);
        };

        match map.get("action").and_then(Value::as_str) {
            Some(ACTION_PING) => {
                let timestamp = map.get("timestamp").cloned().unwrap_or(Value::Null);
                return Inbound::Ping { timestamp };
            }
            Some(ACTION_PONG) => return Inbound::Pong(Value::Object(map)),
            _ => {}
        }

        match map.get("id").and_then(Value::as_str) {
            Some(id) => Inbound::Response {
                id: id.to_string(),
                message: map,
            },
            None => Inbound::Event(Value::Object(map)),
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::Ping { .. } => "ping",
            Inbound::Pong(_) => "pong",
            Inbound::Response { .. } => "response",
            Inbound::Event(_) => "event",
        }
    }
}
