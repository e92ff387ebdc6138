use serde_json::Value;

use crate::context::ConnectionContext;
use crate::message::Pong;

/// Build the reply to a heartbeat ping and record it on the context.
///
/// The ping's `timestamp` is echoed untouched, whatever its JSON type.
pub fn answer_ping(context: &ConnectionContext, timestamp: Value) -> Pong {
    let (count, now) = context.record_heartbeat();
    tracing::debug!(heartbeat_count = count, "heartbeat ping");
    Pong::new(timestamp, now.to_rfc3339(), count)
}
