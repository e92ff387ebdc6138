//! Request/response multiplexing over one native-messaging connection.
//!
//! Many callers send commands concurrently; one reader thread owns the
//! inbound stream and hands each response to the caller waiting on its id.
//! Heartbeat pings are answered inline. Anything else is an event.

pub mod context;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod pending;
pub mod relay;
pub mod stdio;

pub use context::{ConnectionContext, ConnectionState, ConnectionStatus};
pub use error::{RelayError, Result};
pub use heartbeat::answer_ping;
pub use message::{Command, Inbound, Pong, ACTION_PING, ACTION_PONG};
pub use pending::{Delivery, PendingRequest, PendingTable};
pub use relay::{EventHandler, Relay, RelayConfig, DEFAULT_COMMAND_TIMEOUT};
pub use stdio::stdio_relay;
