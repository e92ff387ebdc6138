//! Browser-extension native-messaging host.
//!
//! A browser extension talks to this process over Chrome native messaging;
//! local tools talk to it over HTTP or MCP. Commands from any number of
//! callers are multiplexed over the single extension connection.
//!
//! # Crate Structure
//!
//! - [`frame`] — Native-messaging framing (u32 LE length + JSON)
//! - [`relay`] — Correlation of concurrent commands over one connection
//! - [`schema`] — JSON Schema validation of tool arguments
//! - [`http`] — Loopback HTTP facade
//! - [`mcp`] — MCP stdio facade speaking to the HTTP facade

/// Re-export frame types.
pub mod frame {
    pub use axbridge_frame::*;
}

/// Re-export relay types.
pub mod relay {
    pub use axbridge_relay::*;
}

/// Re-export schema types.
pub mod schema {
    pub use axbridge_schema::*;
}

/// Re-export HTTP facade types.
pub mod http {
    pub use axbridge_http::*;
}

/// Re-export MCP facade types.
pub mod mcp {
    pub use axbridge_mcp::*;
}
