//! MCP stdio server for an axbridge host.
//!
//! Speaks line-delimited JSON-RPC 2.0 on stdin/stdout and turns each tool
//! call into one request against the host's HTTP facade. Nothing here talks
//! to the browser directly.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

use std::time::Duration;

pub use client::{HttpBackend, ReqwestBackend, DEFAULT_BASE_URL, DEFAULT_HTTP_TIMEOUT};
pub use error::{McpError, Result};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
pub use server::{McpServer, SERVER_NAME};
pub use tools::{catalog, HttpCall, ToolDef};

/// Where the MCP server finds the HTTP facade.
#[derive(Debug, Clone)]
pub struct McpConfig {
    pub base_url: String,
    pub http_timeout: Duration,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Serve MCP on stdin/stdout against the facade at `config.base_url`.
pub fn serve_stdio(config: &McpConfig) -> Result<()> {
    let backend = ReqwestBackend::new(config.base_url.clone(), config.http_timeout)?;
    tracing::info!(base_url = backend.base_url(), "starting MCP server");
    McpServer::new(backend)?.run_stdio()
}
