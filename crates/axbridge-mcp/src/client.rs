use std::time::Duration;

use serde_json::Value;

use crate::error::{McpError, Result};
use crate::tools::HttpCall;

/// Base URL of a host started with default settings.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8765";

/// Per-request timeout against the HTTP facade.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The HTTP facade as seen from the MCP server.
pub trait HttpBackend {
    /// Perform `call` and decode the JSON body, whatever the status code.
    fn call(&self, call: HttpCall, body: &Value) -> Result<Value>;
}

/// Blocking `reqwest` client against a running host.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ReqwestBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| McpError::Http(err.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl HttpBackend for ReqwestBackend {
    fn call(&self, call: HttpCall, body: &Value) -> Result<Value> {
        let request = match call {
            HttpCall::Get(path) => self.client.get(self.url(path)),
            HttpCall::Post(path) => self.client.post(self.url(path)).json(body),
        };
        let response = request
            .send()
            .map_err(|err| McpError::Http(err.to_string()))?;
        let status = response.status();
        tracing::debug!(?call, %status, "http facade answered");
        response
            .json::<Value>()
            .map_err(|err| McpError::Http(format!("{status}: {err}")))
    }
}
