/// Errors from the MCP facade.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Reading requests or writing responses failed.
    #[error("stdio error: {0}")]
    Io(#[from] std::io::Error),

    /// A response could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP backend could not be reached or answered garbage.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// A tool schema failed to compile.
    #[error("schema error: {0}")]
    Schema(#[from] axbridge_schema::SchemaError),
}

pub type Result<T> = std::result::Result<T, McpError>;
