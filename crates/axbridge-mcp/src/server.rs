use std::io::{self, BufRead, Write};

use axbridge_schema::{RegistryConfig, SchemaError, SchemaRegistry};
use serde_json::{json, Map, Value};

use crate::client::HttpBackend;
use crate::error::Result;
use crate::protocol::{error_codes, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION, PROTOCOL_VERSION};
use crate::tools::{catalog, ToolDef};

/// Name announced in `initialize`.
pub const SERVER_NAME: &str = "axbridge";

/// MCP server over line-delimited JSON-RPC.
///
/// Each tool call becomes exactly one request against the HTTP backend.
/// Arguments are validated against the tool's input schema first; a call
/// that fails validation never reaches the backend.
pub struct McpServer<B> {
    backend: B,
    tools: Vec<ToolDef>,
    schemas: SchemaRegistry,
}

impl<B: HttpBackend> McpServer<B> {
    pub fn new(backend: B) -> Result<Self> {
        let tools = catalog();
        let config = RegistryConfig {
            strict_mode: true,
            fail_on_missing_schema: true,
        };
        let schemas = SchemaRegistry::from_schemas(
            tools.iter().map(|tool| (tool.name, &tool.input_schema)),
            config,
        )?;
        Ok(Self {
            backend,
            tools,
            schemas,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Serve requests from `input` until EOF, one response line per request.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<()> {
        tracing::info!(tools = self.tools.len(), "MCP server ready");
        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let Some(response) = self.handle_line(trimmed) else {
                continue;
            };
            let encoded = serde_json::to_string(&response)?;
            output.write_all(encoded.as_bytes())?;
            output.write_all(b"\n")?;
            output.flush()?;
        }
        tracing::info!("stdin closed, MCP server exiting");
        Ok(())
    }

    /// Serve on this process's stdin and stdout.
    pub fn run_stdio(&self) -> Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }

    /// Handle one input line. Notifications produce no response.
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(error = %err, "unparsable request");
                return Some(JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {err}"),
                ));
            }
        };
        self.handle_request(request)
    }

    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification");
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                Some(id),
                error_codes::INVALID_REQUEST,
                "Invalid JSON-RPC version",
            ));
        }

        tracing::debug!(method = %request.method, "request");
        let params = request.params.unwrap_or(Value::Null);
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize(&params)),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.list_tools()),
            "tools/call" => match call_params(&params) {
                Some((name, arguments)) => {
                    JsonRpcResponse::success(id, self.call_tool(name, arguments))
                }
                None => JsonRpcResponse::error(
                    Some(id),
                    error_codes::INVALID_PARAMS,
                    "tools/call requires a string 'name' and object 'arguments'",
                ),
            },
            other => JsonRpcResponse::error(
                Some(id),
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };
        Some(response)
    }

    fn initialize(&self, params: &Value) -> Value {
        let version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(PROTOCOL_VERSION);
        json!({
            "protocolVersion": version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self.tools.iter().map(ToolDef::describe).collect();
        json!({ "tools": tools })
    }

    /// Run one tool and shape the outcome as an MCP tool result.
    pub fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Value {
        let Some(tool) = self.tools.iter().find(|tool| tool.name == name) else {
            tracing::warn!(tool = name, "unknown tool");
            return tool_result(&json!({ "error": format!("Unknown tool: {name}") }), true);
        };

        let arguments = Value::Object(arguments);
        if let Err(err) = self.schemas.validate(name, &arguments) {
            tracing::warn!(tool = name, error = %err, "invalid tool arguments");
            let message = match err {
                SchemaError::ValidationFailed { message, .. } => message,
                other => other.to_string(),
            };
            return tool_result(
                &json!({ "error": format!("Invalid arguments for {name}: {message}") }),
                true,
            );
        }
        let body = tool.request_body(&arguments);
        match self.backend.call(tool.call, &body) {
            Ok(response) => {
                let is_error = response.get("error").is_some();
                tool_result(&response, is_error)
            }
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "http call failed");
                tool_result(&json!({ "error": err.to_string() }), true)
            }
        }
    }
}

/// Extract `(name, arguments)` from `tools/call` params. Missing arguments are `{}`.
fn call_params(params: &Value) -> Option<(&str, Map<String, Value>)> {
    let name = params.get("name")?.as_str()?;
    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return None,
    };
    Some((name, arguments))
}

fn tool_result(body: &Value, is_error: bool) -> Value {
    let text = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}
