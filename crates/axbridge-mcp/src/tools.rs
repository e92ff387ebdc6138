//! Tool catalog and its mapping onto the HTTP facade.

use serde_json::{json, Map, Value};

/// The single HTTP call a tool turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpCall {
    Get(&'static str),
    Post(&'static str),
}

/// One MCP tool.
#[derive(Debug, Clone)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub call: HttpCall,
    /// Argument names copied into the HTTP body.
    pub forwarded: &'static [&'static str],
}

impl ToolDef {
    /// Listing entry for `tools/list`.
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }

    /// HTTP body for a call with already validated `arguments`.
    ///
    /// Only the arguments the tool forwards are copied; absent ones stay absent.
    pub fn request_body(&self, arguments: &Value) -> Value {
        let body: Map<String, Value> = self
            .forwarded
            .iter()
            .filter_map(|key| {
                arguments
                    .get(*key)
                    .map(|value| ((*key).to_string(), value.clone()))
            })
            .collect();
        Value::Object(body)
    }
}

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Every tool this server exposes, in listing order.
pub fn catalog() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "browser_get_ax_tree",
            description: "Get the accessibility tree (AXTree) from the current browser tab. \
                Returns a flat list of interactive elements with refId, role, name and attributes. \
                Use the refId to interact with elements using browser_execute_action.",
            input_schema: no_arguments(),
            call: HttpCall::Post("/tools/get_ax_tree"),
            forwarded: &[],
        },
        ToolDef {
            name: "browser_get_ax_tree_compact",
            description: "Get a compact accessibility tree from the current browser tab. \
                Same elements as browser_get_ax_tree in far fewer tokens.",
            input_schema: no_arguments(),
            call: HttpCall::Post("/tools/get_ax_tree_compact"),
            forwarded: &[],
        },
        ToolDef {
            name: "browser_get_page_text",
            description: "Get the visible text of the current page, optionally limited to a \
                CSS selector and truncated to max_length characters.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "max_length": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of characters to return (default 8000)"
                    },
                    "selector": {
                        "type": "string",
                        "description": "CSS selector of the element to read; whole page when omitted"
                    }
                }
            }),
            call: HttpCall::Post("/tools/get_page_text"),
            forwarded: &["max_length", "selector"],
        },
        ToolDef {
            name: "browser_execute_action",
            description: "Execute an action on a browser element by its reference ID \
                (refId from browser_get_ax_tree). Supported actions: click, type, focus, \
                scroll, hover, clear. keypress and scroll_page act on the page and need no \
                ref_id. For 'type' and 'keypress', provide the text parameter.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action_type": {
                        "type": "string",
                        "enum": [
                            "click", "type", "focus", "scroll", "hover", "clear",
                            "keypress", "scroll_page"
                        ],
                        "description": "The action to perform"
                    },
                    "ref_id": {
                        "type": "integer",
                        "description": "The refId of the element from browser_get_ax_tree"
                    },
                    "text": {
                        "type": "string",
                        "description": "Text to type, or the key for keypress"
                    }
                },
                "required": ["action_type"],
                "if": {
                    "properties": { "action_type": { "enum": ["keypress", "scroll_page"] } },
                    "additionalProperties": true
                },
                "else": { "required": ["ref_id"], "additionalProperties": true }
            }),
            call: HttpCall::Post("/tools/execute_action"),
            forwarded: &["action_type", "ref_id", "text"],
        },
        ToolDef {
            name: "browser_health",
            description: "Check whether the axbridge host is up and connected to the browser \
                extension, with heartbeat statistics.",
            input_schema: no_arguments(),
            call: HttpCall::Get("/health"),
            forwarded: &[],
        },
    ]
}
