//! Capability listing, health and diagnostics.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/health", get(health))
        .route("/status", get(status))
}

/// GET /tools
async fn list_tools() -> Json<Value> {
    Json(json!({
        "tools": [
            {
                "name": "get_ax_tree",
                "description": "Get accessibility tree from current browser tab",
                "parameters": {}
            },
            {
                "name": "get_ax_tree_compact",
                "description": "Get a compact accessibility tree from current browser tab",
                "parameters": {}
            },
            {
                "name": "get_page_text",
                "description": "Get visible text of the current page",
                "parameters": {
                    "max_length": "integer (default 8000)",
                    "selector": "string (optional CSS selector)"
                }
            },
            {
                "name": "execute_action",
                "description": "Execute action on element by refId",
                "parameters": {
                    "action_type": "click|type|focus|scroll|hover|clear|keypress|scroll_page",
                    "ref_id": "integer (not needed for keypress, scroll_page)",
                    "text": "string (for type and keypress)"
                }
            }
        ]
    }))
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.relay.status();
    Json(json!({
        "status": "ok",
        "native_connected": status.running,
        "server_start_time": state.started_at,
        "heartbeat_count": status.heartbeat_count,
        "last_heartbeat_time": status.last_heartbeat_time,
    }))
}

/// GET /status
async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.relay.status();
    Json(json!({
        "server": {
            "start_time": state.started_at,
            "pid": state.pid,
            "uptime_seconds": state.uptime_seconds(),
        },
        "native_messaging": {
            "state": status.state,
            "running": status.running,
            "last_message_time": status.last_message_time,
            "message_count": status.message_count,
            "pending_requests": status.pending_requests,
            "request_counter": status.request_counter,
        },
        "heartbeat": {
            "count": status.heartbeat_count,
            "last_time": status.last_heartbeat_time,
        },
    }))
}
