//! Tool endpoints: each maps to exactly one relay command.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use super::{parse_body, relay_call};
use crate::error::ApiError;
use crate::state::AppState;

pub const ACTION_GET_AX_TREE: &str = "GET_AX_TREE";
pub const ACTION_GET_AX_TREE_COMPACT: &str = "GET_AX_TREE_COMPACT";
pub const ACTION_GET_PAGE_TEXT: &str = "GET_PAGE_TEXT";
pub const ACTION_EXECUTE_ACTION: &str = "EXECUTE_ACTION";

/// Default `max_length` for page text.
pub const DEFAULT_MAX_TEXT_LENGTH: u64 = 8000;

/// Page-level actions that target no element.
const GLOBAL_ACTIONS: [&str; 2] = ["keypress", "scroll_page"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tools/get_ax_tree", post(get_ax_tree))
        .route("/tools/get_ax_tree_compact", post(get_ax_tree_compact))
        .route("/tools/get_page_text", post(get_page_text))
        .route("/tools/execute_action", post(execute_action))
}

async fn get_ax_tree(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    parse_body(&body)?;
    Ok(relay_call(&state, ACTION_GET_AX_TREE, json!({})).await)
}

async fn get_ax_tree_compact(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    parse_body(&body)?;
    Ok(relay_call(&state, ACTION_GET_AX_TREE_COMPACT, json!({})).await)
}

async fn get_page_text(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let data = parse_body(&body)?;
    Ok(relay_call(&state, ACTION_GET_PAGE_TEXT, page_text_params(&data)).await)
}

async fn execute_action(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let data = parse_body(&body)?;
    let params = execute_action_params(&data)?;
    Ok(relay_call(&state, ACTION_EXECUTE_ACTION, params).await)
}

/// `{max_length, selector}` → `{maxLength, selector}`.
pub fn page_text_params(data: &Map<String, Value>) -> Value {
    let max_length = match data.get("max_length") {
        None | Some(Value::Null) => json!(DEFAULT_MAX_TEXT_LENGTH),
        Some(value) => value.clone(),
    };
    json!({
        "maxLength": max_length,
        "selector": data.get("selector").cloned().unwrap_or(Value::Null),
    })
}

/// `{action_type, ref_id, text}` → `{type, refId, text}`.
///
/// `ref_id` may be omitted only for page-level actions.
pub fn execute_action_params(data: &Map<String, Value>) -> Result<Value, ApiError> {
    let action_type = match data.get("action_type") {
        Some(Value::String(kind)) if !kind.is_empty() => kind.as_str(),
        _ => return Err(ApiError::MissingActionType),
    };

    let ref_id = data.get("ref_id").cloned().unwrap_or(Value::Null);
    if ref_id.is_null() && !GLOBAL_ACTIONS.contains(&action_type) {
        return Err(ApiError::MissingRefId);
    }

    Ok(json!({
        "type": action_type,
        "refId": ref_id,
        "text": data.get("text").cloned().unwrap_or(Value::Null),
    }))
}
