//! HTTP route handlers.

pub mod info;
pub mod tools;

use std::sync::Arc;

use axbridge_relay::RelayError;
use axum::body::Bytes;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the router with every endpoint, permissive CORS and JSON 404s.
///
/// A known path hit with the wrong method is answered like an unknown path.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(info::routes())
        .merge(tools::routes())
        .fallback(fallback)
        .method_not_allowed_fallback(fallback)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn fallback(method: Method, body: Bytes) -> Response {
    match method {
        Method::OPTIONS => StatusCode::OK.into_response(),
        Method::POST => match parse_body(&body) {
            Ok(_) => ApiError::UnknownEndpoint.into_response(),
            Err(err) => err.into_response(),
        },
        _ => ApiError::NotFound.into_response(),
    }
}

/// Decode a request body into a JSON object. An empty body is `{}`.
pub(crate) fn parse_body(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(ApiError::InvalidJson),
    }
}

/// Run one command on the blocking pool and shape the result as JSON.
///
/// Relay failures are ordinary results: `200 {"error": ...}`.
pub(crate) async fn relay_call(state: &AppState, action: &'static str, params: Value) -> Json<Value> {
    let relay = Arc::clone(&state.relay);
    let timeout = state.command_timeout;
    let outcome =
        tokio::task::spawn_blocking(move || relay.send_command(action, params, timeout)).await;

    match outcome {
        Ok(Ok(response)) => Json(response),
        Ok(Err(err)) => Json(relay_failure(action, &err)),
        Err(err) => {
            tracing::error!(action, error = %err, "relay task aborted");
            Json(json!({ "error": format!("relay task failed: {err}") }))
        }
    }
}

/// Body for a failed command. Timeouts are routine and log quietly.
fn relay_failure(action: &str, err: &RelayError) -> Value {
    if err.is_retryable() {
        tracing::debug!(action, error = %err, "relay command timed out");
    } else {
        tracing::warn!(action, error = %err, "relay command failed");
    }
    err.to_json()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::os::unix::net::UnixStream;
    use std::sync::Arc;
    use std::thread;

    use axbridge_frame::{FrameReader, FrameWriter};
    use axbridge_relay::{Relay, RelayConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::build_router;
    use crate::state::AppState;

    /// Relay wired to a fake extension that echoes every command back.
    pub fn echo_relay() -> Arc<Relay> {
        let (host, ext) = UnixStream::pair().unwrap();
        let relay = Arc::new(Relay::new(host.try_clone().unwrap(), host));
        relay.start().unwrap();

        thread::spawn(move || {
            let mut reader = FrameReader::new(ext.try_clone().unwrap());
            let mut writer = FrameWriter::new(ext);
            while let Ok(command) = reader.read_message() {
                let reply = json!({
                    "id": command["id"],
                    "action": command["action"],
                    "params": command["params"],
                });
                if writer.write_message(&reply).is_err() {
                    break;
                }
            }
        });
        relay
    }

    pub fn connected_router() -> Router {
        build_router(Arc::new(AppState::new(echo_relay())))
    }

    pub fn detached_router() -> Router {
        let relay = Arc::new(Relay::detached(RelayConfig::default()));
        build_router(Arc::new(AppState::new(relay)))
    }

    pub async fn send(router: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}
