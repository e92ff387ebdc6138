use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors that stop the HTTP facade.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The listening address stayed unavailable after every attempt.
    #[error("could not bind {addr} after {attempts} attempt(s): {source}")]
    Bind {
        addr: SocketAddr,
        attempts: u32,
        source: std::io::Error,
    },

    /// The server loop failed.
    #[error("http server error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HttpError>;

/// A request rejected by the facade before it reaches the relay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing action_type")]
    MissingActionType,

    #[error("Missing ref_id for this action_type")]
    MissingRefId,

    #[error("Not found")]
    NotFound,

    #[error("Unknown endpoint")]
    UnknownEndpoint,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson | ApiError::MissingActionType | ApiError::MissingRefId => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound | ApiError::UnknownEndpoint => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
