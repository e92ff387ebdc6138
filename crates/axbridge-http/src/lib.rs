//! Loopback HTTP facade over the native-messaging relay.
//!
//! Every tool endpoint turns into exactly one relay command, run on the
//! blocking pool so a slow extension never stalls the async runtime.
//! Relay failures come back as `200 {"error": ...}`; only malformed requests
//! get a 4xx.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, HttpError, Result};
pub use routes::build_router;
pub use server::{bind_with_retries, run, serve, ServerConfig, DEFAULT_PORT};
pub use state::AppState;
