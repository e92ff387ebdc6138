//! JSON Schema validation of tool-call arguments.
//!
//! Each tool's `inputSchema` is compiled once and looked up by tool name.
//! Arguments are checked before anything leaves the process.

pub mod config;
pub mod error;
pub mod registry;
pub mod validator;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
