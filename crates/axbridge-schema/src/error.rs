/// Errors that can occur during schema validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema could not be compiled.
    #[error("failed to compile schema for {name}: {message}")]
    CompileFailed { name: String, message: String },

    /// The arguments failed schema validation.
    #[error("invalid arguments for {name}: {message}")]
    ValidationFailed { name: String, message: String },

    /// No schema registered under the given name.
    #[error("no schema registered for {0}")]
    NoSchema(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
