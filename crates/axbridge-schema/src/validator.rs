use jsonschema::Validator;
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Report at most this many violations in one error message.
const MAX_REPORTED_ERRORS: usize = 4;

pub(crate) fn validate_value(name: &str, value: &Value, validator: &Validator) -> Result<()> {
    let mut errors = validator.iter_errors(value);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(MAX_REPORTED_ERRORS - 1) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(SchemaError::ValidationFailed {
            name: name.to_string(),
            message,
        });
    }

    Ok(())
}
