use jsonschema::{validator_for, Validator};
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    #[error("Schema parse error: {0}")]
    SchemaParse(#[from] serde_json::Error),
    #[error("Schema compile error: {0}")]
    SchemaCompile(String),
    #[error("Instance validation failed")]
    ValidationFailed,
}

/// Validate a JSON instance against a JSON Schema (draft 2020-12).
/// Returns Ok(()) if valid, Err otherwise.
pub fn validate_json(schema_str: &str, instance_str: &str) -> Result<(), SchemaValidationError> {
    let schema_json: Value = serde_json::from_str(schema_str)?;
    let instance_json: Value = serde_json::from_str(instance_str)?;

    let validator = validator_for(&schema_json)
        .map_err(|e| SchemaValidationError::SchemaCompile(e.to_string()))?;

    if validator.is_valid(&instance_json) {
        Ok(())
    } else {
        Err(SchemaValidationError::ValidationFailed)
    }
}

/// Rejection produced by [`ArgumentValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid arguments: {reason}")]
    MissingOrWrongType { reason: String },
}

/// Checks tool arguments for the single required `url` string.
///
/// The published tool schema only says `url` is a required string; the
/// compiled schema here also rejects the empty string. URL syntax is left
/// to the reader.
pub struct ArgumentValidator {
    validator: Validator,
}

impl ArgumentValidator {
    pub fn new() -> Result<Self, SchemaValidationError> {
        let schema = json!({
            "type": "object",
            "required": ["url"],
            "properties": {
                "url": { "type": "string", "minLength": 1 }
            }
        });
        let validator = validator_for(&schema)
            .map_err(|e| SchemaValidationError::SchemaCompile(e.to_string()))?;
        Ok(Self { validator })
    }

    /// Return the `url` argument, or why the arguments are unusable.
    pub fn validate(&self, arguments: &Value) -> Result<String, ValidationError> {
        if self.validator.is_valid(arguments) {
            if let Some(url) = arguments.get("url").and_then(Value::as_str) {
                return Ok(url.to_string());
            }
        }
        Err(ValidationError::MissingOrWrongType {
            reason: describe(arguments),
        })
    }
}

impl std::fmt::Debug for ArgumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentValidator").finish_non_exhaustive()
    }
}

fn describe(arguments: &Value) -> String {
    let Some(obj) = arguments.as_object() else {
        return "arguments must be an object".into();
    };
    match obj.get("url") {
        None | Some(Value::Null) => "missing required argument 'url'".into(),
        Some(Value::String(_)) => "argument 'url' must not be empty".into(),
        Some(_) => "argument 'url' must be a string".into(),
    }
}
