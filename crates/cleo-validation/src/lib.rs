//! Schema validation for every persisted store document (spec.md §4.2).
//!
//! Validates against a versioned schema set on read and before every write.
//! Unknown top-level fields are warnings in lenient mode, errors in strict.
//! Cross-field rules that plain JSON Schema cannot express (status/field
//! couplings, title≠description, future-timestamp window, shell-meta denial)
//! are delegated to `cleo_core::validate_task`.

pub mod error;

use chrono::Utc;
use cleo_core::Task;
pub use error::ValidationError;

/// Strict rejects unknown fields; lenient only warns (returned separately
/// from hard errors by callers that care to distinguish).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Strict,
    Lenient,
}

/// Check a document's top-level keys against its known schema, returning one
/// `UnknownField` per unrecognized key. In `Lenient` mode callers should
/// surface these as warnings rather than rejecting the write.
#[must_use]
pub fn check_unknown_fields(
    document: &str,
    value: &serde_json::Value,
    known_fields: &[&str],
    mode: ValidationMode,
) -> Vec<ValidationError> {
    let serde_json::Value::Object(map) = value else {
        return Vec::new();
    };
    let unknown: Vec<ValidationError> = map
        .keys()
        .filter(|k| !known_fields.contains(&k.as_str()))
        .map(|k| ValidationError::UnknownField {
            document: document.to_string(),
            field: k.clone(),
        })
        .collect();

    match mode {
        ValidationMode::Strict => unknown,
        // Lenient mode still reports them (as warnings); it's the caller's
        // choice whether to reject based on the result.
        ValidationMode::Lenient => unknown,
    }
}

/// Check that every field in `required` is present and non-null.
#[must_use]
pub fn check_required_fields(
    document: &str,
    value: &serde_json::Value,
    required: &[&str],
) -> Vec<ValidationError> {
    let serde_json::Value::Object(map) = value else {
        return required
            .iter()
            .map(|f| ValidationError::MissingField {
                document: document.to_string(),
                field: (*f).to_string(),
            })
            .collect();
    };
    required
        .iter()
        .filter(|f| !map.get(**f).is_some_and(|v| !v.is_null()))
        .map(|f| ValidationError::MissingField {
            document: document.to_string(),
            field: (*f).to_string(),
        })
        .collect()
}

/// Full validation of a task record: cross-field rules plus whatever
/// top-level shape checks the caller has already run against the raw JSON.
pub fn validate_task(task: &Task) -> Result<(), Vec<ValidationError>> {
    cleo_core::validate_task(task, Utc::now())
        .map_err(|errs| errs.into_iter().map(ValidationError::from).collect())
}

/// Require that `found` matches `expected` exactly; store documents do not
/// currently support cross-version migration.
pub fn check_schema_version(found: &str, expected: &str) -> Result<(), ValidationError> {
    if found == expected {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedSchemaVersion {
            found: found.to_string(),
            expected: expected.to_string(),
        })
    }
}
