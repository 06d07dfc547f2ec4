use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{classify, CleoError};
use crate::meta::{Alternative, EnvelopeMeta};
use crate::taxonomy::ErrorCode;

const SCHEMA_URI: &str = "https://cleo.dev/schema/envelope/v1.json";

/// The `error` block of a failed envelope (spec.md §4.14).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeError {
    pub code: ErrorCode,
    pub name: String,
    pub message: String,
    pub exit_code: i32,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alternatives: Vec<Alternative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Every invocation emits exactly one of these (spec.md §4.14).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(rename = "_meta")]
    pub meta: EnvelopeMeta,
    pub success: bool,
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
}

impl Envelope {
    /// Build a success envelope. `exit_code` is normally `0`, but the
    /// `success-with-status` band (`100+`) applies when the operation
    /// happened to be a no-op (spec.md §8 property 10).
    #[must_use]
    pub fn success(meta: EnvelopeMeta, result: Value, message: Option<String>) -> Self {
        Self {
            schema: SCHEMA_URI.to_string(),
            meta,
            success: true,
            result: Some(result),
            message,
            error: None,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map_or(0, |e| e.exit_code)
    }

    /// Build an error envelope from a `CleoError`, classifying it into its
    /// taxonomy code and exit-code band.
    #[must_use]
    pub fn error(meta: EnvelopeMeta, error: &CleoError) -> Self {
        let (code, exit_code, kind) = classify(error);
        let recoverable = !matches!(kind, crate::taxonomy::ErrorKind::Internal);
        Self {
            schema: SCHEMA_URI.to_string(),
            meta,
            success: false,
            result: None,
            message: None,
            error: Some(EnvelopeError {
                code,
                name: format!("{code:?}"),
                message: error.to_string(),
                exit_code,
                recoverable,
                fix: None,
                alternatives: Vec::new(),
                details: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn meta() -> EnvelopeMeta {
        EnvelopeMeta::new("cleo", "tasks.show", "req-1", Utc::now())
    }

    #[test]
    fn success_envelope_has_null_error_and_zero_exit_code() {
        let envelope = Envelope::success(meta(), serde_json::json!({"task": "T001"}), None);
        assert!(envelope.success);
        assert!(envelope.error.is_none());
        assert_eq!(envelope.exit_code(), 0);
    }

    #[test]
    fn error_envelope_has_null_result() {
        let err = CleoError::Gate(cleo_gate::GateError::CircularValidation);
        let envelope = Envelope::error(meta(), &err);
        assert!(!envelope.success);
        assert!(envelope.result.is_none());
        assert!(envelope.error.is_some());
        assert!((40..48).contains(&envelope.exit_code()));
    }

    #[test]
    fn envelope_serializes_schema_key_with_dollar_sign() {
        let envelope = Envelope::success(meta(), Value::Null, None);
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("$schema").is_some());
        assert!(json.get("_meta").is_some());
    }
}
