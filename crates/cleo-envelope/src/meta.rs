use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `_meta` block stamped onto every envelope (spec.md §4.14).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMeta {
    pub command: String,
    pub operation: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub request_id: String,
    pub transport: String,
}

impl EnvelopeMeta {
    #[must_use]
    pub fn new(command: impl Into<String>, operation: impl Into<String>, request_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            command: command.into(),
            operation: operation.into(),
            timestamp: at,
            version: env!("CARGO_PKG_VERSION").to_string(),
            request_id: request_id.into(),
            transport: "cli".to_string(),
        }
    }
}

/// A `{action, command}` hint surfaced alongside an error (spec.md §4.14).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub action: String,
    pub command: String,
}
