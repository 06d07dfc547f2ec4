use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{id, createdAt, endedAt?, scope, focusTaskId?, agent, terminalBinding?, note?}`
/// (spec.md §3.4). Sessions are authoritative for attribution and may bind
/// to a host-provided terminal identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_task_id: Option<String>,
    pub agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_binding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Session {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}
