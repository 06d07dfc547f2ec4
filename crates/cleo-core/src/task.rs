use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// `T` + digits, unique across active, archived, and cancelled collections.
/// Immutable after creation (spec.md §3.1).
pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Epic,
    Task,
    Subtask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Active,
    Blocked,
    Done,
    Cancelled,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpicLifecycle {
    Backlog,
    Planning,
    Active,
    Review,
    Released,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Related,
    Blocks,
    Duplicates,
    Absorbs,
    Fixes,
    Extends,
    Supersedes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Human,
    Agent,
    Imported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub target_id: TaskId,
    pub relation_type: RelationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub implemented: bool,
    pub tests_passed: bool,
    pub qa_passed: bool,
    pub cleanup_done: bool,
    pub security_passed: bool,
    pub documented: bool,
    pub round: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_agent: Option<String>,
    #[serde(default)]
    pub failure_log: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub parent_id: Option<TaskId>,
    pub position: u32,
    pub position_version: u32,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub size: Option<Size>,
    pub phase: Option<String>,
    #[serde(default)]
    pub depends: BTreeSet<TaskId>,
    #[serde(default)]
    pub relates: Vec<Relation>,
    pub blocked_by: Option<String>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub acceptance: Vec<String>,
    #[serde(default)]
    pub notes: Vec<TimestampedNote>,
    pub epic_lifecycle: Option<EpicLifecycle>,
    pub origin: Option<Origin>,
    #[serde(default)]
    pub verification: Verification,
    #[serde(default)]
    pub no_auto_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_by: String,
    pub modified_by: String,
    pub validated_by: Option<String>,
    pub tested_by: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampedNote {
    pub at: DateTime<Utc>,
    pub text: String,
    pub author: String,
}

const SHELL_METACHARACTERS: &[char] = &['`', '$', ';', '&', '|', '<', '>', '\\'];

/// Validate the fields that JSON Schema cannot express (spec.md §3.2, §4.2):
/// title/description bounds and distinctness, blockedBy/cancellationReason
/// couplings with status, label shape, future-timestamp window.
pub fn validate_task(task: &Task, now: DateTime<Utc>) -> Result<(), Vec<CoreError>> {
    let mut errors = Vec::new();

    if task.title.is_empty() || task.title.chars().count() > 120 {
        errors.push(CoreError::InvalidTitle {
            len: task.title.chars().count(),
        });
    }
    if task.description.chars().count() > 2000 {
        errors.push(CoreError::InvalidDescription {
            len: task.description.chars().count(),
        });
    }
    if !task.description.is_empty()
        && task.title.trim().eq_ignore_ascii_case(task.description.trim())
    {
        errors.push(CoreError::TitleEqualsDescription);
    }

    match task.status {
        TaskStatus::Blocked => {
            let ok = task
                .blocked_by
                .as_ref()
                .is_some_and(|s| (5..=300).contains(&s.chars().count()));
            if !ok {
                errors.push(CoreError::InvalidBlockedBy);
            }
        }
        TaskStatus::Cancelled => {
            let ok = task.cancellation_reason.as_ref().is_some_and(|s| {
                (5..=300).contains(&s.chars().count())
                    && !s.chars().any(|c| SHELL_METACHARACTERS.contains(&c))
            });
            if !ok {
                errors.push(CoreError::InvalidCancellationReason);
            }
        }
        _ => {}
    }

    for label in &task.labels {
        if !is_valid_label(label) {
            errors.push(CoreError::InvalidLabel(label.clone()));
        }
    }

    let max_future = now + chrono::Duration::minutes(5);
    for ts in [
        Some(task.created_at),
        Some(task.updated_at),
        task.completed_at,
        task.cancelled_at,
    ]
    .into_iter()
    .flatten()
    {
        if ts > max_future {
            errors.push(CoreError::FutureTimestamp(ts.to_rfc3339()));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// `^[a-z][a-z0-9.-]*$`
fn is_valid_label(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}
