use chrono::{DateTime, Utc};
use cleo_core::Task;
use serde::{Deserialize, Serialize};

/// `_meta` block shared by the active store and the archive (spec.md §6.1,
/// §4.1, §4.3). `counter` backs the ID generator; `checksum` covers the
/// canonical task list only, not the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMeta {
    pub schema_version: u32,
    #[serde(default)]
    pub generation: u64,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub counter: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_session: Option<String>,
}

impl Default for StoreMeta {
    fn default() -> Self {
        Self {
            schema_version: 1,
            generation: 0,
            checksum: String::new(),
            counter: 0,
            active_session: None,
        }
    }
}

/// One entry in the project's ordered phase set (spec.md §3.3). `name` is
/// the key `Task.phase` must match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDefinition {
    pub order: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: PhaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    NotStarted,
    Active,
    Completed,
}

/// The project file (spec.md §3.3): name, the ordered phase set, and which
/// phase is current. Embedded in the active store document rather than a
/// separate file, matching `tasks.json`'s listed shape in spec.md §6.1
/// (`project`, `focus`, `_meta`, `tasks[]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phases: Vec<PhaseDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self { name: String::new(), phases: Vec::new(), current_phase: None }
    }
}

/// Focus binding (spec.md §3.3, §4.9): which task/phase the single active
/// session is working on, its trailing note, its declared next action, and
/// which session currently holds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Focus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_session: Option<String>,
}

/// The active store document (`tasks`, spec.md §6.1): the project file,
/// focus binding, the authoritative task list, and the shared `_meta` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStoreDocument {
    #[serde(rename = "_meta")]
    pub meta: StoreMeta,
    #[serde(default)]
    pub project: ProjectInfo,
    #[serde(default)]
    pub focus: Focus,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Default for TaskStoreDocument {
    fn default() -> Self {
        Self {
            meta: StoreMeta::default(),
            project: ProjectInfo::default(),
            focus: Focus::default(),
            tasks: Vec::new(),
        }
    }
}

impl TaskStoreDocument {
    /// The checksum input is the canonical task list only (spec.md §4.1
    /// "Read safety"), not the full document, so unrelated `_meta` or
    /// `focus` edits don't spuriously invalidate it.
    #[must_use]
    pub fn compute_checksum(&self) -> String {
        cleo_utils::canonicalization::checksum_hex(&self.tasks)
            .expect("tasks always serialize")
    }
}

/// `{archivedAt, reason}` attached to every archived task (spec.md §4.12).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveBlock {
    pub archived_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedTask {
    #[serde(flatten)]
    pub task: Task,
    #[serde(rename = "_archive")]
    pub archive: ArchiveBlock,
}

/// The cold store document (`archive`, spec.md §6.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveDocument {
    #[serde(rename = "_meta")]
    pub meta: StoreMeta,
    #[serde(default)]
    pub archived_tasks: Vec<ArchivedTask>,
}

impl Default for ArchiveDocument {
    fn default() -> Self {
        Self {
            meta: StoreMeta::default(),
            archived_tasks: Vec::new(),
        }
    }
}
