//! Type hierarchy, depth/sibling caps, and the reparent engine (spec.md
//! §4.6). Depth and cascade queries walk a caller-supplied lookup rather than
//! owning storage, so they can be unit-tested against plain maps and reused
//! unchanged against the real store.

pub mod error;

use std::collections::{HashSet, VecDeque};

use cleo_config::HierarchyConfig;
use cleo_core::{TaskId, TaskStatus, TaskType};
pub use error::HierarchyError;

/// Depth of `task_id`, computed by walking `parent_of` from the task to the
/// root. A root task (no parent) has depth 0.
pub fn compute_depth(task_id: &str, parent_of: impl Fn(&str) -> Option<TaskId>) -> u32 {
    let mut depth = 0;
    let mut current = task_id.to_string();
    while let Some(parent) = parent_of(&current) {
        depth += 1;
        current = parent;
    }
    depth
}

/// The type implied by a parent: root → `epic`, `epic` → `task`, `task` →
/// `subtask`. `subtask` never implies a child type since subtasks cannot
/// have children.
#[must_use]
pub fn implied_type(parent_type: Option<TaskType>) -> Option<TaskType> {
    match parent_type {
        None => Some(TaskType::Epic),
        Some(TaskType::Epic) => Some(TaskType::Task),
        Some(TaskType::Task) => Some(TaskType::Subtask),
        Some(TaskType::Subtask) => None,
    }
}

/// Whether `requested` is a legal override at the resulting `depth` given the
/// parent's type.
pub fn validate_type(
    requested: TaskType,
    parent_type: Option<TaskType>,
    depth: u32,
) -> Result<(), HierarchyError> {
    if depth > 3 {
        return Err(HierarchyError::DepthExceeded);
    }
    let legal = match (parent_type, requested) {
        (None, TaskType::Epic | TaskType::Task) => true,
        (Some(TaskType::Epic), TaskType::Task) => true,
        (Some(TaskType::Task), TaskType::Subtask) => true,
        _ => false,
    };
    if legal {
        Ok(())
    } else {
        Err(HierarchyError::IllegalType {
            requested,
            parent: parent_type,
            depth,
        })
    }
}

/// Check sibling caps on insert or reparent. `countDoneInLimit=false`
/// (default) excludes `done` tasks from the active-sibling count.
pub fn check_sibling_caps(
    parent_id: &str,
    sibling_statuses: &[TaskStatus],
    config: &HierarchyConfig,
) -> Result<(), HierarchyError> {
    let total = sibling_statuses.len() as u32 + 1; // including the task being inserted
    if config.total_cap_enabled() && total > config.max_siblings {
        return Err(HierarchyError::TooManySiblings(
            parent_id.to_string(),
            total,
        ));
    }
    let active = sibling_statuses
        .iter()
        .filter(|s| !matches!(s, TaskStatus::Done))
        .count() as u32
        + 1;
    if active > config.max_active_siblings {
        return Err(HierarchyError::TooManyActiveSiblings(
            parent_id.to_string(),
            active,
        ));
    }
    Ok(())
}

/// Validate a reparent request: the new parent must not be `task_id` itself
/// or any of its descendants (no cycles), and the caller's
/// `expected_position_version` must match the store's current value
/// (optimistic concurrency).
pub fn validate_reparent(
    task_id: &str,
    new_parent_id: Option<&str>,
    descendants_of_task: &HashSet<TaskId>,
    expected_position_version: u32,
    actual_position_version: u32,
) -> Result<(), HierarchyError> {
    if expected_position_version != actual_position_version {
        return Err(HierarchyError::PositionConflict {
            expected: expected_position_version,
            actual: actual_position_version,
        });
    }
    if let Some(new_parent) = new_parent_id
        && (new_parent == task_id || descendants_of_task.contains(new_parent))
    {
        return Err(HierarchyError::Cycle(
            task_id.to_string(),
            new_parent.to_string(),
        ));
    }
    Ok(())
}

/// BFS closed set of `root_id` and all its descendants, used by cascade
/// delete/archive previews (spec.md §9: cascade deletes as a flat BFS
/// closed-set rather than recursive tree mutation).
pub fn descendants_closed_set(
    root_id: &str,
    children_of: impl Fn(&str) -> Vec<TaskId>,
) -> HashSet<TaskId> {
    let mut closed = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(root_id.to_string());
    while let Some(node) = queue.pop_front() {
        for child in children_of(&node) {
            if closed.insert(child.clone()) {
                queue.push_back(child);
            }
        }
    }
    closed
}
