use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::task::{Task, TaskStatus};

/// Whether `to` is a legal transition from `from`, per the state machine in
/// spec.md §4.5.
#[must_use]
pub fn is_legal_transition(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::{Active, Archived, Blocked, Cancelled, Done, Pending};

    if from == to {
        return from != Archived;
    }
    matches!(
        (from, to),
        (Pending, Active | Blocked | Done | Cancelled)
            | (Active, Pending | Blocked | Done | Cancelled)
            | (Blocked, Pending | Active | Done | Cancelled)
            | (Done, Pending | Active)
            | (Cancelled, Pending)
    )
}

/// Apply a status transition to `task`, enforcing entry side effects:
/// `done` stamps `completedAt`; `cancelled` stamps `cancelledAt` and requires
/// `cancellationReason`; `blocked` requires `blockedBy`; reopening from
/// `done`/`cancelled` clears the terminal timestamp and appends an audit
/// note. Does not stamp `updatedAt` — callers use the shared mutation
/// primitive for that.
pub fn transition(
    task: &mut Task,
    to: TaskStatus,
    now: DateTime<Utc>,
    reopen_note_author: &str,
) -> Result<(), CoreError> {
    let from = task.status;
    if !is_legal_transition(from, to) {
        return Err(CoreError::IllegalStatusTransition {
            from: format!("{from:?}").to_lowercase(),
            to: format!("{to:?}").to_lowercase(),
        });
    }

    if to == TaskStatus::Blocked && task.blocked_by.is_none() {
        return Err(CoreError::BlockedRequiresReason);
    }
    if to == TaskStatus::Cancelled && task.cancellation_reason.is_none() {
        return Err(CoreError::CancelledRequiresReason);
    }

    match to {
        TaskStatus::Done => task.completed_at = Some(now),
        TaskStatus::Cancelled => task.cancelled_at = Some(now),
        _ => {}
    }

    if from == TaskStatus::Done && matches!(to, TaskStatus::Pending | TaskStatus::Active) {
        task.completed_at = None;
        task.notes.push(crate::task::TimestampedNote {
            at: now,
            text: "reopened from done".to_string(),
            author: reopen_note_author.to_string(),
        });
    }
    if from == TaskStatus::Cancelled && to == TaskStatus::Pending {
        let original_reason = task.cancellation_reason.take();
        task.notes.push(crate::task::TimestampedNote {
            at: now,
            text: format!(
                "restored from cancelled (was: {})",
                original_reason.as_deref().unwrap_or("no reason recorded")
            ),
            author: reopen_note_author.to_string(),
        });
    }

    task.status = to;
    Ok(())
}

/// Whether every element of `depends` is satisfied: `done` or `cancelled`
/// (spec.md §3.2 invariant 6), given a resolver for each dependency's status.
pub fn depends_satisfied<F>(task: &Task, mut status_of: F) -> bool
where
    F: FnMut(&str) -> Option<TaskStatus>,
{
    task.depends.iter().all(|dep_id| {
        matches!(
            status_of(dep_id),
            Some(TaskStatus::Done | TaskStatus::Cancelled)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, TaskType, Verification};
    use std::collections::BTreeSet;

    fn base_task(status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: "T001".to_string(),
            title: "Implement login flow".to_string(),
            description: "Adds session handling".to_string(),
            task_type: TaskType::Task,
            parent_id: None,
            position: 1,
            position_version: 0,
            status,
            priority: Priority::Medium,
            size: None,
            phase: None,
            depends: BTreeSet::new(),
            relates: Vec::new(),
            blocked_by: if status == TaskStatus::Blocked {
                Some("waiting on design review".to_string())
            } else {
                None
            },
            labels: BTreeSet::new(),
            files: Vec::new(),
            acceptance: Vec::new(),
            notes: Vec::new(),
            epic_lifecycle: None,
            origin: None,
            verification: Verification::default(),
            no_auto_complete: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_by: "agent:claude".to_string(),
            modified_by: "agent:claude".to_string(),
            validated_by: None,
            tested_by: None,
            session_id: None,
        }
    }

    #[test]
    fn pending_to_active_is_legal() {
        assert!(is_legal_transition(TaskStatus::Pending, TaskStatus::Active));
    }

    #[test]
    fn archived_cannot_transition() {
        assert!(!is_legal_transition(
            TaskStatus::Archived,
            TaskStatus::Pending
        ));
    }

    #[test]
    fn done_can_only_reopen_to_pending_or_active() {
        assert!(is_legal_transition(TaskStatus::Done, TaskStatus::Pending));
        assert!(is_legal_transition(TaskStatus::Done, TaskStatus::Active));
        assert!(!is_legal_transition(TaskStatus::Done, TaskStatus::Blocked));
    }

    #[test]
    fn transition_to_done_stamps_completed_at() {
        let mut task = base_task(TaskStatus::Active);
        transition(&mut task, TaskStatus::Done, Utc::now(), "agent:claude").unwrap();
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn transition_to_blocked_requires_blocked_by() {
        let mut task = base_task(TaskStatus::Active);
        task.blocked_by = None;
        let err = transition(&mut task, TaskStatus::Blocked, Utc::now(), "agent:claude")
            .unwrap_err();
        assert_eq!(err, CoreError::BlockedRequiresReason);
    }

    #[test]
    fn reopen_from_done_clears_completed_at_and_adds_note() {
        let mut task = base_task(TaskStatus::Done);
        task.completed_at = Some(Utc::now());
        transition(&mut task, TaskStatus::Pending, Utc::now(), "agent:claude").unwrap();
        assert!(task.completed_at.is_none());
        assert_eq!(task.notes.len(), 1);
    }

    #[test]
    fn depends_satisfied_treats_cancelled_as_satisfied() {
        let mut task = base_task(TaskStatus::Pending);
        task.depends.insert("T002".to_string());
        assert!(depends_satisfied(&task, |_| Some(TaskStatus::Cancelled)));
        assert!(!depends_satisfied(&task, |_| Some(TaskStatus::Active)));
    }
}
