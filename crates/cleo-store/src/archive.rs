use chrono::{DateTime, Utc};
use cleo_core::TaskId;

use crate::document::{ArchiveBlock, ArchiveDocument, ArchivedTask, TaskStoreDocument};
use crate::error::StoreError;

/// Move `ids` (expected to already include cascaded descendants, computed by
/// `cleo-hierarchy`) from `active` into `archive`, attaching an `_archive`
/// block to each (spec.md §4.12). Callers run this under a multi-lock
/// covering both the active store and archive resources so the move is
/// atomic across both files.
pub fn archive_tasks(
    active: &mut TaskStoreDocument,
    archive: &mut ArchiveDocument,
    ids: &[TaskId],
    reason: &str,
    now: DateTime<Utc>,
) {
    let mut remaining = Vec::with_capacity(active.tasks.len());
    for task in active.tasks.drain(..) {
        if ids.contains(&task.id) {
            archive.archived_tasks.push(ArchivedTask {
                task,
                archive: ArchiveBlock {
                    archived_at: now,
                    reason: reason.to_string(),
                },
            });
        } else {
            remaining.push(task);
        }
    }
    active.tasks = remaining;
}

/// Move `ids` back from `archive` into `active`, re-checking uniqueness
/// against the active store's current ids (spec.md §4.12 "Restore"). Fails
/// without mutating either document if any id collides or is unknown.
pub fn restore_tasks(
    archive: &mut ArchiveDocument,
    active: &mut TaskStoreDocument,
    ids: &[TaskId],
) -> Result<(), StoreError> {
    for id in ids {
        if active.tasks.iter().any(|t| &t.id == id) {
            return Err(StoreError::DuplicateIdOnRestore(id.clone()));
        }
        if !archive.archived_tasks.iter().any(|a| &a.task.id == id) {
            return Err(StoreError::UnknownArchivedTask(id.clone()));
        }
    }

    let mut remaining = Vec::with_capacity(archive.archived_tasks.len());
    for archived in archive.archived_tasks.drain(..) {
        if ids.contains(&archived.task.id) {
            active.tasks.push(archived.task);
        } else {
            remaining.push(archived);
        }
    }
    archive.archived_tasks = remaining;
    Ok(())
}
