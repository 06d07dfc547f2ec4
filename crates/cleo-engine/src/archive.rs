use chrono::Utc;
use cleo_core::{TaskId, TaskStatus};
use cleo_envelope::CleoError;
use cleo_hierarchy::descendants_closed_set;
use cleo_store::{ArchiveDocument, TaskStoreDocument};

use crate::audit::record;
use crate::context::EngineContext;

/// Severity-tagged warning surfaced by [`delete_preview`] (spec.md §4.12).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteWarning {
    ActiveCancelled(TaskId),
    BrokenDeps(TaskId),
    CascadeDelete(usize),
    ManyDependents(TaskId, usize),
}

/// What a `delete` would affect, computed without mutating anything
/// (spec.md §4.12 "Delete (hard)").
#[derive(Debug, Clone)]
pub struct DeletePreview {
    pub primary: TaskId,
    pub descendants: Vec<TaskId>,
    pub dependents: Vec<TaskId>,
    pub counts_by_status: Vec<(TaskStatus, usize)>,
    pub warnings: Vec<DeleteWarning>,
}

fn children_of(doc: &TaskStoreDocument, parent: &str) -> Vec<TaskId> {
    doc.tasks
        .iter()
        .filter(|t| t.parent_id.as_deref() == Some(parent))
        .map(|t| t.id.clone())
        .collect()
}

fn load(ctx: &EngineContext) -> Result<TaskStoreDocument, CleoError> {
    Ok(cleo_store::read_task_store(&ctx.tasks_path())?)
}

/// Enumerate what a `delete` of `task_id` would affect (spec.md §4.12).
/// Read-only: does not lock or mutate the store.
pub fn delete_preview(ctx: &EngineContext, task_id: &str, cascade: bool) -> Result<DeletePreview, CleoError> {
    let doc = load(ctx)?;
    let descendants: Vec<TaskId> = if cascade {
        descendants_closed_set(task_id, |id| children_of(&doc, id)).into_iter().collect()
    } else {
        Vec::new()
    };

    let removed: Vec<&str> = std::iter::once(task_id).chain(descendants.iter().map(String::as_str)).collect();
    let dependents: Vec<TaskId> = doc
        .tasks
        .iter()
        .filter(|t| t.depends.iter().any(|d| removed.contains(&d.as_str())))
        .map(|t| t.id.clone())
        .collect();

    let mut counts_by_status: Vec<(TaskStatus, usize)> = Vec::new();
    for id in &removed {
        if let Some(task) = doc.tasks.iter().find(|t| t.id == *id) {
            match counts_by_status.iter_mut().find(|(s, _)| *s == task.status) {
                Some((_, n)) => *n += 1,
                None => counts_by_status.push((task.status, 1)),
            }
        }
    }

    let mut warnings = Vec::new();
    if let Some(task) = doc.tasks.iter().find(|t| t.id == task_id)
        && task.status == TaskStatus::Cancelled
    {
        warnings.push(DeleteWarning::ActiveCancelled(task_id.to_string()));
    }
    if !dependents.is_empty() {
        warnings.push(DeleteWarning::BrokenDeps(task_id.to_string()));
        if dependents.len() > 3 {
            warnings.push(DeleteWarning::ManyDependents(task_id.to_string(), dependents.len()));
        }
    }
    if !descendants.is_empty() {
        warnings.push(DeleteWarning::CascadeDelete(descendants.len()));
    }

    Ok(DeletePreview {
        primary: task_id.to_string(),
        descendants,
        dependents,
        counts_by_status,
        warnings,
    })
}

/// Hard-delete `task_id` (and its descendants under `cascade`), refusing
/// completed tasks outright (spec.md §4.12: "use archive"). Requires `force`
/// for non-interactive callers since there is no confirmation prompt here.
pub fn delete(ctx: &EngineContext, task_id: &str, cascade: bool, force: bool) -> Result<DeletePreview, CleoError> {
    crate::lock::with_lock("tasks", ctx.lock_timeout(), || {
        let mut doc = load(ctx)?;
        let task = doc
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| CleoError::Core(cleo_core::CoreError::MalformedId(task_id.to_string())))?;
        if task.status == TaskStatus::Done {
            return Err(CleoError::Core(cleo_core::CoreError::IllegalStatusTransition {
                from: "done".to_string(),
                to: "done".to_string(),
            }));
        }
        if !force {
            return Err(CleoError::Lock(cleo_lock::LockError::AcquisitionFailed {
                reason: "delete requires an explicit force flag for non-interactive callers".to_string(),
            }));
        }

        let preview = delete_preview(ctx, task_id, cascade)?;
        let to_remove: std::collections::HashSet<&str> =
            std::iter::once(task_id).chain(preview.descendants.iter().map(String::as_str)).collect();
        doc.tasks.retain(|t| !to_remove.contains(t.id.as_str()));
        for t in &mut doc.tasks {
            t.depends.retain(|d| !to_remove.contains(d.as_str()));
        }

        crate::backup::stage_safety(ctx, &ctx.tasks_path())?;
        cleo_store::commit_task_store(&ctx.tasks_path(), &mut doc)?;
        record(ctx, "tasks.delete", Some(task_id), None, None)?;
        Ok(preview)
    })
}

/// Move `task_id` (and descendants under `cascade`) from the active store
/// into the cold archive, atomically across both files (spec.md §4.12
/// "Archive").
pub fn archive(ctx: &EngineContext, task_id: &str, cascade: bool, reason: &str) -> Result<Vec<TaskId>, CleoError> {
    crate::lock::with_multi_lock(&["tasks", "archive"], ctx.lock_timeout(), || {
        let mut active = load(ctx)?;
        let mut archived_doc: ArchiveDocument = cleo_store::read(&ctx.archive_path()).unwrap_or_default();

        let ids: Vec<TaskId> = if cascade {
            std::iter::once(task_id.to_string())
                .chain(descendants_closed_set(task_id, |id| children_of(&active, id)))
                .collect()
        } else {
            vec![task_id.to_string()]
        };

        cleo_store::archive::archive_tasks(&mut active, &mut archived_doc, &ids, reason, Utc::now());

        crate::backup::stage_safety(ctx, &ctx.tasks_path())?;
        cleo_store::commit_task_store(&ctx.tasks_path(), &mut active)?;
        cleo_store::write_atomic(&ctx.archive_path(), &archived_doc)?;
        record(ctx, "tasks.archive", Some(task_id), None, None)?;
        Ok(ids)
    })
}

/// Restore `ids` from the cold archive back into the active store,
/// re-checking id uniqueness (spec.md §4.12 "Restore").
pub fn restore(ctx: &EngineContext, ids: &[TaskId]) -> Result<(), CleoError> {
    crate::lock::with_multi_lock(&["tasks", "archive"], ctx.lock_timeout(), || {
        let mut active = load(ctx)?;
        let mut archived_doc: ArchiveDocument = cleo_store::read(&ctx.archive_path())?;

        cleo_store::archive::restore_tasks(&mut archived_doc, &mut active, ids)?;

        crate::backup::stage_safety(ctx, &ctx.tasks_path())?;
        cleo_store::commit_task_store(&ctx.tasks_path(), &mut active)?;
        cleo_store::write_atomic(&ctx.archive_path(), &archived_doc)?;
        for id in ids {
            record(ctx, "tasks.restore", Some(id), None, None)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{create, NewTask};
    use cleo_config::Config;

    fn ctx() -> (tempfile::TempDir, EngineContext) {
        let td = tempfile::TempDir::new().unwrap();
        let dir = camino::Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        cleo_lock::set_thread_home_for_tests(dir.clone());
        let ctx = EngineContext::new(dir, Config::default(), "agent:builder");
        (td, ctx)
    }

    #[test]
    fn archive_then_restore_round_trips_a_task() {
        let (_td, ctx) = ctx();
        let task = create(&ctx, NewTask { title: "A".to_string(), ..NewTask::default() }).unwrap();
        let ids = archive(&ctx, &task.id, false, "stale").unwrap();
        let active = load(&ctx).unwrap();
        assert!(active.tasks.is_empty());

        restore(&ctx, &ids).unwrap();
        let active = load(&ctx).unwrap();
        assert_eq!(active.tasks.len(), 1);
    }

    #[test]
    fn delete_refuses_completed_tasks() {
        let (_td, ctx) = ctx();
        let task = create(&ctx, NewTask { title: "A".to_string(), ..NewTask::default() }).unwrap();
        crate::tasks::transition(&ctx, &task.id, TaskStatus::Done, None).unwrap();
        assert!(delete(&ctx, &task.id, false, true).is_err());
    }

    #[test]
    fn delete_preview_reports_cascade_count() {
        let (_td, ctx) = ctx();
        let epic = create(&ctx, NewTask { title: "Epic".to_string(), ..NewTask::default() }).unwrap();
        create(&ctx, NewTask {
            title: "Child".to_string(),
            parent_id: Some(epic.id.clone()),
            ..NewTask::default()
        })
        .unwrap();
        let preview = delete_preview(&ctx, &epic.id, true).unwrap();
        assert_eq!(preview.descendants.len(), 1);
    }
}
