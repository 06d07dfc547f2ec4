use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use cleo_core::{ids, status, Priority, Size, Task, TaskStatus, TaskType, TimestampedNote, Verification};
use cleo_envelope::CleoError;
use cleo_graph::DependencyGraph;
use cleo_hierarchy::{check_sibling_caps, compute_depth, implied_type, validate_type};

use crate::audit::record;
use crate::context::EngineContext;

/// How a list field is mutated by `update` (spec.md §4.4 edit-mode vocabulary).
#[derive(Debug, Clone)]
pub enum EditOp<T> {
    Append(T),
    Replace(T),
    Clear,
}

fn apply_set(current: &mut BTreeSet<String>, op: EditOp<BTreeSet<String>>) {
    match op {
        EditOp::Append(items) => current.extend(items),
        EditOp::Replace(items) => *current = items,
        EditOp::Clear => current.clear(),
    }
}

fn apply_vec(current: &mut Vec<String>, op: EditOp<Vec<String>>) {
    match op {
        EditOp::Append(mut items) => current.append(&mut items),
        EditOp::Replace(items) => *current = items,
        EditOp::Clear => current.clear(),
    }
}

/// Patch for `verification.gates.*` (spec.md §4.8 release checks read these
/// back). Every field is independently optional; omitted fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct VerificationPatch {
    pub implemented: Option<bool>,
    pub tests_passed: Option<bool>,
    pub qa_passed: Option<bool>,
    pub cleanup_done: Option<bool>,
    pub security_passed: Option<bool>,
    pub documented: Option<bool>,
}

impl VerificationPatch {
    fn apply(&self, v: &mut Verification) {
        if let Some(x) = self.implemented {
            v.implemented = x;
        }
        if let Some(x) = self.tests_passed {
            v.tests_passed = x;
        }
        if let Some(x) = self.qa_passed {
            v.qa_passed = x;
        }
        if let Some(x) = self.cleanup_done {
            v.cleanup_done = x;
        }
        if let Some(x) = self.security_passed {
            v.security_passed = x;
        }
        if let Some(x) = self.documented {
            v.documented = x;
        }
    }
}

/// Caller-supplied fields for `tasks.update` (spec.md §4.4): scalar fields
/// are overwritten when present, list fields follow `EditOp`'s
/// append/replace/clear vocabulary, notes are append-only. `validated_by`
/// and `tested_by` are stamped with the calling actor's identity when
/// requested — callers attest to validating/testing, they never supply an
/// arbitrary identity (spec.md §3.1 "stamped by engine, not by callers").
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub size: Option<Option<Size>>,
    pub phase: Option<Option<String>>,
    pub no_auto_complete: Option<bool>,
    pub labels: Option<EditOp<BTreeSet<String>>>,
    pub files: Option<EditOp<Vec<String>>>,
    pub acceptance: Option<EditOp<Vec<String>>>,
    pub append_note: Option<String>,
    pub mark_validated: bool,
    pub mark_tested: bool,
    pub verification: Option<VerificationPatch>,
}

/// Caller-supplied fields for `tasks.create` (spec.md §4.4). Anything not
/// set here takes the defaults a freshly-created task has.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub parent_id: Option<String>,
    pub task_type: Option<TaskType>,
    pub priority: Priority,
    pub size: Option<Size>,
    pub labels: BTreeSet<String>,
    pub depends: BTreeSet<String>,
}

fn first_core_error(errors: Vec<cleo_core::CoreError>) -> CleoError {
    errors
        .into_iter()
        .next()
        .map(CleoError::from)
        .unwrap_or(CleoError::Core(cleo_core::CoreError::InvalidTitle { len: 0 }))
}

/// Create a task under lock: allocate its id, derive its implied type from
/// the parent, enforce depth/sibling caps, validate, commit, and audit
/// (spec.md §4.4, §4.6).
pub fn create(ctx: &EngineContext, input: NewTask) -> Result<Task, CleoError> {
    crate::lock::with_lock("tasks", ctx.lock_timeout(), || {
        let path = ctx.tasks_path();
        let mut doc = cleo_store::read_task_store(&path).unwrap_or_default();

        let existing_ids: HashSet<String> = doc.tasks.iter().map(|t| t.id.clone()).collect();
        let mut generator = ids::IdGenerator::new(doc.meta.counter);
        let id = generator.allocate(&existing_ids);
        doc.meta.counter = generator.peek_next();

        let parent_type = input
            .parent_id
            .as_ref()
            .and_then(|pid| doc.tasks.iter().find(|t| &t.id == pid))
            .map(|t| t.task_type);
        let depth = input.parent_id.as_deref().map_or(0, |pid| {
            1 + compute_depth(pid, |child| {
                doc.tasks
                    .iter()
                    .find(|t| t.id == child)
                    .and_then(|t| t.parent_id.clone())
            })
        });
        let task_type = input
            .task_type
            .or_else(|| implied_type(parent_type))
            .unwrap_or(TaskType::Task);
        validate_type(task_type, parent_type, depth)?;

        if let Some(parent_id) = &input.parent_id {
            let sibling_statuses: Vec<TaskStatus> = doc
                .tasks
                .iter()
                .filter(|t| t.parent_id.as_deref() == Some(parent_id.as_str()))
                .map(|t| t.status)
                .collect();
            check_sibling_caps(parent_id, &sibling_statuses, &ctx.config.hierarchy)?;
        }

        let now = Utc::now();
        let task = Task {
            id: id.clone(),
            title: input.title,
            description: input.description,
            task_type,
            parent_id: input.parent_id,
            position: doc.tasks.len() as u32,
            position_version: 0,
            status: TaskStatus::Pending,
            priority: input.priority,
            size: input.size,
            phase: None,
            depends: input.depends,
            relates: Vec::new(),
            blocked_by: None,
            labels: input.labels,
            files: Vec::new(),
            acceptance: Vec::new(),
            notes: Vec::new(),
            epic_lifecycle: (task_type == TaskType::Epic).then_some(cleo_core::EpicLifecycle::Backlog),
            origin: Some(cleo_core::Origin::Agent),
            verification: cleo_core::Verification::default(),
            no_auto_complete: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_by: ctx.actor.clone(),
            modified_by: ctx.actor.clone(),
            validated_by: None,
            tested_by: None,
            session_id: None,
        };

        cleo_core::validate_task(&task, now).map_err(first_core_error)?;

        doc.tasks.push(task.clone());
        crate::checkpoint::stage(ctx);
        crate::backup::stage_operational(ctx, &path)?;
        cleo_store::commit_task_store(&path, &mut doc)?;
        record(ctx, "tasks.create", Some(&task.id), None, None)?;
        Ok(task)
    })
}

/// Apply a scalar/list field edit to a task under lock (spec.md §4.4). Does
/// not touch `status`, `depends`, or `relates` — those go through
/// `transition` and `deps::add` respectively, which carry their own
/// legality checks.
pub fn update(ctx: &EngineContext, id: &str, edit: TaskEdit) -> Result<Task, CleoError> {
    crate::lock::with_lock("tasks", ctx.lock_timeout(), || {
        let path = ctx.tasks_path();
        let mut doc = cleo_store::read_task_store(&path)?;

        if let Some(Some(phase)) = &edit.phase {
            crate::project::check_phase(&doc, phase)?;
        }

        let now = Utc::now();
        let task = doc
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CleoError::Core(cleo_core::CoreError::MalformedId(id.to_string())))?;

        if let Some(title) = edit.title {
            task.title = title;
        }
        if let Some(description) = edit.description {
            task.description = description;
        }
        if let Some(priority) = edit.priority {
            task.priority = priority;
        }
        if let Some(size) = edit.size {
            task.size = size;
        }
        if let Some(phase) = edit.phase {
            task.phase = phase;
        }
        if let Some(flag) = edit.no_auto_complete {
            task.no_auto_complete = flag;
        }
        if let Some(op) = edit.labels {
            apply_set(&mut task.labels, op);
        }
        if let Some(op) = edit.files {
            apply_vec(&mut task.files, op);
        }
        if let Some(op) = edit.acceptance {
            apply_vec(&mut task.acceptance, op);
        }
        if let Some(text) = edit.append_note {
            task.notes.push(TimestampedNote {
                at: now,
                text,
                author: ctx.actor.clone(),
            });
        }
        if edit.mark_validated {
            task.validated_by = Some(ctx.actor.clone());
        }
        if edit.mark_tested {
            task.tested_by = Some(ctx.actor.clone());
        }
        if let Some(patch) = edit.verification {
            patch.apply(&mut task.verification);
        }

        task.updated_at = now;
        task.modified_by = ctx.actor.clone();
        cleo_core::validate_task(task, now).map_err(first_core_error)?;
        let updated = task.clone();

        crate::checkpoint::stage(ctx);
        crate::backup::stage_operational(ctx, &path)?;
        cleo_store::commit_task_store(&path, &mut doc)?;
        record(ctx, "tasks.update", Some(id), None, None)?;
        Ok(updated)
    })
}

/// Transition a task's status under lock, enforcing that every dependency is
/// satisfied before allowing `done` (spec.md §3.2 invariant 6, §4.5).
/// `reason` feeds `blockedBy` when transitioning to `blocked` and
/// `cancellationReason` when transitioning to `cancelled` (spec.md §8 S4) —
/// `status::transition` rejects the call outright if the respective status
/// needs one and none was given.
pub fn transition(ctx: &EngineContext, id: &str, to: TaskStatus, reason: Option<String>) -> Result<Task, CleoError> {
    crate::lock::with_lock("tasks", ctx.lock_timeout(), || {
        let path = ctx.tasks_path();
        let mut doc = cleo_store::read_task_store(&path)?;

        if to == TaskStatus::Done {
            let graph = DependencyGraph::build(&doc.tasks);
            let title_of = |tid: &str| {
                doc.tasks
                    .iter()
                    .find(|t| t.id == tid)
                    .map(|t| t.title.clone())
                    .unwrap_or_default()
            };
            let view = graph.view(id, title_of).map_err(cleo_query::QueryError::from)?;
            if !view.all_deps_ready {
                return Err(CleoError::Graph(cleo_graph::GraphError::CircularDependency {
                    from: id.to_string(),
                    to: view
                        .leaf_blockers
                        .first()
                        .map(|r| r.id.clone())
                        .unwrap_or_default(),
                }));
            }
        }

        let now = Utc::now();
        let task = doc
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CleoError::Core(cleo_core::CoreError::MalformedId(id.to_string())))?;
        match to {
            TaskStatus::Blocked => task.blocked_by = reason.or_else(|| task.blocked_by.clone()),
            TaskStatus::Cancelled => {
                task.cancellation_reason = reason.or_else(|| task.cancellation_reason.clone());
            }
            _ => {}
        }
        status::transition(task, to, now, &ctx.actor)?;
        task.updated_at = now;
        task.modified_by = ctx.actor.clone();
        let updated = task.clone();

        crate::checkpoint::stage(ctx);
        crate::backup::stage_operational(ctx, &path)?;
        cleo_store::commit_task_store(&path, &mut doc)?;
        record(ctx, "tasks.transition", Some(id), None, None)?;
        Ok(updated)
    })
}

/// Reverse `cancelled -> pending`, restoring first from the cold archive if
/// the task was archived after cancellation (spec.md §4.12 "Uncancel").
pub fn uncancel(ctx: &EngineContext, id: &str) -> Result<Task, CleoError> {
    let doc = cleo_store::read_task_store(&ctx.tasks_path())?;
    if !doc.tasks.iter().any(|t| t.id == id) {
        crate::archive::restore(ctx, &[id.to_string()])?;
    }
    transition(ctx, id, TaskStatus::Pending, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleo_config::Config;

    fn ctx() -> (tempfile::TempDir, EngineContext) {
        let td = tempfile::TempDir::new().unwrap();
        let dir = camino::Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        cleo_lock::set_thread_home_for_tests(dir.clone());
        let ctx = EngineContext::new(dir, Config::default(), "agent:builder");
        (td, ctx)
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let (_td, ctx) = ctx();
        let first = create(&ctx, NewTask { title: "First".to_string(), ..NewTask::default() }).unwrap();
        let second = create(&ctx, NewTask { title: "Second".to_string(), ..NewTask::default() }).unwrap();
        assert_eq!(first.id, "T000");
        assert_eq!(second.id, "T001");
    }

    #[test]
    fn root_task_is_implied_epic() {
        let (_td, ctx) = ctx();
        let task = create(&ctx, NewTask { title: "Root".to_string(), ..NewTask::default() }).unwrap();
        assert_eq!(task.task_type, TaskType::Epic);
    }

    #[test]
    fn completing_task_with_unsatisfied_dependency_is_rejected() {
        let (_td, ctx) = ctx();
        let a = create(&ctx, NewTask { title: "A".to_string(), ..NewTask::default() }).unwrap();
        let mut input = NewTask { title: "B".to_string(), ..NewTask::default() };
        input.depends.insert(a.id.clone());
        let b = create(&ctx, input).unwrap();
        assert!(transition(&ctx, &b.id, TaskStatus::Done, None).is_err());
    }

    #[test]
    fn update_stamps_validated_by_and_tested_by_with_the_calling_actor() {
        let (_td, ctx) = ctx();
        let a = create(&ctx, NewTask { title: "A".to_string(), ..NewTask::default() }).unwrap();
        let edit = TaskEdit { mark_validated: true, mark_tested: true, ..TaskEdit::default() };
        let updated = update(&ctx, &a.id, edit).unwrap();
        assert_eq!(updated.validated_by, Some("agent:builder".to_string()));
        assert_eq!(updated.tested_by, Some("agent:builder".to_string()));
    }

    #[test]
    fn update_applies_verification_patch_and_appends_labels() {
        let (_td, ctx) = ctx();
        let a = create(&ctx, NewTask { title: "A".to_string(), ..NewTask::default() }).unwrap();
        let edit = TaskEdit {
            labels: Some(EditOp::Append(BTreeSet::from(["urgent".to_string()]))),
            verification: Some(VerificationPatch {
                implemented: Some(true),
                documented: Some(true),
                ..VerificationPatch::default()
            }),
            ..TaskEdit::default()
        };
        let updated = update(&ctx, &a.id, edit).unwrap();
        assert!(updated.labels.contains("urgent"));
        assert!(updated.verification.implemented);
        assert!(updated.verification.documented);
    }

    #[test]
    fn blocking_without_reason_is_rejected_and_with_reason_succeeds() {
        let (_td, ctx) = ctx();
        let a = create(&ctx, NewTask { title: "A".to_string(), ..NewTask::default() }).unwrap();
        assert!(transition(&ctx, &a.id, TaskStatus::Blocked, None).is_err());
        let blocked = transition(&ctx, &a.id, TaskStatus::Blocked, Some("Waiting for keys".to_string())).unwrap();
        assert_eq!(blocked.blocked_by, Some("Waiting for keys".to_string()));
    }
}
