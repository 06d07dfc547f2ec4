//! The project file (spec.md §3.3): name, ordered phase set, and current
//! phase, embedded in the active store document rather than a standalone
//! file (spec.md §6.1).

use cleo_envelope::CleoError;
use cleo_store::{PhaseDefinition, ProjectInfo, TaskStoreDocument};

use crate::context::EngineContext;

/// Reject `phase` when it doesn't name a key in `doc.project.phases`
/// (spec.md §3.1 "`Task.phase` must be a key in the project phase set").
/// An empty phase set imposes no constraint yet — a fresh store has no
/// phases defined until `set_phases` is called.
pub(crate) fn check_phase(doc: &TaskStoreDocument, phase: &str) -> Result<(), CleoError> {
    if doc.project.phases.is_empty() || doc.project.phases.iter().any(|p| p.name == phase) {
        Ok(())
    } else {
        Err(CleoError::Core(cleo_core::CoreError::InvalidPhase(phase.to_string())))
    }
}

/// Read the current project file under lock (spec.md §3.3).
pub fn show(ctx: &EngineContext) -> Result<ProjectInfo, CleoError> {
    let doc = cleo_store::read_task_store(&ctx.tasks_path()).unwrap_or_default();
    Ok(doc.project)
}

/// Replace the project's name and ordered phase set, clamping
/// `current_phase` to `None` if it no longer names a surviving phase
/// (spec.md §3.3).
pub fn set_phases(
    ctx: &EngineContext,
    name: Option<String>,
    phases: Vec<PhaseDefinition>,
) -> Result<ProjectInfo, CleoError> {
    crate::lock::with_lock("tasks", ctx.lock_timeout(), || {
        let path = ctx.tasks_path();
        let mut doc = cleo_store::read_task_store(&path).unwrap_or_default();

        if let Some(name) = name {
            doc.project.name = name;
        }
        doc.project.phases = phases;
        if let Some(current) = &doc.project.current_phase
            && !doc.project.phases.iter().any(|p| &p.name == current)
        {
            doc.project.current_phase = None;
        }

        crate::backup::stage_operational(ctx, &path)?;
        cleo_store::commit_task_store(&path, &mut doc)?;
        crate::audit::record(ctx, "project.set_phases", None, None, None)?;
        Ok(doc.project)
    })
}
