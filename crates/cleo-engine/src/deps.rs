use cleo_envelope::CleoError;
use cleo_graph::{DependencyGraph, DependencyView};

use crate::audit::record;
use crate::context::EngineContext;

/// Add a dependency edge `from -> to` under lock, rejecting cycles before
/// anything is persisted (spec.md §4.7, §8 S3).
pub fn add(ctx: &EngineContext, from: &str, to: &str) -> Result<(), CleoError> {
    crate::lock::with_lock("tasks", ctx.lock_timeout(), || {
        let path = ctx.tasks_path();
        let mut doc = cleo_store::read_task_store(&path)?;

        let graph = DependencyGraph::build(&doc.tasks);
        if graph.would_cycle(from, to) {
            return Err(CleoError::Graph(cleo_graph::GraphError::CircularDependency {
                from: from.to_string(),
                to: to.to_string(),
            }));
        }

        let now = chrono::Utc::now();
        let task = doc
            .tasks
            .iter_mut()
            .find(|t| t.id == from)
            .ok_or_else(|| CleoError::Core(cleo_core::CoreError::MalformedId(from.to_string())))?;
        task.depends.insert(to.to_string());
        task.updated_at = now;
        task.modified_by = ctx.actor.clone();

        crate::checkpoint::stage(ctx);
        cleo_store::commit_task_store(&path, &mut doc)?;
        record(ctx, "deps.add", Some(from), None, None)?;
        Ok(())
    })
}

/// Read-only dependency view for a single task (spec.md §4.7, §6.2). Reads
/// are lock-free.
pub fn view(ctx: &EngineContext, task_id: &str) -> Result<DependencyView, CleoError> {
    let doc = cleo_store::read_task_store(&ctx.tasks_path())?;
    let graph = DependencyGraph::build(&doc.tasks);
    let title_of = |id: &str| {
        doc.tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.title.clone())
            .unwrap_or_default()
    };
    graph
        .view(task_id, title_of)
        .map_err(cleo_query::QueryError::from)
        .map_err(CleoError::from)
}
