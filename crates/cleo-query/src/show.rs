use cleo_core::Task;
use cleo_graph::{DependencyGraph, DependencyView};

use crate::error::QueryError;

/// A task plus its derived dependency view, the composite `show` answer
/// (spec.md §4.13).
pub struct ShowResult<'a> {
    pub task: &'a Task,
    pub dependencies: DependencyView,
}

pub fn show<'a>(
    tasks: &'a [Task],
    graph: &DependencyGraph,
    task_id: &str,
) -> Result<ShowResult<'a>, QueryError> {
    let task = tasks
        .iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| QueryError::Graph(cleo_graph::GraphError::UnknownTask(task_id.to_string())))?;
    let title_of = |id: &str| {
        tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.title.clone())
            .unwrap_or_default()
    };
    let dependencies = graph.view(task_id, title_of)?;
    Ok(ShowResult { task, dependencies })
}
