use cleo_core::Task;
use cleo_envelope::CleoError;
use cleo_graph::DependencyGraph;
use cleo_query::{find, leverage, list, show, summarize, LeverageEntry, ListQuery, StatsSummary};

use crate::context::EngineContext;

fn load(ctx: &EngineContext) -> Result<Vec<Task>, CleoError> {
    Ok(cleo_store::read_task_store(&ctx.tasks_path())?.tasks)
}

/// One matching task with its rank-sort position already applied (spec.md
/// §6.2 `list`). Owned rather than borrowed so it can outlive the load.
#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub tasks: Vec<Task>,
    pub total: usize,
}

/// List tasks matching `query`. Reads are lock-free.
pub fn run_list(ctx: &EngineContext, query: &ListQuery) -> Result<ListOutcome, CleoError> {
    let tasks = load(ctx)?;
    let result = list(&tasks, query);
    Ok(ListOutcome {
        tasks: result.tasks.into_iter().cloned().collect(),
        total: result.total,
    })
}

/// One fuzzy-search hit (spec.md §6.2 `find`).
#[derive(Debug, Clone)]
pub struct FindOutcome {
    pub task: Task,
    pub score: u32,
}

/// Fuzzy-search tasks for `needle`, highest score first.
pub fn run_find(ctx: &EngineContext, needle: &str) -> Result<Vec<FindOutcome>, CleoError> {
    let tasks = load(ctx)?;
    Ok(find(&tasks, needle)
        .into_iter()
        .map(|m| FindOutcome {
            task: m.task.clone(),
            score: m.score,
        })
        .collect())
}

/// One task plus its dependency relationships (spec.md §6.2 `show`).
#[derive(Debug, Clone)]
pub struct ShowOutcome {
    pub task: Task,
    pub dependencies: cleo_graph::DependencyView,
}

/// Show one task with its dependency relationships.
pub fn run_show(ctx: &EngineContext, task_id: &str) -> Result<ShowOutcome, CleoError> {
    let tasks = load(ctx)?;
    let graph = DependencyGraph::build(&tasks);
    let result = show(&tasks, &graph, task_id).map_err(CleoError::from)?;
    Ok(ShowOutcome {
        task: result.task.clone(),
        dependencies: result.dependencies,
    })
}

/// Rank unblocked, high-value tasks by unlock count and priority (spec.md
/// §6.2 `leverage`).
pub fn run_leverage(ctx: &EngineContext) -> Result<Vec<LeverageEntry>, CleoError> {
    let tasks = load(ctx)?;
    let graph = DependencyGraph::build(&tasks);
    leverage(&tasks, &graph).map_err(CleoError::from)
}

/// Summarize the active store by status, priority, and phase (spec.md §6.2
/// `stats`).
pub fn run_stats(ctx: &EngineContext) -> Result<StatsSummary, CleoError> {
    let tasks = load(ctx)?;
    Ok(summarize(&tasks))
}

/// Longest chain of non-terminal tasks, tie-broken by priority mass then
/// age (spec.md §4.7 "Critical path").
pub fn run_critical_path(ctx: &EngineContext) -> Result<Vec<String>, CleoError> {
    let tasks = load(ctx)?;
    Ok(DependencyGraph::build(&tasks).critical_path())
}

/// Partition pending tasks into level sets by longest-path depth, tie-broken
/// by priority then creation time (spec.md §4.7 "Wave planning").
pub fn run_wave_plan(ctx: &EngineContext) -> Result<std::collections::BTreeMap<u32, Vec<String>>, CleoError> {
    let tasks = load(ctx)?;
    Ok(DependencyGraph::build(&tasks).wave_plan())
}
