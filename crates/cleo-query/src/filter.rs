use chrono::{DateTime, Utc};
use cleo_core::{Priority, Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Priority,
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// `list` filters (spec.md §4.13): status, parent, phase, priority, labels,
/// a creation-date range, and offset/limit pagination.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub status: Option<TaskStatus>,
    pub parent_id: Option<String>,
    pub phase: Option<String>,
    pub priority: Option<Priority>,
    pub labels: Vec<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub sort: Option<(SortField, SortDirection)>,
    pub limit: Option<usize>,
    pub offset: usize,
}

fn priority_rank(p: Priority) -> u8 {
    match p {
        Priority::Critical => 3,
        Priority::High => 2,
        Priority::Medium => 1,
        Priority::Low => 0,
    }
}

fn matches(task: &Task, query: &ListQuery) -> bool {
    if let Some(status) = query.status
        && task.status != status
    {
        return false;
    }
    if let Some(parent) = &query.parent_id
        && task.parent_id.as_deref() != Some(parent.as_str())
    {
        return false;
    }
    if let Some(phase) = &query.phase
        && task.phase.as_deref() != Some(phase.as_str())
    {
        return false;
    }
    if let Some(priority) = query.priority
        && task.priority != priority
    {
        return false;
    }
    if !query.labels.is_empty() && !query.labels.iter().all(|l| task.labels.contains(l)) {
        return false;
    }
    if let Some(after) = query.created_after
        && task.created_at < after
    {
        return false;
    }
    if let Some(before) = query.created_before
        && task.created_at > before
    {
        return false;
    }
    true
}

/// `{tasks[], total}` — `total` is the filtered-but-unpaginated count, so
/// callers can render "showing N of total" (spec.md §6.2).
pub struct ListResult<'a> {
    pub tasks: Vec<&'a Task>,
    pub total: usize,
}

pub fn list<'a>(tasks: &'a [Task], query: &ListQuery) -> ListResult<'a> {
    let mut filtered: Vec<&Task> = tasks.iter().filter(|t| matches(t, query)).collect();

    if let Some((field, direction)) = query.sort {
        filtered.sort_by(|a, b| {
            let ordering = match field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::Priority => priority_rank(a.priority).cmp(&priority_rank(b.priority)),
                SortField::Position => a.position.cmp(&b.position),
            };
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }

    let total = filtered.len();
    let page: Vec<&Task> = filtered
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();

    ListResult { tasks: page, total }
}
