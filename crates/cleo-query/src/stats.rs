use std::collections::HashMap;

use cleo_core::{Priority, Task, TaskStatus};
use cleo_graph::DependencyGraph;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

fn priority_bonus(p: Priority) -> u32 {
    match p {
        Priority::Low => 10,
        Priority::Medium => 20,
        Priority::High => 30,
        Priority::Critical => 40,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    One,
    Two,
    Three,
    Four,
}

/// A single task's leverage score (spec.md §4.13 "statistics"):
/// `unlocks_count * 10 + priority_bonus`, where `unlocks_count` is the
/// number of tasks directly blocked on this one completing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverageEntry {
    pub id: String,
    pub title: String,
    pub unlocks_count: usize,
    pub score: u32,
    pub tier: Tier,
}

fn tier_for(task: &Task, unlocks_count: usize, all_deps_ready: bool) -> Tier {
    if unlocks_count >= 3 {
        Tier::One
    } else if matches!(task.priority, Priority::Critical | Priority::High) && all_deps_ready {
        Tier::Two
    } else if task.status == TaskStatus::Blocked || task.priority == Priority::Medium {
        Tier::Three
    } else {
        Tier::Four
    }
}

/// Per-task leverage scores, highest first. Only non-terminal tasks
/// (pending/active/blocked) are ranked — finished work has nothing left to
/// unlock.
pub fn leverage(tasks: &[Task], graph: &DependencyGraph) -> Result<Vec<LeverageEntry>, QueryError> {
    let title_of = |id: &str| {
        tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.title.clone())
            .unwrap_or_default()
    };

    let mut entries = Vec::new();
    for task in tasks {
        if matches!(task.status, TaskStatus::Done | TaskStatus::Cancelled | TaskStatus::Archived) {
            continue;
        }
        let view = graph.view(&task.id, title_of)?;
        let unlocks_count = view.depended_on_by.len();
        let score = unlocks_count as u32 * 10 + priority_bonus(task.priority);
        let tier = tier_for(task, unlocks_count, view.all_deps_ready);
        entries.push(LeverageEntry {
            id: task.id.clone(),
            title: task.title.clone(),
            unlocks_count,
            score,
            tier,
        });
    }
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(entries)
}

/// Aggregate counts for the statistics overview (spec.md §4.13).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub by_status: HashMap<TaskStatus, usize>,
    pub by_priority: HashMap<Priority, usize>,
    pub by_phase: HashMap<String, usize>,
    pub total: usize,
}

pub fn summarize(tasks: &[Task]) -> StatsSummary {
    let mut summary = StatsSummary {
        total: tasks.len(),
        ..StatsSummary::default()
    };
    for task in tasks {
        *summary.by_status.entry(task.status).or_insert(0) += 1;
        *summary.by_priority.entry(task.priority).or_insert(0) += 1;
        if let Some(phase) = &task.phase {
            *summary.by_phase.entry(phase.clone()).or_insert(0) += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cleo_core::{Origin, Size, TaskType, Verification};
    use std::collections::BTreeSet;

    fn task(id: &str, depends: &[&str], status: TaskStatus, priority: Priority) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: String::new(),
            task_type: TaskType::Task,
            parent_id: None,
            position: 0,
            position_version: 0,
            status,
            priority,
            size: Some(Size::Small),
            phase: None,
            depends: depends.iter().map(|s| (*s).to_string()).collect(),
            relates: Vec::new(),
            blocked_by: None,
            labels: BTreeSet::new(),
            files: Vec::new(),
            acceptance: Vec::new(),
            notes: Vec::new(),
            epic_lifecycle: None,
            origin: Some(Origin::Agent),
            verification: Verification::default(),
            no_auto_complete: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_by: "agent:builder".to_string(),
            modified_by: "agent:builder".to_string(),
            validated_by: None,
            tested_by: None,
            session_id: None,
        }
    }

    #[test]
    fn task_unlocking_three_others_is_tier_one() {
        let tasks = vec![
            task("T001", &[], TaskStatus::Pending, Priority::Low),
            task("T002", &["T001"], TaskStatus::Pending, Priority::Low),
            task("T003", &["T001"], TaskStatus::Pending, Priority::Low),
            task("T004", &["T001"], TaskStatus::Pending, Priority::Low),
        ];
        let graph = DependencyGraph::build(&tasks);
        let entries = leverage(&tasks, &graph).unwrap();
        let top = entries.iter().find(|e| e.id == "T001").unwrap();
        assert_eq!(top.unlocks_count, 3);
        assert_eq!(top.tier, Tier::One);
    }

    #[test]
    fn finished_tasks_are_excluded_from_leverage() {
        let tasks = vec![task("T001", &[], TaskStatus::Done, Priority::Low)];
        let graph = DependencyGraph::build(&tasks);
        assert!(leverage(&tasks, &graph).unwrap().is_empty());
    }

    #[test]
    fn summarize_counts_by_status() {
        let tasks = vec![
            task("T001", &[], TaskStatus::Pending, Priority::Low),
            task("T002", &[], TaskStatus::Done, Priority::Low),
        ];
        let summary = summarize(&tasks);
        assert_eq!(summary.by_status.get(&TaskStatus::Pending), Some(&1));
        assert_eq!(summary.total, 2);
    }
}
