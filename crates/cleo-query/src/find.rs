use cleo_core::Task;

/// Weighted fuzzy match scores (spec.md §4.13 "find"). Highest-scoring rule
/// wins per task; a task that matches no rule is excluded from results.
const SCORE_EXACT_ID: u32 = 100;
const SCORE_ID_SUBSTRING: u32 = 50;
const SCORE_EXACT_TITLE: u32 = 80;
const SCORE_TITLE_PREFIX: u32 = 40;
const SCORE_TITLE_SUBSTRING: u32 = 20;
const SCORE_DESCRIPTION_SUBSTRING: u32 = 10;
const SCORE_LABEL_SUBSTRING: u32 = 15;

#[derive(Debug, Clone)]
pub struct FindMatch<'a> {
    pub task: &'a Task,
    pub score: u32,
}

fn score(task: &Task, needle: &str) -> Option<u32> {
    let needle_lower = needle.to_lowercase();
    let id_lower = task.id.to_lowercase();
    let title_lower = task.title.to_lowercase();

    let mut best: Option<u32> = None;
    let mut consider = |s: u32| {
        if best.is_none_or(|b| s > b) {
            best = Some(s);
        }
    };

    if id_lower == needle_lower {
        consider(SCORE_EXACT_ID);
    } else if id_lower.contains(&needle_lower) {
        consider(SCORE_ID_SUBSTRING);
    }

    if title_lower == needle_lower {
        consider(SCORE_EXACT_TITLE);
    } else if title_lower.starts_with(&needle_lower) {
        consider(SCORE_TITLE_PREFIX);
    } else if title_lower.contains(&needle_lower) {
        consider(SCORE_TITLE_SUBSTRING);
    }

    if task.description.to_lowercase().contains(&needle_lower) {
        consider(SCORE_DESCRIPTION_SUBSTRING);
    }

    if task
        .labels
        .iter()
        .any(|label| label.to_lowercase().contains(&needle_lower))
    {
        consider(SCORE_LABEL_SUBSTRING);
    }

    best
}

/// Score and rank every task against `needle`, highest score first. Ties
/// preserve the input ordering (stable sort).
pub fn find<'a>(tasks: &'a [Task], needle: &str) -> Vec<FindMatch<'a>> {
    if needle.is_empty() {
        return Vec::new();
    }
    let mut matches: Vec<FindMatch<'a>> = tasks
        .iter()
        .filter_map(|task| score(task, needle).map(|score| FindMatch { task, score }))
        .collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cleo_core::{Origin, Priority, Size, TaskStatus, TaskType, Verification};
    use std::collections::BTreeSet;

    fn task(id: &str, title: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            task_type: TaskType::Task,
            parent_id: None,
            position: 0,
            position_version: 0,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            size: Some(Size::Small),
            phase: None,
            depends: BTreeSet::new(),
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
    fn exact_id_outranks_title_substring() {
        let tasks = vec![
            task("T002", "fix the T001 regression"),
            task("T001", "unrelated"),
        ];
        let results = find(&tasks, "T001");
        assert_eq!(results[0].task.id, "T001");
        assert_eq!(results[0].score, SCORE_EXACT_ID);
    }

    #[test]
    fn title_prefix_outranks_title_substring() {
        let tasks = vec![
            task("T001", "a login flow bug"),
            task("T002", "login flow redesign"),
        ];
        let results = find(&tasks, "login");
        assert_eq!(results[0].task.id, "T002");
        assert_eq!(results[0].score, SCORE_TITLE_PREFIX);
    }

    #[test]
    fn no_match_excludes_task() {
        let tasks = vec![task("T001", "alpha")];
        assert!(find(&tasks, "zzz").is_empty());
    }
}
