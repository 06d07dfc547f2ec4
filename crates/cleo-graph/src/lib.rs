//! Dependency graph: forward (`task → depends`) and reverse (`task →
//! dependents`) indices computed from the canonical store, cycle detection,
//! and the derived views spec.md §4.7 requires. Any persisted cache is
//! invalidated whenever the store's generation changes — this crate never
//! persists anything itself, it only indexes a snapshot of tasks.

pub mod error;

use std::collections::{BTreeMap, HashMap, HashSet};

use cleo_core::{Priority, Task, TaskId, TaskStatus};
pub use error::GraphError;
use serde::{Deserialize, Serialize};

/// In-memory dependency index over a snapshot of tasks.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    forward: HashMap<TaskId, HashSet<TaskId>>,
    reverse: HashMap<TaskId, HashSet<TaskId>>,
    status: HashMap<TaskId, TaskStatus>,
    priority: HashMap<TaskId, Priority>,
    created_at: HashMap<TaskId, chrono::DateTime<chrono::Utc>>,
}

/// A task resolved into the fields a dependency view needs (spec.md §4.7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRef {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
}

/// Full answer to `tasks.deps` for a single task (spec.md §6.2: `{dependsOn[],
/// dependedOnBy[], unresolvedChain, leafBlockers[], allDepsReady}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyView {
    pub depends_on: Vec<DependencyRef>,
    pub depended_on_by: Vec<DependencyRef>,
    pub unresolved_chain: usize,
    pub leaf_blockers: Vec<DependencyRef>,
    pub all_deps_ready: bool,
}

fn is_satisfied(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Done | TaskStatus::Cancelled)
}

impl DependencyGraph {
    /// Build the graph from a full task snapshot.
    #[must_use]
    pub fn build(tasks: &[Task]) -> Self {
        let mut graph = Self::default();
        for task in tasks {
            graph.status.insert(task.id.clone(), task.status);
            graph.priority.insert(task.id.clone(), task.priority);
            graph.created_at.insert(task.id.clone(), task.created_at);
            graph.forward.entry(task.id.clone()).or_default();
            graph.reverse.entry(task.id.clone()).or_default();
        }
        for task in tasks {
            for dep in &task.depends {
                graph.forward.entry(task.id.clone()).or_default().insert(dep.clone());
                graph.reverse.entry(dep.clone()).or_default().insert(task.id.clone());
            }
        }
        graph
    }

    /// Whether adding `from -> to` (meaning `from` depends on `to`) would
    /// introduce a cycle, via DFS over forward edges from `to` back to `from`.
    #[must_use]
    pub fn would_cycle(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let mut stack = vec![to.to_string()];
        let mut seen = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == from {
                return true;
            }
            if !seen.insert(node.clone()) {
                continue;
            }
            if let Some(edges) = self.forward.get(&node) {
                stack.extend(edges.iter().cloned());
            }
        }
        false
    }

    /// Validate and record a new dependency edge `from -> to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        if !self.forward.contains_key(from) {
            return Err(GraphError::UnknownTask(from.to_string()));
        }
        if !self.forward.contains_key(to) {
            return Err(GraphError::UnknownTask(to.to_string()));
        }
        if self.would_cycle(from, to) {
            return Err(GraphError::CircularDependency {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.forward.entry(from.to_string()).or_default().insert(to.to_string());
        self.reverse.entry(to.to_string()).or_default().insert(from.to_string());
        Ok(())
    }

    fn resolve(&self, id: &str, title_of: &impl Fn(&str) -> String) -> Option<DependencyRef> {
        self.status.get(id).map(|status| DependencyRef {
            id: id.to_string(),
            title: title_of(id),
            status: *status,
        })
    }

    /// Full dependency view for `task_id` (spec.md §4.7 query answers).
    pub fn view(
        &self,
        task_id: &str,
        title_of: impl Fn(&str) -> String,
    ) -> Result<DependencyView, GraphError> {
        let forward = self
            .forward
            .get(task_id)
            .ok_or_else(|| GraphError::UnknownTask(task_id.to_string()))?;
        let reverse = self.reverse.get(task_id).cloned().unwrap_or_default();

        let depends_on: Vec<DependencyRef> = forward
            .iter()
            .filter_map(|id| self.resolve(id, &title_of))
            .collect();
        let depended_on_by: Vec<DependencyRef> = reverse
            .iter()
            .filter_map(|id| self.resolve(id, &title_of))
            .collect();

        let ancestors = self.transitive_forward(task_id);
        let unresolved_chain = ancestors
            .iter()
            .filter(|id| {
                self.status
                    .get(*id)
                    .is_some_and(|s| !is_satisfied(*s))
            })
            .count();

        let leaf_blockers: Vec<DependencyRef> = ancestors
            .iter()
            .filter(|id| {
                let own_status = self.status.get(*id).copied();
                let own_deps_ready = self
                    .forward
                    .get(*id)
                    .is_none_or(|deps| deps.iter().all(|d| self.status.get(d).is_some_and(|s| is_satisfied(*s))));
                own_deps_ready && own_status.is_some_and(|s| !is_satisfied(s))
            })
            .filter_map(|id| self.resolve(id, &title_of))
            .collect();

        let all_deps_ready = ancestors
            .iter()
            .all(|id| self.status.get(id).is_some_and(|s| is_satisfied(*s)));

        Ok(DependencyView {
            depends_on,
            depended_on_by,
            unresolved_chain,
            leaf_blockers,
            all_deps_ready,
        })
    }

    /// All transitive forward dependencies of `task_id` (not including itself).
    fn transitive_forward(&self, task_id: &str) -> HashSet<TaskId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<TaskId> = self
            .forward
            .get(task_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        while let Some(node) = stack.pop() {
            if seen.insert(node.clone())
                && let Some(edges) = self.forward.get(&node)
            {
                stack.extend(edges.iter().cloned());
            }
        }
        seen
    }

    /// Longest-path depth of `task_id` over forward edges (0 for a task with
    /// no unsatisfied dependencies).
    fn longest_path_depth(&self, task_id: &str, memo: &mut HashMap<TaskId, u32>) -> u32 {
        if let Some(d) = memo.get(task_id) {
            return *d;
        }
        let deps = self.forward.get(task_id).cloned().unwrap_or_default();
        let depth = deps
            .iter()
            .filter(|d| self.status.get(*d).is_some_and(|s| !is_satisfied(*s)))
            .map(|d| 1 + self.longest_path_depth(d, memo))
            .max()
            .unwrap_or(0);
        memo.insert(task_id.to_string(), depth);
        depth
    }

    /// Partition pending tasks into level sets by longest-path depth,
    /// tie-broken by priority then creation time (spec.md §4.7 wave planning).
    #[must_use]
    pub fn wave_plan(&self) -> BTreeMap<u32, Vec<TaskId>> {
        let mut memo = HashMap::new();
        let mut waves: BTreeMap<u32, Vec<TaskId>> = BTreeMap::new();
        let pending: Vec<TaskId> = self
            .status
            .iter()
            .filter(|(_, s)| matches!(s, TaskStatus::Pending))
            .map(|(id, _)| id.clone())
            .collect();

        for id in pending {
            let depth = self.longest_path_depth(&id, &mut memo);
            waves.entry(depth).or_default().push(id);
        }
        for tasks in waves.values_mut() {
            tasks.sort_by(|a, b| {
                let pa = self.priority.get(a).copied().unwrap_or(Priority::Medium);
                let pb = self.priority.get(b).copied().unwrap_or(Priority::Medium);
                priority_rank(pb)
                    .cmp(&priority_rank(pa))
                    .then_with(|| self.created_at.get(a).cmp(&self.created_at.get(b)))
            });
        }
        waves
    }

    /// Longest chain of non-terminal tasks by node count, tie-broken by
    /// priority mass then age (spec.md §4.7 critical path).
    #[must_use]
    pub fn critical_path(&self) -> Vec<TaskId> {
        let non_terminal: Vec<TaskId> = self
            .status
            .iter()
            .filter(|(_, s)| !is_satisfied(**s))
            .map(|(id, _)| id.clone())
            .collect();

        let mut best: Vec<TaskId> = Vec::new();
        let mut best_priority_mass = 0i64;
        for start in &non_terminal {
            let chain = self.longest_chain_from(start, &non_terminal);
            let mass: i64 = chain
                .iter()
                .map(|id| priority_rank(self.priority.get(id).copied().unwrap_or(Priority::Medium)) as i64)
                .sum();
            if chain.len() > best.len()
                || (chain.len() == best.len() && mass > best_priority_mass)
            {
                best_priority_mass = mass;
                best = chain;
            }
        }
        best
    }

    fn longest_chain_from(&self, start: &str, non_terminal: &[TaskId]) -> Vec<TaskId> {
        let mut best: Vec<TaskId> = vec![start.to_string()];
        if let Some(deps) = self.forward.get(start) {
            for dep in deps {
                if non_terminal.contains(dep) {
                    let mut candidate = self.longest_chain_from(dep, non_terminal);
                    candidate.insert(0, start.to_string());
                    if candidate.len() > best.len() {
                        best = candidate;
                    }
                }
            }
        }
        best
    }
}

const fn priority_rank(p: Priority) -> u8 {
    match p {
        Priority::Critical => 4,
        Priority::High => 3,
        Priority::Medium => 2,
        Priority::Low => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleo_core::{EpicLifecycle, Origin, Size, TaskType, Verification};
    use std::collections::BTreeSet;

    fn task(id: &str, depends: &[&str], status: TaskStatus) -> Task {
        let now = chrono::Utc::now();
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: String::new(),
            task_type: TaskType::Task,
            parent_id: None,
            position: 0,
            position_version: 0,
            status,
            priority: Priority::Medium,
            size: None::<Size>,
            phase: None,
            depends: depends.iter().map(|s| (*s).to_string()).collect(),
            relates: Vec::new(),
            blocked_by: None,
            labels: BTreeSet::new(),
            files: Vec::new(),
            acceptance: Vec::new(),
            notes: Vec::new(),
            epic_lifecycle: None::<EpicLifecycle>,
            origin: None::<Origin>,
            verification: Verification::default(),
            no_auto_complete: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_by: "agent:claude".to_string(),
            modified_by: "agent:claude".to_string(),
            validated_by: None,
            tested_by: None,
            session_id: None,
        }
    }

    #[test]
    fn cycle_is_detected_before_insertion() {
        let tasks = vec![task("T001", &[], TaskStatus::Pending), task("T002", &["T001"], TaskStatus::Pending)];
        let graph = DependencyGraph::build(&tasks);
        assert!(graph.would_cycle("T001", "T002"));
        assert!(!graph.would_cycle("T002", "T001"));
    }

    #[test]
    fn add_dependency_rejects_cycle() {
        let tasks = vec![task("T001", &[], TaskStatus::Pending), task("T002", &["T001"], TaskStatus::Pending)];
        let mut graph = DependencyGraph::build(&tasks);
        assert!(graph.add_dependency("T001", "T002").is_err());
    }

    #[test]
    fn all_deps_ready_true_when_deps_done() {
        let tasks = vec![task("T001", &[], TaskStatus::Done), task("T002", &["T001"], TaskStatus::Pending)];
        let graph = DependencyGraph::build(&tasks);
        let view = graph.view("T002", |id| format!("title-{id}")).unwrap();
        assert!(view.all_deps_ready);
        assert_eq!(view.unresolved_chain, 0);
    }

    #[test]
    fn cancelled_dependency_counts_as_satisfied() {
        let tasks = vec![
            task("T001", &[], TaskStatus::Cancelled),
            task("T002", &["T001"], TaskStatus::Pending),
        ];
        let graph = DependencyGraph::build(&tasks);
        let view = graph.view("T002", |id| format!("title-{id}")).unwrap();
        assert!(view.all_deps_ready);
    }

    #[test]
    fn leaf_blocker_is_a_ready_but_unsatisfied_ancestor() {
        let tasks = vec![
            task("T001", &[], TaskStatus::Active),
            task("T002", &["T001"], TaskStatus::Pending),
            task("T003", &["T002"], TaskStatus::Pending),
        ];
        let graph = DependencyGraph::build(&tasks);
        let view = graph.view("T003", |id| format!("title-{id}")).unwrap();
        assert_eq!(view.leaf_blockers.len(), 1);
        assert_eq!(view.leaf_blockers[0].id, "T001");
    }

    #[test]
    fn wave_plan_groups_by_longest_path_depth() {
        let tasks = vec![
            task("T001", &[], TaskStatus::Pending),
            task("T002", &["T001"], TaskStatus::Pending),
        ];
        let graph = DependencyGraph::build(&tasks);
        let waves = graph.wave_plan();
        assert_eq!(waves.get(&0), Some(&vec!["T001".to_string()]));
        assert_eq!(waves.get(&1), Some(&vec!["T002".to_string()]));
    }
}
