//! Per-epic lifecycle pipeline (spec.md §3.5, §4.8): one [`PipelineDocument`]
//! per epic holding a [`StageRecord`] for each of the nine sequence stages
//! plus the cross-cutting `contribution` stage. Completion is gated through
//! `cleo_gate`, which owns the pass/fail/warn and prerequisite logic; this
//! crate owns the document shape and the transition bookkeeping around it.

pub mod error;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cleo_config::LifecycleMode;
use cleo_core::Task;
use cleo_gate::{GateCondition, LifecycleStage, StageState, TransitionKind};
use serde::{Deserialize, Serialize};

pub use error::LifecycleError;
pub use cleo_gate::{GateVerdict, LifecycleStage as Stage};

/// One recorded evidence item attached to a stage (spec.md §3.5 `evidence[]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub at: DateTime<Utc>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// `{from, to, kind, actor, at, reason?}` (spec.md §3.5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from: StageState,
    pub to: StageState,
    pub kind: TransitionKind,
    pub actor: String,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `{state, startedAt?, completedAt?, gates[], evidence[], transitions[]}`
/// (spec.md §3.5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub state: StageState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gates: Vec<GateCondition>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl Default for StageRecord {
    fn default() -> Self {
        Self {
            state: StageState::NotStarted,
            started_at: None,
            completed_at: None,
            gates: Vec::new(),
            evidence: Vec::new(),
            transitions: Vec::new(),
        }
    }
}

/// The pipeline document owned by one epic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDocument {
    pub epic_id: String,
    pub stages: HashMap<LifecycleStage, StageRecord>,
}

impl PipelineDocument {
    #[must_use]
    pub fn new(epic_id: impl Into<String>) -> Self {
        let mut stages = HashMap::new();
        for stage in LifecycleStage::SEQUENCE {
            stages.insert(stage, StageRecord::default());
        }
        stages.insert(LifecycleStage::Contribution, StageRecord::default());
        Self {
            epic_id: epic_id.into(),
            stages,
        }
    }

    #[must_use]
    pub fn record(&self, stage: LifecycleStage) -> &StageRecord {
        self.stages.get(&stage).expect("every stage is seeded in new()")
    }

    fn record_mut(&mut self, stage: LifecycleStage) -> &mut StageRecord {
        self.stages.entry(stage).or_default()
    }

    fn state_of(&self, stage: LifecycleStage) -> StageState {
        self.record(stage).state
    }

    fn is_terminal(&self, stage: LifecycleStage) -> bool {
        matches!(self.state_of(stage), StageState::Completed | StageState::Skipped)
    }

    /// Move `stage` into `in_progress`, stamping `startedAt` and recording an
    /// automatic transition. Fails with `AlreadyTerminal` if `stage` is
    /// already `completed` or `skipped` — restarting a terminal stage
    /// requires `force_transition` (spec.md §4.8).
    pub fn start_stage(&mut self, stage: LifecycleStage, actor: &str, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if self.is_terminal(stage) {
            return Err(LifecycleError::AlreadyTerminal(stage));
        }
        let from = self.state_of(stage);
        let record = self.record_mut(stage);
        record.state = StageState::InProgress;
        record.started_at.get_or_insert(now);
        record.transitions.push(Transition {
            from,
            to: StageState::InProgress,
            kind: TransitionKind::Automatic,
            actor: actor.to_string(),
            at: now,
            reason: None,
        });
        Ok(())
    }

    /// Attach a gate condition to `stage`'s record (does not itself change
    /// `state`).
    pub fn record_gate(&mut self, stage: LifecycleStage, condition: GateCondition) {
        self.record_mut(stage).gates.push(condition);
    }

    /// Append an evidence item to `stage`'s record.
    pub fn add_evidence(&mut self, stage: LifecycleStage, evidence: Evidence) {
        self.record_mut(stage).evidence.push(evidence);
    }

    /// Complete `stage`, subject to the prerequisite check in `cleo_gate`
    /// (and, for `release`, its extra attribution checks against `task`).
    /// Fails with `LifecycleError::Gate` under `strict` mode when a
    /// prerequisite or release check is unmet; under `advisory` mode the
    /// violation is logged by `cleo_gate` and completion proceeds.
    pub fn complete_stage(
        &mut self,
        stage: LifecycleStage,
        task: &Task,
        mode: LifecycleMode,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        cleo_gate::can_complete_stage(stage, |s| self.state_of(s), mode)?;
        if stage == LifecycleStage::Release {
            cleo_gate::check_release_gate(task, mode)?;
        }

        let from = self.state_of(stage);
        let record = self.record_mut(stage);
        record.state = StageState::Completed;
        record.completed_at = Some(now);
        record.transitions.push(Transition {
            from,
            to: StageState::Completed,
            kind: TransitionKind::Automatic,
            actor: actor.to_string(),
            at: now,
            reason: None,
        });
        Ok(())
    }

    /// Mark `stage` as `skipped`, which satisfies downstream prerequisite
    /// checks exactly like `completed` (spec.md §4.8). Fails with
    /// `IllegalTransition` if `stage` is already `completed` — a completed
    /// stage can only be moved elsewhere via `force_transition`.
    pub fn skip_stage(&mut self, stage: LifecycleStage, actor: &str, reason: &str, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if self.state_of(stage) == StageState::Completed {
            return Err(LifecycleError::IllegalTransition(stage));
        }
        let from = self.state_of(stage);
        let record = self.record_mut(stage);
        record.state = StageState::Skipped;
        record.transitions.push(Transition {
            from,
            to: StageState::Skipped,
            kind: TransitionKind::Manual,
            actor: actor.to_string(),
            at: now,
            reason: Some(reason.to_string()),
        });
        Ok(())
    }

    /// Force `stage` directly into `to`, bypassing every gate check. Only
    /// reachable via explicit caller request (spec.md §4.8); always recorded
    /// with `kind=forced` and the supplied reason, regardless of lifecycle
    /// mode.
    pub fn force_transition(
        &mut self,
        stage: LifecycleStage,
        to: StageState,
        actor: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) {
        let from = self.state_of(stage);
        let record = self.record_mut(stage);
        record.state = to;
        if matches!(to, StageState::Completed) {
            record.completed_at = Some(now);
        }
        record.transitions.push(Transition {
            from,
            to,
            kind: TransitionKind::Forced,
            actor: actor.to_string(),
            at: now,
            reason: Some(reason.to_string()),
        });
        tracing::warn!(epic_id = %self.epic_id, ?stage, ?to, reason, "forced lifecycle transition recorded");
    }

    /// True once every sequence stage (excluding the cross-cutting
    /// `contribution` stage) is `completed` or `skipped`.
    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(self.state_of(LifecycleStage::Release), StageState::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleo_core::{EpicLifecycle, Origin, Priority, Size, TaskStatus, TaskType, Verification};
    use std::collections::BTreeSet;

    fn released_task() -> Task {
        let now = Utc::now();
        Task {
            id: "T001".to_string(),
            title: "Ship v2".to_string(),
            description: String::new(),
            task_type: TaskType::Epic,
            parent_id: None,
            position: 1,
            position_version: 0,
            status: TaskStatus::Active,
            priority: Priority::High,
            size: Some(Size::Large),
            phase: None,
            depends: BTreeSet::new(),
            relates: Vec::new(),
            blocked_by: None,
            labels: BTreeSet::new(),
            files: Vec::new(),
            acceptance: Vec::new(),
            notes: Vec::new(),
            epic_lifecycle: Some(EpicLifecycle::Review),
            origin: Some(Origin::Agent),
            verification: Verification {
                implemented: true,
                documented: true,
                ..Verification::default()
            },
            no_auto_complete: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_by: "agent:builder".to_string(),
            modified_by: "agent:builder".to_string(),
            validated_by: Some("agent:reviewer".to_string()),
            tested_by: Some("agent:tester".to_string()),
            session_id: None,
        }
    }

    #[test]
    fn new_document_seeds_every_stage_not_started() {
        let doc = PipelineDocument::new("T001");
        assert_eq!(doc.record(LifecycleStage::Research).state, StageState::NotStarted);
        assert_eq!(doc.record(LifecycleStage::Release).state, StageState::NotStarted);
        assert_eq!(doc.record(LifecycleStage::Contribution).state, StageState::NotStarted);
    }

    #[test]
    fn completing_release_before_prerequisites_fails_in_strict_mode() {
        let mut doc = PipelineDocument::new("T001");
        let task = released_task();
        let err = doc
            .complete_stage(LifecycleStage::Release, &task, LifecycleMode::Strict, "agent:builder", Utc::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Gate(_)));
    }

    #[test]
    fn skipping_stages_satisfies_downstream_prerequisites() {
        let mut doc = PipelineDocument::new("T001");
        let now = Utc::now();
        for stage in cleo_gate::LifecycleStage::SEQUENCE {
            if stage == LifecycleStage::Release {
                break;
            }
            doc.skip_stage(stage, "agent:builder", "not applicable to this epic", now).unwrap();
        }
        let task = released_task();
        assert!(
            doc.complete_stage(LifecycleStage::Release, &task, LifecycleMode::Strict, "agent:builder", now)
                .is_ok()
        );
        assert!(doc.is_released());
    }

    #[test]
    fn forced_transition_is_always_recorded_as_forced() {
        let mut doc = PipelineDocument::new("T001");
        let now = Utc::now();
        doc.force_transition(
            LifecycleStage::Testing,
            StageState::Completed,
            "human:alice",
            "manual QA sign-off outside the pipeline",
            now,
        );
        let record = doc.record(LifecycleStage::Testing);
        assert_eq!(record.state, StageState::Completed);
        assert_eq!(record.transitions.last().unwrap().kind, TransitionKind::Forced);
    }

    #[test]
    fn restarting_a_skipped_stage_without_forcing_is_rejected() {
        let mut doc = PipelineDocument::new("T001");
        let now = Utc::now();
        doc.skip_stage(LifecycleStage::Research, "agent:builder", "not applicable", now).unwrap();
        let err = doc.start_stage(LifecycleStage::Research, "agent:builder", now).unwrap_err();
        assert_eq!(err, LifecycleError::AlreadyTerminal(LifecycleStage::Research));
    }

    #[test]
    fn skipping_a_completed_stage_without_forcing_is_rejected() {
        let mut doc = PipelineDocument::new("T001");
        let now = Utc::now();
        doc.force_transition(LifecycleStage::Research, StageState::Completed, "agent:builder", "done early", now);
        let err = doc.skip_stage(LifecycleStage::Research, "agent:builder", "not applicable", now).unwrap_err();
        assert_eq!(err, LifecycleError::IllegalTransition(LifecycleStage::Research));
    }

    #[test]
    fn advisory_mode_completes_release_despite_missing_prerequisites() {
        let mut doc = PipelineDocument::new("T001");
        let task = released_task();
        assert!(
            doc.complete_stage(LifecycleStage::Release, &task, LifecycleMode::Advisory, "agent:builder", Utc::now())
                .is_ok()
        );
    }
}
