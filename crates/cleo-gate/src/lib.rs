//! Lifecycle stage gate evaluation (spec.md §4.8). Pure functions over
//! caller-supplied stage state, so `cleo-lifecycle` can drive the pipeline
//! document while the pass/fail/warn logic and the release-stage circular
//! validation check live in one place, grounded on the teacher's
//! `GateResult`/`GateCondition` shape.

pub mod error;

use chrono::{DateTime, Utc};
use cleo_config::LifecycleMode;
use cleo_core::Task;
use serde::{Deserialize, Serialize};

pub use error::GateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Research,
    Consensus,
    ArchitectureDecision,
    Specification,
    Decomposition,
    Implementation,
    Validation,
    Testing,
    Release,
    /// Cross-cutting: not part of the linear sequence, never a prerequisite.
    Contribution,
}

impl LifecycleStage {
    /// The nine stages in pipeline order (excludes `Contribution`, which is
    /// cross-cutting and has no position in the sequence).
    pub const SEQUENCE: [LifecycleStage; 9] = [
        LifecycleStage::Research,
        LifecycleStage::Consensus,
        LifecycleStage::ArchitectureDecision,
        LifecycleStage::Specification,
        LifecycleStage::Decomposition,
        LifecycleStage::Implementation,
        LifecycleStage::Validation,
        LifecycleStage::Testing,
        LifecycleStage::Release,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    NotStarted,
    InProgress,
    Blocked,
    Completed,
    Skipped,
    Failed,
}

impl StageState {
    fn satisfies_prerequisite(self) -> bool {
        matches!(self, StageState::Completed | StageState::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateVerdict {
    Pass,
    Fail,
    Warn,
}

/// One recorded gate check (spec.md §3.5: `{name, result, checkedBy, checkedAt, details?}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateCondition {
    pub name: String,
    pub result: GateVerdict,
    pub checked_by: String,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Automatic,
    Manual,
    Forced,
}

/// Prerequisite stages that must be `completed` or `skipped` before `stage`
/// may complete. `Contribution` and `Research` (the first stage) have none.
#[must_use]
pub fn stage_prerequisites(stage: LifecycleStage) -> Vec<LifecycleStage> {
    let Some(position) = LifecycleStage::SEQUENCE.iter().position(|s| *s == stage) else {
        return Vec::new();
    };
    LifecycleStage::SEQUENCE[..position].to_vec()
}

/// Whether `stage` may transition into `completed`, given `state_of` (a
/// lookup from stage to its current recorded state) and the configured
/// `mode`. In `strict` mode, any unmet prerequisite fails the transition. In
/// `advisory` mode, a missing prerequisite is logged but does not reject. In
/// `off` mode, prerequisites are never evaluated.
pub fn can_complete_stage(
    stage: LifecycleStage,
    state_of: impl Fn(LifecycleStage) -> StageState,
    mode: LifecycleMode,
) -> Result<(), GateError> {
    if matches!(mode, LifecycleMode::Off) {
        return Ok(());
    }
    for prerequisite in stage_prerequisites(stage) {
        if !state_of(prerequisite).satisfies_prerequisite() {
            match mode {
                LifecycleMode::Strict => {
                    return Err(GateError::PrerequisiteNotMet { stage, prerequisite });
                }
                LifecycleMode::Advisory => {
                    tracing::warn!(
                        ?stage,
                        ?prerequisite,
                        "stage completing with an unmet prerequisite under advisory mode"
                    );
                }
                LifecycleMode::Off => unreachable!("handled above"),
            }
        }
    }
    Ok(())
}

/// The `release` stage's extra checks (spec.md §4.8): verification gates
/// implemented and documented, both `validatedBy`/`testedBy` present, and
/// `createdBy ≠ validatedBy ≠ testedBy`. In `advisory` mode violations are
/// logged, not rejected; in `off` mode the checks are skipped entirely.
pub fn check_release_gate(task: &Task, mode: LifecycleMode) -> Result<(), GateError> {
    if matches!(mode, LifecycleMode::Off) {
        return Ok(());
    }

    let violation = if !task.verification.implemented || !task.verification.documented {
        Some(GateError::VerificationIncomplete)
    } else if task.validated_by.is_none() || task.tested_by.is_none() {
        Some(GateError::MissingAttribution)
    } else {
        let created = &task.created_by;
        let validated = task.validated_by.as_ref().unwrap();
        let tested = task.tested_by.as_ref().unwrap();
        if created == validated || created == tested || validated == tested {
            Some(GateError::CircularValidation)
        } else {
            None
        }
    };

    match (violation, mode) {
        (None, _) => Ok(()),
        (Some(e), LifecycleMode::Strict) => Err(e),
        (Some(e), LifecycleMode::Advisory) => {
            tracing::warn!(task_id = %task.id, error = %e, "release gate violation under advisory mode");
            Ok(())
        }
        (Some(_), LifecycleMode::Off) => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleo_core::{EpicLifecycle, Origin, Priority, Size, TaskStatus, TaskType, Verification};
    use std::collections::{BTreeSet, HashMap};

    fn base_task() -> Task {
        let now = Utc::now();
        Task {
            id: "T001".to_string(),
            title: "Ship the release".to_string(),
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
    fn research_has_no_prerequisites() {
        assert!(stage_prerequisites(LifecycleStage::Research).is_empty());
    }

    #[test]
    fn release_requires_all_eight_prior_stages() {
        assert_eq!(stage_prerequisites(LifecycleStage::Release).len(), 8);
    }

    #[test]
    fn strict_mode_rejects_unmet_prerequisite() {
        let err = can_complete_stage(
            LifecycleStage::Testing,
            |_| StageState::NotStarted,
            LifecycleMode::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, GateError::PrerequisiteNotMet { .. }));
    }

    #[test]
    fn advisory_mode_allows_unmet_prerequisite() {
        assert!(
            can_complete_stage(
                LifecycleStage::Testing,
                |_| StageState::NotStarted,
                LifecycleMode::Advisory,
            )
            .is_ok()
        );
    }

    #[test]
    fn off_mode_skips_evaluation_entirely() {
        assert!(
            can_complete_stage(
                LifecycleStage::Release,
                |_| StageState::NotStarted,
                LifecycleMode::Off,
            )
            .is_ok()
        );
    }

    #[test]
    fn satisfied_prerequisites_allow_completion() {
        let mut completed: HashMap<LifecycleStage, StageState> = HashMap::new();
        for stage in stage_prerequisites(LifecycleStage::Release) {
            completed.insert(stage, StageState::Completed);
        }
        assert!(
            can_complete_stage(
                LifecycleStage::Release,
                |s| completed.get(&s).copied().unwrap_or(StageState::NotStarted),
                LifecycleMode::Strict,
            )
            .is_ok()
        );
    }

    #[test]
    fn release_gate_passes_with_distinct_attributors() {
        assert!(check_release_gate(&base_task(), LifecycleMode::Strict).is_ok());
    }

    #[test]
    fn release_gate_rejects_missing_verification() {
        let mut task = base_task();
        task.verification.documented = false;
        let err = check_release_gate(&task, LifecycleMode::Strict).unwrap_err();
        assert_eq!(err, GateError::VerificationIncomplete);
    }

    #[test]
    fn release_gate_rejects_missing_attribution() {
        let mut task = base_task();
        task.tested_by = None;
        let err = check_release_gate(&task, LifecycleMode::Strict).unwrap_err();
        assert_eq!(err, GateError::MissingAttribution);
    }

    #[test]
    fn release_gate_rejects_circular_validation() {
        let mut task = base_task();
        task.tested_by = task.validated_by.clone();
        let err = check_release_gate(&task, LifecycleMode::Strict).unwrap_err();
        assert_eq!(err, GateError::CircularValidation);
    }

    #[test]
    fn release_gate_circular_validation_is_advisory_in_advisory_mode() {
        let mut task = base_task();
        task.created_by = task.validated_by.clone().unwrap();
        assert!(check_release_gate(&task, LifecycleMode::Advisory).is_ok());
    }
}
