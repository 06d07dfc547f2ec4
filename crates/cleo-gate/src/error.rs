use thiserror::Error;

use crate::LifecycleStage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("stage '{stage:?}' cannot complete: prerequisite '{prerequisite:?}' is neither completed nor skipped")]
    PrerequisiteNotMet {
        stage: LifecycleStage,
        prerequisite: LifecycleStage,
    },

    #[error("release gate requires verification.gates.implemented and .documented to be true")]
    VerificationIncomplete,

    #[error("release gate requires both validatedBy and testedBy to be recorded")]
    MissingAttribution,

    #[error("release gate requires createdBy, validatedBy, and testedBy to be three distinct identities")]
    CircularValidation,
}
