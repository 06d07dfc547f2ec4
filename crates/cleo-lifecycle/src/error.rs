use thiserror::Error;

use crate::LifecycleStage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("stage gate rejected completion: {0}")]
    Gate(#[from] cleo_gate::GateError),

    #[error("stage '{0:?}' is already completed and cannot be restarted without a forced transition")]
    AlreadyTerminal(LifecycleStage),

    #[error("'{0:?}' is not a legal stage state transition target from a non-forced caller")]
    IllegalTransition(LifecycleStage),
}
