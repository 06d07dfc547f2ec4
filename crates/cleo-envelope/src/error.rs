//! `CleoError` — the single seam every crate-local error enum is mapped
//! into (spec.md §7), mirroring the teacher's per-module error enums
//! feeding one top-level error type.

use crate::taxonomy::{ErrorCode, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum CleoError {
    #[error(transparent)]
    Core(#[from] cleo_core::CoreError),
    #[error(transparent)]
    Graph(#[from] cleo_graph::GraphError),
    #[error(transparent)]
    Hierarchy(#[from] cleo_hierarchy::HierarchyError),
    #[error(transparent)]
    Gate(#[from] cleo_gate::GateError),
    #[error(transparent)]
    Lifecycle(#[from] cleo_lifecycle::LifecycleError),
    #[error(transparent)]
    Session(#[from] cleo_session::SessionError),
    #[error(transparent)]
    Audit(#[from] cleo_audit::AuditError),
    #[error(transparent)]
    Store(#[from] cleo_store::StoreError),
    #[error(transparent)]
    Lock(#[from] cleo_lock::LockError),
    #[error(transparent)]
    Config(#[from] cleo_config::ConfigError),
    #[error(transparent)]
    Validation(#[from] cleo_validation::ValidationError),
    #[error(transparent)]
    Query(#[from] cleo_query::QueryError),
}

/// Map a `CleoError` to its stable `(code, exit_code, kind)`, following the
/// teacher's `error_to_exit_code_and_kind` single-match pattern.
#[must_use]
pub fn classify(error: &CleoError) -> (ErrorCode, i32, ErrorKind) {
    let code = match error {
        CleoError::Core(e) => classify_core(e),
        CleoError::Graph(cleo_graph::GraphError::CircularDependency { .. }) => {
            ErrorCode::CircularDependency
        }
        CleoError::Graph(cleo_graph::GraphError::UnknownTask(_)) => ErrorCode::NotFound,
        CleoError::Hierarchy(e) => classify_hierarchy(e),
        CleoError::Gate(e) => classify_gate(e),
        CleoError::Lifecycle(cleo_lifecycle::LifecycleError::Gate(e)) => classify_gate(e),
        CleoError::Lifecycle(cleo_lifecycle::LifecycleError::AlreadyTerminal(_)) => ErrorCode::StageAlreadyTerminal,
        CleoError::Lifecycle(cleo_lifecycle::LifecycleError::IllegalTransition(_)) => ErrorCode::IllegalStageTransition,
        CleoError::Session(e) => classify_session(e),
        CleoError::Audit(_) => ErrorCode::IoError,
        CleoError::Store(e) => classify_store(e),
        CleoError::Lock(_) => ErrorCode::LockTimeout,
        CleoError::Config(_) => ErrorCode::ConfigError,
        CleoError::Validation(_) => ErrorCode::ValidationError,
        CleoError::Query(cleo_query::QueryError::Graph(cleo_graph::GraphError::CircularDependency { .. })) => {
            ErrorCode::CircularDependency
        }
        CleoError::Query(_) => ErrorCode::NotFound,
    };
    let (exit_code, kind) = code.exit_code_and_kind();
    (code, exit_code, kind)
}

fn classify_core(e: &cleo_core::CoreError) -> ErrorCode {
    match e {
        cleo_core::CoreError::DuplicateId(_) => ErrorCode::DuplicateId,
        cleo_core::CoreError::MalformedId(_) => ErrorCode::NotFound,
        cleo_core::CoreError::IllegalStatusTransition { .. } => ErrorCode::IllegalStatusTransition,
        _ => ErrorCode::ValidationError,
    }
}

fn classify_hierarchy(e: &cleo_hierarchy::HierarchyError) -> ErrorCode {
    match e {
        cleo_hierarchy::HierarchyError::DepthExceeded => ErrorCode::DepthExceeded,
        cleo_hierarchy::HierarchyError::TooManySiblings(..)
        | cleo_hierarchy::HierarchyError::TooManyActiveSiblings(..) => ErrorCode::SiblingCapExceeded,
        cleo_hierarchy::HierarchyError::PositionConflict { .. } => ErrorCode::PositionConflict,
        cleo_hierarchy::HierarchyError::Cycle(..) => ErrorCode::CircularDependency,
        cleo_hierarchy::HierarchyError::IllegalType { .. }
        | cleo_hierarchy::HierarchyError::HasChildren(_) => ErrorCode::ValidationError,
    }
}

fn classify_gate(e: &cleo_gate::GateError) -> ErrorCode {
    match e {
        cleo_gate::GateError::PrerequisiteNotMet { .. } => ErrorCode::PrerequisiteNotMet,
        cleo_gate::GateError::VerificationIncomplete => ErrorCode::VerificationIncomplete,
        cleo_gate::GateError::CircularValidation => ErrorCode::CircularValidation,
        cleo_gate::GateError::MissingAttribution => ErrorCode::MissingAttribution,
    }
}

fn classify_session(e: &cleo_session::SessionError) -> ErrorCode {
    match e {
        cleo_session::SessionError::PrimarySessionActive(_) => ErrorCode::PrimarySessionActive,
        cleo_session::SessionError::FocusRequired => ErrorCode::FocusRequired,
        cleo_session::SessionError::EndNoteRequired => ErrorCode::EndNoteRequired,
        cleo_session::SessionError::AlreadyEnded(_) => ErrorCode::SessionAlreadyEnded,
        cleo_session::SessionError::MissingScope | cleo_session::SessionError::InvalidScope(_) => {
            ErrorCode::ValidationError
        }
    }
}

fn classify_store(e: &cleo_store::StoreError) -> ErrorCode {
    match e {
        cleo_store::StoreError::ChecksumMismatch { .. } => ErrorCode::ChecksumMismatch,
        cleo_store::StoreError::Lock(_) => ErrorCode::LockTimeout,
        cleo_store::StoreError::DuplicateIdOnRestore(_) => ErrorCode::DuplicateId,
        cleo_store::StoreError::UnknownArchivedTask(_) => ErrorCode::NotFound,
        cleo_store::StoreError::Read { .. }
        | cleo_store::StoreError::Parse { .. }
        | cleo_store::StoreError::Write { .. } => ErrorCode::IoError,
        cleo_store::StoreError::Validation { .. } => ErrorCode::ValidationError,
    }
}
