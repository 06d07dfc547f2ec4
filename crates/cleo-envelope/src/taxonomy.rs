//! Exit code bands and the closed error taxonomy (spec.md §6.3, §7),
//! following the teacher's `exit_codes.rs` pattern of one `match` mapping a
//! top-level error enum to `(exit_code, ErrorKind)`.

use serde::{Deserialize, Serialize};

/// Exit code band boundaries (spec.md §6.3). A concrete error always maps to
/// exactly one code inside its band.
pub mod bands {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const HIERARCHY: i32 = 10;
    pub const CONCURRENCY: i32 = 20;
    pub const SESSION: i32 = 30;
    pub const GATE: i32 = 40;
    pub const PROTOCOL: i32 = 60;
    pub const LIFECYCLE: i32 = 80;
    pub const ARTIFACT: i32 = 85;
    pub const PROVENANCE: i32 = 90;
    pub const SUCCESS_WITH_STATUS: i32 = 100;
}

/// The closed error-kind taxonomy (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    NotFound,
    Conflict,
    State,
    Concurrency,
    Gate,
    Provenance,
    Internal,
}

/// A machine-readable error code name, stable across releases (spec.md
/// §4.14 `error.name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    DuplicateId,
    CircularDependency,
    DepthExceeded,
    SiblingCapExceeded,
    PositionConflict,
    IllegalStatusTransition,
    TaskNotCancelled,
    TaskCompleted,
    LockTimeout,
    ChecksumMismatch,
    PrimarySessionActive,
    FocusRequired,
    EndNoteRequired,
    SessionAlreadyEnded,
    PrerequisiteNotMet,
    VerificationIncomplete,
    CircularValidation,
    MissingAttribution,
    ConfigError,
    IoError,
    StageAlreadyTerminal,
    IllegalStageTransition,
}

impl ErrorCode {
    /// `(exit_code, kind)` for this code, following each band in spec.md §6.3.
    #[must_use]
    pub const fn exit_code_and_kind(self) -> (i32, ErrorKind) {
        match self {
            Self::ValidationError => (bands::GENERAL, ErrorKind::Input),
            Self::NotFound => (bands::GENERAL + 1, ErrorKind::NotFound),
            Self::DuplicateId => (bands::GENERAL + 2, ErrorKind::Conflict),
            Self::CircularDependency => (bands::GENERAL + 3, ErrorKind::Conflict),
            Self::IllegalStatusTransition => (bands::GENERAL + 4, ErrorKind::State),
            Self::TaskNotCancelled => (bands::GENERAL + 5, ErrorKind::State),
            Self::TaskCompleted => (bands::GENERAL + 6, ErrorKind::State),
            Self::ConfigError => (bands::GENERAL + 7, ErrorKind::Input),
            Self::IoError => (bands::GENERAL + 8, ErrorKind::Internal),

            Self::DepthExceeded => (bands::HIERARCHY, ErrorKind::Conflict),
            Self::SiblingCapExceeded => (bands::HIERARCHY + 1, ErrorKind::Conflict),
            Self::PositionConflict => (bands::HIERARCHY + 2, ErrorKind::Conflict),

            Self::LockTimeout => (bands::CONCURRENCY, ErrorKind::Concurrency),
            Self::ChecksumMismatch => (bands::CONCURRENCY + 1, ErrorKind::Concurrency),

            Self::PrimarySessionActive => (bands::SESSION, ErrorKind::State),
            Self::FocusRequired => (bands::SESSION + 1, ErrorKind::State),
            Self::EndNoteRequired => (bands::SESSION + 2, ErrorKind::Input),
            Self::SessionAlreadyEnded => (bands::SESSION + 3, ErrorKind::State),

            Self::PrerequisiteNotMet => (bands::GATE, ErrorKind::Gate),
            Self::VerificationIncomplete => (bands::GATE + 1, ErrorKind::Gate),
            Self::CircularValidation => (bands::GATE + 2, ErrorKind::Gate),
            Self::MissingAttribution => (bands::PROVENANCE, ErrorKind::Provenance),

            Self::StageAlreadyTerminal => (bands::LIFECYCLE, ErrorKind::State),
            Self::IllegalStageTransition => (bands::LIFECYCLE + 1, ErrorKind::State),
        }
    }
}
