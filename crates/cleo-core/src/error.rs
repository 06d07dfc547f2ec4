use thiserror::Error;

/// Errors raised by task entity construction, mutation, and ID generation.
/// Maps 1:1 onto the error codes in spec.md §7; `cleo-envelope` wraps these
/// at the response boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("title must be 1-120 characters, got {len}")]
    InvalidTitle { len: usize },

    #[error("description must be 0-2000 characters, got {len}")]
    InvalidDescription { len: usize },

    #[error("title and description must differ (case-insensitively)")]
    TitleEqualsDescription,

    #[error("blockedBy must be 5-300 characters when status is blocked")]
    InvalidBlockedBy,

    #[error("cancellationReason must be 5-300 characters and contain no shell metacharacters")]
    InvalidCancellationReason,

    #[error("label '{0}' does not match ^[a-z][a-z0-9.-]*$")]
    InvalidLabel(String),

    #[error("timestamp {0} is more than 5 minutes in the future")]
    FutureTimestamp(String),

    #[error("illegal status transition from {from} to {to}")]
    IllegalStatusTransition { from: String, to: String },

    #[error("status 'blocked' requires blockedBy")]
    BlockedRequiresReason,

    #[error("status 'cancelled' requires cancellationReason")]
    CancelledRequiresReason,

    #[error("task id '{0}' is not well-formed (expected T + digits)")]
    MalformedId(String),

    #[error("task id '{0}' already exists")]
    DuplicateId(String),

    #[error("phase '{0}' is not a key in the project phase set")]
    InvalidPhase(String),
}
