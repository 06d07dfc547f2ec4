use thiserror::Error;

/// Errors raised by the foundation primitives in this crate (atomic writes,
/// canonicalization, path resolution). Crates further up the stack
/// (`cleo-store`, `cleo-lock`, ...) wrap this in their own error enums rather
/// than exposing it directly at the `cleo-envelope` boundary.
#[derive(Error, Debug)]
pub enum UtilsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to canonicalize JSON: {0}")]
    Canonicalize(String),

    #[error("atomic write to {path} failed after retrying: {reason}")]
    AtomicWriteFailed { path: String, reason: String },
}
