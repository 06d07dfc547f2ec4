use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session start requires a scope selector")]
    MissingScope,

    #[error("invalid scope selector '{0}'; expected 'kind:target' or a bare kind")]
    InvalidScope(String),

    #[error("a primary session is already active ('{0}'); end it first or enable multiSession")]
    PrimarySessionActive(String),

    #[error("session end requires an ending note in requireNotes mode")]
    EndNoteRequired,

    #[error("this operation requires an active focus task")]
    FocusRequired,

    #[error("session '{0}' has already ended")]
    AlreadyEnded(String),
}
