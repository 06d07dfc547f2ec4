use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("resulting depth would exceed the maximum of 3")]
    DepthExceeded,

    #[error("type '{requested:?}' is not legal at depth {depth} (parent type {parent:?})")]
    IllegalType {
        requested: cleo_core::TaskType,
        parent: Option<cleo_core::TaskType>,
        depth: u32,
    },

    #[error("parent '{0}' already has {1} total siblings, exceeding hierarchy.maxSiblings")]
    TooManySiblings(String, u32),

    #[error("parent '{0}' already has {1} active siblings, exceeding hierarchy.maxActiveSiblings")]
    TooManyActiveSiblings(String, u32),

    #[error("reparenting '{0}' under '{1}' would create a cycle")]
    Cycle(String, String),

    #[error(
        "position version mismatch: caller assumed {expected}, store has {actual}"
    )]
    PositionConflict { expected: u32, actual: u32 },

    #[error("task '{0}' has children; pass cascade to remove them or use archive")]
    HasChildren(String),
}
