//! Task entity layer: the typed task record, field-level mutation
//! primitives, status state machine, and ID generator.

pub mod error;
pub mod ids;
pub mod mutation;
pub mod status;
pub mod task;

pub use error::CoreError;
pub use task::{
    EpicLifecycle, Origin, Priority, Relation, RelationType, Size, Task, TaskId, TaskStatus,
    TaskType, TimestampedNote, Verification, validate_task,
};
