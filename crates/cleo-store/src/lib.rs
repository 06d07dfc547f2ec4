//! The only writer of persisted store files (spec.md §4.1): atomic JSON
//! read/write, advisory locking, the archive engine (§4.12), and backup
//! rotation (§2 item 12).

pub mod archive;
pub mod backup;
pub mod document;
pub mod error;
pub mod store;

pub use document::{
    ArchiveBlock, ArchiveDocument, ArchivedTask, Focus, PhaseDefinition, PhaseStatus, ProjectInfo,
    StoreMeta, TaskStoreDocument,
};
pub use error::StoreError;
pub use store::{commit_task_store, read, read_task_store, with_lock, with_multi_lock, write_atomic};
