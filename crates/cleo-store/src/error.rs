use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} as JSON: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: cleo_utils::error::UtilsError,
    },

    #[error(transparent)]
    Lock(#[from] cleo_lock::LockError),

    #[error("checksum mismatch for {path} even after re-read; data may be corrupted")]
    ChecksumMismatch { path: Utf8PathBuf },

    #[error("task id '{0}' already present in the active store; restore refused")]
    DuplicateIdOnRestore(String),

    #[error("no archived task with id '{0}'")]
    UnknownArchivedTask(String),

    #[error("{path} failed schema validation: {errors:?}")]
    Validation {
        path: Utf8PathBuf,
        errors: Vec<cleo_validation::ValidationError>,
    },
}
