use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("failed to open audit log {path}: {source}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append to audit log {path}: {source}")]
    Append {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read audit log {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed audit record in {path} at line {line}: {source}")]
    Malformed {
        path: Utf8PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("checkpoint of {source_dir} into {dest_dir} failed: {source}")]
    Checkpoint {
        source_dir: Utf8PathBuf,
        dest_dir: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
