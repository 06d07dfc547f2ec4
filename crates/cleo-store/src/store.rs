use std::time::Duration;

use camino::Utf8Path;
use cleo_lock::FileLock;
use cleo_utils::atomic_write::write_file_atomic;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::document::TaskStoreDocument;
use crate::error::StoreError;

/// Top-level keys `tasks.json` is allowed to carry (spec.md §6.1). Unknown
/// keys are logged rather than rejected — a newer `cleo` writing a field an
/// older one doesn't know about is a forward-compat signal, not corruption.
const TASK_STORE_FIELDS: &[&str] = &["_meta", "project", "focus", "tasks"];
const TASK_STORE_SCHEMA_VERSION: &str = "1";

/// Read and deserialize a JSON document. Lock-free (spec.md §4.13: "All read
/// operations are lock-free").
pub fn read<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate `doc`'s top-level shape and every task it carries against
/// `cleo-validation` (spec.md §4.2 "validates each persisted file on read
/// and before every write"). Unknown fields only warn; schema-version
/// mismatches and per-task cross-field violations fail hard.
fn validate_task_store(path: &Utf8Path, raw: &serde_json::Value, doc: &TaskStoreDocument) -> Result<(), StoreError> {
    for unknown in cleo_validation::check_unknown_fields("tasks.json", raw, TASK_STORE_FIELDS, cleo_validation::ValidationMode::Lenient) {
        tracing::warn!(path = %path, %unknown, "unknown field in tasks.json");
    }

    let mut errors = Vec::new();
    if let Err(e) = cleo_validation::check_schema_version(&doc.meta.schema_version.to_string(), TASK_STORE_SCHEMA_VERSION) {
        errors.push(e);
    }
    for task in &doc.tasks {
        if let Err(task_errors) = cleo_validation::validate_task(task) {
            errors.extend(task_errors);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation { path: path.to_path_buf(), errors })
    }
}

/// Read the active task store, validating `_meta.checksum` against the
/// recomputed checksum of the task list (spec.md §4.1 "Read safety"). On
/// mismatch, re-reads once before surfacing `ChecksumMismatch`. Every read
/// also runs the persisted document through `cleo-validation` (spec.md §4.2).
pub fn read_task_store(path: &Utf8Path) -> Result<TaskStoreDocument, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: serde_json::Value = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: TaskStoreDocument = serde_json::from_value(raw.clone()).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let verified = if doc.meta.checksum == doc.compute_checksum() {
        doc
    } else {
        let retried = read::<TaskStoreDocument>(path)?;
        if retried.meta.checksum != retried.compute_checksum() {
            return Err(StoreError::ChecksumMismatch {
                path: path.to_path_buf(),
            });
        }
        retried
    };

    validate_task_store(path, &raw, &verified)?;
    Ok(verified)
}

/// Serialize `value` as JCS-canonical JSON and write it atomically (temp
/// file, fsync, rename, directory fsync — spec.md §4.1 "Write contract").
pub fn write_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), StoreError> {
    let canonical =
        cleo_utils::canonicalization::emit_jcs(value).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    write_file_atomic(path, &canonical)
        .map(|_| ())
        .map_err(|e| StoreError::Write {
            path: path.to_path_buf(),
            source: cleo_utils::error::UtilsError::AtomicWriteFailed {
                path: path.to_string(),
                reason: e.to_string(),
            },
        })
}

/// Commit the active store: validate every task against `cleo-validation`
/// (spec.md §4.2 "before every write"), recompute `_meta.checksum` over the
/// task list, increment `_meta.generation`, then write atomically.
pub fn commit_task_store(path: &Utf8Path, doc: &mut TaskStoreDocument) -> Result<(), StoreError> {
    let mut errors = Vec::new();
    for task in &doc.tasks {
        if let Err(task_errors) = cleo_validation::validate_task(task) {
            errors.extend(task_errors);
        }
    }
    if !errors.is_empty() {
        return Err(StoreError::Validation { path: path.to_path_buf(), errors });
    }

    doc.meta.checksum = doc.compute_checksum();
    doc.meta.generation += 1;
    write_atomic(path, doc)
}

/// Run `f` under an exclusive advisory lock on `resource` (spec.md §4.1
/// "Locking"), with a wall-clock `timeout` deadline. The lock is released
/// whether `f` succeeds or fails.
pub fn with_lock<T>(
    resource: &str,
    timeout: Duration,
    f: impl FnOnce() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let lock = FileLock::acquire(resource, false, timeout)?;
    let result = f();
    lock.release()?;
    result
}

/// Run `f` under exclusive locks on every resource in `resources`, acquired
/// in a stable order (sorted) to prevent deadlock across concurrent
/// multi-file commits (spec.md §4.1, §5 "Ordering guarantees"). If any
/// acquisition fails, every lock already held is released and the whole
/// commit fails with no writes performed.
pub fn with_multi_lock<T>(
    resources: &[&str],
    timeout: Duration,
    f: impl FnOnce() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let mut ordered: Vec<&str> = resources.to_vec();
    ordered.sort_unstable();

    let mut held = Vec::with_capacity(ordered.len());
    for resource in &ordered {
        match FileLock::acquire(resource, false, timeout) {
            Ok(lock) => held.push(lock),
            Err(e) => {
                for lock in held {
                    let _ = lock.release();
                }
                return Err(StoreError::Lock(e));
            }
        }
    }

    let result = f();
    for lock in held {
        let _ = lock.release();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::StoreMeta;
    use camino::Utf8PathBuf;

    /// A fresh temp directory for document files, with `cleo-lock`'s own
    /// thread-local store directory pointed at the same place so
    /// `with_lock`/`with_multi_lock` don't touch the real `.cleo` dir.
    fn isolated_dir() -> (tempfile::TempDir, Utf8PathBuf) {
        let td = tempfile::TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        cleo_lock::set_thread_home_for_tests(dir.clone());
        (td, dir)
    }

    #[test]
    fn write_then_read_task_store_round_trips() {
        let (_td, dir) = isolated_dir();
        let path = dir.join("tasks.json");
        let mut doc = TaskStoreDocument::default();
        commit_task_store(&path, &mut doc).unwrap();
        let reread = read_task_store(&path).unwrap();
        assert_eq!(reread.meta.generation, 1);
    }

    #[test]
    fn corrupted_checksum_is_detected() {
        let (_td, dir) = isolated_dir();
        let path = dir.join("tasks.json");
        let mut doc = TaskStoreDocument {
            meta: StoreMeta {
                checksum: "deadbeefdeadbeef".to_string(),
                ..StoreMeta::default()
            },
            ..TaskStoreDocument::default()
        };
        doc.meta.generation = 1;
        write_atomic(&path, &doc).unwrap();
        let err = read_task_store(&path).unwrap_err();
        assert!(matches!(err, StoreError::ChecksumMismatch { .. }));
    }

    #[test]
    fn with_lock_releases_after_success() {
        let (_td, _dir) = isolated_dir();
        let result = with_lock("tasks", Duration::from_secs(1), || Ok(42)).unwrap();
        assert_eq!(result, 42);
        // A second acquisition must succeed now that the first was released.
        assert!(with_lock("tasks", Duration::from_secs(1), || Ok(())).is_ok());
    }

    #[test]
    fn multi_lock_acquires_in_sorted_order_and_releases_all() {
        let (_td, _dir) = isolated_dir();
        let result =
            with_multi_lock(&["tasks", "archive", "audit"], Duration::from_secs(1), || Ok(()));
        assert!(result.is_ok());
        assert!(
            with_multi_lock(&["archive", "tasks"], Duration::from_secs(1), || Ok(())).is_ok()
        );
    }
}
