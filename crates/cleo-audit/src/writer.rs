use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cleo_utils::paths::ensure_dir_all;

use crate::error::AuditError;
use crate::model::AuditRecord;

/// Appends one JSON object per line to a dedicated file, `O_APPEND` + `fsync`
/// per record, mirroring the store's atomic-write discipline (spec.md
/// §4.10). Readers stream the file with `BufRead::lines()` without
/// materialising the whole log.
pub struct AuditLog {
    path: Utf8PathBuf,
}

impl AuditLog {
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir_all(parent).map_err(|source| AuditError::Open {
                path: self.path.clone(),
                source,
            })?;
        }
        let line = serde_json::to_string(record).expect("AuditRecord always serializes");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| AuditError::Open {
                path: self.path.clone(),
                source,
            })?;
        writeln!(file, "{line}").map_err(|source| AuditError::Append {
            path: self.path.clone(),
            source,
        })?;
        file.sync_all().map_err(|source| AuditError::Append {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        read_all(&self.path)
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Free function variant of [`AuditLog::read_all`], usable without
/// constructing an `AuditLog` (e.g. from read-only query paths).
pub fn read_all(path: &Utf8Path) -> Result<Vec<AuditRecord>, AuditError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path).map_err(|source| AuditError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| AuditError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record: AuditRecord =
            serde_json::from_str(&line).map_err(|source| AuditError::Malformed {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("audit.jsonl")).unwrap();
        let log = AuditLog::new(path);

        log.append(&AuditRecord::new("task.create", "agent:builder", Utc::now()).with_task("T001"))
            .unwrap();
        log.append(&AuditRecord::new("task.update", "agent:builder", Utc::now()).with_task("T001"))
            .unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "task.create");
        assert_eq!(records[1].task_id.as_deref(), Some("T001"));
    }

    #[test]
    fn read_all_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("missing.jsonl")).unwrap();
        assert!(AuditLog::new(path).read_all().unwrap().is_empty());
    }

    #[test]
    fn entries_are_appended_in_order_never_reordered() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("audit.jsonl")).unwrap();
        let log = AuditLog::new(path);
        for action in ["a", "b", "c"] {
            log.append(&AuditRecord::new(action, "agent:builder", Utc::now()))
                .unwrap();
        }
        let records = log.read_all().unwrap();
        let actions: Vec<_> = records.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(actions, vec!["a", "b", "c"]);
    }
}
