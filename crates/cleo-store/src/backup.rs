use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// `backups/operational/` — taken before every mutation (spec.md §2 item
/// 12, §6.1).
pub fn operational_backup_dir(store_dir: &Utf8Path) -> Utf8PathBuf {
    store_dir.join("backups").join("operational")
}

/// `backups/safety/` — taken before destructive operations only (delete,
/// archive, restore).
pub fn safety_backup_dir(store_dir: &Utf8Path) -> Utf8PathBuf {
    store_dir.join("backups").join("safety")
}

/// Copy `source` into `backup_dir/<stem>-<timestamp>.<ext>`, creating
/// `backup_dir` if needed, then rotate so at most `keep` backups for that
/// stem remain.
pub fn create_backup(
    source: &Utf8Path,
    backup_dir: &Utf8Path,
    at: DateTime<Utc>,
    keep: usize,
) -> Result<Utf8PathBuf, StoreError> {
    std::fs::create_dir_all(backup_dir).map_err(|source_err| StoreError::Write {
        path: backup_dir.to_path_buf(),
        source: cleo_utils::error::UtilsError::AtomicWriteFailed {
            path: backup_dir.to_string(),
            reason: source_err.to_string(),
        },
    })?;

    let stem = source.file_stem().unwrap_or("backup");
    let ext = source.extension().unwrap_or("json");
    let dest = backup_dir.join(format!("{stem}-{}.{ext}", at.format("%Y%m%dT%H%M%S%.fZ")));

    std::fs::copy(source, &dest).map_err(|io_err| StoreError::Write {
        path: dest.clone(),
        source: cleo_utils::error::UtilsError::AtomicWriteFailed {
            path: dest.to_string(),
            reason: io_err.to_string(),
        },
    })?;

    rotate_backups(backup_dir, stem, keep)?;
    Ok(dest)
}

/// Keep only the `keep` most recent backups sharing `stem`, oldest removed
/// first. Filenames embed a sortable timestamp, so lexicographic order is
/// chronological order.
pub fn rotate_backups(backup_dir: &Utf8Path, stem: &str, keep: usize) -> Result<(), StoreError> {
    let Ok(entries) = std::fs::read_dir(backup_dir) else {
        return Ok(());
    };
    let prefix = format!("{stem}-");
    let mut matching: Vec<Utf8PathBuf> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.path()).ok())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .collect();
    matching.sort();

    if matching.len() > keep {
        for stale in &matching[..matching.len() - keep] {
            let _ = std::fs::remove_file(stale);
        }
    }
    Ok(())
}

/// Safety backup taken immediately before a destructive commit (delete,
/// archive, restore), so a pre-restore snapshot always exists even if the
/// destructive operation itself fails partway (spec.md §4.12, §2 item 12).
pub fn pre_destructive_safety_backup(
    store_dir: &Utf8Path,
    source: &Utf8Path,
    at: DateTime<Utc>,
    keep: usize,
) -> Result<Utf8PathBuf, StoreError> {
    create_backup(source, &safety_backup_dir(store_dir), at, keep)
}

/// Operational backup taken before every ordinary mutation commit.
pub fn pre_mutation_operational_backup(
    store_dir: &Utf8Path,
    source: &Utf8Path,
    at: DateTime<Utc>,
    keep: usize,
) -> Result<Utf8PathBuf, StoreError> {
    create_backup(source, &operational_backup_dir(store_dir), at, keep)
}
