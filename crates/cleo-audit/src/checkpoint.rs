use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

use crate::error::AuditError;

/// A point-in-time copy of the store subtree (spec.md §4.11), staged under
/// `.checkpoint/<timestamp>/` inside the store directory. Best-effort:
/// callers turn a failed [`create_checkpoint`] into an envelope warning
/// rather than aborting the commit it protects.
pub fn create_checkpoint(
    store_dir: &Utf8Path,
    checkpoint_root: &Utf8Path,
    at: DateTime<Utc>,
) -> Result<Utf8PathBuf, AuditError> {
    let dest = checkpoint_root.join(at.format("%Y%m%dT%H%M%S%.fZ").to_string());
    copy_dir_recursive(store_dir, &dest).map_err(|source| AuditError::Checkpoint {
        source_dir: store_dir.to_path_buf(),
        dest_dir: dest.clone(),
        source,
    })?;
    Ok(dest)
}

/// Checkpoints under `checkpoint_root`, oldest first (lexicographic order on
/// the timestamped directory name is chronological).
pub fn list_checkpoints(checkpoint_root: &Utf8Path) -> Vec<Utf8PathBuf> {
    let Ok(entries) = std::fs::read_dir(checkpoint_root) else {
        return Vec::new();
    };
    let mut checkpoints: Vec<Utf8PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.path()).ok())
        .collect();
    checkpoints.sort();
    checkpoints
}

fn copy_dir_recursive(src: &Utf8Path, dest: &Utf8Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        // Checkpoints capture the store subtree only; never recurse into a
        // prior checkpoint directory nested under it.
        if name == ".checkpoint" {
            continue;
        }
        let src_child = entry.path();
        let dest_child = dest.join(&name);
        if file_type.is_dir() {
            copy_dir_recursive(
                Utf8Path::from_path(&src_child).unwrap_or(src),
                &dest_child,
            )?;
        } else if file_type.is_file() {
            std::fs::copy(&src_child, &dest_child)?;
        }
    }
    Ok(())
}
