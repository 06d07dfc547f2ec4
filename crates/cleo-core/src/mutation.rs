use chrono::{DateTime, Utc};

use crate::task::{Task, TimestampedNote};

/// Edit-mode vocabulary for list-valued fields (spec.md §4.4): *append* is the
/// default, *replace* corresponds to `set*` operations, *clear* to `clear*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Append,
    Replace,
    Clear,
}

/// Apply an edit-mode mutation to a `Vec`-valued field, deduplicating on
/// append so repeated values are idempotent.
pub fn apply_list_edit<T: Clone + PartialEq>(current: &mut Vec<T>, mode: EditMode, values: Vec<T>) {
    match mode {
        EditMode::Append => {
            for v in values {
                if !current.contains(&v) {
                    current.push(v);
                }
            }
        }
        EditMode::Replace => *current = values,
        EditMode::Clear => current.clear(),
    }
}

/// Apply an edit-mode mutation to a `BTreeSet`-valued field.
pub fn apply_set_edit<T: Ord + Clone>(
    current: &mut std::collections::BTreeSet<T>,
    mode: EditMode,
    values: std::collections::BTreeSet<T>,
) {
    match mode {
        EditMode::Append => current.extend(values),
        EditMode::Replace => *current = values,
        EditMode::Clear => current.clear(),
    }
}

/// Append a timestamped, attributed note. Notes are never edited in place
/// (spec.md §3.1, §4.4).
pub fn append_note(task: &mut Task, text: impl Into<String>, author: impl Into<String>, now: DateTime<Utc>) {
    task.notes.push(TimestampedNote {
        at: now,
        text: text.into(),
        author: author.into(),
    });
}

/// Stamp `updatedAt` and `modifiedBy`. Every mutation primitive must call
/// this exactly once, after applying its field change (spec.md §4.4, §3.2
/// invariant 9).
pub fn stamp_update(task: &mut Task, now: DateTime<Utc>, actor: impl Into<String>) {
    task.updated_at = now;
    task.modified_by = actor.into();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn append_mode_deduplicates() {
        let mut files = vec!["a.rs".to_string()];
        apply_list_edit(
            &mut files,
            EditMode::Append,
            vec!["a.rs".to_string(), "b.rs".to_string()],
        );
        assert_eq!(files, vec!["a.rs".to_string(), "b.rs".to_string()]);
    }

    #[test]
    fn replace_mode_overwrites() {
        let mut files = vec!["a.rs".to_string()];
        apply_list_edit(&mut files, EditMode::Replace, vec!["b.rs".to_string()]);
        assert_eq!(files, vec!["b.rs".to_string()]);
    }

    #[test]
    fn clear_mode_empties() {
        let mut files = vec!["a.rs".to_string()];
        apply_list_edit(&mut files, EditMode::Clear, vec!["b.rs".to_string()]);
        assert!(files.is_empty());
    }

    #[test]
    fn set_edit_append_unions() {
        let mut labels: BTreeSet<String> = ["bug".to_string()].into_iter().collect();
        let additions: BTreeSet<String> = ["urgent".to_string()].into_iter().collect();
        apply_set_edit(&mut labels, EditMode::Append, additions);
        assert_eq!(labels.len(), 2);
    }
}
