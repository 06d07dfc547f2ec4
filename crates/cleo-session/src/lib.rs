//! Session lifecycle and focus binding (spec.md §3.4, §4.9). Session
//! creation/ending is a pure decision function over caller-supplied state;
//! persistence of the resulting `Session` into the project file is
//! `cleo-store`'s job.

pub mod error;
pub mod model;
pub mod scope;

use chrono::{DateTime, Utc};

pub use error::SessionError;
pub use model::Session;
pub use scope::{Scope, parse_scope};

/// Start a new session. Fails with `PrimarySessionActive` unless no primary
/// session is active or `multi_session` is enabled; fails with
/// `MissingScope`/`InvalidScope` if `scope_selector` doesn't parse. On
/// success, focus is seeded from the scope's implied task, if any.
pub fn start_session(
    id: impl Into<String>,
    scope_selector: &str,
    agent: impl Into<String>,
    terminal_binding: Option<String>,
    existing_primary: Option<&Session>,
    multi_session: bool,
    now: DateTime<Utc>,
) -> Result<Session, SessionError> {
    if !multi_session
        && let Some(primary) = existing_primary
        && primary.is_active()
    {
        return Err(SessionError::PrimarySessionActive(primary.id.clone()));
    }
    let scope = parse_scope(scope_selector)?;
    Ok(Session {
        id: id.into(),
        created_at: now,
        ended_at: None,
        focus_task_id: scope.implied_focus_task().map(str::to_string),
        scope: scope.raw().to_string(),
        agent: agent.into(),
        terminal_binding,
        note: None,
    })
}

/// End `session`. In `require_notes` mode an ending `note` must be
/// non-empty. Fails with `AlreadyEnded` if the session has already ended.
pub fn end_session(
    session: &mut Session,
    note: Option<String>,
    require_notes: bool,
    now: DateTime<Utc>,
) -> Result<(), SessionError> {
    if !session.is_active() {
        return Err(SessionError::AlreadyEnded(session.id.clone()));
    }
    if require_notes && note.as_deref().is_none_or(str::is_empty) {
        return Err(SessionError::EndNoteRequired);
    }
    session.ended_at = Some(now);
    session.note = note;
    Ok(())
}

/// Resolve the task id that a mutating operation must be focused on.
/// Returns `FocusRequired` when the project file has no `currentTask` bound.
pub fn require_focus(current_task: Option<&str>) -> Result<&str, SessionError> {
    current_task.ok_or(SessionError::FocusRequired)
}

/// Key used to look up the active session: the host-provided terminal id
/// when one was supplied for this invocation, falling back to the project
/// file's `_meta.activeSession` (spec.md §4.9).
#[must_use]
pub fn resolve_active_session_key<'a>(
    invocation_terminal_id: Option<&'a str>,
    meta_active_session: Option<&'a str>,
) -> Option<&'a str> {
    invocation_terminal_id.or(meta_active_session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, ended: bool) -> Session {
        Session {
            id: id.to_string(),
            created_at: Utc::now(),
            ended_at: ended.then(Utc::now),
            scope: "epic:T001".to_string(),
            focus_task_id: Some("T001".to_string()),
            agent: "agent:builder".to_string(),
            terminal_binding: None,
            note: None,
        }
    }

    #[test]
    fn start_without_scope_fails() {
        let err = start_session("S1", "", "agent:builder", None, None, false, Utc::now()).unwrap_err();
        assert_eq!(err, SessionError::MissingScope);
    }

    #[test]
    fn start_seeds_focus_from_scope() {
        let s = start_session("S1", "epic:T002", "agent:builder", None, None, false, Utc::now()).unwrap();
        assert_eq!(s.focus_task_id.as_deref(), Some("T002"));
    }

    #[test]
    fn second_primary_session_is_rejected_without_multi_session() {
        let primary = session("S1", false);
        let err = start_session("S2", "epic:T003", "agent:builder", None, Some(&primary), false, Utc::now())
            .unwrap_err();
        assert_eq!(err, SessionError::PrimarySessionActive("S1".to_string()));
    }

    #[test]
    fn second_session_allowed_with_multi_session() {
        let primary = session("S1", false);
        assert!(
            start_session("S2", "epic:T003", "agent:builder", None, Some(&primary), true, Utc::now()).is_ok()
        );
    }

    #[test]
    fn second_session_allowed_once_first_has_ended() {
        let primary = session("S1", true);
        assert!(
            start_session("S2", "epic:T003", "agent:builder", None, Some(&primary), false, Utc::now()).is_ok()
        );
    }

    #[test]
    fn end_without_note_fails_in_require_notes_mode() {
        let mut s = session("S1", false);
        let err = end_session(&mut s, None, true, Utc::now()).unwrap_err();
        assert_eq!(err, SessionError::EndNoteRequired);
    }

    #[test]
    fn end_with_note_succeeds_in_require_notes_mode() {
        let mut s = session("S1", false);
        end_session(&mut s, Some("wrapped up the epic".to_string()), true, Utc::now()).unwrap();
        assert!(!s.is_active());
    }

    #[test]
    fn ending_an_ended_session_fails() {
        let mut s = session("S1", true);
        let err = end_session(&mut s, None, false, Utc::now()).unwrap_err();
        assert_eq!(err, SessionError::AlreadyEnded("S1".to_string()));
    }

    #[test]
    fn require_focus_surfaces_error_when_absent() {
        assert_eq!(require_focus(None), Err(SessionError::FocusRequired));
        assert_eq!(require_focus(Some("T001")), Ok("T001"));
    }

    #[test]
    fn terminal_binding_takes_priority_over_meta_fallback() {
        assert_eq!(
            resolve_active_session_key(Some("tty-1"), Some("S-meta")),
            Some("tty-1")
        );
        assert_eq!(resolve_active_session_key(None, Some("S-meta")), Some("S-meta"));
        assert_eq!(resolve_active_session_key(None, None), None);
    }
}
