use chrono::Utc;
use cleo_envelope::CleoError;
use cleo_session::{end_session, start_session, Session};
use serde::{Deserialize, Serialize};

use crate::audit::record;
use crate::context::EngineContext;

/// All session records, persisted as a flat list (spec.md §6.1 `sessions`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStoreDocument {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Start a new session under lock, binding its scope and, if the scope
/// implies one, its focus task (spec.md §4.9). A primary (non-multi)
/// session also binds the active store's `focus` block, which is what
/// makes `cleo_session::require_focus` resolvable later.
pub fn start(
    ctx: &EngineContext,
    id: impl Into<String>,
    selector: &str,
    agent: impl Into<String>,
    multi_session: bool,
) -> Result<Session, CleoError> {
    let id = id.into();
    let agent = agent.into();
    crate::lock::with_multi_lock(&["sessions", "tasks"], ctx.lock_timeout(), || {
        let sessions_path = ctx.sessions_path();
        let mut doc: SessionStoreDocument = cleo_store::read(&sessions_path).unwrap_or_default();

        let existing_primary = doc.sessions.iter().find(|s| s.is_active());
        let session = start_session(id, selector, agent, None, existing_primary, multi_session, Utc::now())
            .map_err(CleoError::Session)?;

        doc.sessions.push(session.clone());
        cleo_store::write_atomic(&sessions_path, &doc)?;

        if !multi_session {
            let tasks_path = ctx.tasks_path();
            let mut tasks_doc = cleo_store::read_task_store(&tasks_path).unwrap_or_default();
            tasks_doc.focus.current_task = session.focus_task_id.clone();
            tasks_doc.focus.primary_session = Some(session.id.clone());
            crate::backup::stage_operational(ctx, &tasks_path)?;
            cleo_store::commit_task_store(&tasks_path, &mut tasks_doc)?;
        }

        record(ctx, "session.start", None, None, None)?;
        Ok(session)
    })
}

/// End a session under lock, requiring a note when the config demands one
/// (spec.md §4.9). Clears the active store's `focus` block when the
/// session being ended is the one currently holding it.
pub fn end(
    ctx: &EngineContext,
    session_id: &str,
    note: Option<String>,
    require_notes: bool,
) -> Result<Session, CleoError> {
    crate::lock::with_multi_lock(&["sessions", "tasks"], ctx.lock_timeout(), || {
        let sessions_path = ctx.sessions_path();
        let mut doc: SessionStoreDocument = cleo_store::read(&sessions_path)?;

        let session = doc
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| CleoError::Session(cleo_session::SessionError::AlreadyEnded(session_id.to_string())))?;
        end_session(session, note, require_notes, Utc::now()).map_err(CleoError::Session)?;
        let ended = session.clone();

        cleo_store::write_atomic(&sessions_path, &doc)?;

        let tasks_path = ctx.tasks_path();
        let mut tasks_doc = cleo_store::read_task_store(&tasks_path).unwrap_or_default();
        if tasks_doc.focus.primary_session.as_deref() == Some(session_id) {
            tasks_doc.focus.current_task = None;
            tasks_doc.focus.primary_session = None;
            tasks_doc.focus.session_note = None;
            tasks_doc.focus.next_action = None;
            crate::backup::stage_operational(ctx, &tasks_path)?;
            cleo_store::commit_task_store(&tasks_path, &mut tasks_doc)?;
        }

        record(ctx, "session.end", None, None, None)?;
        Ok(ended)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleo_config::Config;

    fn ctx() -> (tempfile::TempDir, EngineContext) {
        let td = tempfile::TempDir::new().unwrap();
        let dir = camino::Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        cleo_lock::set_thread_home_for_tests(dir.clone());
        let ctx = EngineContext::new(dir, Config::default(), "agent:builder");
        (td, ctx)
    }

    #[test]
    fn second_primary_session_is_rejected() {
        let (_td, ctx) = ctx();
        start(&ctx, "S001", "task:T001", "agent:builder", false).unwrap();
        assert!(start(&ctx, "S002", "task:T002", "agent:builder", false).is_err());
    }

    #[test]
    fn ending_a_session_requires_a_note_when_configured() {
        let (_td, ctx) = ctx();
        let session = start(&ctx, "S001", "task:T001", "agent:builder", false).unwrap();
        assert!(end(&ctx, &session.id, None, true).is_err());
        assert!(end(&ctx, &session.id, Some("wrapped up".to_string()), true).is_ok());
    }
}
