use chrono::Utc;
use cleo_audit::{AuditLog, AuditRecord};
use cleo_envelope::CleoError;
use serde_json::Value;

use crate::context::EngineContext;

/// Append one audit entry for an engine operation (spec.md §4.10: exactly
/// one audit entry per committed mutation). The audit append happens after
/// the store commit, so a reader observing the state change is guaranteed to
/// eventually see this record (spec.md §5 "Ordering guarantees").
pub fn record(
    ctx: &EngineContext,
    action: &str,
    task_id: Option<&str>,
    before: Option<Value>,
    after: Option<Value>,
) -> Result<(), CleoError> {
    let mut entry = AuditRecord::new(action, &ctx.actor, Utc::now());
    if let Some(id) = task_id {
        entry = entry.with_task(id);
    }
    if let Some(before) = before {
        entry = entry.with_before(before);
    }
    if let Some(after) = after {
        entry = entry.with_after(after);
    }
    let log = AuditLog::new(ctx.audit_path());
    log.append(&entry).map_err(CleoError::Audit)
}
