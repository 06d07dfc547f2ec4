use chrono::Utc;
use cleo_audit::checkpoint::create_checkpoint;

use crate::context::EngineContext;

/// Stage a best-effort, point-in-time copy of the store subtree before a
/// mutation commits (spec.md §4.11). A failure here is logged and swallowed
/// — checkpointing never aborts the commit it protects.
pub fn stage(ctx: &EngineContext) {
    let root = ctx.store_dir.join(".checkpoint");
    if let Err(err) = create_checkpoint(&ctx.store_dir, &root, Utc::now()) {
        tracing::warn!(error = %err, "checkpoint creation failed, continuing without one");
    }
}
