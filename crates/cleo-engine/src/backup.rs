use camino::Utf8Path;
use chrono::Utc;
use cleo_envelope::CleoError;

use crate::context::EngineContext;

/// Back up `path`'s current on-disk contents into `backups/operational/`
/// before the mutation about to commit overwrites it (spec.md §2 item 12,
/// §6.1). No-op if `path` doesn't exist yet — the very first write to a
/// fresh store has nothing to back up.
pub fn stage_operational(ctx: &EngineContext, path: &Utf8Path) -> Result<(), CleoError> {
    if !path.exists() {
        return Ok(());
    }
    cleo_store::backup::pre_mutation_operational_backup(&ctx.store_dir, path, Utc::now(), ctx.config.backup.operational_keep)?;
    Ok(())
}

/// Back up `path` into `backups/safety/` before a destructive commit
/// (delete, archive, restore), so a pre-restore snapshot always exists even
/// if the destructive operation fails partway (spec.md §4.12, §2 item 12).
pub fn stage_safety(ctx: &EngineContext, path: &Utf8Path) -> Result<(), CleoError> {
    if !path.exists() {
        return Ok(());
    }
    cleo_store::backup::pre_destructive_safety_backup(&ctx.store_dir, path, Utc::now(), ctx.config.backup.safety_keep)?;
    Ok(())
}
