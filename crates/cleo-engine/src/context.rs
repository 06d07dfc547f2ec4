use std::time::Duration;

use camino::Utf8PathBuf;
use cleo_config::Config;

/// Everything an engine call needs: where the store lives, the merged
/// config, and the identity attributed to whatever it writes (spec.md §9
/// "ambient process-wide globals become an explicit engine-context value").
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub store_dir: Utf8PathBuf,
    pub config: Config,
    pub actor: String,
}

impl EngineContext {
    #[must_use]
    pub fn new(store_dir: Utf8PathBuf, config: Config, actor: impl Into<String>) -> Self {
        Self {
            store_dir,
            config,
            actor: actor.into(),
        }
    }

    #[must_use]
    pub fn tasks_path(&self) -> Utf8PathBuf {
        self.store_dir.join("tasks.json")
    }

    #[must_use]
    pub fn archive_path(&self) -> Utf8PathBuf {
        self.store_dir.join("archive.json")
    }

    #[must_use]
    pub fn sessions_path(&self) -> Utf8PathBuf {
        self.store_dir.join("sessions.json")
    }

    #[must_use]
    pub fn audit_path(&self) -> Utf8PathBuf {
        self.store_dir.join("audit.log")
    }

    #[must_use]
    pub fn lifecycle_manifest_path(&self, epic_id: &str) -> Utf8PathBuf {
        self.store_dir.join("lifecycle").join(epic_id).join("_manifest.json")
    }

    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.config.lock.timeout_seconds)
    }
}
