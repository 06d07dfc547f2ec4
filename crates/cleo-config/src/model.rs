use std::collections::HashMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Lifecycle gate enforcement mode (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleMode {
    /// Prerequisite and gate violations are rejected.
    Strict,
    /// Violations are logged but not rejected; no `kind=forced` transition
    /// is recorded.
    #[default]
    Advisory,
    /// Gates are not evaluated at all.
    Off,
}

/// Output rendering format for the CLI surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Hierarchy depth/sibling caps (spec.md §4.6 invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyConfig {
    /// Hard cap on total siblings under one parent. `0` means unbounded
    /// (spec.md §9 open question 3).
    pub max_siblings: u32,
    /// Cap on non-`done` siblings under one parent.
    pub max_active_siblings: u32,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_siblings: 32,
            max_active_siblings: 8,
        }
    }
}

impl HierarchyConfig {
    /// Whether the total-sibling cap is enforced. `max_siblings == 0` disables it.
    #[must_use]
    pub const fn total_cap_enabled(&self) -> bool {
        self.max_siblings > 0
    }
}

/// Locking and commit timing (spec.md §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockConfig {
    /// Deadline in seconds for a single lock acquisition before `LOCK_TIMEOUT`.
    pub timeout_seconds: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { timeout_seconds: 10 }
    }
}

/// CLI-facing output preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbose: bool,
    pub json_logs: bool,
}

/// Lifecycle pipeline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleConfig {
    pub mode: LifecycleMode,
}

/// Session end-of-work policy (spec.md §4.9: "`session end` requires an
/// ending note in `requireNotes` mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub require_notes: bool,
}

/// Backup rotation depth (spec.md §2 item 12, §6.1): how many timestamped
/// copies to keep per store file in `backups/operational/` and
/// `backups/safety/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    pub operational_keep: usize,
    pub safety_keep: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { operational_keep: 10, safety_keep: 20 }
    }
}

/// The fully merged configuration used throughout the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub hierarchy: HierarchyConfig,
    pub lifecycle: LifecycleConfig,
    pub lock: LockConfig,
    pub output: OutputConfig,
    pub session: SessionConfig,
    pub backup: BackupConfig,
}

/// Where a resolved config value ultimately came from. Mirrors the teacher's
/// source-attribution map for diagnosability (`cleo doctor`-style introspection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Defaults,
    HomeConfig(Utf8PathBuf),
    ProjectConfig(Utf8PathBuf),
    Environment,
    CliFlag,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::HomeConfig(p) => write!(f, "home config ({p})"),
            Self::ProjectConfig(p) => write!(f, "project config ({p})"),
            Self::Environment => write!(f, "environment"),
            Self::CliFlag => write!(f, "cli flag"),
        }
    }
}

/// Explicit CLI flag overrides, applied at the highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub verbose: Option<bool>,
    pub json_logs: Option<bool>,
    pub output_format: Option<OutputFormat>,
    pub lock_timeout_seconds: Option<u64>,
    pub lifecycle_mode: Option<LifecycleMode>,
    pub session_require_notes: Option<bool>,
    pub config_path: Option<Utf8PathBuf>,
}

/// The resolved config plus a record of which layer produced each field,
/// keyed by a dotted field path (e.g. `"hierarchy.maxSiblings"`).
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub source_attribution: HashMap<String, ConfigSource>,
    pub project_root: Option<Utf8PathBuf>,
    pub store_dir: Utf8PathBuf,
}
