//! Path and config resolution: finds the project root and store directory,
//! and merges `config.json` layers (defaults ← home ← project ← env ← CLI).

pub mod discovery;
pub mod error;
pub mod model;

pub use discovery::{discover, discover_from, find_project_root, resolve_store_dir};
pub use error::ConfigError;
pub use model::{
    BackupConfig, CliOverrides, Config, ConfigSource, HierarchyConfig, LifecycleConfig,
    LifecycleMode, LockConfig, OutputConfig, OutputFormat, ResolvedConfig, SessionConfig,
};
