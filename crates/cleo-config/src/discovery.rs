use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use cleo_utils::paths;

use crate::error::ConfigError;
use crate::model::{
    CliOverrides, Config, ConfigSource, LifecycleMode, OutputFormat, ResolvedConfig,
};

/// A config document as written to `config.json`. All fields are optional so
/// a file can override only what it cares about; anything absent falls
/// through to the next-lower-precedence layer.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    hierarchy: Option<HierarchyFile>,
    lifecycle: Option<LifecycleFile>,
    lock: Option<LockFile>,
    output: Option<OutputFile>,
    session: Option<SessionFile>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct HierarchyFile {
    max_siblings: Option<u32>,
    max_active_siblings: Option<u32>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleFile {
    mode: Option<LifecycleMode>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockFile {
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputFile {
    format: Option<OutputFormat>,
    verbose: Option<bool>,
    json_logs: Option<bool>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    require_notes: Option<bool>,
}

/// Walk upward from `start_dir` looking for a `.cleo` directory. Stops at the
/// first ancestor that has one, or at the filesystem root if none exists.
#[must_use]
pub fn find_project_root(start_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        if current.join(".cleo").is_dir() {
            return Some(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// Resolve the store directory for `start_dir`: the explicit `CLEO_DIR`
/// override if set, otherwise `.cleo` under the discovered project root, or
/// `start_dir/.cleo` when no project root exists yet (first run).
#[must_use]
pub fn resolve_store_dir(start_dir: &Utf8Path) -> Utf8PathBuf {
    if let Ok(explicit) = std::env::var("CLEO_DIR") {
        return Utf8PathBuf::from(explicit);
    }
    match find_project_root(start_dir) {
        Some(root) => root.join(".cleo"),
        None => start_dir.join(".cleo"),
    }
}

fn load_config_file(path: &Utf8Path) -> Result<Option<ConfigFile>, ConfigError> {
    let content = match std::fs::read_to_string(path.as_std_path()) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let parsed: ConfigFile =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(parsed))
}

fn apply_file(
    config: &mut Config,
    file: ConfigFile,
    source: &ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if let Some(h) = file.hierarchy {
        if let Some(v) = h.max_siblings {
            config.hierarchy.max_siblings = v;
            attribution.insert("hierarchy.maxSiblings".to_string(), source.clone());
        }
        if let Some(v) = h.max_active_siblings {
            config.hierarchy.max_active_siblings = v;
            attribution.insert("hierarchy.maxActiveSiblings".to_string(), source.clone());
        }
    }
    if let Some(l) = file.lifecycle {
        if let Some(v) = l.mode {
            config.lifecycle.mode = v;
            attribution.insert("lifecycle.mode".to_string(), source.clone());
        }
    }
    if let Some(l) = file.lock {
        if let Some(v) = l.timeout_seconds {
            config.lock.timeout_seconds = v;
            attribution.insert("lock.timeoutSeconds".to_string(), source.clone());
        }
    }
    if let Some(o) = file.output {
        if let Some(v) = o.format {
            config.output.format = v;
            attribution.insert("output.format".to_string(), source.clone());
        }
        if let Some(v) = o.verbose {
            config.output.verbose = v;
            attribution.insert("output.verbose".to_string(), source.clone());
        }
        if let Some(v) = o.json_logs {
            config.output.json_logs = v;
            attribution.insert("output.jsonLogs".to_string(), source.clone());
        }
    }
    if let Some(s) = file.session {
        if let Some(v) = s.require_notes {
            config.session.require_notes = v;
            attribution.insert("session.requireNotes".to_string(), source.clone());
        }
    }
}

fn apply_env(config: &mut Config, attribution: &mut HashMap<String, ConfigSource>) {
    if let Ok(v) = std::env::var("CLEO_LIFECYCLE_MODE") {
        let mode = match v.to_ascii_lowercase().as_str() {
            "strict" => Some(LifecycleMode::Strict),
            "advisory" => Some(LifecycleMode::Advisory),
            "off" => Some(LifecycleMode::Off),
            _ => None,
        };
        if let Some(mode) = mode {
            config.lifecycle.mode = mode;
            attribution.insert("lifecycle.mode".to_string(), ConfigSource::Environment);
        }
    }
    if let Ok(v) = std::env::var("CLEO_LOCK_TIMEOUT_SECONDS") {
        if let Ok(secs) = v.parse::<u64>() {
            config.lock.timeout_seconds = secs;
            attribution.insert("lock.timeoutSeconds".to_string(), ConfigSource::Environment);
        }
    }
    if let Ok(v) = std::env::var("CLEO_VERBOSE") {
        config.output.verbose = v == "1" || v.eq_ignore_ascii_case("true");
        attribution.insert("output.verbose".to_string(), ConfigSource::Environment);
    }
    if let Ok(v) = std::env::var("CLEO_JSON_LOGS") {
        config.output.json_logs = v == "1" || v.eq_ignore_ascii_case("true");
        attribution.insert("output.jsonLogs".to_string(), ConfigSource::Environment);
    }
    if let Ok(v) = std::env::var("CLEO_SESSION_REQUIRE_NOTES") {
        config.session.require_notes = v == "1" || v.eq_ignore_ascii_case("true");
        attribution.insert("session.requireNotes".to_string(), ConfigSource::Environment);
    }
}

fn apply_cli(config: &mut Config, overrides: &CliOverrides, attribution: &mut HashMap<String, ConfigSource>) {
    if let Some(v) = overrides.verbose {
        config.output.verbose = v;
        attribution.insert("output.verbose".to_string(), ConfigSource::CliFlag);
    }
    if let Some(v) = overrides.json_logs {
        config.output.json_logs = v;
        attribution.insert("output.jsonLogs".to_string(), ConfigSource::CliFlag);
    }
    if let Some(v) = overrides.output_format {
        config.output.format = v;
        attribution.insert("output.format".to_string(), ConfigSource::CliFlag);
    }
    if let Some(v) = overrides.lock_timeout_seconds {
        config.lock.timeout_seconds = v;
        attribution.insert("lock.timeoutSeconds".to_string(), ConfigSource::CliFlag);
    }
    if let Some(v) = overrides.lifecycle_mode {
        config.lifecycle.mode = v;
        attribution.insert("lifecycle.mode".to_string(), ConfigSource::CliFlag);
    }
    if let Some(v) = overrides.session_require_notes {
        config.session.require_notes = v;
        attribution.insert("session.requireNotes".to_string(), ConfigSource::CliFlag);
    }
}

/// Merge defaults ← home config ← project config ← environment ← CLI flags,
/// starting project-root discovery from `start_dir`. The path-driven variant
/// used by tests to avoid process-global state; `discover` wraps this with
/// the real current directory and real `CLEO_HOME`.
pub fn discover_from(
    start_dir: &Utf8Path,
    overrides: &CliOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let mut config = Config::default();
    let mut attribution = HashMap::new();

    let home_config_path = overrides
        .config_path
        .clone()
        .unwrap_or_else(paths::home_config_path);
    if let Some(file) = load_config_file(&home_config_path)? {
        tracing::debug!(path = %home_config_path, "loaded home config");
        apply_file(
            &mut config,
            file,
            &ConfigSource::HomeConfig(home_config_path.clone()),
            &mut attribution,
        );
    }

    let project_root = find_project_root(start_dir);
    let store_dir = resolve_store_dir(start_dir);
    let project_config_path = store_dir.join("config.json");
    if project_config_path != home_config_path {
        if let Some(file) = load_config_file(&project_config_path)? {
            tracing::debug!(path = %project_config_path, "loaded project config");
            apply_file(
                &mut config,
                file,
                &ConfigSource::ProjectConfig(project_config_path.clone()),
                &mut attribution,
            );
        }
    }

    apply_env(&mut config, &mut attribution);
    apply_cli(&mut config, overrides, &mut attribution);

    if config.hierarchy.max_active_siblings == 0 {
        return Err(ConfigError::InvalidValue {
            field: "hierarchy.maxActiveSiblings".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(ResolvedConfig {
        config,
        source_attribution: attribution,
        project_root,
        store_dir,
    })
}

/// Merge config starting from the real process current directory.
pub fn discover(overrides: &CliOverrides) -> Result<ResolvedConfig, ConfigError> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: Utf8PathBuf::from("."),
        source,
    })?;
    let cwd = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|p| ConfigError::InvalidValue {
            field: "cwd".to_string(),
            reason: format!("current directory is not valid UTF-8: {}", p.display()),
        })?;
    discover_from(&cwd, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn project_root_discovery_walks_ancestors() {
        let td = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join(".cleo")).unwrap();
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(root));
    }

    #[test]
    fn no_project_root_returns_none() {
        let td = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        assert_eq!(find_project_root(&root), None);
    }

    #[test]
    fn defaults_apply_when_no_files_present() {
        let td = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        let overrides = CliOverrides {
            config_path: Some(root.join("nonexistent-home-config.json")),
            ..Default::default()
        };
        let resolved = discover_from(&root, &overrides).unwrap();
        assert_eq!(resolved.config.hierarchy.max_siblings, 32);
        assert_eq!(resolved.config.hierarchy.max_active_siblings, 8);
        assert_eq!(resolved.config.lifecycle.mode, LifecycleMode::Advisory);
    }

    #[test]
    fn project_config_overrides_home_config() {
        let td = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        let store_dir = root.join(".cleo");
        std::fs::create_dir_all(&store_dir).unwrap();
        std::fs::write(
            store_dir.join("config.json"),
            r#"{"hierarchy": {"maxSiblings": 64}}"#,
        )
        .unwrap();

        let home_config = root.join("home-config.json");
        std::fs::write(&home_config, r#"{"hierarchy": {"maxSiblings": 16}}"#).unwrap();

        let overrides = CliOverrides {
            config_path: Some(home_config),
            ..Default::default()
        };
        let resolved = discover_from(&root, &overrides).unwrap();
        assert_eq!(resolved.config.hierarchy.max_siblings, 64);
    }

    #[test]
    fn cli_override_wins_over_everything() {
        let td = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        let overrides = CliOverrides {
            config_path: Some(root.join("nonexistent.json")),
            lifecycle_mode: Some(LifecycleMode::Strict),
            ..Default::default()
        };
        let resolved = discover_from(&root, &overrides).unwrap();
        assert_eq!(resolved.config.lifecycle.mode, LifecycleMode::Strict);
        assert_eq!(
            resolved.source_attribution.get("lifecycle.mode"),
            Some(&ConfigSource::CliFlag)
        );
    }

    #[test]
    fn zero_max_active_siblings_is_rejected() {
        let td = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
        let store_dir = root.join(".cleo");
        std::fs::create_dir_all(&store_dir).unwrap();
        std::fs::write(
            store_dir.join("config.json"),
            r#"{"hierarchy": {"maxActiveSiblings": 0}}"#,
        )
        .unwrap();
        let overrides = CliOverrides {
            config_path: Some(root.join("nonexistent.json")),
            ..Default::default()
        };
        assert!(discover_from(&root, &overrides).is_err());
    }
}
