use camino::Utf8PathBuf;
use std::cell::RefCell;

// Thread-local override used only in tests to avoid process-global env races.
thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
    static THREAD_DIR: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// Resolve the user's cleo home directory:
/// 1) thread-local override (tests use this)
/// 2) env `CLEO_HOME` (opt-in for users/CI)
/// 3) `$HOME/.cleo` via `dirs::home_dir()`, falling back to `.cleo`
#[must_use]
pub fn cleo_home() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var("CLEO_HOME") {
        return Utf8PathBuf::from(p);
    }
    dirs::home_dir()
        .and_then(|h| Utf8PathBuf::from_path_buf(h).ok())
        .map(|h| h.join(".cleo"))
        .unwrap_or_else(|| Utf8PathBuf::from(".cleo"))
}

/// Resolve the active store directory:
/// 1) thread-local override (tests use this)
/// 2) env `CLEO_DIR` (per-project override)
/// 3) `<project root>/.cleo`, where project root is the current directory
#[must_use]
pub fn cleo_dir() -> Utf8PathBuf {
    if let Some(tl) = THREAD_DIR.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var("CLEO_DIR") {
        return Utf8PathBuf::from(p);
    }
    Utf8PathBuf::from(".cleo")
}

/// Returns `<cleo_dir>/config.json`
#[must_use]
pub fn project_config_path() -> Utf8PathBuf {
    cleo_dir().join("config.json")
}

/// Returns `<cleo_home>/config.json`
#[must_use]
pub fn home_config_path() -> Utf8PathBuf {
    cleo_home().join("config.json")
}

/// Returns `<cleo_dir>/checkpoints`
#[must_use]
pub fn checkpoint_dir() -> Utf8PathBuf {
    cleo_dir().join("checkpoints")
}

/// Returns `<cleo_dir>/archive`
#[must_use]
pub fn archive_dir() -> Utf8PathBuf {
    cleo_dir().join("archive")
}

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<std::path::Path>>(p: P) -> std::io::Result<()> {
    match std::fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// RAII guard for isolated home that clears thread-local state on drop
#[cfg(any(test, feature = "test-utils"))]
pub struct HomeGuard {
    inner: tempfile::TempDir,
}

#[cfg(any(test, feature = "test-utils"))]
impl Drop for HomeGuard {
    fn drop(&mut self) {
        THREAD_HOME.with(|tl| *tl.borrow_mut() = None);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl std::ops::Deref for HomeGuard {
    type Target = tempfile::TempDir;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Test helper: provides isolated workspace testing; not part of public API stability guarantees.
///
/// Give this test a unique home under the system temp dir.
/// Hold the `HomeGuard` for the test's duration so the directory stays alive and env is cleaned up.
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(not(test), allow(dead_code))]
#[must_use]
pub fn with_isolated_home() -> HomeGuard {
    let td = tempfile::TempDir::new().expect("create temp home");
    let p = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(p));
    HomeGuard { inner: td }
}
