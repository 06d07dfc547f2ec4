//! File locking for the atomic JSON store, with advisory semantics and
//! stale-lock recovery.
//!
//! Locks are acquired per resource key (the store root, or a specific
//! sub-path for multi-file commits) using `O_EXCL` semantics to avoid
//! TOCTOU races, backed by an `fd-lock` exclusive lock on the lock file
//! itself. Locking coordinates cleo processes; it is not a security
//! boundary.

use anyhow::Result;
use camino::Utf8PathBuf;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Thread-local override used only in tests to avoid process-global env races.
thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// Default age threshold for considering a lock stale (in seconds).
const DEFAULT_STALE_THRESHOLD_SECS: u64 = 3600;

/// Default deadline for a single lock acquisition attempt, per the store's
/// bounded-wait contract.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Lock information stored in the lock file, used for stale detection and
/// diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that created the lock.
    pub pid: u32,
    /// Best-effort process start time (seconds since UNIX epoch).
    pub start_time: u64,
    /// Timestamp when the lock was created (seconds since UNIX epoch).
    pub created_at: u64,
    /// Resource key being locked (store root or sub-path).
    pub resource: String,
    /// cleo version that created the lock.
    pub cleo_version: String,
}

/// Lock errors for file locking operations.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error(
        "concurrent execution detected for '{resource}' (PID {pid}, created {created_ago} ago)"
    )]
    ConcurrentExecution {
        resource: String,
        pid: u32,
        created_ago: String,
    },

    #[error("stale lock detected for '{resource}' (PID {pid}, age {age_secs}s); use force to override")]
    StaleLock {
        resource: String,
        pid: u32,
        age_secs: u64,
    },

    #[error("lock file is corrupted or invalid: {reason}")]
    CorruptedLock { reason: String },

    #[error("failed to acquire lock: {reason}")]
    AcquisitionFailed { reason: String },

    #[error("failed to acquire lock for '{resource}' within {timeout_secs}s")]
    Timeout { resource: String, timeout_secs: u64 },

    #[error("failed to release lock: {reason}")]
    ReleaseFailed { reason: String },

    #[error("I/O error during lock operation: {0}")]
    Io(#[from] io::Error),
}

/// Write a file atomically via temp-file + rename. Deliberately self-contained
/// (no dependency on `cleo-utils`) so this crate has no upward edges.
fn write_file_atomic(path: &Utf8PathBuf, content: &str) -> Result<(), io::Error> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no parent directory"))?;
    fs::create_dir_all(parent)?;
    let temp_path = parent.join(format!(".{}.tmp", path.file_name().unwrap_or("file")));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Resolve the active store directory (mirrors `cleo_utils::paths::cleo_dir`,
/// duplicated here to keep this crate dependency-free).
fn cleo_dir() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var("CLEO_DIR") {
        return Utf8PathBuf::from(p);
    }
    Utf8PathBuf::from(".cleo")
}

fn ensure_dir_all(path: &Utf8PathBuf) -> Result<(), io::Error> {
    if !path.as_std_path().exists() {
        fs::create_dir_all(path.as_std_path())?;
    }
    Ok(())
}

/// Set a thread-local override for the store directory during tests.
#[cfg(any(test, feature = "test-utils"))]
pub fn set_thread_home_for_tests(path: Utf8PathBuf) {
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(path));
}

/// Set up an isolated store directory for testing.
#[cfg(test)]
pub fn with_isolated_home() -> tempfile::TempDir {
    let td = tempfile::TempDir::new().expect("failed to create temp dir");
    let p = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    set_thread_home_for_tests(p);
    td
}

/// Exclusive advisory lock over a resource key within the store.
pub struct FileLock {
    lock_path: PathBuf,
    _fd_lock: Option<Box<RwLock<fs::File>>>,
    lock_info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock for `resource`, retrying with backoff until
    /// `timeout` elapses.
    pub fn acquire(resource: &str, force: bool, timeout: Duration) -> Result<Self, LockError> {
        let dir = cleo_dir();
        ensure_dir_all(&dir).map_err(|e| LockError::AcquisitionFailed {
            reason: format!("failed to create store directory: {e}"),
        })?;

        let lock_path = Self::get_lock_path(resource);
        Self::acquire_with_deadline(resource, &lock_path, force, timeout)
    }

    fn acquire_with_deadline(
        resource: &str,
        lock_path: &Path,
        force: bool,
        timeout: Duration,
    ) -> Result<Self, LockError> {
        let deadline = SystemTime::now() + timeout;
        let mut attempt: u32 = 0;

        loop {
            let lock_info = LockInfo {
                pid: process::id(),
                start_time: Self::get_process_start_time()?,
                created_at: SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap()
                    .as_secs(),
                resource: resource.to_string(),
                cleo_version: env!("CARGO_PKG_VERSION").to_string(),
            };

            match fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(lock_path)
            {
                Ok(lock_file) => return Self::finalize_lock(lock_path.to_path_buf(), lock_file, lock_info),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    match Self::check_existing_lock(
                        lock_path,
                        resource,
                        force,
                        DEFAULT_STALE_THRESHOLD_SECS,
                    ) {
                        Ok(()) => {
                            Self::try_remove_stale_lock(lock_path, resource)?;
                            match fs::OpenOptions::new()
                                .create_new(true)
                                .write(true)
                                .open(lock_path)
                            {
                                Ok(lock_file) => {
                                    return Self::finalize_lock(
                                        lock_path.to_path_buf(),
                                        lock_file,
                                        lock_info,
                                    );
                                }
                                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                                    // Another process grabbed it; fall through to deadline check.
                                }
                                Err(e) => {
                                    return Err(LockError::AcquisitionFailed {
                                        reason: format!(
                                            "failed to create lock for '{resource}' after removing stale lock: {e}"
                                        ),
                                    });
                                }
                            }
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => {
                    return Err(LockError::AcquisitionFailed {
                        reason: format!(
                            "failed to create lock file for '{resource}' at '{}': {e}",
                            lock_path.display()
                        ),
                    });
                }
            }

            if SystemTime::now() >= deadline {
                return Err(LockError::Timeout {
                    resource: resource.to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }

            let base_delay_ms = 10u64.saturating_mul(2u64.saturating_pow(attempt.min(6)));
            let jitter_ms = (attempt as u64).wrapping_mul(3).wrapping_add((process::id() as u64) % 7) % 7;
            std::thread::sleep(Duration::from_millis((base_delay_ms + jitter_ms).min(200)));
            attempt += 1;
        }
    }

    fn finalize_lock(
        lock_path: PathBuf,
        lock_file: fs::File,
        lock_info: LockInfo,
    ) -> Result<Self, LockError> {
        let lock_json =
            serde_json::to_string_pretty(&lock_info).map_err(|e| LockError::AcquisitionFailed {
                reason: format!("failed to serialize lock info for '{}': {e}", lock_info.resource),
            })?;

        let mut rw_lock = Box::new(RwLock::new(lock_file));
        {
            let fd_lock = rw_lock.try_write().map_err(|_e| LockError::ConcurrentExecution {
                resource: lock_info.resource.clone(),
                pid: 0,
                created_ago: "unknown".to_string(),
            })?;

            let mut file_ref = &*fd_lock;
            file_ref
                .write_all(lock_json.as_bytes())
                .map_err(|e| LockError::AcquisitionFailed {
                    reason: format!("failed to write lock info for '{}': {e}", lock_info.resource),
                })?;
            file_ref.flush().map_err(|e| LockError::AcquisitionFailed {
                reason: format!("failed to flush lock file for '{}': {e}", lock_info.resource),
            })?;
            file_ref.sync_all().map_err(|e| LockError::AcquisitionFailed {
                reason: format!("failed to sync lock file for '{}': {e}", lock_info.resource),
            })?;
        }

        Ok(Self {
            lock_path,
            _fd_lock: Some(rw_lock),
            lock_info,
        })
    }

    /// Rename-then-delete a stale lock file to minimize the race window.
    /// Treats `NotFound` as success since another process may have already
    /// removed it.
    fn try_remove_stale_lock(lock_path: &Path, resource: &str) -> Result<(), LockError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let pid = process::id();
        let stale_path = lock_path.with_extension(format!("stale.{timestamp}.{pid}"));

        match fs::rename(lock_path, &stale_path) {
            Ok(()) => {
                let _ = fs::remove_file(&stale_path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::AcquisitionFailed {
                reason: format!("failed to rename stale lock for '{resource}': {e}"),
            }),
        }
    }

    /// Check whether a lock exists for the given resource.
    #[must_use]
    pub fn exists(resource: &str) -> bool {
        Self::get_lock_path(resource).exists()
    }

    /// Return information about an existing lock, if any.
    pub fn get_lock_info(resource: &str) -> Result<Option<LockInfo>, LockError> {
        let lock_path = Self::get_lock_path(resource);
        if !lock_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&lock_path).map_err(|e| LockError::CorruptedLock {
            reason: format!("failed to read lock file: {e}"),
        })?;
        let info: LockInfo = serde_json::from_str(&content).map_err(|e| LockError::CorruptedLock {
            reason: format!("failed to parse lock file: {e}"),
        })?;
        Ok(Some(info))
    }

    /// Release the lock (also runs automatically on drop).
    pub fn release(mut self) -> Result<(), LockError> {
        self._fd_lock.take();
        if self.lock_path.exists() {
            fs::remove_file(&self.lock_path).map_err(|e| LockError::ReleaseFailed {
                reason: format!("failed to remove lock file: {e}"),
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        &self.lock_info.resource
    }

    #[must_use]
    pub const fn lock_info(&self) -> &LockInfo {
        &self.lock_info
    }

    fn get_lock_path(resource: &str) -> PathBuf {
        let safe_name: String = resource
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        cleo_dir().as_std_path().join(format!(".{safe_name}.lock"))
    }

    fn check_existing_lock(
        lock_path: &Path,
        resource: &str,
        force: bool,
        ttl_seconds: u64,
    ) -> Result<(), LockError> {
        const MAX_READ_RETRIES: u32 = 3;
        const READ_RETRY_DELAY_MS: u64 = 10;

        for attempt in 0..MAX_READ_RETRIES {
            let lock_content = match fs::read_to_string(lock_path) {
                Ok(content) => content,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    if attempt + 1 < MAX_READ_RETRIES {
                        std::thread::sleep(Duration::from_millis(READ_RETRY_DELAY_MS));
                        continue;
                    }
                    return Err(LockError::CorruptedLock {
                        reason: format!("failed to read existing lock for '{resource}': {e}"),
                    });
                }
            };

            if lock_content.is_empty() {
                if attempt + 1 < MAX_READ_RETRIES {
                    std::thread::sleep(Duration::from_millis(READ_RETRY_DELAY_MS));
                    continue;
                }
                return Err(LockError::CorruptedLock {
                    reason: format!("lock file for '{resource}' is empty (may be initializing)"),
                });
            }

            match serde_json::from_str::<LockInfo>(&lock_content) {
                Ok(existing_lock) => {
                    return Self::validate_existing_lock(&existing_lock, resource, force, ttl_seconds);
                }
                Err(e) => {
                    let is_likely_incomplete = e.is_eof()
                        || lock_content.trim().is_empty()
                        || (lock_content.starts_with('{') && !lock_content.contains('}'));
                    if is_likely_incomplete && attempt + 1 < MAX_READ_RETRIES {
                        std::thread::sleep(Duration::from_millis(READ_RETRY_DELAY_MS));
                        continue;
                    }
                    return Err(LockError::CorruptedLock {
                        reason: format!("failed to parse existing lock for '{resource}': {e}"),
                    });
                }
            }
        }
        unreachable!("check_existing_lock loop exhausted without returning")
    }

    fn validate_existing_lock(
        existing_lock: &LockInfo,
        resource: &str,
        force: bool,
        ttl_seconds: u64,
    ) -> Result<(), LockError> {
        let now_secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let lock_age = now_secs.saturating_sub(existing_lock.created_at);
        let is_stale = lock_age > ttl_seconds;

        if Self::is_process_running(existing_lock.pid) {
            if force {
                return Ok(());
            }
            let created_ago = Self::format_duration_since(existing_lock.created_at);
            return Err(LockError::ConcurrentExecution {
                resource: resource.to_string(),
                pid: existing_lock.pid,
                created_ago,
            });
        }

        if is_stale {
            if force {
                Ok(())
            } else {
                Err(LockError::StaleLock {
                    resource: resource.to_string(),
                    pid: existing_lock.pid,
                    age_secs: lock_age,
                })
            }
        } else if force {
            Ok(())
        } else {
            let created_ago = Self::format_duration_since(existing_lock.created_at);
            Err(LockError::ConcurrentExecution {
                resource: resource.to_string(),
                pid: existing_lock.pid,
                created_ago,
            })
        }
    }

    fn is_process_running(pid: u32) -> bool {
        #[cfg(unix)]
        {
            let rc = unsafe { libc::kill(pid as i32, 0) };
            if rc == 0 {
                true
            } else {
                matches!(
                    io::Error::last_os_error().raw_os_error(),
                    Some(code) if code == libc::EPERM
                )
            }
        }

        #[cfg(windows)]
        {
            use winapi::um::handleapi::CloseHandle;
            use winapi::um::minwinbase::STILL_ACTIVE;
            use winapi::um::processthreadsapi::{GetExitCodeProcess, OpenProcess};
            use winapi::um::winnt::PROCESS_QUERY_LIMITED_INFORMATION;

            unsafe {
                let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
                if handle.is_null() {
                    return false;
                }
                let mut exit_code: u32 = 0;
                let result = GetExitCodeProcess(handle, &mut exit_code);
                if result == 0 {
                    CloseHandle(handle);
                    return false;
                }
                CloseHandle(handle);
                exit_code == STILL_ACTIVE
            }
        }

        #[cfg(not(any(unix, windows)))]
        {
            true
        }
    }

    fn get_process_start_time() -> Result<u64, LockError> {
        Ok(SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs())
    }

    fn format_duration_since(timestamp: u64) -> String {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let duration = now.saturating_sub(timestamp);
        if duration < 60 {
            format!("{duration}s")
        } else if duration < 3600 {
            format!("{}m", duration / 60)
        } else if duration < 86400 {
            format!("{}h", duration / 3600)
        } else {
            format!("{}d", duration / 86400)
        }
    }
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock")
            .field("lock_path", &self.lock_path)
            .field("lock_info", &self.lock_info)
            .field("_fd_lock", &"<RwLock>")
            .finish()
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self._fd_lock.take();
        if self.lock_path.exists() {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

/// Lock management utilities used by CLI maintenance commands.
pub mod utils {
    use super::{
        DEFAULT_STALE_THRESHOLD_SECS, FileLock, LockError, Result, SystemTime, UNIX_EPOCH, fs,
    };

    /// Check whether a clean operation should be allowed (no active locks
    /// unless forced).
    pub fn can_clean(resource: &str, force: bool, ttl_seconds: Option<u64>) -> Result<(), LockError> {
        let ttl = ttl_seconds.unwrap_or(DEFAULT_STALE_THRESHOLD_SECS);
        if let Some(lock_info) = FileLock::get_lock_info(resource)? {
            if FileLock::is_process_running(lock_info.pid) {
                if force {
                    return Ok(());
                }
                return Err(LockError::ConcurrentExecution {
                    resource: resource.to_string(),
                    pid: lock_info.pid,
                    created_ago: FileLock::format_duration_since(lock_info.created_at),
                });
            }

            if !force {
                let lock_age = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap()
                    .as_secs()
                    - lock_info.created_at;
                if lock_age <= ttl {
                    return Err(LockError::StaleLock {
                        resource: resource.to_string(),
                        pid: lock_info.pid,
                        age_secs: lock_age,
                    });
                }
            }
        }
        Ok(())
    }

    /// Force-remove a lock file for emergency cleanup.
    pub fn force_remove_lock(resource: &str) -> Result<(), LockError> {
        let lock_path = FileLock::get_lock_path(resource);
        if lock_path.exists() {
            fs::remove_file(&lock_path).map_err(|e| LockError::ReleaseFailed {
                reason: format!("failed to force remove lock: {e}"),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_env() -> tempfile::TempDir {
        with_isolated_home()
    }

    #[test]
    fn lock_acquisition_and_release() {
        let _temp_dir = setup_test_env();
        let resource = "store";

        let lock = FileLock::acquire(resource, false, DEFAULT_ACQUIRE_TIMEOUT).unwrap();
        assert_eq!(lock.resource(), resource);
        assert!(FileLock::exists(resource));

        lock.release().unwrap();
        assert!(!FileLock::exists(resource));
    }

    #[test]
    fn concurrent_acquisition_is_rejected() {
        let _temp_dir = setup_test_env();
        let resource = "store";

        let _lock = FileLock::acquire(resource, false, Duration::from_millis(50)).unwrap();
        let second = FileLock::acquire(resource, false, Duration::from_millis(50));
        assert!(second.is_err());
    }

    #[test]
    fn force_overrides_concurrent_lock() {
        let _temp_dir = setup_test_env();
        let resource = "store";

        let lock = FileLock::acquire(resource, false, DEFAULT_ACQUIRE_TIMEOUT).unwrap();
        std::mem::forget(lock); // simulate a process that died without releasing

        let forced = FileLock::acquire(resource, true, DEFAULT_ACQUIRE_TIMEOUT);
        assert!(forced.is_ok());
    }

    #[test]
    fn lock_info_roundtrips() {
        let _temp_dir = setup_test_env();
        let resource = "store";

        let lock = FileLock::acquire(resource, false, DEFAULT_ACQUIRE_TIMEOUT).unwrap();
        let info = FileLock::get_lock_info(resource).unwrap().unwrap();
        assert_eq!(info.resource, resource);
        assert_eq!(info.pid, std::process::id());
        drop(lock);
    }
}
