use std::time::Duration;

use cleo_envelope::CleoError;
use cleo_lock::FileLock;

/// Run `f` under an exclusive advisory lock on `resource`, surfacing both
/// lock-acquisition failures and whatever error `f` itself returns as a
/// single [`CleoError`] (spec.md §4.1 "Locking"). `cleo_store::with_lock`
/// cannot be reused here directly: its closure is typed to return
/// `StoreError`, but engine operations also raise hierarchy, gate, and
/// session errors inside the same locked section.
pub fn with_lock<T>(resource: &str, timeout: Duration, f: impl FnOnce() -> Result<T, CleoError>) -> Result<T, CleoError> {
    let lock = FileLock::acquire(resource, false, timeout).map_err(CleoError::Lock)?;
    let result = f();
    lock.release().map_err(CleoError::Lock)?;
    result
}

/// Run `f` under exclusive locks on every resource in `resources`, acquired
/// in a stable (sorted) order to prevent deadlock across concurrent
/// multi-file commits (spec.md §4.12 "archive is atomic across both files").
pub fn with_multi_lock<T>(
    resources: &[&str],
    timeout: Duration,
    f: impl FnOnce() -> Result<T, CleoError>,
) -> Result<T, CleoError> {
    let mut ordered: Vec<&str> = resources.to_vec();
    ordered.sort_unstable();

    let mut held = Vec::with_capacity(ordered.len());
    for resource in &ordered {
        match FileLock::acquire(resource, false, timeout) {
            Ok(lock) => held.push(lock),
            Err(e) => {
                for lock in held {
                    let _ = lock.release();
                }
                return Err(CleoError::Lock(e));
            }
        }
    }

    let result = f();
    for lock in held {
        lock.release().map_err(CleoError::Lock)?;
    }
    result
}
