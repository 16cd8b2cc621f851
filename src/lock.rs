//! Advisory Lock Module
//!
//! Serializes compound store mutations across processes through an exclusive
//! `flock`-style lock on a single well-known file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::Result;

// == Advisory Lock ==
/// A lock identified by a filesystem path.
///
/// Only processes that go through this type are constrained by it.
#[derive(Debug, Clone)]
pub struct AdvisoryLock {
    path: PathBuf,
}

impl AdvisoryLock {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Blocking ==
    /// Runs `body` while holding the lock, waiting for other holders to finish.
    ///
    /// Returns `None` when the lock file cannot be opened or `body` fails. The
    /// failure is logged, never propagated.
    pub fn with_blocking_lock<T, F>(&self, body: F) -> Option<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let guard = match self.open().and_then(LockGuard::blocking) {
            Ok(guard) => guard,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "advisory_lock.acquire_failed");
                return None;
            }
        };
        debug!(path = %self.path.display(), mode = "blocking", "advisory_lock.acquired");
        run_guarded(guard, body)
    }

    // == Non-Blocking ==
    /// Runs `body` only if the lock is free right now.
    ///
    /// Returns `None` without running `body` when another holder is active.
    pub fn with_non_blocking_lock<T, F>(&self, body: F) -> Option<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let guard = match self.open().and_then(LockGuard::try_exclusive) {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                debug!(path = %self.path.display(), "advisory_lock.contended");
                return None;
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "advisory_lock.acquire_failed");
                return None;
            }
        };
        debug!(path = %self.path.display(), mode = "non_blocking", "advisory_lock.acquired");
        run_guarded(guard, body)
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
    }
}

fn run_guarded<T, F>(guard: LockGuard, body: F) -> Option<T>
where
    F: FnOnce() -> Result<T>,
{
    let outcome = body();
    drop(guard);
    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, "advisory_lock.body_failed");
            None
        }
    }
}

// == Lock Guard ==
/// Holds the exclusive lock until dropped; dropping also closes the file.
struct LockGuard {
    file: File,
}

impl LockGuard {
    fn blocking(file: File) -> io::Result<Self> {
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    fn try_exclusive(file: File) -> io::Result<Option<Self>> {
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!(error = %err, "advisory_lock.release_failed");
        }
    }
}
