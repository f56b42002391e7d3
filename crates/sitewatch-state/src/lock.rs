//! Execution lock, one regular run at a time.
//!
//! The lock is a marker holding the owner's PID. A marker whose owner is no
//! longer alive is stale and gets reclaimed; a live owner makes `acquire`
//! fail fast with [`StateError::LockHeld`]. The returned [`LockGuard`]
//! releases the marker when dropped, which covers early returns, errors,
//! and cancellation of the future holding it.
//!
//! Every change to an existing marker is a compare-and-swap against the
//! token last read, so two processes reclaiming the same stale marker cannot
//! both win, and a release never deletes a marker that changed hands.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{StateError, StateResult};

/// Storage for the single owner token.
pub trait LockMarker: Send + Sync {
    /// Current owner token, or `None` when no marker exists.
    fn read(&self) -> StateResult<Option<String>>;

    /// Atomically create the marker holding `token`. Returns `false` if one
    /// already exists. A created marker is never observed without its token.
    fn create_new(&self, token: &str) -> StateResult<bool>;

    /// Atomically replace the marker with `token` if it still holds
    /// `expected`. Returns whether the swap happened.
    fn replace_if(&self, expected: &str, token: &str) -> StateResult<bool>;

    /// Atomically delete the marker if it still holds `expected`.
    fn remove_if(&self, expected: &str) -> StateResult<bool>;
}

/// "Is this process identifier still running?"
pub trait ProcessTable: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

impl<F> ProcessTable for F
where
    F: Fn(u32) -> bool + Send + Sync,
{
    fn is_alive(&self, pid: u32) -> bool {
        self(pid)
    }
}

// ── OS process table ───────────────────────────────────────────────

/// Process liveness via `kill(pid, 0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessTable;

impl ProcessTable for OsProcessTable {
    fn is_alive(&self, pid: u32) -> bool {
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return false;
        };
        // 0 and negative values address process groups.
        if pid <= 0 {
            return false;
        }
        // SAFETY: signal 0 only performs the existence and permission checks.
        let rc = unsafe { libc::kill(pid, 0) };
        rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
}

// ── File marker ────────────────────────────────────────────────────

/// Lock marker stored as a one-line PID file.
///
/// Conditional updates are serialised through an `flock` on a sibling
/// `<name>.guard` file, which is never deleted. The marker itself is only
/// ever written by linking or renaming a complete temp file into place.
#[derive(Debug, Clone)]
pub struct FileLockMarker {
    path: PathBuf,
}

impl FileLockMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn lock_err(&self, e: impl std::fmt::Display) -> StateError {
        StateError::Lock(format!("{}: {e}", self.path.display()))
    }

    fn ensure_parent(&self) -> StateResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StateError::Lock(format!("{}: {e}", parent.display())))?;
        }
        Ok(())
    }

    /// Write `token` to a private temp file and return its path.
    fn stage(&self, token: &str) -> StateResult<PathBuf> {
        let tmp = self.sibling(&format!(".{token}.{}.tmp", std::process::id()));
        std::fs::write(&tmp, format!("{token}\n")).map_err(|e| self.lock_err(e))?;
        Ok(tmp)
    }

    /// Run `f` while holding an exclusive `flock` on the guard file.
    fn with_guard<T>(&self, f: impl FnOnce() -> StateResult<T>) -> StateResult<T> {
        self.ensure_parent()?;
        let guard: File = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.sibling(".guard"))
            .map_err(|e| self.lock_err(e))?;
        loop {
            // SAFETY: the descriptor stays open for the duration of the call.
            if unsafe { libc::flock(guard.as_raw_fd(), libc::LOCK_EX) } == 0 {
                break;
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != ErrorKind::Interrupted {
                return Err(self.lock_err(err));
            }
        }
        // Closing `guard` drops the flock.
        f()
    }
}

impl LockMarker for FileLockMarker {
    fn read(&self) -> StateResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.lines().next().unwrap_or("").trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.lock_err(e)),
        }
    }

    fn create_new(&self, token: &str) -> StateResult<bool> {
        self.ensure_parent()?;
        let tmp = self.stage(token)?;
        // link(2) fails if the marker exists, and publishes the full contents.
        let linked = std::fs::hard_link(&tmp, &self.path);
        let _ = std::fs::remove_file(&tmp);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(self.lock_err(e)),
        }
    }

    fn replace_if(&self, expected: &str, token: &str) -> StateResult<bool> {
        self.with_guard(|| {
            if self.read()?.as_deref() != Some(expected) {
                return Ok(false);
            }
            let tmp = self.stage(token)?;
            std::fs::rename(&tmp, &self.path).map_err(|e| {
                let _ = std::fs::remove_file(&tmp);
                self.lock_err(e)
            })?;
            Ok(true)
        })
    }

    fn remove_if(&self, expected: &str) -> StateResult<bool> {
        self.with_guard(|| {
            if self.read()?.as_deref() != Some(expected) {
                return Ok(false);
            }
            match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(self.lock_err(e)),
            }
        })
    }
}

// ── ExecutionLock ──────────────────────────────────────────────────

/// Process-wide mutual exclusion for the store's read-modify-write cycle.
pub struct ExecutionLock {
    marker: Box<dyn LockMarker>,
    processes: Box<dyn ProcessTable>,
    pid: u32,
}

impl ExecutionLock {
    /// Create a lock owned by the current process.
    pub fn new(marker: impl LockMarker + 'static, processes: impl ProcessTable + 'static) -> Self {
        Self {
            marker: Box::new(marker),
            processes: Box::new(processes),
            pid: std::process::id(),
        }
    }

    /// PID file lock at `path` checked against the OS process table.
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileLockMarker::new(path), OsProcessTable)
    }

    /// Override the owner identifier (for testing).
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Take the lock, reclaiming a stale marker if needed.
    pub fn acquire(&self) -> StateResult<LockGuard<'_>> {
        let token = self.pid.to_string();

        for _ in 0..3 {
            if self.marker.create_new(&token)? {
                debug!(pid = self.pid, "execution lock acquired");
                return Ok(LockGuard { lock: self });
            }

            // Released between the two calls: try creating again.
            let Some(owner_token) = self.marker.read()? else {
                continue;
            };
            match owner_token.parse::<u32>() {
                Ok(owner) if owner != self.pid && self.processes.is_alive(owner) => {
                    return Err(StateError::LockHeld { pid: owner });
                }
                Ok(owner) => warn!(owner, "reclaiming stale lock left by a dead process"),
                Err(_) => warn!(content = %owner_token, "reclaiming unreadable lock marker"),
            }

            if self.marker.replace_if(&owner_token, &token)? {
                debug!(pid = self.pid, "execution lock acquired from stale marker");
                return Ok(LockGuard { lock: self });
            }
            // Someone else changed the marker first; look again.
            debug!(pid = self.pid, "lock marker changed during reclaim");
        }

        match self.marker.read()?.and_then(|t| t.parse::<u32>().ok()) {
            Some(owner) => Err(StateError::LockHeld { pid: owner }),
            None => Err(StateError::Lock("lock marker kept changing while acquiring".into())),
        }
    }

    /// Remove the marker if this process still owns it.
    pub fn release(&self) -> StateResult<()> {
        if self.marker.remove_if(&self.pid.to_string())? {
            debug!(pid = self.pid, "execution lock released");
        } else {
            debug!(pid = self.pid, "lock marker not ours, leaving it");
        }
        Ok(())
    }
}

/// Held execution lock; released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a ExecutionLock,
}

impl LockGuard<'_> {
    pub fn pid(&self) -> u32 {
        self.lock.pid
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release() {
            warn!(error = %e, "failed to release execution lock");
        }
    }
}
