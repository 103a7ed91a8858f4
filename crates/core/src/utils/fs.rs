//! File helpers shared by the VFS flush and the commit workers

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// How long a worker waits for a contended lock before giving up
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Locks older than this are assumed to belong to a crashed process
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(60);

/// A `.break` guard is only held for a metadata check and one unlink
const STALE_BREAKER_AGE: Duration = Duration::from_secs(5);

/// Lexically normalize a path: drop `.` segments and fold `..` into the parent.
///
/// Relative paths are joined onto `base` first. No filesystem access happens,
/// so the target does not need to exist.
pub fn normalize_path(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Ensure all parent directories exist for a path
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    Ok(())
}

/// Read a file, mapping a missing file to `None`
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Write a file atomically: stage into a temp file next to the target, then rename
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dirs(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut staged = NamedTempFile::new_in(&dir).map_err(|e| Error::io(&dir, e))?;
    staged
        .write_all(contents)
        .map_err(|e| Error::io(staged.path(), e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| Error::io(staged.path(), e))?;
    staged
        .persist(path)
        .map_err(|e| Error::io(path, e.error))?;

    debug!("Atomically wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Whether `path` exists and was last modified more than `age` ago
pub fn is_older_than(path: &Path, age: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|elapsed| elapsed > age)
}

/// Serialize a value as two-space indented JSON with a trailing newline
pub fn to_formatted_json<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Advisory lock held through a `<file>.lock` sibling.
///
/// The lock file is created with `create_new`, so only one process can hold it.
/// It is removed when the guard drops.
#[derive(Debug)]
pub struct FileLock {
    lock_path: PathBuf,
}

impl FileLock {
    /// Path of the lock file guarding `target`
    pub fn lock_path_for(target: &Path) -> PathBuf {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        target.with_file_name(name)
    }

    /// Acquire the lock for `target`, waiting up to [`LOCK_TIMEOUT`]
    pub fn acquire(target: &Path) -> Result<Self> {
        Self::acquire_with(target, LOCK_TIMEOUT, STALE_LOCK_AGE)
    }

    pub fn acquire_with(target: &Path, timeout: Duration, stale_after: Duration) -> Result<Self> {
        ensure_parent_dirs(target)?;
        let lock_path = Self::lock_path_for(target);
        let started = SystemTime::now();
        let mut backoff = Duration::from_millis(5);

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!("Acquired lock {}", lock_path.display());
                    return Ok(Self { lock_path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Self::is_stale(&lock_path, stale_after)
                        && Self::break_stale(&lock_path, stale_after)?
                    {
                        continue;
                    }

                    let waited = started.elapsed().unwrap_or_default();
                    if waited >= timeout {
                        return Err(Error::Lock {
                            path: target.to_path_buf(),
                            reason: format!("timed out after {:?} waiting for {}", waited, lock_path.display()),
                        });
                    }

                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(Duration::from_millis(200));
                }
                Err(e) => return Err(Error::io(&lock_path, e)),
            }
        }
    }

    /// Remove a stale lock while holding its `<lock>.break` guard.
    ///
    /// Staleness is checked again under the guard, so a waiter that saw the old
    /// lock never deletes the fresh one another waiter created after breaking it.
    /// Returns `false` when another waiter is breaking the lock or it is no longer stale.
    fn break_stale(lock_path: &Path, stale_after: Duration) -> Result<bool> {
        let mut breaker_name = lock_path.as_os_str().to_os_string();
        breaker_name.push(".break");
        let breaker = PathBuf::from(breaker_name);

        match OpenOptions::new().write(true).create_new(true).open(&breaker) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Left behind by a process that died mid-break
                if Self::is_stale(&breaker, STALE_BREAKER_AGE) {
                    let _ = fs::remove_file(&breaker);
                }
                return Ok(false);
            }
            Err(e) => return Err(Error::io(&breaker, e)),
        }

        let broken = Self::is_stale(lock_path, stale_after);
        if broken {
            warn!("Breaking stale lock {}", lock_path.display());
            if let Err(e) = fs::remove_file(lock_path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    let _ = fs::remove_file(&breaker);
                    return Err(Error::io(lock_path, e));
                }
            }
        }
        if let Err(e) = fs::remove_file(&breaker) {
            warn!("Failed to release {}: {}", breaker.display(), e);
        }
        Ok(broken)
    }

    /// Whether an existing lock file is older than `stale_after`
    pub fn is_stale(lock_path: &Path, stale_after: Duration) -> bool {
        is_older_than(lock_path, stale_after)
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            warn!("Failed to release lock {}: {}", self.lock_path.display(), e);
        }
    }
}
