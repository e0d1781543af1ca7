//! # Data Directory Lock
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on
//! Windows) so two node processes never share one data directory.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

/// Errors from data-directory locking
#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    #[error("data directory already in use{} ({})", pid.map(|p| format!(" by process {p}")).unwrap_or_default(), path.display())]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },

    #[error("failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

/// Exclusive lock on a data directory, released on drop.
#[derive(Debug)]
pub struct DatabaseLock {
    /// The lock file handle (kept open to maintain lock)
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DatabaseLock {
    /// Lock file name
    pub const LOCK_FILE: &'static str = "LOCK";

    /// Acquire the lock, retrying with exponential backoff until `timeout`.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        std::fs::create_dir_all(data_dir).map_err(LockError::CreateFailed)?;
        let deadline = Instant::now() + timeout;
        let lock_path = data_dir.join(Self::LOCK_FILE);
        let mut retry_delay = Duration::from_millis(50);

        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)
                .map_err(LockError::CreateFailed)?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    let pid = std::process::id();
                    let mut locked_file = file;
                    locked_file.set_len(0).map_err(LockError::WriteFailed)?;
                    writeln!(locked_file, "{}", pid).map_err(LockError::WriteFailed)?;
                    locked_file.sync_all().map_err(LockError::WriteFailed)?;

                    return Ok(Self {
                        file: locked_file,
                        path: lock_path,
                        pid,
                    });
                }
                Err(_) => {
                    if Instant::now() >= deadline {
                        return Err(LockError::AlreadyLocked {
                            pid: Self::read_existing_pid(&lock_path),
                            path: lock_path,
                        });
                    }
                    // Retry with exponential backoff (capped at 500ms)
                    drop(file);
                    std::thread::sleep(retry_delay);
                    retry_delay = (retry_delay * 2).min(Duration::from_millis(500));
                }
            }
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let first = DatabaseLock::acquire(dir.path(), Duration::from_millis(10)).unwrap();
        assert_eq!(first.pid(), std::process::id());

        let err = DatabaseLock::acquire(dir.path(), Duration::from_millis(60)).unwrap_err();
        match err {
            LockError::AlreadyLocked { pid, .. } => assert_eq!(pid, Some(std::process::id())),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _lock = DatabaseLock::acquire(dir.path(), Duration::from_millis(10)).unwrap();
        }
        assert!(DatabaseLock::acquire(dir.path(), Duration::from_millis(10)).is_ok());
    }
}
