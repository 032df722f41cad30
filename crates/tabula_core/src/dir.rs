//! Workspace directory management.
//!
//! ```text
//! <workspace>/
//! ├─ LOCK          # Advisory lock, one process at a time
//! └─ journal.log   # Commit journal
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const JOURNAL_FILE: &str = "journal.log";

/// An opened workspace directory holding the exclusive lock.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub struct WorkspaceDir {
    path: PathBuf,
    _lock_file: File,
}

impl WorkspaceDir {
    /// Opens or creates a workspace directory and takes its lock.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidFormat`] if the directory is missing and
    ///   `create_if_missing` is false, if the path is not a directory, or if
    ///   a journal already exists and `error_if_exists` is true
    /// - [`CoreError::WorkspaceLocked`] if another process holds the lock
    /// - [`CoreError::Io`] on file system errors
    pub fn open(path: &Path, create_if_missing: bool, error_if_exists: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_format(format!(
                    "workspace directory does not exist: {}",
                    path.display()
                )));
            }
        } else if error_if_exists && path.join(JOURNAL_FILE).exists() {
            return Err(CoreError::invalid_format(format!(
                "workspace already exists: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::WorkspaceLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the commit journal.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.path.join(JOURNAL_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ws");
        let dir = WorkspaceDir::open(&path, true, false).unwrap();
        assert!(path.join("LOCK").exists());
        assert_eq!(dir.journal_path(), path.join("journal.log"));
    }

    #[test]
    fn missing_directory_without_create_fails() {
        let temp = tempdir().unwrap();
        let result = WorkspaceDir::open(&temp.path().join("absent"), false, false);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn second_open_is_locked_out() {
        let temp = tempdir().unwrap();
        let _first = WorkspaceDir::open(temp.path(), true, false).unwrap();
        let second = WorkspaceDir::open(temp.path(), true, false);
        assert!(matches!(second, Err(CoreError::WorkspaceLocked)));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let temp = tempdir().unwrap();
        drop(WorkspaceDir::open(temp.path(), true, false).unwrap());
        assert!(WorkspaceDir::open(temp.path(), true, false).is_ok());
    }

    #[test]
    fn error_if_exists_checks_journal() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("journal.log"), b"").unwrap();
        let result = WorkspaceDir::open(temp.path(), true, true);
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }
}
