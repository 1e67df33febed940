//! Single-instance lock for the consumer.
//!
//! A zero-byte marker file whose presence means "a consumer is running".
//! Acquisition uses an exclusive create so two consumers racing for the
//! lock cannot both win.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Held instance lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock at the given path.
    ///
    /// # Errors
    /// Returns `ConsumerAlreadyRunning` if the marker already exists,
    /// or an IO error if it cannot be created.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(Error::ConsumerAlreadyRunning(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Path of the marker file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker at the given path without holding the lock.
    ///
    /// Used by the termination-signal handler, which exits the process
    /// directly and never unwinds into [`Drop`]. A missing marker is
    /// not an error.
    pub fn release_path(path: &Path) {
        let _ = fs::remove_file(path);
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        Self::release_path(&self.path);
    }
}
