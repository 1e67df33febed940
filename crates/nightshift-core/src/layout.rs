//! On-disk layout of the `.nightshift/` data directory.

use std::path::{Path, PathBuf};

/// Owns every path under the repository's `.nightshift/` directory.
///
/// ```text
/// .nightshift/
///   config            two lines: key file path, passphrase (may be empty)
///   repo/             shadow mirror clone, used only by the pipeline
///   commits/<id>.info due timestamp, branch name, commit message
///   commits/<id>.diff raw diff payload, applied verbatim on replay
///   consumer.lock     zero-byte marker, presence means a consumer runs
/// ```
#[derive(Debug, Clone)]
pub struct Layout {
    data_dir: PathBuf,
}

impl Layout {
    /// Directory name at the repository root.
    const DATA_DIR: &'static str = ".nightshift";
    const CONFIG_FILE: &'static str = "config";
    const SHADOW_DIR: &'static str = "repo";
    const COMMITS_DIR: &'static str = "commits";
    const LOCK_FILE: &'static str = "consumer.lock";

    /// Create a layout rooted at the given working repository root.
    #[must_use]
    pub fn new(repo_root: impl AsRef<Path>) -> Self {
        Self {
            data_dir: repo_root.as_ref().join(Self::DATA_DIR),
        }
    }

    /// Path to the data directory itself.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to the persisted credential file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(Self::CONFIG_FILE)
    }

    /// Path to the shadow repository clone.
    #[must_use]
    pub fn shadow_path(&self) -> PathBuf {
        self.data_dir.join(Self::SHADOW_DIR)
    }

    /// Path to the record store directory.
    #[must_use]
    pub fn commits_dir(&self) -> PathBuf {
        self.data_dir.join(Self::COMMITS_DIR)
    }

    /// Path to the consumer instance lock.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(Self::LOCK_FILE)
    }

    /// Whether the shadow repository has been bootstrapped.
    #[must_use]
    pub fn shadow_exists(&self) -> bool {
        self.shadow_path().join(".git").exists()
    }
}
