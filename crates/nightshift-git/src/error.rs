//! Error types for nightshift-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// Branch not found, locally or on the remote.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Remote not found.
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// Private key file could not be read.
    #[error("unreadable key file: {0}")]
    UnreadableKeyFile(std::path::PathBuf),

    /// Clone of the origin remote failed.
    #[error("clone failed: {0}")]
    CloneFailed(String),

    /// Fetch failed.
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// The recorded diff could not be applied to the shadow work tree.
    #[error("failed to apply diff: {0}")]
    ApplyFailed(String),

    /// Push failed.
    #[error("push failed: {0}")]
    PushFailed(String),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}
