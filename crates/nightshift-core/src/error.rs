//! Error types for nightshift-core.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nightshift-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The index holds no staged changes to defer.
    #[error("nothing to commit - stage your changes with `git add` first")]
    NoStagedChanges,

    /// The commit message was empty.
    #[error("commit message must not be empty")]
    EmptyMessage,

    /// A relative date expression did not match `+<N><hours|minutes>`.
    #[error("invalid date expression '{0}' - expected e.g. \"+2hours\" or \"+30minutes\"")]
    InvalidDateExpression(String),

    /// A record on disk could not be parsed or is missing its payload.
    #[error("corrupt record {path}: {reason}")]
    CorruptRecord {
        /// Path to the offending metadata file.
        path: PathBuf,
        /// Why the record is unusable.
        reason: String,
    },

    /// Another consumer already holds the instance lock.
    #[error("consumer is already running (lock held at {0})")]
    ConsumerAlreadyRunning(PathBuf),

    /// No credentials have been persisted yet.
    #[error("no credentials found at {0} - run `nightshift commit` once to bootstrap")]
    CredentialsMissing(PathBuf),

    /// The persisted credential file is malformed.
    #[error("malformed credential file {0}")]
    CredentialsMalformed(PathBuf),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] nightshift_git::Error),
}
