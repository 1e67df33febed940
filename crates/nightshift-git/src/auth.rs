//! SSH credential provider for remote operations.
//!
//! Turns a private key file path and optional passphrase into the
//! `git2` callback machinery used by clone, fetch and push. Callbacks
//! cannot be cloned, so the provider hands out a fresh set per call.

use std::path::{Path, PathBuf};

use git2::{Cred, FetchOptions, PushOptions, RemoteCallbacks};

use crate::error::{Error, Result};

/// Authentication material for SSH remotes.
#[derive(Debug, Clone)]
pub struct SshKeyAuth {
    key_path: PathBuf,
    passphrase: Option<String>,
}

impl SshKeyAuth {
    /// Create a provider from a private key file and optional passphrase.
    ///
    /// # Errors
    /// Returns `UnreadableKeyFile` if the key file does not exist or
    /// cannot be read.
    pub fn new(key_path: impl Into<PathBuf>, passphrase: Option<String>) -> Result<Self> {
        let key_path = key_path.into();
        std::fs::metadata(&key_path).map_err(|_| Error::UnreadableKeyFile(key_path.clone()))?;

        Ok(Self {
            key_path,
            passphrase,
        })
    }

    /// Path to the private key file.
    #[must_use]
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Build remote callbacks that answer credential requests with this key.
    ///
    /// Falls back to the ssh-agent when the transport refuses key-file
    /// auth for the offered username.
    #[must_use]
    pub fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, allowed| {
            let user = username_from_url.unwrap_or("git");
            if allowed.is_ssh_key() {
                if let Ok(cred) =
                    Cred::ssh_key(user, None, &self.key_path, self.passphrase.as_deref())
                {
                    return Ok(cred);
                }
                return Cred::ssh_key_from_agent(user);
            }
            Cred::default()
        });
        callbacks
    }

    /// Fetch options wired to this provider's callbacks.
    #[must_use]
    pub fn fetch_options(&self) -> FetchOptions<'_> {
        let mut options = FetchOptions::new();
        options.remote_callbacks(self.callbacks());
        options
    }

    /// Push options wired to this provider's callbacks.
    #[must_use]
    pub fn push_options(&self) -> PushOptions<'_> {
        let mut options = PushOptions::new();
        options.remote_callbacks(self.callbacks());
        options
    }
}
