//! Persisted SSH credentials for the shadow repository.
//!
//! Captured interactively once during bootstrap and reloaded on every
//! consumer start. Only the key file path and passphrase are persisted;
//! nothing decrypted ever leaves process memory.

use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use nightshift_git::SshKeyAuth;

use crate::error::{Error, Result};

/// Key file path plus optional passphrase.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Path to the private key file.
    pub key_path: PathBuf,
    /// Passphrase for the key, if it has one.
    pub passphrase: Option<SecretString>,
}

impl Credentials {
    /// Create credentials from a key path and optional passphrase.
    #[must_use]
    pub fn new(key_path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Self {
            key_path: key_path.into(),
            passphrase: passphrase
                .filter(|p| !p.is_empty())
                .map(SecretString::from),
        }
    }

    /// Load credentials from the two-line config file.
    ///
    /// # Errors
    /// Returns `CredentialsMissing` if the file does not exist and
    /// `CredentialsMalformed` if the key path line is empty.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::CredentialsMissing(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut lines = content.lines();

        let key_path = lines
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .ok_or_else(|| Error::CredentialsMalformed(path.to_path_buf()))?;
        let passphrase = lines.next().map(str::to_string);

        Ok(Self::new(key_path, passphrase))
    }

    /// Persist credentials as the two-line config file, owner-readable
    /// only on Unix.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let passphrase = self
            .passphrase
            .as_ref()
            .map_or("", |p| p.expose_secret());
        let content = format!("{}\n{passphrase}", self.key_path.display());

        // The file must never exist with looser permissions, even
        // briefly, so it is created 0600 rather than chmodded after.
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)?;
            file.write_all(content.as_bytes())?;
            // mode() only applies on creation; tighten a pre-existing file.
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        #[cfg(not(unix))]
        fs::write(path, content)?;

        Ok(())
    }

    /// Build the authenticated transport provider.
    ///
    /// # Errors
    /// Returns error if the key file is unreadable.
    pub fn auth(&self) -> Result<SshKeyAuth> {
        let passphrase = self
            .passphrase
            .as_ref()
            .map(|p| p.expose_secret().to_string());
        Ok(SshKeyAuth::new(&self.key_path, passphrase)?)
    }
}
