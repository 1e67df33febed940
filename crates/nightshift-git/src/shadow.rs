//! The shadow repository: a private mirror clone used only for replay.
//!
//! Replays never touch the user's working copy. Each due record gets an
//! ephemeral local branch in the shadow, created from the remote-tracking
//! branch of the same name, and that branch ref is deleted again after a
//! successful push so the next record for the same branch starts clean
//! from the advanced remote.

use std::path::Path;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{ApplyLocation, BranchType, Diff, IndexAddOption, Oid};

use crate::auth::SshKeyAuth;
use crate::error::{Error, Result};

/// The mirror clone of origin owned by the deferred-push pipeline.
pub struct ShadowRepo {
    inner: git2::Repository,
}

impl ShadowRepo {
    /// Clone origin into the shadow location.
    ///
    /// # Errors
    /// Returns `CloneFailed` if the clone cannot complete (bad URL, bad
    /// key, network failure).
    pub fn clone(url: &str, path: impl AsRef<Path>, auth: &SshKeyAuth) -> Result<Self> {
        let inner = RepoBuilder::new()
            .fetch_options(auth.fetch_options())
            .clone(url, path.as_ref())
            .map_err(|e| Error::CloneFailed(e.message().into()))?;

        Ok(Self { inner })
    }

    /// Open an existing shadow repository.
    ///
    /// # Errors
    /// Returns `NotARepository` if the shadow location holds no repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::open(path).map_err(|_| Error::NotARepository)?;
        Ok(Self { inner })
    }

    /// Fetch origin using its configured refspecs.
    ///
    /// Nothing-to-fetch is a success.
    ///
    /// # Errors
    /// Returns `FetchFailed` if the fetch cannot complete.
    pub fn fetch(&self, auth: &SshKeyAuth) -> Result<()> {
        let mut remote = self
            .inner
            .find_remote("origin")
            .map_err(|_| Error::RemoteNotFound("origin".into()))?;

        remote
            .fetch(&[] as &[&str], Some(&mut auth.fetch_options()), None)
            .map_err(|e| Error::FetchFailed(e.message().into()))?;

        Ok(())
    }

    /// Check out the ephemeral replay branch for `branch_name`.
    ///
    /// Reuses a local branch of that name if one exists; otherwise
    /// creates it from the remote-tracking branch.
    ///
    /// # Errors
    /// Returns `BranchNotFound` if neither a local branch nor a
    /// remote-tracking branch of that name exists.
    pub fn checkout_replay_branch(&self, branch_name: &str) -> Result<()> {
        if self
            .inner
            .find_branch(branch_name, BranchType::Local)
            .is_err()
        {
            let remote_name = format!("origin/{branch_name}");
            let remote_branch = self
                .inner
                .find_branch(&remote_name, BranchType::Remote)
                .map_err(|_| Error::BranchNotFound(branch_name.into()))?;

            let target = remote_branch.get().peel_to_commit()?;
            self.inner.branch(branch_name, &target, false)?;
        }

        let branch = self.inner.find_branch(branch_name, BranchType::Local)?;
        let object = branch.get().peel(git2::ObjectType::Commit)?;

        // Force: the shadow tree may hold leftovers from a failed apply.
        let mut checkout = CheckoutBuilder::new();
        checkout.force();

        self.inner.checkout_tree(&object, Some(&mut checkout))?;
        self.inner
            .set_head(&format!("refs/heads/{branch_name}"))?;

        Ok(())
    }

    /// Apply a recorded unified diff to the shadow work tree.
    ///
    /// # Errors
    /// Returns `ApplyFailed` if the payload is not a valid patch or does
    /// not apply against the checked-out base.
    pub fn apply_diff(&self, payload: &[u8]) -> Result<()> {
        let diff =
            Diff::from_buffer(payload).map_err(|e| Error::ApplyFailed(e.message().into()))?;

        // libgit2 parses unrecognized text as an empty patch; an empty
        // payload can never represent a staged change.
        if diff.deltas().len() == 0 {
            return Err(Error::ApplyFailed("empty or unparseable patch".into()));
        }

        self.inner
            .apply(&diff, ApplyLocation::WorkDir, None)
            .map_err(|e| Error::ApplyFailed(e.message().into()))?;

        Ok(())
    }

    /// Stage every change in the shadow work tree, deletions included.
    ///
    /// # Errors
    /// Returns error if the index cannot be updated.
    pub fn stage_all(&self) -> Result<()> {
        let mut index = self.inner.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;
        Ok(())
    }

    /// Commit the staged changes to the checked-out replay branch.
    ///
    /// # Errors
    /// Returns error if the commit fails.
    pub fn commit(&self, message: &str) -> Result<Oid> {
        let signature = self.inner.signature()?;

        let mut index = self.inner.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.inner.find_tree(tree_id)?;

        let parent = self.inner.head()?.peel_to_commit()?;

        let oid = self.inner.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        Ok(oid)
    }

    /// Push a branch to origin.
    ///
    /// # Errors
    /// Returns `PushFailed` if the push is rejected or cannot complete.
    pub fn push(&self, branch_name: &str, auth: &SshKeyAuth) -> Result<()> {
        let mut remote = self
            .inner
            .find_remote("origin")
            .map_err(|_| Error::RemoteNotFound("origin".into()))?;

        let refspec = format!("refs/heads/{branch_name}:refs/heads/{branch_name}");
        remote
            .push(&[refspec.as_str()], Some(&mut auth.push_options()))
            .map_err(|e| Error::PushFailed(e.message().into()))?;

        Ok(())
    }

    /// Delete the ephemeral replay branch ref.
    ///
    /// The branch may be the current HEAD, so HEAD is detached to the
    /// branch tip first. A missing branch is not an error.
    ///
    /// # Errors
    /// Returns error if the ref exists but cannot be removed.
    pub fn delete_replay_branch(&self, branch_name: &str) -> Result<()> {
        let Ok(mut branch) = self.inner.find_branch(branch_name, BranchType::Local) else {
            return Ok(());
        };

        if let Some(target) = branch.get().target() {
            self.inner.set_head_detached(target)?;
        }
        branch.delete()?;

        Ok(())
    }

    /// Whether a local branch of this name currently exists in the shadow.
    #[must_use]
    pub fn has_local_branch(&self, branch_name: &str) -> bool {
        self.inner
            .find_branch(branch_name, BranchType::Local)
            .is_ok()
    }
}

impl std::fmt::Debug for ShadowRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowRepo")
            .field("path", &self.inner.path())
            .finish()
    }
}
