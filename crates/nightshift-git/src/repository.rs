//! Wrapper around the user's working repository.
//!
//! The producer side of the pipeline only ever touches this repository:
//! it inspects the index, captures the staged diff and creates the
//! immediate local commit. Replay happens in [`crate::shadow`].

use std::path::Path;

use git2::{DiffFormat, Oid, Status, StatusOptions};

use crate::error::{Error, Result};

/// Index states that count as "staged" when deciding whether there is
/// anything to commit.
const STAGED_MASK: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

/// High-level wrapper around the user's working git repository.
pub struct WorkRepo {
    inner: git2::Repository,
}

impl WorkRepo {
    /// Open the repository containing the given path.
    ///
    /// # Errors
    /// Returns `NotARepository` if no repository is found at the path or
    /// any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|_| Error::NotARepository)?;
        Ok(Self { inner })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns `NotARepository` if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Get the path to the repository root (workdir).
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Get the name of the current branch.
    ///
    /// # Errors
    /// Returns error if HEAD is detached.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.inner.head()?;
        if !head.is_branch() {
            return Err(Error::DetachedHead);
        }

        head.shorthand()
            .map(String::from)
            .ok_or(Error::DetachedHead)
    }

    /// Get the fetch URL of the origin remote.
    ///
    /// # Errors
    /// Returns `RemoteNotFound` if origin is not configured or has no URL.
    pub fn origin_url(&self) -> Result<String> {
        let remote = self
            .inner
            .find_remote("origin")
            .map_err(|_| Error::RemoteNotFound("origin".into()))?;

        remote
            .url()
            .map(String::from)
            .ok_or_else(|| Error::RemoteNotFound("origin".into()))
    }

    /// Check whether the index holds at least one staged change.
    ///
    /// # Errors
    /// Returns error if the status check fails.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(false);

        let statuses = self.inner.statuses(Some(&mut options))?;
        Ok(statuses
            .iter()
            .any(|entry| entry.status().intersects(STAGED_MASK)))
    }

    /// Capture the staged changes as a unified diff, byte for byte what
    /// `git diff --staged` would print.
    ///
    /// # Errors
    /// Returns error if the diff cannot be computed.
    pub fn staged_diff(&self) -> Result<Vec<u8>> {
        // On an unborn branch there is no HEAD tree to diff against.
        let head_tree = match self.inner.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(_) => None,
        };

        let diff = self
            .inner
            .diff_tree_to_index(head_tree.as_ref(), None, None)?;

        let mut buf = Vec::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                buf.push(line.origin() as u8);
            }
            buf.extend_from_slice(line.content());
            true
        })?;

        Ok(buf)
    }

    /// Commit whatever is currently staged to the current branch.
    ///
    /// # Errors
    /// Returns error if the index cannot be written or the commit fails
    /// (e.g. user.name/email missing from git config).
    pub fn commit_staged(&self, message: &str) -> Result<Oid> {
        let signature = self.inner.signature()?;

        let mut index = self.inner.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.inner.find_tree(tree_id)?;

        let parent = match self.inner.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<_> = parent.iter().collect();

        let oid = self.inner.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;

        Ok(oid)
    }
}

impl std::fmt::Debug for WorkRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkRepo")
            .field("path", &self.inner.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_test_repo() -> (TempDir, WorkRepo) {
        let temp = TempDir::new().unwrap();
        let repo = git2::Repository::init(temp.path()).unwrap();

        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();

            let sig = repo.signature().unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
                .unwrap();
        }

        let wrapped = WorkRepo { inner: repo };
        (temp, wrapped)
    }

    fn stage_file(repo: &WorkRepo, name: &str, content: &str) {
        let root = repo.workdir().unwrap();
        fs::write(root.join(name), content).unwrap();

        let mut index = repo.inner.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    #[test]
    fn test_current_branch() {
        let (_temp, repo) = init_test_repo();
        let branch = repo.current_branch().unwrap();
        assert!(branch == "main" || branch == "master");
    }

    #[test]
    fn test_no_staged_changes_after_commit() {
        let (_temp, repo) = init_test_repo();
        assert!(!repo.has_staged_changes().unwrap());
    }

    #[test]
    fn test_untracked_file_is_not_staged() {
        let (temp, repo) = init_test_repo();
        fs::write(temp.path().join("loose.txt"), "untracked").unwrap();
        assert!(!repo.has_staged_changes().unwrap());
    }

    #[test]
    fn test_staged_file_detected() {
        let (_temp, repo) = init_test_repo();
        stage_file(&repo, "feature.txt", "hello\n");
        assert!(repo.has_staged_changes().unwrap());
    }

    #[test]
    fn test_staged_diff_contains_change() {
        let (_temp, repo) = init_test_repo();
        stage_file(&repo, "feature.txt", "hello\n");

        let diff = repo.staged_diff().unwrap();
        let text = String::from_utf8(diff).unwrap();
        assert!(text.contains("feature.txt"));
        assert!(text.contains("+hello"));
    }

    #[test]
    fn test_commit_staged_advances_head() {
        let (_temp, repo) = init_test_repo();
        stage_file(&repo, "feature.txt", "hello\n");

        let oid = repo.commit_staged("add feature").unwrap();
        let head = repo.inner.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.id(), oid);
        assert_eq!(head.message().unwrap(), "add feature");
        assert!(!repo.has_staged_changes().unwrap());
    }

    #[test]
    fn test_missing_origin_reported() {
        let (_temp, repo) = init_test_repo();
        assert!(matches!(
            repo.origin_url(),
            Err(Error::RemoteNotFound(_))
        ));
    }
}
