//! Filesystem-backed store of deferred commit records.
//!
//! Each record is a pair of co-located artifacts named after its id:
//! `<id>.info` (due timestamp, branch name, commit message, newline
//! separated) and `<id>.diff` (raw payload). The pair is created
//! together and removed together; a record missing its payload is never
//! processed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::record::{CommitRecord, RecordId};

const INFO_EXT: &str = "info";
const DIFF_EXT: &str = "diff";

/// Handle to a stored record pair.
#[derive(Debug, Clone)]
pub struct RecordHandle {
    info_path: PathBuf,
}

impl RecordHandle {
    /// Path to the metadata artifact.
    #[must_use]
    pub fn info_path(&self) -> &Path {
        &self.info_path
    }

    /// Path to the payload artifact.
    #[must_use]
    pub fn diff_path(&self) -> PathBuf {
        self.info_path.with_extension(DIFF_EXT)
    }

    /// The record id, parsed from the filename stem when possible.
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        self.info_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse().ok())
    }
}

/// The record store directory, shared by producer and consumer.
///
/// There is no locking around individual file creation or deletion;
/// collisions are avoided by id uniqueness.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    /// Create a store over the given directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the records live in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a new record pair, allocating a fresh id.
    ///
    /// # Errors
    /// Returns error if the store directory cannot be created or either
    /// artifact cannot be written.
    pub fn append(
        &self,
        due_at: i64,
        branch_name: &str,
        message: &str,
        diff_payload: &[u8],
    ) -> Result<RecordId> {
        fs::create_dir_all(&self.dir)?;

        let id = RecordId::generate();
        let info = format!("{due_at}\n{branch_name}\n{message}");

        fs::write(self.info_path(id), info)?;
        fs::write(self.diff_path(id), diff_payload)?;

        Ok(id)
    }

    /// Enumerate the records whose due time has passed at `now`.
    ///
    /// Yields records in filesystem listing order, NOT due-time order;
    /// callers must not rely on chronological ordering. Metadata files
    /// whose due stamp cannot be read are yielded as immediately due so
    /// that [`Self::load`] reports them and the caller can clear them;
    /// silently skipping them here would leave them stranded forever.
    ///
    /// # Errors
    /// Returns error if the store directory cannot be read. A store
    /// directory that does not exist yet is simply empty.
    pub fn list_due(&self, now: i64) -> Result<Vec<RecordHandle>> {
        let mut due = Vec::new();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(due),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(INFO_EXT) {
                continue;
            }

            let due_at = fs::read_to_string(&path).ok().and_then(|content| {
                content
                    .lines()
                    .next()
                    .and_then(|line| line.trim().parse::<i64>().ok())
            });

            match due_at {
                Some(due_at) if due_at > now => {}
                _ => due.push(RecordHandle { info_path: path }),
            }
        }

        Ok(due)
    }

    /// Enumerate every record in the store, due or not.
    ///
    /// # Errors
    /// Returns error if the store directory cannot be read.
    pub fn list_all(&self) -> Result<Vec<RecordHandle>> {
        self.list_due(i64::MAX)
    }

    /// Load a record from its handle.
    ///
    /// # Errors
    /// Returns `CorruptRecord` if the metadata does not split into
    /// exactly three fields or the payload artifact is missing.
    pub fn load(&self, handle: &RecordHandle) -> Result<CommitRecord> {
        let corrupt = |reason: &str| Error::CorruptRecord {
            path: handle.info_path().to_path_buf(),
            reason: reason.into(),
        };

        let content =
            fs::read_to_string(handle.info_path()).map_err(|_| corrupt("unreadable metadata"))?;

        // The message keeps any embedded newlines; only the first two
        // separators are structural.
        let mut fields = content.splitn(3, '\n');
        let due_at = fields
            .next()
            .and_then(|line| line.trim().parse::<i64>().ok())
            .ok_or_else(|| corrupt("missing or non-numeric due timestamp"))?;
        let branch_name = fields
            .next()
            .ok_or_else(|| corrupt("missing branch name"))?
            .to_string();
        let message = fields
            .next()
            .ok_or_else(|| corrupt("missing commit message"))?
            .to_string();

        let diff_payload = fs::read(handle.diff_path())
            .map_err(|_| corrupt("missing diff payload"))?;

        let id = handle.id().ok_or_else(|| corrupt("non-numeric id"))?;

        Ok(CommitRecord {
            id,
            due_at,
            branch_name,
            message,
            diff_payload,
        })
    }

    /// Delete both artifacts of a record. Idempotent: files already gone
    /// are not an error.
    pub fn remove(&self, handle: &RecordHandle) {
        let _ = fs::remove_file(handle.info_path());
        let _ = fs::remove_file(handle.diff_path());
    }

    fn info_path(&self, id: RecordId) -> PathBuf {
        self.dir.join(format!("{id}.{INFO_EXT}"))
    }

    fn diff_path(&self, id: RecordId) -> PathBuf {
        self.dir.join(format!("{id}.{DIFF_EXT}"))
    }
}
