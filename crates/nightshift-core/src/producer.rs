//! Producer side of the pipeline: commit locally now, record for later.

use chrono::Utc;
use nightshift_git::{Oid, WorkRepo};

use crate::error::{Error, Result};
use crate::record::RecordId;
use crate::schedule;
use crate::store::RecordStore;

/// Outcome of a deferred commit.
#[derive(Debug)]
pub struct DeferredCommit {
    /// Id of the record written to the store.
    pub record_id: RecordId,
    /// Unix timestamp the record becomes due at.
    pub due_at: i64,
    /// Branch the local commit landed on.
    pub branch_name: String,
    /// Oid of the immediate local commit.
    pub commit: Oid,
}

/// Commit the staged changes immediately and append the matching record.
///
/// The diff is captured before the commit so the record holds exactly
/// what was staged; the record is written last, so a failure anywhere
/// earlier leaves the store untouched.
///
/// # Errors
/// Returns `EmptyMessage` or `NoStagedChanges` when preconditions fail,
/// `InvalidDateExpression` for a malformed `--date`, and git/IO errors
/// otherwise.
pub fn defer_commit(
    repo: &WorkRepo,
    store: &RecordStore,
    message: &str,
    date_expr: Option<&str>,
) -> Result<DeferredCommit> {
    if message.trim().is_empty() {
        return Err(Error::EmptyMessage);
    }

    let branch_name = repo.current_branch()?;

    if !repo.has_staged_changes()? {
        return Err(Error::NoStagedChanges);
    }

    // Resolve the due time before committing: a bad expression must not
    // leave a stray local commit behind.
    let due_at = schedule::resolve_due(date_expr, Utc::now())?;

    let diff_payload = repo.staged_diff()?;
    let commit = repo.commit_staged(message)?;

    let record_id = store.append(due_at, &branch_name, message, &diff_payload)?;

    Ok(DeferredCommit {
        record_id,
        due_at,
        branch_name,
        commit,
    })
}
