//! The commit record: the unit of deferred work.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;

/// Process-wide sequence so two records generated in the same
/// millisecond still get distinct ids.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Time-ordered, process-unique record identifier.
///
/// The high bits carry the generation time in milliseconds, the low 16
/// bits a wrapping per-process sequence, so ids sort roughly by creation
/// time and double as record filename stems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xffff;
        Self((millis << 16) | seq)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// One deferred commit, as persisted by the record store.
///
/// Records are immutable once written: the consumer reads and deletes
/// them, never rewrites them.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    /// Identifier, also the filename stem of both artifacts.
    pub id: RecordId,
    /// Unix timestamp (seconds) after which the record is due.
    pub due_at: i64,
    /// Local branch the original commit was made on.
    pub branch_name: String,
    /// Commit message to replay.
    pub message: String,
    /// Unified diff of the staged changes at commit time.
    pub diff_payload: Vec<u8>,
}

impl CommitRecord {
    /// Whether the record is eligible for replay at `now` (unix seconds).
    #[must_use]
    pub const fn is_due(&self, now: i64) -> bool {
        self.due_at <= now
    }
}
