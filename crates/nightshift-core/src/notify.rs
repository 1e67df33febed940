//! Notification seam for replay outcomes.
//!
//! The consumer runs unattended, so replay results cannot go to the
//! terminal alone. The trait lets the CLI plug in desktop notifications
//! and tests plug in a recording mock.

/// Sink for replay outcome reports.
pub trait Notifier {
    /// A record was replayed and pushed.
    fn replay_succeeded(&self, branch: &str);

    /// A replay attempt failed; the record has been dropped.
    fn replay_failed(&self, detail: &str);
}
