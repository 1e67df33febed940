//! Desktop notification sink for replay outcomes.
//!
//! The consumer usually runs detached, so outcomes go to the desktop;
//! they are echoed to the terminal as well for attached runs, and the
//! terminal is the fallback when no notification daemon answers.

use nightshift_core::Notifier;
use notify_rust::Notification;

use crate::output;

/// [`Notifier`] backed by the desktop notification daemon.
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn send(summary: &str, body: &str, icon: &str) {
        let _ = Notification::new()
            .summary(summary)
            .body(body)
            .icon(icon)
            .show();
    }
}

impl Notifier for DesktopNotifier {
    fn replay_succeeded(&self, branch: &str) {
        let body = format!("'{branch}' is pushed!");
        output::success(&body);
        Self::send("Nightshift", &body, "dialog-information");
    }

    fn replay_failed(&self, detail: &str) {
        let body = format!("Replay failed, commit dropped: {detail}");
        output::warn(&body);
        Self::send("Nightshift", &body, "dialog-error");
    }
}
