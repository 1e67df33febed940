//! Consumer side of the pipeline: poll the store, replay due records.
//!
//! The loop is single threaded and cooperative: it blocks on each
//! replay's network operations and on the sleep between polls. Records
//! are processed in filesystem listing order and at most once; a failed
//! replay is reported through the notifier and the record dropped, never
//! retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use nightshift_git::{ShadowRepo, SshKeyAuth};

use crate::error::Result;
use crate::notify::Notifier;
use crate::record::CommitRecord;
use crate::store::{RecordHandle, RecordStore};

/// Fixed delay between two polls of the record store.
pub const POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Granularity of shutdown-flag checks while sleeping.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// The replay engine driving the shadow repository.
pub struct Consumer<'a> {
    store: &'a RecordStore,
    shadow: &'a ShadowRepo,
    auth: &'a SshKeyAuth,
    notifier: &'a dyn Notifier,
}

impl<'a> Consumer<'a> {
    /// Build a consumer over an already-opened shadow repository and an
    /// already-built transport.
    #[must_use]
    pub fn new(
        store: &'a RecordStore,
        shadow: &'a ShadowRepo,
        auth: &'a SshKeyAuth,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            store,
            shadow,
            auth,
            notifier,
        }
    }

    /// Run the poll loop until the shutdown flag is raised.
    ///
    /// # Errors
    /// Returns error only if the record store directory itself becomes
    /// unreadable; replay failures are reported and swallowed.
    pub fn run(&self, shutdown: &AtomicBool) -> Result<()> {
        while !shutdown.load(Ordering::Relaxed) {
            self.poll_once(Utc::now().timestamp())?;
            sleep_interruptible(POLL_INTERVAL, shutdown);
        }
        Ok(())
    }

    /// Process every record due at `now`. Returns how many records were
    /// taken off the store, successful or not.
    ///
    /// # Errors
    /// Returns error if the store cannot be enumerated.
    pub fn poll_once(&self, now: i64) -> Result<usize> {
        let due = self.store.list_due(now)?;
        let mut processed = 0;

        for handle in &due {
            self.process(handle);
            processed += 1;
        }

        Ok(processed)
    }

    /// One processing attempt. The record is removed whatever happens
    /// after it was selected: drop-on-failure, no retry.
    fn process(&self, handle: &RecordHandle) {
        let outcome = self
            .store
            .load(handle)
            .map_err(|e| e.to_string())
            .and_then(|record| {
                self.replay(&record)
                    .map_err(|e| format!("branch '{}': {e}", record.branch_name))
                    .map(|()| record)
            });

        match outcome {
            Ok(record) => {
                self.notifier.replay_succeeded(&record.branch_name);
                // Drop the ephemeral branch ref so the next record for
                // this branch starts clean from the advanced remote.
                // The push already landed, so a failed cleanup cannot
                // turn the replay into a failure; a leftover ref is
                // simply reused next time.
                let _ = self.shadow.delete_replay_branch(&record.branch_name);
            }
            Err(detail) => self.notifier.replay_failed(&detail),
        }

        self.store.remove(handle);
    }

    /// Replay one record against the shadow repository. The record has
    /// succeeded once the push lands; ref cleanup is the caller's.
    fn replay(&self, record: &CommitRecord) -> std::result::Result<(), nightshift_git::Error> {
        self.shadow.fetch(self.auth)?;
        self.shadow.checkout_replay_branch(&record.branch_name)?;
        self.shadow.apply_diff(&record.diff_payload)?;
        self.shadow.stage_all()?;
        self.shadow.commit(&record.message)?;
        self.shadow.push(&record.branch_name, self.auth)?;

        Ok(())
    }
}

/// Sleep for `total`, waking early when the shutdown flag is raised.
fn sleep_interruptible(total: Duration, shutdown: &AtomicBool) {
    let mut remaining = total;
    while !remaining.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining -= slice;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingNotifier {
        succeeded: RefCell<Vec<String>>,
        failed: RefCell<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn replay_succeeded(&self, branch: &str) {
            self.succeeded.borrow_mut().push(branch.to_string());
        }

        fn replay_failed(&self, detail: &str) {
            self.failed.borrow_mut().push(detail.to_string());
        }
    }

    struct Fixture {
        _temp: TempDir,
        origin_path: PathBuf,
        store: RecordStore,
        shadow: ShadowRepo,
        auth: SshKeyAuth,
    }

    /// Bare origin seeded with `main`, a shadow clone of it, and an
    /// empty record store.
    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let origin_path = temp.path().join("origin.git");
        git2::Repository::init_bare(&origin_path).unwrap();

        let seed_path = temp.path().join("seed");
        let seed = git2::Repository::clone(origin_path.to_str().unwrap(), &seed_path).unwrap();
        {
            let mut config = seed.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();

            fs::write(seed_path.join("README.md"), "# seed\n").unwrap();
            let mut index = seed.index().unwrap();
            index.add_path(Path::new("README.md")).unwrap();
            index.write().unwrap();

            let sig = seed.signature().unwrap();
            let tree = seed.find_tree(index.write_tree().unwrap()).unwrap();
            seed.commit(Some("refs/heads/main"), &sig, &sig, "seed", &tree, &[])
                .unwrap();

            let mut remote = seed.find_remote("origin").unwrap();
            remote
                .push(&["refs/heads/main:refs/heads/main"], None)
                .unwrap();
        }

        let key = temp.path().join("id_test");
        fs::write(&key, "dummy").unwrap();
        let auth = SshKeyAuth::new(&key, None).unwrap();

        let shadow_path = temp.path().join("shadow");
        let shadow =
            ShadowRepo::clone(origin_path.to_str().unwrap(), &shadow_path, &auth).unwrap();
        {
            let raw = git2::Repository::open(&shadow_path).unwrap();
            let mut config = raw.config().unwrap();
            config.set_str("user.name", "Shadow").unwrap();
            config.set_str("user.email", "shadow@example.com").unwrap();
        }

        let store = RecordStore::new(temp.path().join("commits"));
        Fixture {
            _temp: temp,
            origin_path,
            store,
            shadow,
            auth,
        }
    }

    fn new_file_patch(name: &str) -> Vec<u8> {
        format!(
            "diff --git a/{name} b/{name}\n\
             new file mode 100644\n\
             index 0000000..ce01362\n\
             --- /dev/null\n\
             +++ b/{name}\n\
             @@ -0,0 +1 @@\n\
             +hello\n"
        )
        .into_bytes()
    }

    fn origin_tip(fixture: &Fixture, branch: &str) -> git2::Oid {
        let origin = git2::Repository::open_bare(&fixture.origin_path).unwrap();
        origin
            .refname_to_id(&format!("refs/heads/{branch}"))
            .unwrap()
    }

    #[test]
    fn test_idle_poll_mutates_nothing() {
        let fixture = fixture();
        let notifier = RecordingNotifier::default();
        let consumer = Consumer::new(&fixture.store, &fixture.shadow, &fixture.auth, &notifier);

        // A record that is not yet due stays untouched.
        fixture
            .store
            .append(i64::MAX, "main", "later", &new_file_patch("later.txt"))
            .unwrap();
        let before = origin_tip(&fixture, "main");

        let processed = consumer.poll_once(Utc::now().timestamp()).unwrap();

        assert_eq!(processed, 0);
        assert_eq!(fixture.store.list_all().unwrap().len(), 1);
        assert_eq!(origin_tip(&fixture, "main"), before);
        assert!(notifier.succeeded.borrow().is_empty());
        assert!(notifier.failed.borrow().is_empty());
    }

    #[test]
    fn test_due_record_is_replayed_and_removed() {
        let fixture = fixture();
        let notifier = RecordingNotifier::default();
        let consumer = Consumer::new(&fixture.store, &fixture.shadow, &fixture.auth, &notifier);

        let before = origin_tip(&fixture, "main");
        fixture
            .store
            .append(0, "main", "deferred change", &new_file_patch("feature.txt"))
            .unwrap();

        let processed = consumer.poll_once(Utc::now().timestamp()).unwrap();

        assert_eq!(processed, 1);
        assert!(fixture.store.list_all().unwrap().is_empty());
        assert_ne!(origin_tip(&fixture, "main"), before);
        assert_eq!(*notifier.succeeded.borrow(), vec!["main".to_string()]);

        // Ephemeral branch ref is gone after the push.
        assert!(!fixture.shadow.has_local_branch("main"));
    }

    #[test]
    fn test_failed_replay_still_drops_record() {
        let fixture = fixture();
        let notifier = RecordingNotifier::default();
        let consumer = Consumer::new(&fixture.store, &fixture.shadow, &fixture.auth, &notifier);

        fixture
            .store
            .append(0, "main", "bad", b"this is not a patch")
            .unwrap();

        consumer.poll_once(Utc::now().timestamp()).unwrap();

        assert!(fixture.store.list_all().unwrap().is_empty());
        assert_eq!(notifier.failed.borrow().len(), 1);
        assert!(notifier.succeeded.borrow().is_empty());
    }

    #[test]
    fn test_unknown_branch_reported_and_dropped() {
        let fixture = fixture();
        let notifier = RecordingNotifier::default();
        let consumer = Consumer::new(&fixture.store, &fixture.shadow, &fixture.auth, &notifier);

        fixture
            .store
            .append(0, "ghost", "msg", &new_file_patch("feature.txt"))
            .unwrap();

        consumer.poll_once(Utc::now().timestamp()).unwrap();

        assert!(fixture.store.list_all().unwrap().is_empty());
        let failed = notifier.failed.borrow();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].contains("ghost"));
    }

    #[test]
    fn test_same_branch_replayed_twice_sequentially() {
        let fixture = fixture();
        let notifier = RecordingNotifier::default();
        let consumer = Consumer::new(&fixture.store, &fixture.shadow, &fixture.auth, &notifier);

        fixture
            .store
            .append(0, "main", "first", &new_file_patch("one.txt"))
            .unwrap();
        consumer.poll_once(Utc::now().timestamp()).unwrap();
        let first_tip = origin_tip(&fixture, "main");

        fixture
            .store
            .append(0, "main", "second", &new_file_patch("two.txt"))
            .unwrap();
        consumer.poll_once(Utc::now().timestamp()).unwrap();
        let second_tip = origin_tip(&fixture, "main");

        assert_eq!(notifier.succeeded.borrow().len(), 2);
        assert!(notifier.failed.borrow().is_empty());
        assert_ne!(first_tip, second_tip);

        // The second replay built on the first's pushed state.
        let origin = git2::Repository::open_bare(&fixture.origin_path).unwrap();
        let tip = origin.find_commit(second_tip).unwrap();
        assert_eq!(tip.parent_id(0).unwrap(), first_tip);
    }

    #[test]
    fn test_missing_payload_reported_and_dropped() {
        let fixture = fixture();
        let notifier = RecordingNotifier::default();
        let consumer = Consumer::new(&fixture.store, &fixture.shadow, &fixture.auth, &notifier);

        let id = fixture
            .store
            .append(0, "main", "msg", &new_file_patch("feature.txt"))
            .unwrap();
        fs::remove_file(fixture.store.dir().join(format!("{id}.diff"))).unwrap();

        consumer.poll_once(Utc::now().timestamp()).unwrap();

        assert!(fixture.store.list_all().unwrap().is_empty());
        assert_eq!(notifier.failed.borrow().len(), 1);
    }

    #[test]
    fn test_garbage_metadata_reported_and_dropped() {
        let fixture = fixture();
        let notifier = RecordingNotifier::default();
        let consumer = Consumer::new(&fixture.store, &fixture.shadow, &fixture.auth, &notifier);

        fs::create_dir_all(fixture.store.dir()).unwrap();
        fs::write(
            fixture.store.dir().join("99.info"),
            "not-a-timestamp\nmain\nmsg",
        )
        .unwrap();
        fs::write(fixture.store.dir().join("99.diff"), "x").unwrap();

        // Even with `now` far in the past the broken record is picked
        // up, reported, and cleared rather than lingering forever.
        consumer.poll_once(0).unwrap();

        assert!(fixture.store.list_all().unwrap().is_empty());
        assert_eq!(notifier.failed.borrow().len(), 1);
        assert!(notifier.succeeded.borrow().is_empty());
    }

    /// Notifier that records whether the ephemeral branch ref still
    /// existed at the moment success was reported.
    struct BranchCheckingNotifier<'a> {
        shadow: &'a ShadowRepo,
        branch_present_at_success: Cell<Option<bool>>,
    }

    impl Notifier for BranchCheckingNotifier<'_> {
        fn replay_succeeded(&self, branch: &str) {
            self.branch_present_at_success
                .set(Some(self.shadow.has_local_branch(branch)));
        }

        fn replay_failed(&self, _detail: &str) {}
    }

    #[test]
    fn test_success_reported_before_branch_cleanup() {
        let fixture = fixture();
        let notifier = BranchCheckingNotifier {
            shadow: &fixture.shadow,
            branch_present_at_success: Cell::new(None),
        };
        let consumer = Consumer::new(&fixture.store, &fixture.shadow, &fixture.auth, &notifier);

        fixture
            .store
            .append(0, "main", "deferred change", &new_file_patch("feature.txt"))
            .unwrap();
        consumer.poll_once(Utc::now().timestamp()).unwrap();

        // Cleanup runs only after the success report went out.
        assert_eq!(notifier.branch_present_at_success.get(), Some(true));
        assert!(!fixture.shadow.has_local_branch("main"));
    }

    #[test]
    fn test_run_stops_on_shutdown_flag() {
        let fixture = fixture();
        let notifier = RecordingNotifier::default();
        let consumer = Consumer::new(&fixture.store, &fixture.shadow, &fixture.auth, &notifier);

        let shutdown = AtomicBool::new(true);
        consumer.run(&shutdown).unwrap();
    }
}
