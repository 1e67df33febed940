//! `nightshift consume` command - run the replay loop until interrupted.

use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result, bail};
use nightshift_core::{Consumer, Credentials, InstanceLock, RecordStore};
use nightshift_git::ShadowRepo;

use super::utils::open_repo_and_layout;
use crate::notify::DesktopNotifier;
use crate::output;

/// Run the consume command.
pub fn run() -> Result<()> {
    let (_repo, layout) = open_repo_and_layout()?;

    if !layout.shadow_exists() {
        bail!("Nothing to consume - run `nightshift commit` at least once first");
    }

    // Single instance per repository; exits immediately when another
    // consumer holds the lock.
    let lock = InstanceLock::acquire(layout.lock_path())?;
    install_signal_handler(lock.path().to_path_buf())?;

    let credentials = Credentials::load(layout.config_path())?;
    let auth = credentials
        .auth()
        .context("Failed to build a transport from the stored credentials")?;
    let shadow = ShadowRepo::open(layout.shadow_path())
        .context("The shadow repository is missing or damaged")?;
    let store = RecordStore::new(layout.commits_dir());
    let notifier = DesktopNotifier;

    output::info("Consumer running - due commits will be pushed while you sleep");

    // The signal handler exits the process directly, so the flag only
    // matters if something else ever raises it.
    let shutdown = AtomicBool::new(false);
    let consumer = Consumer::new(&store, &shadow, &auth, &notifier);
    consumer.run(&shutdown)?;

    drop(lock);
    Ok(())
}

/// Remove the lock and exit on SIGINT/SIGTERM, even mid-replay: an
/// interrupted replay is simply retried (or re-pushed) by a later run.
#[cfg(unix)]
fn install_signal_handler(lock_path: std::path::PathBuf) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            InstanceLock::release_path(&lock_path);
            std::process::exit(1);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn install_signal_handler(_lock_path: std::path::PathBuf) -> Result<()> {
    // No signal stream on this platform; the lock is released by Drop
    // on normal exit.
    Ok(())
}
