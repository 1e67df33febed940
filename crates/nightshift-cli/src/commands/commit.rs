//! `nightshift commit` command - commit now, schedule the push.

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use inquire::{Password, PasswordDisplayMode, Text};
use nightshift_core::{Credentials, Layout, RecordStore, defer_commit};
use nightshift_git::{ShadowRepo, WorkRepo};

use super::utils::open_repo_and_layout;
use crate::output;

/// Run the commit command.
pub fn run(message: &str, date: Option<&str>) -> Result<()> {
    let (repo, layout) = open_repo_and_layout()?;

    // First commit in this repository bootstraps the shadow mirror.
    if !layout.shadow_exists() {
        bootstrap_shadow(&repo, &layout)?;
    }

    let store = RecordStore::new(layout.commits_dir());
    let deferred = defer_commit(&repo, &store, message, date)?;

    let mut short = deferred.commit.to_string();
    short.truncate(8);
    output::success(&format!(
        "Committed {short} to '{}'",
        deferred.branch_name
    ));

    let due = Local
        .timestamp_opt(deferred.due_at, 0)
        .single()
        .map_or_else(
            || deferred.due_at.to_string(),
            |due| due.format("%Y-%m-%d %H:%M").to_string(),
        );
    output::info(&format!(
        "Push scheduled for {due} - run `nightshift consume` to deliver it"
    ));

    Ok(())
}

/// One-time setup: ask for credentials, persist them, clone origin into
/// the shadow location. Any failure here aborts the command before a
/// record is written.
fn bootstrap_shadow(repo: &WorkRepo, layout: &Layout) -> Result<()> {
    let origin_url = repo
        .origin_url()
        .context("The working repository has no 'origin' remote to mirror")?;

    output::info("First run: cloning origin into the shadow repository");

    let key_path = Text::new("Path to your SSH private key:")
        .prompt()
        .context("Bootstrap cancelled")?;
    let passphrase = Password::new("Key passphrase (leave empty if none):")
        .with_display_mode(PasswordDisplayMode::Hidden)
        .without_confirmation()
        .prompt()
        .context("Bootstrap cancelled")?;

    let credentials = Credentials::new(key_path, Some(passphrase));
    let auth = credentials
        .auth()
        .context("The key file could not be read")?;
    credentials.save(layout.config_path())?;

    ShadowRepo::clone(&origin_url, layout.shadow_path(), &auth)
        .context("Cloning origin into the shadow repository failed")?;

    output::success("Shadow repository ready");
    Ok(())
}
