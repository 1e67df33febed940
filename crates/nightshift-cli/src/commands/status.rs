//! `nightshift status` command - list the commits waiting to be pushed.

use anyhow::Result;
use chrono::{Local, TimeZone, Utc};
use colored::Colorize;
use nightshift_core::RecordStore;
use serde::Serialize;

use super::utils::open_repo_and_layout;
use crate::output;

/// Run the status command.
pub fn run(json: bool) -> Result<()> {
    let (_repo, layout) = open_repo_and_layout()?;
    let store = RecordStore::new(layout.commits_dir());

    let now = Utc::now().timestamp();
    let mut pending: Vec<PendingRecord> = vec![];
    for handle in store.list_all()? {
        match store.load(&handle) {
            Ok(record) => pending.push(PendingRecord {
                id: record.id.to_string(),
                due_at: record.due_at,
                due: human_date(record.due_at),
                overdue: record.is_due(now),
                branch: record.branch_name,
                message: record.message,
            }),
            Err(e) => output::warn(&e.to_string()),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    if pending.is_empty() {
        output::info("No commits waiting to be pushed.");
        return Ok(());
    }

    println!();
    println!("  {}", "Pending pushes".bold());
    output::hr();
    for record in &pending {
        let marker = if record.overdue {
            "●".yellow()
        } else {
            "●".dimmed()
        };
        println!(
            "  {marker} {:<17} {:<24} {}",
            record.due.dimmed(),
            record.branch.cyan(),
            first_line(&record.message)
        );
    }
    println!();

    Ok(())
}

/// One pending record, JSON-ready.
#[derive(Debug, Serialize)]
struct PendingRecord {
    id: String,
    due_at: i64,
    due: String,
    overdue: bool,
    branch: String,
    message: String,
}

fn human_date(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map_or_else(|| timestamp.to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}
