//! Command definitions and dispatch.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

pub mod commit;
pub mod completions;
pub mod consume;
pub mod status;
mod utils;

/// Commit now, push while you sleep.
#[derive(Debug, Parser)]
#[command(name = "nightshift", version, about, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Commit the staged changes now and schedule the push for later.
    Commit {
        /// Commit message.
        #[arg(short, long)]
        message: String,

        /// Relative due time, e.g. "+2hours" or "+30minutes".
        /// Omitted means the push is due immediately.
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Run the consumer loop that pushes due commits. Runs until
    /// interrupted; only one consumer may run per repository.
    Consume,

    /// List the commits still waiting to be pushed.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
