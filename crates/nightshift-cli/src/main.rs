//! Nightshift CLI - commit now, push while you sleep.

use clap::Parser;

mod commands;
mod notify;
mod output;

use commands::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Commit { message, date } => commands::commit::run(&message, date.as_deref()),
        Commands::Consume => commands::consume::run(),
        Commands::Status { json } => commands::status::run(json),
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
