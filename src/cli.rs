use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(name = "timeledger", version, about = "Incremental Harvest time-entry sync")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch recent entries from Harvest and merge them into the store
    Sync {
        /// Compute the merge but skip the write
        #[arg(long)]
        dry_run: bool,
    },
    /// Import a legacy spreadsheet export (CSV) through the same pipeline
    Import {
        /// Path to the CSV export
        file: PathBuf,
        /// Compute the merge but skip the write
        #[arg(long)]
        dry_run: bool,
    },
    /// Show store paths and dataset summary
    Status,
    /// Check config, environment, and store invariants
    Verify,
}

fn print_report(report: &CommandReport) {
    for line in &report.details {
        println!("{line}");
    }
    for line in &report.issues {
        eprintln!("issue: {line}");
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Sync { dry_run } => commands::sync::run(&commands::sync::SyncOptions { dry_run })?,
        Command::Import { file, dry_run } => {
            commands::import::run(&commands::import::ImportOptions { file, dry_run })?
        }
        Command::Status => commands::status::run()?,
        Command::Verify => commands::verify::run()?,
    };

    print_report(&report);
    if !report.ok {
        anyhow::bail!(
            "{} finished with {} issue(s)",
            report.command,
            report.issues.len()
        );
    }
    Ok(())
}
