//! LifeOS CLI - local state and encrypted backups in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{backup, logs, state, status};

/// LifeOS - your life, backed up and encrypted on your own machine
#[derive(Parser)]
#[command(name = "lifeos", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show state and backup summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and edit stored state
    State {
        #[command(subcommand)]
        command: state::StateCommands,
    },

    /// Export, verify and restore encrypted backups
    Backup {
        #[command(subcommand)]
        command: backup::BackupCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::State { command } => state::run(command),
        Commands::Backup { command } => backup::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
