// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd` — operator CLI for the fleet supervisor.

mod commands;
mod runtime;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "herd", version, about = "Fleet supervisor for autonomous agent jobs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the supervisor until interrupted
    Start {
        /// Fleet config file or directory containing herdctl.yaml
        #[arg(long, default_value = ".")]
        config: PathBuf,
        /// State directory (default: .herd next to the config)
        #[arg(long)]
        state_dir: Option<PathBuf>,
        /// Load a .env file next to the root config
        #[arg(long)]
        env_file: bool,
    },
    /// Load and validate the fleet config
    Validate {
        #[arg(long, default_value = ".")]
        config: PathBuf,
    },
    /// Show fleet and agent state
    Status {
        #[arg(long, default_value = ".herd")]
        state_dir: PathBuf,
    },
    /// List job history
    Jobs {
        #[arg(long, default_value = ".herd")]
        state_dir: PathBuf,
        /// Filter by qualified agent name
        #[arg(long)]
        agent: Option<String>,
        /// Filter by status (pending|running|completed|failed|cancelled)
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one job's metadata
    Show {
        job_id: String,
        #[arg(long, default_value = ".herd")]
        state_dir: PathBuf,
        /// Include the transcript
        #[arg(long)]
        output: bool,
    },
    /// Print a job transcript, optionally following appends
    Logs {
        job_id: String,
        #[arg(long, default_value = ".herd")]
        state_dir: PathBuf,
        #[arg(long)]
        follow: bool,
    },
    /// Inspect or toggle schedule status
    Schedule {
        #[command(subcommand)]
        command: commands::schedule::ScheduleCommand,
    },
}

/// Exit codes: 0 clean stop, 1 initialization failure, 2 unrecoverable
/// runtime error.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Start { config, state_dir, env_file } => {
            return commands::start::run(config, state_dir, env_file).await;
        }
        Command::Validate { config } => commands::validate(&config),
        Command::Status { state_dir } => commands::status::run(&state_dir),
        Command::Jobs { state_dir, agent, status, limit } => {
            commands::jobs::list(&state_dir, agent, status, limit)
        }
        Command::Show { job_id, state_dir, output } => {
            commands::jobs::show(&state_dir, &job_id, output)
        }
        Command::Logs { job_id, state_dir, follow } => {
            commands::jobs::logs(&state_dir, &job_id, follow).await
        }
        Command::Schedule { command } => commands::schedule::run(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
