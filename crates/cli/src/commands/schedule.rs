// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd schedule` — durable schedule status toggles.
//!
//! These write the same state file the supervisor reads; a running
//! scheduler honors the change on its next tick.

use anyhow::Context;
use clap::Subcommand;
use herd_core::schedule::ScheduleStatus;
use herd_storage::StateStore;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ScheduleCommand {
    /// List every schedule with durable state
    List {
        #[arg(long, default_value = ".herd")]
        state_dir: PathBuf,
    },
    /// Re-enable a disabled schedule
    Enable {
        /// Qualified agent name
        agent: String,
        schedule: String,
        #[arg(long, default_value = ".herd")]
        state_dir: PathBuf,
    },
    /// Stop a schedule from firing
    Disable {
        agent: String,
        schedule: String,
        #[arg(long, default_value = ".herd")]
        state_dir: PathBuf,
    },
}

pub fn run(command: ScheduleCommand) -> anyhow::Result<()> {
    match command {
        ScheduleCommand::List { state_dir } => list(&state_dir),
        ScheduleCommand::Enable { agent, schedule, state_dir } => {
            set_status(&state_dir, &agent, &schedule, ScheduleStatus::Idle)
        }
        ScheduleCommand::Disable { agent, schedule, state_dir } => {
            set_status(&state_dir, &agent, &schedule, ScheduleStatus::Disabled)
        }
    }
}

fn list(state_dir: &Path) -> anyhow::Result<()> {
    let store = StateStore::open(state_dir).context("cannot open state directory")?;
    let fleet = store.read_fleet_state();
    for (agent, state) in &fleet.agents {
        for (name, schedule) in &state.schedules {
            let next = schedule
                .next_run_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!("{agent}/{name}: {} next={next}", schedule.status);
        }
    }
    Ok(())
}

fn set_status(
    state_dir: &Path,
    agent: &str,
    schedule: &str,
    status: ScheduleStatus,
) -> anyhow::Result<()> {
    let store = StateStore::open(state_dir).context("cannot open state directory")?;
    store
        .update_agent_state(agent, |state| {
            state.schedule_mut(schedule).status = status;
        })
        .context("cannot update schedule state")?;
    println!("{agent}/{schedule}: {status}");
    Ok(())
}
