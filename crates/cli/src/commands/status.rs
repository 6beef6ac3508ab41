// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd status` — read-only view of the state directory.

use anyhow::Context;
use herd_storage::StateStore;
use std::path::Path;

pub fn run(state_dir: &Path) -> anyhow::Result<()> {
    let store = StateStore::open(state_dir).context("cannot open state directory")?;
    let fleet = store.read_fleet_state();

    match fleet.started_at {
        Some(at) => println!("fleet started {}", at.to_rfc3339()),
        None => println!("fleet has not been started"),
    }
    if fleet.agents.is_empty() {
        println!("no agent state recorded");
        return Ok(());
    }

    for (name, agent) in &fleet.agents {
        let current = agent
            .current_job
            .as_ref()
            .map(|id| format!(" job={id}"))
            .unwrap_or_default();
        println!("{name}: {}{current}", agent.status);
        if let Some(message) = &agent.error_message {
            println!("  error: {message}");
        }
        for (schedule, state) in &agent.schedules {
            let last = state
                .last_run_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!("  {schedule}: {} last_run={last}", state.status);
            if let Some(error) = &state.last_error {
                println!("    last_error: {error}");
            }
        }
    }
    Ok(())
}
