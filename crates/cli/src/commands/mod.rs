// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod jobs;
pub mod schedule;
pub mod start;
pub mod status;

use anyhow::Context;
use herd_config::LoadOptions;
use std::path::Path;

/// `herd validate` — load the fleet config and report every problem.
pub fn validate(config: &Path) -> anyhow::Result<()> {
    let resolved = herd_config::load(config, &LoadOptions::from_process_env())
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("config validation failed")?;

    println!("config ok: {} agents", resolved.agents.len());
    for agent in &resolved.agents {
        let schedules = agent
            .schedules
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if schedules.is_empty() {
            println!("  {}", agent.qualified_name);
        } else {
            println!("  {} [{}]", agent.qualified_name, schedules);
        }
    }
    Ok(())
}
