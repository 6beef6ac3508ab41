// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable fleet state: `<stateDir>/state.yaml`.

use crate::id::JobId;
use crate::schedule::ScheduleState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarse status of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Error,
}

crate::simple_display! {
    AgentStatus {
        Idle => "idle",
        Running => "running",
        Error => "error",
    }
}

/// Durable per-agent state, keyed by qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentState {
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_job: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schedules: BTreeMap<String, ScheduleState>,
}

impl AgentState {
    pub fn schedule(&self, name: &str) -> Option<&ScheduleState> {
        self.schedules.get(name)
    }

    pub fn schedule_mut(&mut self, name: &str) -> &mut ScheduleState {
        self.schedules.entry(name.to_string()).or_default()
    }
}

/// The whole supervisor state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FleetState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub agents: BTreeMap<String, AgentState>,
}

impl FleetState {
    pub fn agent(&self, qualified_name: &str) -> Option<&AgentState> {
        self.agents.get(qualified_name)
    }

    pub fn agent_mut(&mut self, qualified_name: &str) -> &mut AgentState {
        self.agents.entry(qualified_name.to_string()).or_default()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
