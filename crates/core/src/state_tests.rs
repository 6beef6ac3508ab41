// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::schedule::ScheduleStatus;

#[test]
fn agent_mut_inserts_default() {
    let mut state = FleetState::default();
    assert!(state.agent("ops.pager").is_none());

    state.agent_mut("ops.pager").status = AgentStatus::Running;
    assert_eq!(state.agent("ops.pager").map(|a| a.status), Some(AgentStatus::Running));
}

#[test]
fn schedule_mut_inserts_default() {
    let mut agent = AgentState::default();
    assert!(agent.schedule("nightly").is_none());

    agent.schedule_mut("nightly").status = ScheduleStatus::Disabled;
    assert_eq!(
        agent.schedule("nightly").map(|s| s.status),
        Some(ScheduleStatus::Disabled)
    );
}

#[test]
fn empty_state_serializes_minimal() {
    let json = serde_json::to_string(&FleetState::default()).unwrap();
    assert_eq!(json, "{}");
}

#[test]
fn round_trip_preserves_schedule_state() {
    let mut state = FleetState::default();
    state.started_at = Some(chrono::Utc::now());
    let agent = state.agent_mut("research.scout");
    agent.last_job_id = JobId::parse("job-2024-01-15-abc123").ok();
    agent.schedule_mut("hourly").status = ScheduleStatus::Running;

    let encoded = serde_json::to_string(&state).unwrap();
    let back: FleetState = serde_json::from_str(&encoded).unwrap();
    assert_eq!(back, state);
}
