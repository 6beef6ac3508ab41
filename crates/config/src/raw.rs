// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw on-disk schemas, deserialized after env interpolation.
//!
//! Unknown keys are rejected (`deny_unknown_fields`) so typos surface as
//! parse errors naming the offending field.

use herd_core::agent::{DockerSettings, PermissionMode, RuntimeKind};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Root or sub-fleet file: `herdctl.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetFile {
    pub version: i64,
    #[serde(default)]
    pub fleet: Option<FleetMeta>,
    /// Agent-shaped defaults applied to every agent at or below this file.
    #[serde(default)]
    pub defaults: Option<serde_yaml::Value>,
    #[serde(default)]
    pub agents: Vec<AgentRef>,
    #[serde(default)]
    pub fleets: Vec<FleetRef>,
    #[serde(default)]
    pub retention: Option<RetentionRaw>,
    // Connector sections are opaque to the supervisor; external surfaces
    // read them through the resolved config.
    #[serde(default)]
    pub web: Option<serde_yaml::Value>,
    #[serde(default)]
    pub chat: Option<serde_yaml::Value>,
    #[serde(default)]
    pub webhooks: Option<serde_yaml::Value>,
    #[serde(default)]
    pub docker: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FleetMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentRef {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetRef {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RetentionRaw {
    #[serde(default)]
    pub max_jobs_per_agent: Option<usize>,
    #[serde(default)]
    pub max_total_jobs: Option<usize>,
}

/// One agent definition file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentFile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub schedules: BTreeMap<String, RawSchedule>,
    #[serde(default)]
    pub permissions: Option<RawPermissions>,
    #[serde(default)]
    pub runtime: Option<RuntimeKind>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub docker: Option<DockerSettings>,
    #[serde(default)]
    pub session: Option<RawSession>,
    #[serde(default)]
    pub chat: Option<serde_yaml::Value>,
    #[serde(default)]
    pub max_concurrent: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawPermissions {
    #[serde(default)]
    pub mode: Option<PermissionMode>,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawSession {
    /// Per-job deadline, e.g. `30m` or `1h`.
    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSchedule {
    #[serde(rename = "type")]
    pub kind: RawScheduleKind,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawScheduleKind {
    Interval,
    Cron,
    Webhook,
    Chat,
}
