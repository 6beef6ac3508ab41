// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolved agent specifications.
//!
//! These are the immutable value types produced by config load. Agents are
//! created by a load and destroyed by a reload; jobs outlive their agent.

use crate::schedule::ScheduleSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Tool-permission posture for an agent's runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PermissionMode {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "acceptEdits")]
    AcceptEdits,
    #[serde(rename = "bypassPermissions")]
    BypassPermissions,
    #[serde(rename = "plan")]
    Plan,
}

crate::simple_display! {
    PermissionMode {
        Default => "default",
        AcceptEdits => "acceptEdits",
        BypassPermissions => "bypassPermissions",
        Plan => "plan",
    }
}

/// Which runtime flavor executes the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Sdk,
    Cli,
}

crate::simple_display! {
    RuntimeKind {
        Sdk => "sdk",
        Cli => "cli",
    }
}

/// Container settings passed through to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DockerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// Session policy: per-job deadline and resume behavior.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionPolicy {
    /// Hard deadline for one job, measured from `job:created`.
    pub timeout: Option<Duration>,
}

/// A fully resolved agent: identity plus everything the executor needs.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSpec {
    pub local_name: String,
    /// Fleet chain from the root (exclusive) down to this agent's parent.
    pub fleet_path: Vec<String>,
    /// `fleet_path` joined with `.`, then the local name. Globally unique.
    pub qualified_name: String,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub permission_mode: PermissionMode,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub runtime: RuntimeKind,
    pub docker: Option<DockerSettings>,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    pub session: SessionPolicy,
    /// Maximum simultaneously running jobs for this agent.
    pub max_concurrent: u32,
    pub schedules: BTreeMap<String, ScheduleSpec>,
}

impl AgentSpec {
    pub fn schedule(&self, name: &str) -> Option<&ScheduleSpec> {
        self.schedules.get(name)
    }
}

crate::builder! {
    pub struct AgentSpecBuilder => AgentSpec {
        into {
            local_name: String = "worker",
            qualified_name: String = "worker",
        }
        set {
            fleet_path: Vec<String> = Vec::new(),
            permission_mode: PermissionMode = PermissionMode::Default,
            allowed_tools: Vec<String> = Vec::new(),
            disallowed_tools: Vec<String> = Vec::new(),
            runtime: RuntimeKind = RuntimeKind::Sdk,
            session: SessionPolicy = SessionPolicy::default(),
            max_concurrent: u32 = 1,
            schedules: BTreeMap<String, ScheduleSpec> = BTreeMap::new(),
        }
        option {
            description: String = None,
            system_prompt: String = None,
            docker: DockerSettings = None,
            model: String = None,
            max_turns: u32 = None,
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
