// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor's event surface.
//!
//! Serializes with `{"type": "kind:verb", ...fields}` format. For any one
//! job, subscribers observe `job:created`, then zero or more `job:output`,
//! then exactly one of `job:completed` / `job:failed` / `job:cancelled`.
//! There is no ordering guarantee across jobs.

use crate::id::JobId;
use crate::job::Job;
use crate::message::TranscriptMessage;
use serde::{Deserialize, Serialize};

/// Change set attached to `config:reloaded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReloadSummary {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modified: Vec<String>,
}

impl ReloadSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Events fanned out to supervisor subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "initialized")]
    Initialized { agent_count: usize },

    #[serde(rename = "started")]
    Started,

    #[serde(rename = "stopped")]
    Stopped,

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "config:reloaded")]
    ConfigReloaded { changes: ReloadSummary },

    #[serde(rename = "agent:started")]
    AgentStarted { agent: String },

    #[serde(rename = "agent:stopped")]
    AgentStopped { agent: String },

    #[serde(rename = "schedule:triggered")]
    ScheduleTriggered {
        agent: String,
        schedule: String,
        /// `interval` or `cron` for timed fires; `webhook`/`chat` for kicks.
        reason: String,
    },

    #[serde(rename = "schedule:skipped")]
    ScheduleSkipped {
        agent: String,
        schedule: String,
        reason: String,
    },

    #[serde(rename = "job:created")]
    JobCreated {
        job: Job,
        agent: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schedule: Option<String>,
    },

    #[serde(rename = "job:output")]
    JobOutput {
        job_id: JobId,
        agent: String,
        output: TranscriptMessage,
        message_type: String,
    },

    #[serde(rename = "job:completed")]
    JobCompleted { job: Job },

    #[serde(rename = "job:failed")]
    JobFailed { job: Job, error: String },

    #[serde(rename = "job:cancelled")]
    JobCancelled { job: Job },

    #[serde(rename = "job:forked")]
    JobForked { parent: JobId, child: Job },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Initialized { .. } => "initialized",
            Event::Started => "started",
            Event::Stopped => "stopped",
            Event::Error { .. } => "error",
            Event::ConfigReloaded { .. } => "config:reloaded",
            Event::AgentStarted { .. } => "agent:started",
            Event::AgentStopped { .. } => "agent:stopped",
            Event::ScheduleTriggered { .. } => "schedule:triggered",
            Event::ScheduleSkipped { .. } => "schedule:skipped",
            Event::JobCreated { .. } => "job:created",
            Event::JobOutput { .. } => "job:output",
            Event::JobCompleted { .. } => "job:completed",
            Event::JobFailed { .. } => "job:failed",
            Event::JobCancelled { .. } => "job:cancelled",
            Event::JobForked { .. } => "job:forked",
        }
    }

    /// High-volume events may be dropped oldest-first for slow subscribers.
    /// Low-volume lifecycle events never are.
    pub fn is_high_volume(&self) -> bool {
        matches!(self, Event::JobOutput { .. })
    }

    /// The job this event concerns, when it concerns one.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Event::JobCreated { job, .. }
            | Event::JobCompleted { job }
            | Event::JobFailed { job, .. }
            | Event::JobCancelled { job } => Some(&job.id),
            Event::JobOutput { job_id, .. } => Some(job_id),
            Event::JobForked { child, .. } => Some(&child.id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
