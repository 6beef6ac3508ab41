// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job metadata and its state machine.

use crate::clock::Clock;
use crate::id::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a job came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Schedule,
    Webhook,
    Chat,
    Fork,
}

crate::simple_display! {
    TriggerType {
        Manual => "manual",
        Schedule => "schedule",
        Webhook => "webhook",
        Chat => "chat",
        Fork => "fork",
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Why a job reached its terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Success,
    Error,
    Timeout,
    Cancelled,
    MaxTurns,
}

crate::simple_display! {
    ExitReason {
        Success => "success",
        Error => "error",
        Timeout => "timeout",
        Cancelled => "cancelled",
        MaxTurns => "max_turns",
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobValidationError {
    #[error("terminal job {0} is missing finished_at")]
    MissingFinishedAt(JobId),
    #[error("terminal job {0} is missing exit_reason")]
    MissingExitReason(JobId),
    #[error("job {0}: finished_at precedes started_at")]
    FinishedBeforeStarted(JobId),
    #[error("job {0}: negative duration_seconds")]
    NegativeDuration(JobId),
}

/// Durable metadata for one agent invocation.
///
/// Persisted as `<stateDir>/jobs/<id>.yaml`; the transcript lives next to
/// it as `<id>.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Qualified name of the agent that ran this job.
    pub agent: String,
    /// Schedule that fired it, when `trigger_type` is `schedule`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub trigger_type: TriggerType,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
    /// Assigned by the runtime once the underlying session exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<JobId>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Transcript file name, relative to the jobs directory.
    pub transcript: String,
}

impl Job {
    /// Create a pending job record.
    pub fn pending(
        id: JobId,
        agent: impl Into<String>,
        trigger_type: TriggerType,
        clock: &impl Clock,
    ) -> Self {
        let transcript = format!("{id}.jsonl");
        Self {
            id,
            agent: agent.into(),
            schedule: None,
            trigger_type,
            status: JobStatus::Pending,
            exit_reason: None,
            session_id: None,
            forked_from: None,
            started_at: clock.now_utc(),
            finished_at: None,
            duration_seconds: None,
            prompt: None,
            summary: None,
            transcript,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition to a terminal status, stamping finish time and duration.
    ///
    /// `duration_seconds` is the whole-second floor of the wall-clock span.
    pub fn finalize(&mut self, status: JobStatus, reason: ExitReason, now: DateTime<Utc>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.exit_reason = Some(reason);
        self.finished_at = Some(now);
        self.duration_seconds = Some((now - self.started_at).num_seconds().max(0));
    }

    /// Check the terminal-state invariants.
    pub fn validate(&self) -> Result<(), JobValidationError> {
        if self.is_terminal() {
            let finished = self
                .finished_at
                .ok_or_else(|| JobValidationError::MissingFinishedAt(self.id.clone()))?;
            if self.exit_reason.is_none() {
                return Err(JobValidationError::MissingExitReason(self.id.clone()));
            }
            if finished < self.started_at {
                return Err(JobValidationError::FinishedBeforeStarted(self.id.clone()));
            }
        }
        if self.duration_seconds.is_some_and(|d| d < 0) {
            return Err(JobValidationError::NegativeDuration(self.id.clone()));
        }
        Ok(())
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            agent: String = "worker",
            transcript: String = "job-2024-01-15-abc123.jsonl",
        }
        set {
            id: JobId = match JobId::parse("job-2024-01-15-abc123") {
                Ok(id) => id,
                Err(_) => unreachable!("constant test id is valid"),
            },
            trigger_type: TriggerType = TriggerType::Manual,
            status: JobStatus = JobStatus::Pending,
            started_at: DateTime<Utc> = chrono::Utc::now(),
        }
        option {
            schedule: String = None,
            exit_reason: ExitReason = None,
            session_id: String = None,
            forked_from: JobId = None,
            finished_at: DateTime<Utc> = None,
            duration_seconds: i64 = None,
            prompt: String = None,
            summary: String = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
