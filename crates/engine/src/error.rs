// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operational errors returned to external callers.
//!
//! Lookup failures and state-machine misuse carry enough context to
//! render an actionable message (available names, limits). Background
//! failures never surface here; they are logged and swallowed.

use crate::runtime::RuntimeError;
use crate::supervisor::Phase;
use herd_config::ConfigurationError;
use herd_core::id::JobId;
use herd_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid state: {operation} requires {expected}, supervisor is {actual}")]
    InvalidState {
        operation: &'static str,
        expected: &'static str,
        actual: Phase,
    },

    #[error("agent {name:?} not found (available: {})", available.join(", "))]
    AgentNotFound { name: String, available: Vec<String> },

    #[error("schedule {schedule:?} not found on agent {agent:?}")]
    ScheduleNotFound { agent: String, schedule: String },

    #[error("job {0} not found")]
    JobNotFound(String),

    #[error("agent {agent:?} at concurrency limit ({current_jobs}/{limit})")]
    ConcurrencyLimit {
        agent: String,
        limit: u32,
        current_jobs: u32,
    },

    #[error("queue full for agent {agent:?}")]
    QueueFull { agent: String },

    #[error("agent {agent:?} is disabled")]
    AgentDisabled { agent: String },

    #[error("cannot cancel job {job_id}: {reason}")]
    JobCancel { job_id: JobId, reason: String },

    #[error("cannot fork job {job_id}: {reason}")]
    JobFork { job_id: JobId, reason: String },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
