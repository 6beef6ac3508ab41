// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job history filtering and pagination.

use chrono::{DateTime, Utc};
use herd_core::job::{Job, JobStatus};

/// Filter applied by [`crate::StateStore::list_jobs`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    /// Qualified agent name, matched exactly.
    pub agent: Option<String>,
    pub status: Option<JobStatus>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        if self.agent.as_deref().is_some_and(|a| a != job.agent) {
            return false;
        }
        if self.status.is_some_and(|s| s != job.status) {
            return false;
        }
        if self.started_after.is_some_and(|t| job.started_at <= t) {
            return false;
        }
        if self.started_before.is_some_and(|t| job.started_at >= t) {
            return false;
        }
        true
    }
}

/// Result of a job listing.
#[derive(Debug, Clone, Default)]
pub struct JobListing {
    /// Matching jobs, newest first, after offset/limit.
    pub jobs: Vec<Job>,
    /// Matching jobs before pagination.
    pub total: usize,
    /// Metadata files that could not be read or parsed.
    pub unreadable: usize,
}
