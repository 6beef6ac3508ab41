// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job history retention.
//!
//! Applied after each job completion and on supervisor idle ticks: first
//! the per-agent cap, then the optional fleet-wide cap. Only terminal
//! jobs are eligible; deletion removes metadata and transcript, oldest
//! first by `started_at`.

use crate::filter::JobFilter;
use crate::store::StateStore;
use herd_core::job::Job;
use std::collections::BTreeMap;

/// Retention caps. `max_jobs_per_agent` defaults to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionLimits {
    pub max_jobs_per_agent: usize,
    pub max_total_jobs: Option<usize>,
}

impl Default for RetentionLimits {
    fn default() -> Self {
        Self { max_jobs_per_agent: 100, max_total_jobs: None }
    }
}

impl RetentionLimits {
    /// Prune terminal jobs beyond the caps. Returns how many were deleted.
    ///
    /// Individual delete failures are logged and skipped; retention is
    /// background work and must not stop the supervisor.
    pub fn apply(&self, store: &StateStore) -> usize {
        let listing = store.list_jobs(&JobFilter::default());

        // Newest first from the store; keep only terminal jobs.
        let mut terminal: Vec<Job> = listing.jobs.into_iter().filter(Job::is_terminal).collect();

        let mut doomed: Vec<Job> = Vec::new();

        let mut by_agent: BTreeMap<String, Vec<Job>> = BTreeMap::new();
        for job in terminal.drain(..) {
            by_agent.entry(job.agent.clone()).or_default().push(job);
        }
        let mut survivors: Vec<Job> = Vec::new();
        for (_, jobs) in by_agent {
            for (index, job) in jobs.into_iter().enumerate() {
                if index < self.max_jobs_per_agent {
                    survivors.push(job);
                } else {
                    doomed.push(job);
                }
            }
        }

        if let Some(max_total) = self.max_total_jobs {
            // Oldest overall past the fleet-wide cap.
            survivors.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            if survivors.len() > max_total {
                doomed.extend(survivors.split_off(max_total));
            }
        }

        let mut deleted = 0;
        for job in doomed {
            match store.delete_job(&job.id) {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(job_id = %job.id, error = %e, "retention delete failed");
                }
            }
        }
        deleted
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
