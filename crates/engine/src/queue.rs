// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent admission control.
//!
//! One mutex covers every FIFO and running count; admission decisions
//! happen entirely under it and the lock is never held across I/O.
//! Within an agent's queue, `high` precedes `normal` precedes `low`,
//! ties broken by arrival order. Admission refuses outright once
//! `running + waiting` reaches the agent's `max_concurrent`, which is
//! what makes burst triggers deterministic.

use herd_core::agent::AgentSpec;
use herd_core::id::JobId;
use herd_core::job::TriggerType;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::Notify;

/// Default bound on one agent's waiting line.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Admission priority. Scheduled triggers default to `low`, manual and
/// chat to `normal`, forks to `high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn for_trigger(trigger: TriggerType) -> Self {
        match trigger {
            TriggerType::Fork => Priority::High,
            TriggerType::Manual | TriggerType::Chat => Priority::Normal,
            TriggerType::Schedule | TriggerType::Webhook => Priority::Low,
        }
    }
}

/// A request admitted to (or waiting in) the queue.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub agent: String,
    pub schedule: Option<String>,
    pub trigger: TriggerType,
    pub priority: Priority,
    pub prompt_override: Option<String>,
    pub forked_from: Option<JobId>,
    pub resume_session: Option<String>,
    seq: u64,
}

impl QueuedJob {
    pub fn new(job_id: JobId, agent: impl Into<String>, trigger: TriggerType) -> Self {
        Self {
            job_id,
            agent: agent.into(),
            schedule: None,
            trigger,
            priority: Priority::for_trigger(trigger),
            prompt_override: None,
            forked_from: None,
            resume_session: None,
            seq: 0,
        }
    }
}

/// Why a request was not admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AtCapacity { limit: u32, current: u32 },
    AgentNotFound,
    AgentDisabled,
    QueueFull,
}

impl SkipReason {
    /// Wire string used in `schedule:skipped` events.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AtCapacity { .. } => "at_capacity",
            SkipReason::AgentNotFound => "agent_not_found",
            SkipReason::AgentDisabled => "agent_disabled",
            SkipReason::QueueFull => "queue_full",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted { job_id: JobId },
    Skipped { reason: SkipReason },
}

struct AgentQueue {
    max_concurrent: u32,
    running: u32,
    waiting: Vec<QueuedJob>,
    /// Set when the agent was removed from config while jobs drain.
    disabled: bool,
}

struct QueueInner {
    agents: HashMap<String, AgentQueue>,
    depth: usize,
    seq: u64,
}

/// The in-memory job queue. Persists nothing.
pub struct JobQueue {
    inner: Mutex<QueueInner>,
    ready: Notify,
}

impl JobQueue {
    pub fn new(depth: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                agents: HashMap::new(),
                depth: depth.max(1),
                seq: 0,
            }),
            ready: Notify::new(),
        }
    }

    /// Install or refresh agent limits from a config snapshot. Running
    /// counts survive; agents no longer present are disabled until their
    /// jobs drain.
    pub fn configure(&self, agents: &[AgentSpec]) {
        let mut inner = self.inner.lock();
        for spec in agents {
            let entry = inner
                .agents
                .entry(spec.qualified_name.clone())
                .or_insert_with(|| AgentQueue {
                    max_concurrent: spec.max_concurrent,
                    running: 0,
                    waiting: Vec::new(),
                    disabled: false,
                });
            entry.max_concurrent = spec.max_concurrent;
            entry.disabled = false;
        }
        let keep: Vec<&str> = agents.iter().map(|a| a.qualified_name.as_str()).collect();
        inner.agents.retain(|name, queue| {
            if keep.contains(&name.as_str()) {
                true
            } else if queue.running > 0 {
                queue.disabled = true;
                queue.waiting.clear();
                true
            } else {
                false
            }
        });
        drop(inner);
        self.ready.notify_one();
    }

    /// Admit a request or refuse it with a reason.
    pub fn enqueue(&self, mut request: QueuedJob) -> EnqueueOutcome {
        let mut inner = self.inner.lock();
        inner.seq += 1;
        request.seq = inner.seq;
        let depth = inner.depth;

        let Some(queue) = inner.agents.get_mut(&request.agent) else {
            return EnqueueOutcome::Skipped { reason: SkipReason::AgentNotFound };
        };
        if queue.disabled {
            return EnqueueOutcome::Skipped { reason: SkipReason::AgentDisabled };
        }
        let occupied = queue.running + queue.waiting.len() as u32;
        if occupied >= queue.max_concurrent {
            return EnqueueOutcome::Skipped {
                reason: SkipReason::AtCapacity {
                    limit: queue.max_concurrent,
                    current: occupied,
                },
            };
        }
        if queue.waiting.len() >= depth {
            return EnqueueOutcome::Skipped { reason: SkipReason::QueueFull };
        }

        let job_id = request.job_id.clone();
        // Priority order, arrival order within a priority.
        let at = queue
            .waiting
            .iter()
            .position(|queued| queued.priority > request.priority)
            .unwrap_or(queue.waiting.len());
        queue.waiting.insert(at, request);
        drop(inner);
        self.ready.notify_one();
        EnqueueOutcome::Accepted { job_id }
    }

    /// Pop every request that can start now, bumping running counts.
    pub fn take_ready(&self) -> Vec<QueuedJob> {
        let mut inner = self.inner.lock();
        let mut ready = Vec::new();
        for queue in inner.agents.values_mut() {
            while queue.running < queue.max_concurrent && !queue.waiting.is_empty() {
                let request = queue.waiting.remove(0);
                queue.running += 1;
                ready.push(request);
            }
        }
        ready.sort_by_key(|r| (r.priority, r.seq));
        ready
    }

    /// A job finished: free its slot and wake the dispatcher so any
    /// waiter is promoted immediately.
    pub fn signal_completed(&self, agent: &str) {
        let mut inner = self.inner.lock();
        let mut remove = false;
        if let Some(queue) = inner.agents.get_mut(agent) {
            queue.running = queue.running.saturating_sub(1);
            remove = queue.disabled && queue.running == 0;
        }
        if remove {
            inner.agents.remove(agent);
        }
        drop(inner);
        self.ready.notify_one();
    }

    /// Wait until `take_ready` may return work.
    pub async fn ready(&self) {
        self.ready.notified().await;
    }

    pub fn running_count(&self, agent: &str) -> u32 {
        self.inner.lock().agents.get(agent).map(|q| q.running).unwrap_or(0)
    }

    /// Running plus waiting, as reported in capacity refusals.
    pub fn occupancy(&self, agent: &str) -> u32 {
        self.inner
            .lock()
            .agents
            .get(agent)
            .map(|q| q.running + q.waiting.len() as u32)
            .unwrap_or(0)
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_DEPTH)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
