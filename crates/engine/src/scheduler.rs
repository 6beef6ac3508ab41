// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tick-driven schedule evaluator.
//!
//! Every tick walks each timed `(agent, schedule)` pair, skips disabled
//! ones, and decides due-ness. A due schedule's `last_run_at` and
//! `next_run_at` are persisted atomically *before* the due trigger is
//! observable anywhere, so a crash mid-tick can never double-fire.

use crate::events::EventBus;
use chrono::{DateTime, Local, Utc};
use herd_config::ResolvedConfig;
use herd_core::clock::Clock;
use herd_core::event::Event;
use herd_core::schedule::{ScheduleKind, ScheduleState, ScheduleStatus};
use herd_storage::StateStore;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default wall period between ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(5);

/// A schedule that came due on a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueTrigger {
    pub agent: String,
    pub schedule: String,
    /// `interval` or `cron`.
    pub reason: &'static str,
}

pub struct Scheduler<C: Clock> {
    store: Arc<StateStore>,
    clock: C,
    /// Immutable config snapshot; swapped wholesale on reload.
    config: RwLock<Arc<ResolvedConfig>>,
    /// Wall-clock instant of supervisor start; the cron search base and
    /// the interval first-fire anchor.
    started_at: RwLock<DateTime<Utc>>,
    tick_period: Duration,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(
        store: Arc<StateStore>,
        config: Arc<ResolvedConfig>,
        clock: C,
        tick_period: Duration,
    ) -> Self {
        let started_at = clock.now_utc();
        Self {
            store,
            clock,
            config: RwLock::new(config),
            started_at: RwLock::new(started_at),
            tick_period,
        }
    }

    /// Swap in a reloaded config snapshot.
    pub fn set_config(&self, config: Arc<ResolvedConfig>) {
        *self.config.write() = config;
    }

    pub fn mark_started(&self) {
        *self.started_at.write() = self.clock.now_utc();
    }

    /// Evaluate one tick. Persists schedule state for every due pair,
    /// then returns the triggers for the supervisor to route.
    pub fn tick_once(&self) -> Vec<DueTrigger> {
        let config = self.config.read().clone();
        let started_at = *self.started_at.read();
        let now = self.clock.now_utc();
        let fleet = self.store.read_fleet_state();
        let mut due = Vec::new();

        for agent in &config.agents {
            for (name, spec) in &agent.schedules {
                if !spec.kind.is_timed() {
                    continue;
                }
                let state = fleet
                    .agent(&agent.qualified_name)
                    .and_then(|a| a.schedule(name))
                    .cloned()
                    .unwrap_or_default();
                if state.status == ScheduleStatus::Disabled {
                    continue;
                }

                let fire = match &spec.kind {
                    ScheduleKind::Interval { every } => {
                        if interval_due(&state, *every, now, started_at) {
                            let every = chrono::Duration::from_std(*every)
                                .unwrap_or(chrono::Duration::zero());
                            Some((now + every, "interval"))
                        } else {
                            None
                        }
                    }
                    ScheduleKind::Cron { expression } => {
                        let base = state.last_run_at.unwrap_or(started_at);
                        let next = expression.next_after(base.with_timezone(&Local));
                        match next {
                            Some(next) if next.with_timezone(&Utc) <= now => {
                                let upcoming = expression
                                    .next_after(now.with_timezone(&Local))
                                    .map(|n| n.with_timezone(&Utc))
                                    .unwrap_or(now);
                                Some((upcoming, "cron"))
                            }
                            _ => None,
                        }
                    }
                    ScheduleKind::Webhook | ScheduleKind::Chat => None,
                };

                let Some((next_run_at, reason)) = fire else {
                    continue;
                };

                // Persist before the trigger escapes this function.
                let update =
                    self.store
                        .update_agent_state(&agent.qualified_name, |agent_state| {
                            let slot = agent_state.schedule_mut(name);
                            slot.last_run_at = Some(now);
                            slot.next_run_at = Some(next_run_at);
                        });
                match update {
                    Ok(_) => due.push(DueTrigger {
                        agent: agent.qualified_name.clone(),
                        schedule: name.clone(),
                        reason,
                    }),
                    Err(e) => {
                        // A write failure skips this fire; the schedule
                        // stays due and retries next tick.
                        tracing::warn!(
                            agent = %agent.qualified_name,
                            schedule = %name,
                            error = %e,
                            "cannot persist schedule state, skipping fire"
                        );
                    }
                }
            }
        }

        due
    }

    /// Tick loop. Each batch of due triggers goes to `due_tx`; send
    /// failures mean the supervisor is gone and the loop exits.
    pub async fn run(
        self: Arc<Self>,
        due_tx: mpsc::UnboundedSender<DueTrigger>,
        bus: Arc<EventBus>,
        shutdown: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            for trigger in self.tick_once() {
                bus.emit(Event::ScheduleTriggered {
                    agent: trigger.agent.clone(),
                    schedule: trigger.schedule.clone(),
                    reason: trigger.reason.to_string(),
                });
                if due_tx.send(trigger).is_err() {
                    return;
                }
            }
        }
    }
}

/// Interval due rule: one period must elapse since the anchor, which is
/// the last fire or, for a schedule that has never run, supervisor
/// start. With the default tick period a fresh schedule fires on the
/// first tick that is at least one interval after start.
fn interval_due(
    state: &ScheduleState,
    every: Duration,
    now: DateTime<Utc>,
    started_at: DateTime<Utc>,
) -> bool {
    let anchor = state.last_run_at.unwrap_or(started_at);
    let every = chrono::Duration::from_std(every).unwrap_or(chrono::Duration::zero());
    now >= anchor + every
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
