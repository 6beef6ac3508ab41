// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives one admitted job from pending metadata to a terminal state.
//!
//! Per job, subscribers observe `job:created`, then `job:output` per
//! message, then exactly one terminal event. The executor exclusively
//! owns the job's transcript writer and state entries until terminal.

use crate::events::EventBus;
use crate::queue::{JobQueue, QueuedJob};
use crate::runtime::{AgentRuntime, RunOutcome, RuntimeEvent, RuntimeRequest};
use herd_core::agent::AgentSpec;
use herd_core::clock::Clock;
use herd_core::event::Event;
use herd_core::job::{ExitReason, Job, JobStatus};
use herd_core::message::TranscriptMessage;
use herd_core::state::AgentStatus;
use herd_storage::{RetentionLimits, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long a cancelled runtime gets to flush and exit before the
/// executor finalizes without it.
pub const FORCE_KILL_GRACE: Duration = Duration::from_secs(10);

enum DrainEnd {
    Finished,
    Cancelled,
    TimedOut,
}

/// Shared handles an executor needs; cheap to clone per job.
pub struct JobExecutor<C: Clock> {
    pub store: Arc<StateStore>,
    pub bus: Arc<EventBus>,
    pub queue: Arc<JobQueue>,
    pub runtime: Arc<dyn AgentRuntime>,
    pub retention: RetentionLimits,
    pub clock: C,
}

impl<C: Clock> Clone for JobExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            bus: self.bus.clone(),
            queue: self.queue.clone(),
            runtime: self.runtime.clone(),
            retention: self.retention,
            clock: self.clock.clone(),
        }
    }
}

impl<C: Clock> JobExecutor<C> {
    /// Run one admitted request to completion. Never panics or errors
    /// out: every failure path lands the job in a terminal state.
    pub async fn execute(
        &self,
        agent: &AgentSpec,
        request: QueuedJob,
        cancel: CancellationToken,
    ) -> Job {
        let mut job = Job::pending(
            request.job_id.clone(),
            agent.qualified_name.clone(),
            request.trigger,
            &self.clock,
        );
        job.schedule = request.schedule.clone();
        job.forked_from = request.forked_from.clone();

        let schedule_prompt = request
            .schedule
            .as_deref()
            .and_then(|name| agent.schedule(name))
            .and_then(|spec| spec.prompt.clone());
        job.prompt = request.prompt_override.clone().or(schedule_prompt);

        if let Err(e) = self.store.write_job(&job) {
            tracing::warn!(job_id = %job.id, error = %e, "cannot write pending job");
        }
        if let Err(e) = self.store.create_transcript(&job.id) {
            tracing::warn!(job_id = %job.id, error = %e, "cannot create transcript");
        }

        self.mark_agent_running(agent, &job);

        self.bus.emit(Event::JobCreated {
            job: job.clone(),
            agent: agent.qualified_name.clone(),
            schedule: request.schedule.clone(),
        });
        if let Some(parent) = &job.forked_from {
            self.bus.emit(Event::JobForked { parent: parent.clone(), child: job.clone() });
        }

        job.status = JobStatus::Running;
        if let Err(e) = self.store.write_job(&job) {
            tracing::warn!(job_id = %job.id, error = %e, "cannot persist running status");
        }

        let runtime_cancel = cancel.child_token();
        let run = self
            .runtime
            .run(
                RuntimeRequest {
                    agent: agent.clone(),
                    job_id: job.id.clone(),
                    prompt: job.prompt.clone(),
                    resume_session: request.resume_session.clone(),
                    sessions_dir: self.store.paths().sessions_dir(),
                },
                runtime_cancel.clone(),
            )
            .await;

        let mut rx = match run {
            Ok(rx) => rx,
            Err(e) => {
                job.finalize(JobStatus::Failed, ExitReason::Error, self.clock.now_utc());
                self.persist_and_emit_terminal(agent, &mut job, Some(e.to_string()));
                return job;
            }
        };

        let mut last_error: Option<String> = None;
        let mut outcome: Option<RunOutcome> = None;

        let end = {
            let drain = async {
                while let Some(event) = rx.recv().await {
                    match event {
                        RuntimeEvent::Session { session_id } => {
                            job.session_id = Some(session_id);
                            if let Err(e) = self.store.write_job(&job) {
                                tracing::warn!(job_id = %job.id, error = %e, "cannot persist session id");
                            }
                        }
                        RuntimeEvent::Message(message) => {
                            if let TranscriptMessage::Error { message: text, .. } = &message {
                                last_error = Some(text.clone());
                            }
                            if let Err(e) = self.store.append_job_output(&job.id, &message) {
                                tracing::warn!(job_id = %job.id, error = %e, "cannot append output");
                            }
                            self.bus.emit(Event::JobOutput {
                                job_id: job.id.clone(),
                                agent: job.agent.clone(),
                                message_type: message.kind().to_string(),
                                output: message,
                            });
                        }
                        RuntimeEvent::Done(done) => outcome = Some(done),
                    }
                }
            };
            tokio::pin!(drain);

            let deadline = async {
                match agent.session.timeout {
                    Some(timeout) => tokio::time::sleep(timeout).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let first = tokio::select! {
                _ = &mut drain => DrainEnd::Finished,
                _ = cancel.cancelled() => DrainEnd::Cancelled,
                _ = deadline => DrainEnd::TimedOut,
            };
            match first {
                DrainEnd::Finished => DrainEnd::Finished,
                other => {
                    // Signal the runtime; give it the grace window to
                    // flush what it has, then finalize regardless.
                    runtime_cancel.cancel();
                    let _ = tokio::time::timeout(FORCE_KILL_GRACE, &mut drain).await;
                    other
                }
            }
        };
        drop(rx);

        let now = self.clock.now_utc();
        let error = match end {
            DrainEnd::Cancelled => {
                job.finalize(JobStatus::Cancelled, ExitReason::Cancelled, now);
                None
            }
            DrainEnd::TimedOut => {
                job.finalize(JobStatus::Failed, ExitReason::Timeout, now);
                Some("deadline exceeded".to_string())
            }
            DrainEnd::Finished => match last_error {
                Some(error) => {
                    job.finalize(JobStatus::Failed, ExitReason::Error, now);
                    Some(error)
                }
                None => {
                    let reason = match outcome {
                        Some(RunOutcome::MaxTurns) => ExitReason::MaxTurns,
                        _ => ExitReason::Success,
                    };
                    job.finalize(JobStatus::Completed, reason, now);
                    None
                }
            },
        };

        self.persist_and_emit_terminal(agent, &mut job, error);
        job
    }

    fn mark_agent_running(&self, agent: &AgentSpec, job: &Job) {
        let mut was_idle = false;
        let schedule = job.schedule.clone();
        let job_id = job.id.clone();
        let update = self.store.update_fleet_state(|fleet| {
            let state = fleet.agent_mut(&agent.qualified_name);
            was_idle = state.status != AgentStatus::Running;
            state.status = AgentStatus::Running;
            state.current_job = Some(job_id);
            state.error_message = None;
            if let Some(name) = &schedule {
                state.schedule_mut(name).status = herd_core::schedule::ScheduleStatus::Running;
            }
        });
        if let Err(e) = update {
            tracing::warn!(agent = %agent.qualified_name, error = %e, "cannot mark agent running");
        }
        if was_idle {
            self.bus.emit(Event::AgentStarted { agent: agent.qualified_name.clone() });
        }
    }

    /// Persist the terminal job, emit its terminal event, release the
    /// queue slot, settle agent state, and apply retention.
    fn persist_and_emit_terminal(&self, agent: &AgentSpec, job: &mut Job, error: Option<String>) {
        if let Err(e) = self.store.write_job(job) {
            tracing::warn!(job_id = %job.id, error = %e, "cannot persist terminal job");
        }

        match (job.status, &error) {
            (JobStatus::Cancelled, _) => self.bus.emit(Event::JobCancelled { job: job.clone() }),
            (JobStatus::Failed, Some(message)) => self.bus.emit(Event::JobFailed {
                job: job.clone(),
                error: message.clone(),
            }),
            (JobStatus::Failed, None) => self.bus.emit(Event::JobFailed {
                job: job.clone(),
                error: "job failed".to_string(),
            }),
            _ => self.bus.emit(Event::JobCompleted { job: job.clone() }),
        }

        self.queue.signal_completed(&agent.qualified_name);
        let still_running = self.queue.running_count(&agent.qualified_name) > 0;

        let job_id = job.id.clone();
        let schedule = job.schedule.clone();
        let failed = job.status == JobStatus::Failed;
        let error_for_state = error.clone();
        let update = self.store.update_fleet_state(|fleet| {
            let state = fleet.agent_mut(&agent.qualified_name);
            if state.current_job.as_ref() == Some(&job_id) {
                state.current_job = None;
            }
            state.last_job_id = Some(job_id.clone());
            if !still_running {
                if failed {
                    state.status = AgentStatus::Error;
                    state.error_message = error_for_state.clone();
                } else {
                    state.status = AgentStatus::Idle;
                    state.error_message = None;
                }
            }
            if let Some(name) = &schedule {
                let slot = state.schedule_mut(name);
                slot.status = herd_core::schedule::ScheduleStatus::Idle;
                slot.last_error = error_for_state.clone();
            }
        });
        if let Err(e) = update {
            tracing::warn!(agent = %agent.qualified_name, error = %e, "cannot settle agent state");
        }

        if !still_running {
            self.bus.emit(Event::AgentStopped { agent: agent.qualified_name.clone() });
        }

        let deleted = self.retention.apply(&self.store);
        if deleted > 0 {
            tracing::debug!(deleted, "retention pruned job history");
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
