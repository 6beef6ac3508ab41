// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level lifecycle: owns every component, routes triggers, fans out
//! events.
//!
//! ```text
//! uninitialized -> initialized      (initialize)
//! initialized   -> running          (start)
//! running       -> stopped          (stop)
//! any           -> error            (unrecoverable init failure)
//! ```
//!
//! `reload` re-reads config in place: the scheduler swaps to the new
//! snapshot, removed agents stop scheduling while their running jobs
//! drain, and modified agents pick up new settings on their next
//! admission.

use crate::error::SupervisorError;
use crate::events::{EventBus, EventStream};
use crate::executor::JobExecutor;
use crate::queue::{EnqueueOutcome, JobQueue, QueuedJob, SkipReason};
use crate::runtime::AgentRuntime;
use crate::scheduler::{DueTrigger, Scheduler, DEFAULT_TICK_PERIOD};
use crate::stream::JobOutputStream;
use chrono::{DateTime, Utc};
use herd_config::{compute_config_changes, ConfigChanges, LoadOptions, ResolvedConfig};
use herd_core::agent::AgentSpec;
use herd_core::clock::{Clock, SystemClock};
use herd_core::event::Event;
use herd_core::id::JobId;
use herd_core::job::{Job, TriggerType};
use herd_core::message::TranscriptMessage;
use herd_core::schedule::{ScheduleState, ScheduleStatus};
use herd_core::state::AgentStatus;
use herd_storage::{JobFilter, JobListing, RetentionLimits, StateStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
    Error,
}

herd_core::simple_display! {
    Phase {
        Uninitialized => "uninitialized",
        Initialized => "initialized",
        Running => "running",
        Stopped => "stopped",
        Error => "error",
    }
}

/// Construction-time knobs.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub config_path: PathBuf,
    pub state_dir: PathBuf,
    pub load: LoadOptions,
    pub tick_period: Duration,
    pub queue_depth: usize,
}

impl SupervisorOptions {
    pub fn new(config_path: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            state_dir: state_dir.into(),
            load: LoadOptions::default(),
            tick_period: DEFAULT_TICK_PERIOD,
            queue_depth: crate::queue::DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// Options for `stop`.
#[derive(Debug, Clone, Copy)]
pub struct StopOptions {
    /// How long to wait for running jobs before giving up (default 30 s).
    pub timeout: Duration,
    /// Cancel survivors once the timeout elapses.
    pub cancel_on_timeout: bool,
}

impl Default for StopOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), cancel_on_timeout: true }
    }
}

/// Options for `trigger`.
#[derive(Debug, Clone, Default)]
pub struct TriggerOptions {
    pub prompt: Option<String>,
    /// Connectors set `webhook`/`chat`; defaults to `manual`.
    pub trigger_type: Option<TriggerType>,
}

/// Successful admission of a trigger or fork.
#[derive(Debug, Clone)]
pub struct TriggerResult {
    pub job_id: JobId,
    pub agent_name: String,
    pub schedule_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub prompt: Option<String>,
}

/// Modifications applied to a fork.
#[derive(Debug, Clone, Default)]
pub struct ForkOptions {
    /// Override; absent means inherit the parent's prompt.
    pub prompt: Option<String>,
}

/// One schedule's spec plus durable state, as surfaced to callers.
#[derive(Debug, Clone)]
pub struct ScheduleInfo {
    pub agent: String,
    pub name: String,
    /// `interval`, `cron`, `webhook`, or `chat`.
    pub kind: &'static str,
    pub status: ScheduleStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// One agent's spec plus durable state.
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub qualified_name: String,
    pub local_name: String,
    pub description: Option<String>,
    pub status: AgentStatus,
    pub current_job: Option<JobId>,
    pub last_job_id: Option<JobId>,
    pub max_concurrent: u32,
    pub schedules: Vec<ScheduleInfo>,
}

/// Whole-fleet snapshot.
#[derive(Debug, Clone)]
pub struct FleetStatus {
    pub phase: Phase,
    pub started_at: Option<DateTime<Utc>>,
    pub agents: Vec<AgentInfo>,
}

/// `get_job` result.
#[derive(Debug, Clone)]
pub struct JobDetails {
    pub job: Job,
    pub output: Option<Vec<TranscriptMessage>>,
}

struct RunningEntry {
    agent: String,
    schedule: Option<String>,
    cancel: CancellationToken,
}

pub struct FleetSupervisor<C: Clock = SystemClock> {
    options: SupervisorOptions,
    clock: C,
    runtime: Arc<dyn AgentRuntime>,
    phase: Mutex<Phase>,
    store: Mutex<Option<Arc<StateStore>>>,
    config: Mutex<Option<Arc<ResolvedConfig>>>,
    scheduler: Mutex<Option<Arc<Scheduler<C>>>>,
    queue: Arc<JobQueue>,
    bus: Arc<EventBus>,
    running: Arc<Mutex<HashMap<JobId, RunningEntry>>>,
    /// Signalled whenever a job leaves the running set.
    jobs_settled: Arc<Notify>,
    shutdown: Mutex<Option<CancellationToken>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl FleetSupervisor<SystemClock> {
    pub fn new(options: SupervisorOptions, runtime: Arc<dyn AgentRuntime>) -> Self {
        Self::with_clock(options, runtime, SystemClock)
    }
}

impl<C: Clock> FleetSupervisor<C> {
    pub fn with_clock(options: SupervisorOptions, runtime: Arc<dyn AgentRuntime>, clock: C) -> Self {
        let queue = Arc::new(JobQueue::new(options.queue_depth));
        Self {
            options,
            clock,
            runtime,
            phase: Mutex::new(Phase::Uninitialized),
            store: Mutex::new(None),
            config: Mutex::new(None),
            scheduler: Mutex::new(None),
            queue,
            bus: Arc::new(EventBus::new()),
            running: Arc::new(Mutex::new(HashMap::new())),
            jobs_settled: Arc::new(Notify::new()),
            shutdown: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Subscribe to the event surface. Slow subscribers lose oldest
    /// `job:output` entries first; lifecycle events are never dropped.
    pub fn subscribe(&self) -> EventStream {
        self.bus.subscribe()
    }

    // -- lifecycle --

    /// Load config, open the state directory, construct components.
    pub fn initialize(&self) -> Result<(), SupervisorError> {
        {
            let phase = *self.phase.lock();
            if !matches!(phase, Phase::Uninitialized | Phase::Stopped) {
                return Err(SupervisorError::InvalidState {
                    operation: "initialize",
                    expected: "uninitialized",
                    actual: phase,
                });
            }
        }

        let config = match herd_config::load(&self.options.config_path, &self.options.load) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                *self.phase.lock() = Phase::Error;
                self.bus.emit(Event::Error { message: e.to_string() });
                return Err(e.into());
            }
        };

        let store = match StateStore::open(&self.options.state_dir) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                *self.phase.lock() = Phase::Error;
                self.bus.emit(Event::Error { message: e.to_string() });
                return Err(e.into());
            }
        };

        self.queue.configure(&config.agents);
        self.seed_agent_states(&store, &config)?;

        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            config.clone(),
            self.clock.clone(),
            self.options.tick_period,
        ));

        let agent_count = config.agents.len();
        *self.store.lock() = Some(store);
        *self.config.lock() = Some(config);
        *self.scheduler.lock() = Some(scheduler);
        *self.phase.lock() = Phase::Initialized;
        self.bus.emit(Event::Initialized { agent_count });
        tracing::info!(agent_count, "supervisor initialized");
        Ok(())
    }

    /// Ensure every configured agent and schedule has a state entry.
    fn seed_agent_states(
        &self,
        store: &StateStore,
        config: &ResolvedConfig,
    ) -> Result<(), SupervisorError> {
        store.update_fleet_state(|fleet| {
            for agent in &config.agents {
                let entry = fleet.agent_mut(&agent.qualified_name);
                for name in agent.schedules.keys() {
                    entry.schedule_mut(name);
                }
            }
        })?;
        Ok(())
    }

    /// Begin scheduler ticks and event routing.
    pub fn start(self: &Arc<Self>) -> Result<(), SupervisorError> {
        {
            let mut phase = self.phase.lock();
            if *phase != Phase::Initialized {
                return Err(SupervisorError::InvalidState {
                    operation: "start",
                    expected: "initialized",
                    actual: *phase,
                });
            }
            *phase = Phase::Running;
        }

        let store = self.store_handle()?;
        let scheduler = self.scheduler_handle()?;

        let now = self.clock.now_utc();
        store.update_fleet_state(|fleet| fleet.started_at = Some(now))?;
        scheduler.mark_started();

        let shutdown = CancellationToken::new();
        *self.shutdown.lock() = Some(shutdown.clone());

        let (due_tx, mut due_rx) = mpsc::unbounded_channel::<DueTrigger>();

        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(scheduler.run(
            due_tx,
            self.bus.clone(),
            shutdown.child_token(),
        )));

        let router = {
            let this = self.clone();
            let shutdown = shutdown.child_token();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        due = due_rx.recv() => match due {
                            Some(due) => this.handle_due(due),
                            None => break,
                        },
                    }
                }
            })
        };
        tasks.push(router);

        let dispatcher = {
            let this = self.clone();
            let shutdown = shutdown.child_token();
            tokio::spawn(async move {
                let mut idle_tick = tokio::time::interval(Duration::from_secs(60));
                idle_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    for request in this.queue.take_ready() {
                        this.spawn_job(request);
                    }
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = this.queue.ready() => {}
                        _ = idle_tick.tick() => this.idle_retention(),
                    }
                }
            })
        };
        tasks.push(dispatcher);
        drop(tasks);

        self.bus.emit(Event::Started);
        tracing::info!("supervisor started");
        Ok(())
    }

    /// Stop scheduling, wait for running jobs, optionally cancel
    /// stragglers. Stopping a non-running supervisor is a no-op.
    pub async fn stop(&self, options: StopOptions) -> Result<(), SupervisorError> {
        {
            let mut phase = self.phase.lock();
            match *phase {
                Phase::Running => {}
                _ => return Ok(()),
            }
            *phase = Phase::Stopped;
        }

        if let Some(shutdown) = self.shutdown.lock().take() {
            shutdown.cancel();
        }

        let drained = self.wait_for_jobs(options.timeout).await;
        if !drained && options.cancel_on_timeout {
            tracing::warn!("stop timeout elapsed, cancelling running jobs");
            let tokens: Vec<CancellationToken> =
                self.running.lock().values().map(|e| e.cancel.clone()).collect();
            for token in tokens {
                token.cancel();
            }
            // Cancelled runtimes get the forced-kill grace, plus slack.
            self.wait_for_jobs(crate::executor::FORCE_KILL_GRACE + Duration::from_secs(5)).await;
        }

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if tokio::time::timeout(Duration::from_secs(1), task).await.is_err() {
                tracing::debug!("background task did not settle in time");
            }
        }

        self.bus.emit(Event::Stopped);
        self.bus.close();
        tracing::info!("supervisor stopped");
        Ok(())
    }

    async fn wait_for_jobs(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register before checking so a job settling in between
            // cannot be missed.
            let wait = self.jobs_settled.notified();
            if self.running.lock().is_empty() {
                return true;
            }
            if tokio::time::timeout_at(deadline, wait).await.is_err() {
                return self.running.lock().is_empty();
            }
        }
    }

    /// Re-read config and apply the difference without interrupting
    /// running jobs.
    pub fn reload(&self) -> Result<ConfigChanges, SupervisorError> {
        {
            let phase = *self.phase.lock();
            if !matches!(phase, Phase::Initialized | Phase::Running) {
                return Err(SupervisorError::InvalidState {
                    operation: "reload",
                    expected: "initialized or running",
                    actual: phase,
                });
            }
        }

        let new_config = Arc::new(herd_config::load(&self.options.config_path, &self.options.load)?);
        let old_config = self.config_handle()?;
        let store = self.store_handle()?;

        let changes = compute_config_changes(&old_config.agents, &new_config.agents);

        self.queue.configure(&new_config.agents);
        if let Some(scheduler) = self.scheduler.lock().as_ref() {
            scheduler.set_config(new_config.clone());
        }

        store.update_fleet_state(|fleet| {
            for removed in &changes.removed {
                fleet.agents.remove(&removed.qualified_name);
            }
            for agent in &new_config.agents {
                let entry = fleet.agent_mut(&agent.qualified_name);
                entry.schedules.retain(|name, _| agent.schedules.contains_key(name));
                for name in agent.schedules.keys() {
                    entry.schedule_mut(name);
                }
            }
        })?;

        *self.config.lock() = Some(new_config);

        let summary = changes.summary();
        tracing::info!(
            added = summary.added.len(),
            removed = summary.removed.len(),
            modified = summary.modified.len(),
            "config reloaded"
        );
        self.bus.emit(Event::ConfigReloaded { changes: summary });
        Ok(changes)
    }

    // -- trigger pipeline --

    fn handle_due(&self, due: DueTrigger) {
        // since_last rule: one job per (agent, schedule) at a time.
        let already_running = self
            .running
            .lock()
            .values()
            .any(|e| e.agent == due.agent && e.schedule.as_deref() == Some(&due.schedule));
        if already_running {
            self.bus.emit(Event::ScheduleSkipped {
                agent: due.agent,
                schedule: due.schedule,
                reason: "already_running".to_string(),
            });
            return;
        }

        let mut request =
            QueuedJob::new(JobId::new(&self.clock), due.agent.clone(), TriggerType::Schedule);
        request.schedule = Some(due.schedule.clone());

        match self.queue.enqueue(request) {
            EnqueueOutcome::Accepted { .. } => {}
            EnqueueOutcome::Skipped { reason } => {
                self.record_schedule_error(&due, &reason);
                self.bus.emit(Event::ScheduleSkipped {
                    agent: due.agent,
                    schedule: due.schedule,
                    reason: reason.as_str().to_string(),
                });
            }
        }
    }

    /// Lookup-style skips are recorded on the schedule; capacity skips
    /// are normal operation and are not.
    fn record_schedule_error(&self, due: &DueTrigger, reason: &SkipReason) {
        if matches!(reason, SkipReason::AtCapacity { .. }) {
            return;
        }
        if let Ok(store) = self.store_handle() {
            let result = store.update_agent_state(&due.agent, |agent| {
                agent.schedule_mut(&due.schedule).last_error =
                    Some(format!("trigger skipped: {}", reason.as_str()));
            });
            if let Err(e) = result {
                tracing::warn!(error = %e, "cannot record schedule error");
            }
        }
    }

    fn spawn_job(self: &Arc<Self>, request: QueuedJob) {
        let Some(agent) = self.config_agent(&request.agent) else {
            tracing::warn!(agent = %request.agent, "dispatched job for unknown agent");
            self.queue.signal_completed(&request.agent);
            return;
        };
        let (store, retention) = match (self.store_handle(), self.config_handle()) {
            (Ok(store), Ok(config)) => (
                store,
                RetentionLimits {
                    max_jobs_per_agent: config.retention.max_jobs_per_agent,
                    max_total_jobs: config.retention.max_total_jobs,
                },
            ),
            _ => {
                self.queue.signal_completed(&request.agent);
                return;
            }
        };

        let cancel = CancellationToken::new();
        self.running.lock().insert(
            request.job_id.clone(),
            RunningEntry {
                agent: request.agent.clone(),
                schedule: request.schedule.clone(),
                cancel: cancel.clone(),
            },
        );

        let executor = JobExecutor {
            store,
            bus: self.bus.clone(),
            queue: self.queue.clone(),
            runtime: self.runtime.clone(),
            retention,
            clock: self.clock.clone(),
        };
        let this = self.clone();
        let job_id = request.job_id.clone();
        tokio::spawn(async move {
            executor.execute(&agent, request, cancel).await;
            this.running.lock().remove(&job_id);
            this.jobs_settled.notify_waiters();
        });
    }

    fn idle_retention(&self) {
        if !self.running.lock().is_empty() {
            return;
        }
        let (Ok(store), Ok(config)) = (self.store_handle(), self.config_handle()) else {
            return;
        };
        let limits = RetentionLimits {
            max_jobs_per_agent: config.retention.max_jobs_per_agent,
            max_total_jobs: config.retention.max_total_jobs,
        };
        limits.apply(&store);
    }

    // -- public operations --

    /// Start a job for an agent, resolved by qualified name first, then
    /// by unambiguous local name.
    pub fn trigger(
        &self,
        agent_name: &str,
        schedule_name: Option<&str>,
        options: TriggerOptions,
    ) -> Result<TriggerResult, SupervisorError> {
        {
            let phase = *self.phase.lock();
            if phase != Phase::Running {
                return Err(SupervisorError::InvalidState {
                    operation: "trigger",
                    expected: "running",
                    actual: phase,
                });
            }
        }

        let agent = self.resolve_agent(agent_name)?;
        if let Some(schedule) = schedule_name {
            if agent.schedule(schedule).is_none() {
                return Err(SupervisorError::ScheduleNotFound {
                    agent: agent.qualified_name.clone(),
                    schedule: schedule.to_string(),
                });
            }
        }

        let trigger_type = options.trigger_type.unwrap_or(TriggerType::Manual);
        let mut request =
            QueuedJob::new(JobId::new(&self.clock), agent.qualified_name.clone(), trigger_type);
        request.schedule = schedule_name.map(str::to_string);
        request.prompt_override = options.prompt.clone();

        match self.queue.enqueue(request) {
            EnqueueOutcome::Accepted { job_id } => Ok(TriggerResult {
                job_id,
                agent_name: agent.qualified_name.clone(),
                schedule_name: schedule_name.map(str::to_string),
                started_at: self.clock.now_utc(),
                prompt: options.prompt,
            }),
            EnqueueOutcome::Skipped { reason } => {
                Err(self.skip_to_error(&agent.qualified_name, reason))
            }
        }
    }

    /// Cancel a running job. The runtime observes the signal at its next
    /// suspension point; the executor finalizes after it returns or after
    /// the forced-kill grace.
    pub fn cancel_job(&self, job_id: &JobId) -> Result<(), SupervisorError> {
        if let Some(entry) = self.running.lock().get(job_id) {
            entry.cancel.cancel();
            return Ok(());
        }
        let store = self.store_handle()?;
        match store.read_job(job_id) {
            Some(job) if job.is_terminal() => Err(SupervisorError::JobCancel {
                job_id: job_id.clone(),
                reason: format!("job already {}", job.status),
            }),
            Some(_) => Err(SupervisorError::JobCancel {
                job_id: job_id.clone(),
                reason: "job is not running".to_string(),
            }),
            None => Err(SupervisorError::JobNotFound(job_id.to_string())),
        }
    }

    /// Fork a job: a fresh high-priority job inheriting the parent's
    /// prompt (unless overridden) and resuming its session when one was
    /// recorded.
    pub fn fork_job(
        &self,
        parent_id: &JobId,
        options: ForkOptions,
    ) -> Result<TriggerResult, SupervisorError> {
        {
            let phase = *self.phase.lock();
            if phase != Phase::Running {
                return Err(SupervisorError::InvalidState {
                    operation: "forkJob",
                    expected: "running",
                    actual: phase,
                });
            }
        }

        let store = self.store_handle()?;
        let parent = store
            .read_job(parent_id)
            .ok_or_else(|| SupervisorError::JobNotFound(parent_id.to_string()))?;

        let prompt = options.prompt.or_else(|| parent.prompt.clone());
        let mut request =
            QueuedJob::new(JobId::new(&self.clock), parent.agent.clone(), TriggerType::Fork);
        request.prompt_override = prompt.clone();
        request.forked_from = Some(parent.id.clone());
        request.resume_session = parent.session_id.clone();

        match self.queue.enqueue(request) {
            EnqueueOutcome::Accepted { job_id } => Ok(TriggerResult {
                job_id,
                agent_name: parent.agent,
                schedule_name: None,
                started_at: self.clock.now_utc(),
                prompt,
            }),
            EnqueueOutcome::Skipped { reason: SkipReason::AtCapacity { limit, current } } => {
                Err(SupervisorError::ConcurrencyLimit {
                    agent: parent.agent,
                    limit,
                    current_jobs: current,
                })
            }
            EnqueueOutcome::Skipped { reason } => Err(SupervisorError::JobFork {
                job_id: parent_id.clone(),
                reason: reason.as_str().to_string(),
            }),
        }
    }

    pub fn enable_schedule(
        &self,
        agent_name: &str,
        schedule_name: &str,
    ) -> Result<ScheduleInfo, SupervisorError> {
        self.set_schedule_status(agent_name, schedule_name, ScheduleStatus::Idle)
    }

    pub fn disable_schedule(
        &self,
        agent_name: &str,
        schedule_name: &str,
    ) -> Result<ScheduleInfo, SupervisorError> {
        self.set_schedule_status(agent_name, schedule_name, ScheduleStatus::Disabled)
    }

    fn set_schedule_status(
        &self,
        agent_name: &str,
        schedule_name: &str,
        status: ScheduleStatus,
    ) -> Result<ScheduleInfo, SupervisorError> {
        let agent = self.resolve_agent(agent_name)?;
        let spec = agent.schedule(schedule_name).ok_or_else(|| {
            SupervisorError::ScheduleNotFound {
                agent: agent.qualified_name.clone(),
                schedule: schedule_name.to_string(),
            }
        })?;

        let store = self.store_handle()?;
        let updated = store.update_agent_state(&agent.qualified_name, |state| {
            state.schedule_mut(schedule_name).status = status;
        })?;

        let state = updated.schedule(schedule_name).cloned().unwrap_or_default();
        Ok(schedule_info(&agent.qualified_name, schedule_name, spec.kind.trigger_reason(), &state))
    }

    // -- queries --

    pub fn get_fleet_status(&self) -> Result<FleetStatus, SupervisorError> {
        let config = self.config_handle()?;
        let store = self.store_handle()?;
        let fleet = store.read_fleet_state();
        let agents = config
            .agents
            .iter()
            .map(|spec| agent_info(spec, fleet.agent(&spec.qualified_name)))
            .collect();
        Ok(FleetStatus {
            phase: self.phase(),
            started_at: fleet.started_at,
            agents,
        })
    }

    pub fn get_agent_info(&self) -> Result<Vec<AgentInfo>, SupervisorError> {
        Ok(self.get_fleet_status()?.agents)
    }

    pub fn get_agent_info_by_name(&self, name: &str) -> Result<AgentInfo, SupervisorError> {
        let agent = self.resolve_agent(name)?;
        let store = self.store_handle()?;
        let fleet = store.read_fleet_state();
        Ok(agent_info(&agent, fleet.agent(&agent.qualified_name)))
    }

    pub fn get_schedules(&self) -> Result<Vec<ScheduleInfo>, SupervisorError> {
        let mut schedules = Vec::new();
        for agent in self.get_agent_info()? {
            schedules.extend(agent.schedules);
        }
        Ok(schedules)
    }

    pub fn get_job(
        &self,
        job_id: &JobId,
        include_output: bool,
    ) -> Result<JobDetails, SupervisorError> {
        let store = self.store_handle()?;
        let job = store
            .read_job(job_id)
            .ok_or_else(|| SupervisorError::JobNotFound(job_id.to_string()))?;
        let output = if include_output {
            Some(store.read_job_output(job_id)?)
        } else {
            None
        };
        Ok(JobDetails { job, output })
    }

    /// Filtered, paginated job history. `total` counts matches before
    /// pagination; `unreadable` counts files that failed to parse.
    pub fn get_jobs(&self, filter: &JobFilter) -> Result<JobListing, SupervisorError> {
        Ok(self.store_handle()?.list_jobs(filter))
    }

    /// Replay a job's transcript, then follow appends until terminal.
    pub fn stream_job_output(&self, job_id: &JobId) -> Result<JobOutputStream, SupervisorError> {
        let store = self.store_handle()?;
        if store.read_job(job_id).is_none() {
            return Err(SupervisorError::JobNotFound(job_id.to_string()));
        }
        Ok(JobOutputStream::start(store, job_id.clone()))
    }

    // -- helpers --

    fn store_handle(&self) -> Result<Arc<StateStore>, SupervisorError> {
        self.store.lock().clone().ok_or(SupervisorError::InvalidState {
            operation: "store access",
            expected: "initialized",
            actual: Phase::Uninitialized,
        })
    }

    fn config_handle(&self) -> Result<Arc<ResolvedConfig>, SupervisorError> {
        self.config.lock().clone().ok_or(SupervisorError::InvalidState {
            operation: "config access",
            expected: "initialized",
            actual: Phase::Uninitialized,
        })
    }

    fn scheduler_handle(&self) -> Result<Arc<Scheduler<C>>, SupervisorError> {
        self.scheduler.lock().clone().ok_or(SupervisorError::InvalidState {
            operation: "scheduler access",
            expected: "initialized",
            actual: Phase::Uninitialized,
        })
    }

    fn config_agent(&self, qualified: &str) -> Option<AgentSpec> {
        self.config.lock().as_ref().and_then(|c| c.agent(qualified).cloned())
    }

    /// Qualified name first; a bare local name resolves only when it is
    /// unambiguous.
    fn resolve_agent(&self, name: &str) -> Result<AgentSpec, SupervisorError> {
        let config = self.config_handle()?;
        if let Some(agent) = config.agent(name) {
            return Ok(agent.clone());
        }
        let matches = config.agents_by_local_name(name);
        match matches.as_slice() {
            [only] => Ok((*only).clone()),
            _ => Err(SupervisorError::AgentNotFound {
                name: name.to_string(),
                available: config.qualified_names(),
            }),
        }
    }

    fn skip_to_error(&self, agent: &str, reason: SkipReason) -> SupervisorError {
        match reason {
            SkipReason::AtCapacity { limit, current } => SupervisorError::ConcurrencyLimit {
                agent: agent.to_string(),
                limit,
                current_jobs: current,
            },
            SkipReason::AgentNotFound => SupervisorError::AgentNotFound {
                name: agent.to_string(),
                available: self
                    .config
                    .lock()
                    .as_ref()
                    .map(|c| c.qualified_names())
                    .unwrap_or_default(),
            },
            SkipReason::AgentDisabled => {
                SupervisorError::AgentDisabled { agent: agent.to_string() }
            }
            SkipReason::QueueFull => SupervisorError::QueueFull { agent: agent.to_string() },
        }
    }
}

fn schedule_info(
    agent: &str,
    name: &str,
    kind: &'static str,
    state: &ScheduleState,
) -> ScheduleInfo {
    ScheduleInfo {
        agent: agent.to_string(),
        name: name.to_string(),
        kind,
        status: state.status,
        last_run_at: state.last_run_at,
        next_run_at: state.next_run_at,
        last_error: state.last_error.clone(),
    }
}

fn agent_info(spec: &AgentSpec, state: Option<&herd_core::state::AgentState>) -> AgentInfo {
    let default_state = herd_core::state::AgentState::default();
    let state = state.unwrap_or(&default_state);
    let schedules = spec
        .schedules
        .values()
        .map(|schedule| {
            let schedule_state = state.schedule(&schedule.name).cloned().unwrap_or_default();
            schedule_info(
                &spec.qualified_name,
                &schedule.name,
                schedule.kind.trigger_reason(),
                &schedule_state,
            )
        })
        .collect();
    AgentInfo {
        qualified_name: spec.qualified_name.clone(),
        local_name: spec.local_name.clone(),
        description: spec.description.clone(),
        status: state.status,
        current_job: state.current_job.clone(),
        last_job_id: state.last_job_id.clone(),
        max_concurrent: spec.max_concurrent,
        schedules,
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
