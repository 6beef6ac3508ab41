// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::events::EventStream;
use crate::runtime::fake::{FakeRuntime, ScriptedRun};
use herd_core::clock::FakeClock;
use herd_core::id::JobId;
use herd_core::schedule::{ScheduleKind, ScheduleSpec, ScheduleStatus};
use std::collections::BTreeMap;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    executor: JobExecutor<FakeClock>,
    runtime: Arc<FakeRuntime>,
    clock: FakeClock,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(StateStore::open(dir.path()).unwrap());
    let runtime = FakeRuntime::new();
    let clock = FakeClock::new();
    let executor = JobExecutor {
        store,
        bus: Arc::new(EventBus::new()),
        queue: Arc::new(JobQueue::default()),
        runtime: runtime.clone(),
        retention: RetentionLimits::default(),
        clock: clock.clone(),
    };
    Harness { _dir: dir, executor, runtime, clock }
}

fn agent(name: &str) -> AgentSpec {
    AgentSpec::builder()
        .local_name(name)
        .qualified_name(name)
        .build()
}

fn request(h: &Harness, agent: &str) -> QueuedJob {
    QueuedJob::new(JobId::new(&h.clock), agent, herd_core::job::TriggerType::Manual)
}

fn admit(h: &Harness, spec: &AgentSpec, req: &QueuedJob) {
    h.executor.queue.configure(std::slice::from_ref(spec));
    assert!(matches!(
        h.executor.queue.enqueue(req.clone()),
        crate::queue::EnqueueOutcome::Accepted { .. }
    ));
    assert_eq!(h.executor.queue.take_ready().len(), 1);
}

async fn drain_events(stream: &mut EventStream) -> Vec<&'static str> {
    let mut names = Vec::new();
    while let Some(event) = stream.try_next() {
        names.push(event.name());
    }
    names
}

#[tokio::test]
async fn completed_run_lands_success() {
    let h = harness();
    let spec = agent("worker");
    let req = request(&h, "worker");
    admit(&h, &spec, &req);

    let job = h.executor.execute(&spec, req, CancellationToken::new()).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.exit_reason, Some(ExitReason::Success));
    assert_eq!(job.session_id.as_deref(), Some("sess-fake"));
    assert!(job.validate().is_ok());

    let stored = h.executor.store.read_job(&job.id).unwrap();
    assert_eq!(stored, job);
    let output = h.executor.store.read_job_output(&job.id).unwrap();
    assert_eq!(output.len(), 1);
    assert_eq!(h.executor.queue.running_count("worker"), 0);
}

#[tokio::test]
async fn event_order_is_created_output_terminal() {
    let h = harness();
    let mut stream = h.executor.bus.subscribe();
    let spec = agent("worker");
    let req = request(&h, "worker");
    admit(&h, &spec, &req);

    h.executor.execute(&spec, req, CancellationToken::new()).await;

    let names = drain_events(&mut stream).await;
    let created = names.iter().position(|n| *n == "job:created").unwrap();
    let output = names.iter().position(|n| *n == "job:output").unwrap();
    let completed = names.iter().position(|n| *n == "job:completed").unwrap();
    assert!(created < output && output < completed, "order: {names:?}");
    assert!(names.contains(&"agent:started"));
    assert!(names.contains(&"agent:stopped"));
}

#[tokio::test]
async fn runtime_error_message_fails_the_job() {
    let h = harness();
    let spec = agent("worker");
    h.runtime.script(
        "worker",
        ScriptedRun { fail_with: Some("boom".to_string()), ..Default::default() },
    );
    let mut stream = h.executor.bus.subscribe();
    let req = request(&h, "worker");
    admit(&h, &spec, &req);

    let job = h.executor.execute(&spec, req, CancellationToken::new()).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.exit_reason, Some(ExitReason::Error));
    let names = drain_events(&mut stream).await;
    assert!(names.contains(&"job:failed"), "{names:?}");

    // Agent state records the error.
    let state = h.executor.store.read_fleet_state();
    let agent_state = state.agent("worker").unwrap();
    assert_eq!(agent_state.status, herd_core::state::AgentStatus::Error);
    assert_eq!(agent_state.error_message.as_deref(), Some("boom"));
}

#[tokio::test]
async fn spawn_failure_fails_the_job() {
    let h = harness();
    let spec = agent("worker");
    h.runtime.script(
        "worker",
        ScriptedRun { spawn_error: Some("no binary".to_string()), ..Default::default() },
    );
    let req = request(&h, "worker");
    admit(&h, &spec, &req);

    let job = h.executor.execute(&spec, req, CancellationToken::new()).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.exit_reason, Some(ExitReason::Error));
}

#[tokio::test]
async fn max_turns_outcome_is_recorded() {
    let h = harness();
    let spec = agent("worker");
    h.runtime.script(
        "worker",
        ScriptedRun { outcome: RunOutcome::MaxTurns, ..Default::default() },
    );
    let req = request(&h, "worker");
    admit(&h, &spec, &req);

    let job = h.executor.execute(&spec, req, CancellationToken::new()).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.exit_reason, Some(ExitReason::MaxTurns));
}

#[tokio::test]
async fn cancellation_lands_cancelled() {
    let h = harness();
    let spec = agent("worker");
    h.runtime.script(
        "worker",
        ScriptedRun {
            messages: vec!["never arrives".to_string()],
            delay: std::time::Duration::from_secs(30),
            ..Default::default()
        },
    );
    let mut stream = h.executor.bus.subscribe();
    let req = request(&h, "worker");
    admit(&h, &spec, &req);

    let cancel = CancellationToken::new();
    let task = {
        let executor = h.executor.clone();
        let spec = spec.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { executor.execute(&spec, req, cancel).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    cancel.cancel();
    let job = task.await.unwrap();

    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.exit_reason, Some(ExitReason::Cancelled));
    let names = drain_events(&mut stream).await;
    assert!(names.contains(&"job:cancelled"), "{names:?}");
}

#[tokio::test]
async fn deadline_lands_timeout() {
    let h = harness();
    let mut spec = agent("worker");
    spec.session.timeout = Some(std::time::Duration::from_millis(50));
    h.runtime.script(
        "worker",
        ScriptedRun {
            messages: vec!["slow".to_string()],
            delay: std::time::Duration::from_secs(30),
            ..Default::default()
        },
    );
    let req = request(&h, "worker");
    admit(&h, &spec, &req);

    let job = h.executor.execute(&spec, req, CancellationToken::new()).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.exit_reason, Some(ExitReason::Timeout));
}

#[tokio::test]
async fn scheduled_job_uses_schedule_prompt_and_settles_schedule_state() {
    let h = harness();
    let mut schedules = BTreeMap::new();
    schedules.insert(
        "nightly".to_string(),
        ScheduleSpec {
            name: "nightly".to_string(),
            kind: ScheduleKind::Interval { every: std::time::Duration::from_secs(60) },
            prompt: Some("sweep the queues".to_string()),
        },
    );
    let spec = AgentSpec::builder()
        .local_name("worker")
        .qualified_name("worker")
        .schedules(schedules)
        .build();

    let mut req = request(&h, "worker");
    req.schedule = Some("nightly".to_string());
    req.trigger = herd_core::job::TriggerType::Schedule;
    admit(&h, &spec, &req);

    let job = h.executor.execute(&spec, req, CancellationToken::new()).await;
    assert_eq!(job.prompt.as_deref(), Some("sweep the queues"));
    assert_eq!(job.schedule.as_deref(), Some("nightly"));

    let state = h.executor.store.read_fleet_state();
    let schedule = state.agent("worker").and_then(|a| a.schedule("nightly")).cloned().unwrap();
    assert_eq!(schedule.status, ScheduleStatus::Idle);
    assert!(schedule.last_error.is_none());
}

#[tokio::test]
async fn prompt_override_beats_schedule_prompt() {
    let h = harness();
    let mut schedules = BTreeMap::new();
    schedules.insert(
        "nightly".to_string(),
        ScheduleSpec {
            name: "nightly".to_string(),
            kind: ScheduleKind::Webhook,
            prompt: Some("schedule prompt".to_string()),
        },
    );
    let spec = AgentSpec::builder()
        .local_name("worker")
        .qualified_name("worker")
        .schedules(schedules)
        .build();

    let mut req = request(&h, "worker");
    req.schedule = Some("nightly".to_string());
    req.prompt_override = Some("override".to_string());
    admit(&h, &spec, &req);

    let job = h.executor.execute(&spec, req, CancellationToken::new()).await;
    assert_eq!(job.prompt.as_deref(), Some("override"));

    // The runtime saw the effective prompt.
    let requests = h.runtime.requests();
    assert_eq!(requests[0].prompt.as_deref(), Some("override"));
}

#[tokio::test]
async fn fork_request_emits_job_forked_and_resumes_session() {
    let h = harness();
    let spec = agent("worker");
    let parent_id = JobId::new(&h.clock);
    let mut stream = h.executor.bus.subscribe();

    let mut req = request(&h, "worker");
    req.trigger = herd_core::job::TriggerType::Fork;
    req.forked_from = Some(parent_id.clone());
    req.resume_session = Some("sess-parent".to_string());
    admit(&h, &spec, &req);

    let job = h.executor.execute(&spec, req, CancellationToken::new()).await;
    assert_eq!(job.forked_from, Some(parent_id));
    assert_eq!(job.trigger_type, herd_core::job::TriggerType::Fork);

    let names = drain_events(&mut stream).await;
    assert!(names.contains(&"job:forked"), "{names:?}");

    let requests = h.runtime.requests();
    assert_eq!(requests[0].resume_session.as_deref(), Some("sess-parent"));
}
