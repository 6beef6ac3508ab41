// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios against a real temp state directory and the
//! scripted fake runtime.

use herd_config::{ConfigError, LoadOptions};
use herd_engine::{
    FakeRuntime, FleetSupervisor, ForkOptions, ScriptedRun, StopOptions, SupervisorError,
    SupervisorOptions, TriggerOptions,
};
use herd_core::event::Event;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
    let path = dir.path().join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn load(dir: &TempDir) -> Result<herd_config::ResolvedConfig, herd_config::ConfigurationError> {
    herd_config::load(dir.path(), &LoadOptions::default())
}

// Scenario 1: a -> b -> a reference cycle fails with the full path chain.
#[test]
fn cycle_detection_reports_both_files() {
    let dir = TempDir::new().unwrap();
    write(&dir, "herdctl.yaml", "version: 1\nfleets:\n  - path: ./a/herdctl.yaml\n");
    write(&dir, "a/herdctl.yaml", "version: 1\nfleets:\n  - path: ./../b/herdctl.yaml\n");
    write(&dir, "b/herdctl.yaml", "version: 1\nfleets:\n  - path: ./../a/herdctl.yaml\n");

    let err = load(&dir).unwrap_err();
    let chain = err
        .errors
        .iter()
        .find_map(|e| match e {
            ConfigError::Cycle { chain } => Some(chain),
            _ => None,
        })
        .expect("cycle error expected");

    let rendered: Vec<String> = chain.iter().map(|p| p.display().to_string()).collect();
    assert!(
        rendered.iter().any(|p| p.ends_with("a/herdctl.yaml")),
        "chain missing a/: {rendered:?}"
    );
    assert!(
        rendered.iter().any(|p| p.ends_with("b/herdctl.yaml")),
        "chain missing b/: {rendered:?}"
    );
}

// Scenario 2: two sub-fleets sharing a declared name collide.
#[test]
fn sibling_fleet_name_collision() {
    let dir = TempDir::new().unwrap();
    write(&dir, "x/herdctl.yaml", "version: 1\nfleet:\n  name: duplicate-name\n");
    write(&dir, "y/herdctl.yaml", "version: 1\nfleet:\n  name: duplicate-name\n");
    write(&dir, "herdctl.yaml", "version: 1\nfleets:\n  - path: ./x\n  - path: ./y\n");

    let err = load(&dir).unwrap_err();
    match err.errors.iter().find(|e| matches!(e, ConfigError::FleetNameCollision { .. })) {
        Some(ConfigError::FleetNameCollision { name, first, second, .. }) => {
            assert_eq!(name, "duplicate-name");
            let first = first.display().to_string();
            let second = second.display().to_string();
            assert!(first.contains("/x/") || first.contains("/y/"), "{first}");
            assert!(second.contains("/x/") || second.contains("/y/"), "{second}");
            assert_ne!(first, second);
        }
        other => panic!("collision error expected, got {other:?}"),
    }
}

// Scenario 6: undefined variable without a default is fatal, naming the
// variable and its dotted path.
#[test]
fn undefined_env_var_is_fatal() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "agents/scout.yaml",
        "name: scout\ndocker:\n  env:\n    TOKEN: ${MISSING}\n",
    );
    write(&dir, "herdctl.yaml", "version: 1\nagents:\n  - path: ./agents/scout.yaml\n");

    let err = load(&dir).unwrap_err();
    match err.errors.first() {
        Some(ConfigError::UndefinedVariable { variable, path }) => {
            assert_eq!(variable, "MISSING");
            assert_eq!(path, "docker.env.TOKEN");
        }
        other => panic!("undefined variable expected, got {other:?}"),
    }
}

struct Fleet {
    _dir: TempDir,
    supervisor: Arc<FleetSupervisor>,
    runtime: Arc<FakeRuntime>,
}

async fn start_fleet(agent_yaml: &str, tick_period: Duration) -> Fleet {
    let dir = TempDir::new().unwrap();
    write(&dir, "agents/agent.yaml", agent_yaml);
    write(&dir, "herdctl.yaml", "version: 1\nagents:\n  - path: ./agents/agent.yaml\n");

    let runtime = FakeRuntime::new();
    let mut options =
        SupervisorOptions::new(dir.path().join("herdctl.yaml"), dir.path().join("state"));
    options.tick_period = tick_period;
    let supervisor = Arc::new(FleetSupervisor::new(options, runtime.clone()));
    supervisor.initialize().unwrap();
    supervisor.start().unwrap();
    Fleet { _dir: dir, supervisor, runtime }
}

// Scenario 3: a 100 ms interval schedule fires exactly once within the
// first couple of hundred milliseconds of supervisor lifetime.
#[tokio::test]
async fn interval_schedule_fires_once_on_start() {
    let fleet = start_fleet(
        concat!(
            "name: ticker\n",
            "schedules:\n",
            "  tick:\n",
            "    type: interval\n",
            "    interval: 100ms\n",
        ),
        Duration::from_millis(50),
    )
    .await;
    let mut stream = fleet.supervisor.subscribe();

    // The schedule fires one interval after start. Stopping right after
    // the first fire cancels the scheduler well before the next 100 ms
    // boundary, freezing the count.
    let first = wait_for(&mut stream, "job:created").await;
    match first {
        Event::JobCreated { schedule, .. } => assert_eq!(schedule.as_deref(), Some("tick")),
        other => panic!("unexpected: {other:?}"),
    }
    fleet.supervisor.stop(StopOptions::default()).await.unwrap();

    let mut extra_created = 0;
    while let Some(event) = stream.try_next() {
        if event.name() == "job:created" {
            extra_created += 1;
        }
    }
    assert_eq!(extra_created, 0, "schedule fired more than once in the window");
}

// Scenario 4: three simultaneous manual triggers against max_concurrent=2.
#[tokio::test]
async fn concurrency_cap_refuses_third_trigger() {
    let fleet = start_fleet("name: busy\nmax_concurrent: 2\n", Duration::from_secs(60)).await;
    fleet.runtime.script(
        "busy",
        ScriptedRun {
            messages: vec!["working".to_string()],
            delay: Duration::from_secs(10),
            ..Default::default()
        },
    );

    let first = fleet.supervisor.trigger("busy", None, TriggerOptions::default());
    let second = fleet.supervisor.trigger("busy", None, TriggerOptions::default());
    let third = fleet.supervisor.trigger("busy", None, TriggerOptions::default());

    assert!(first.is_ok());
    assert!(second.is_ok());
    match third {
        Err(SupervisorError::ConcurrencyLimit { limit, current_jobs, .. }) => {
            assert_eq!(limit, 2);
            assert_eq!(current_jobs, 2);
        }
        other => panic!("concurrency limit expected, got {other:?}"),
    }

    fleet
        .supervisor
        .stop(StopOptions { timeout: Duration::from_millis(100), cancel_on_timeout: true })
        .await
        .unwrap();
}

// Scenario 5: a fork inherits the parent's prompt and records lineage.
#[tokio::test]
async fn fork_inherits_prompt() {
    let fleet = start_fleet("name: forker\nmax_concurrent: 2\n", Duration::from_secs(60)).await;
    let mut stream = fleet.supervisor.subscribe();

    let parent = fleet
        .supervisor
        .trigger(
            "forker",
            None,
            TriggerOptions { prompt: Some("original".to_string()), ..Default::default() },
        )
        .unwrap();
    wait_for(&mut stream, "job:completed").await;

    let child = fleet.supervisor.fork_job(&parent.job_id, ForkOptions::default()).unwrap();
    wait_for(&mut stream, "job:completed").await;

    let details = fleet.supervisor.get_job(&child.job_id, false).unwrap();
    assert_eq!(details.job.prompt.as_deref(), Some("original"));
    assert_eq!(details.job.forked_from, Some(parent.job_id));
    assert_eq!(details.job.trigger_type, herd_core::job::TriggerType::Fork);

    fleet.supervisor.stop(StopOptions::default()).await.unwrap();
}

// Terminal jobs satisfy the §8 invariants end to end.
#[tokio::test]
async fn terminal_job_invariants_hold() {
    let fleet = start_fleet("name: solo\n", Duration::from_secs(60)).await;
    let mut stream = fleet.supervisor.subscribe();

    let result = fleet.supervisor.trigger("solo", None, TriggerOptions::default()).unwrap();
    wait_for(&mut stream, "job:completed").await;

    let job = fleet.supervisor.get_job(&result.job_id, false).unwrap().job;
    assert!(job.validate().is_ok());
    let finished = job.finished_at.unwrap();
    assert!(finished >= job.started_at);
    assert_eq!(
        job.duration_seconds.unwrap(),
        (finished - job.started_at).num_seconds()
    );

    fleet.supervisor.stop(StopOptions::default()).await.unwrap();
}

async fn wait_for(stream: &mut herd_engine::EventStream, name: &str) -> Event {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {name}"))
            .unwrap_or_else(|| panic!("stream closed waiting for {name}"));
        if event.name() == name {
            return event;
        }
    }
}
