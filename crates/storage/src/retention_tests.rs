// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::store::StateStore;
use herd_core::clock::{Clock, FakeClock};
use herd_core::id::JobId;
use herd_core::job::{ExitReason, JobStatus, TriggerType};
use tempfile::TempDir;

fn setup() -> (TempDir, StateStore, FakeClock) {
    let dir = TempDir::new().unwrap();
    let store = StateStore::open(dir.path()).unwrap();
    (dir, store, FakeClock::new())
}

fn terminal_job(store: &StateStore, clock: &FakeClock, agent: &str) -> Job {
    let mut job = Job::pending(JobId::new(clock), agent, TriggerType::Manual, clock);
    job.finalize(JobStatus::Completed, ExitReason::Success, clock.now_utc());
    store.write_job(&job).unwrap();
    store.create_transcript(&job.id).unwrap();
    clock.advance(std::time::Duration::from_secs(1));
    job
}

fn running_job(store: &StateStore, clock: &FakeClock, agent: &str) -> Job {
    let mut job = Job::pending(JobId::new(clock), agent, TriggerType::Manual, clock);
    job.status = JobStatus::Running;
    store.write_job(&job).unwrap();
    store.create_transcript(&job.id).unwrap();
    clock.advance(std::time::Duration::from_secs(1));
    job
}

#[test]
fn per_agent_cap_deletes_oldest() {
    let (_dir, store, clock) = setup();
    let oldest = terminal_job(&store, &clock, "a");
    let middle = terminal_job(&store, &clock, "a");
    let newest = terminal_job(&store, &clock, "a");

    let limits = RetentionLimits { max_jobs_per_agent: 2, max_total_jobs: None };
    assert_eq!(limits.apply(&store), 1);

    assert!(store.read_job(&oldest.id).is_none());
    assert!(store.read_job(&middle.id).is_some());
    assert!(store.read_job(&newest.id).is_some());
}

#[test]
fn running_jobs_are_never_pruned() {
    let (_dir, store, clock) = setup();
    let running = running_job(&store, &clock, "a");
    terminal_job(&store, &clock, "a");
    terminal_job(&store, &clock, "a");

    let limits = RetentionLimits { max_jobs_per_agent: 1, max_total_jobs: None };
    assert_eq!(limits.apply(&store), 1);
    assert!(store.read_job(&running.id).is_some());
}

#[test]
fn fleet_wide_cap_applies_after_per_agent() {
    let (_dir, store, clock) = setup();
    let a_old = terminal_job(&store, &clock, "a");
    let a_new = terminal_job(&store, &clock, "a");
    let b_old = terminal_job(&store, &clock, "b");
    let b_new = terminal_job(&store, &clock, "b");

    let limits = RetentionLimits { max_jobs_per_agent: 10, max_total_jobs: Some(2) };
    assert_eq!(limits.apply(&store), 2);

    assert!(store.read_job(&a_old.id).is_none());
    assert!(store.read_job(&a_new.id).is_none());
    assert!(store.read_job(&b_old.id).is_some());
    assert!(store.read_job(&b_new.id).is_some());
}

#[test]
fn deletes_transcripts_too() {
    let (dir, store, clock) = setup();
    let gone = terminal_job(&store, &clock, "a");
    terminal_job(&store, &clock, "a");

    let limits = RetentionLimits { max_jobs_per_agent: 1, max_total_jobs: None };
    limits.apply(&store);
    assert!(!dir.path().join("jobs").join(format!("{}.jsonl", gone.id)).exists());
}

#[test]
fn under_cap_deletes_nothing() {
    let (_dir, store, clock) = setup();
    terminal_job(&store, &clock, "a");
    terminal_job(&store, &clock, "b");
    assert_eq!(RetentionLimits::default().apply(&store), 0);
}
