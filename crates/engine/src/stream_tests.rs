// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use herd_core::clock::{Clock, FakeClock};
use herd_core::job::{ExitReason, Job, JobStatus, TriggerType};
use tempfile::TempDir;

fn setup() -> (TempDir, Arc<StateStore>, FakeClock, Job) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(StateStore::open(dir.path()).unwrap());
    let clock = FakeClock::new();
    let mut job = Job::pending(JobId::new(&clock), "worker", TriggerType::Manual, &clock);
    job.status = JobStatus::Running;
    store.write_job(&job).unwrap();
    store.create_transcript(&job.id).unwrap();
    (dir, store, clock, job)
}

fn assistant(clock: &FakeClock, text: &str) -> TranscriptMessage {
    TranscriptMessage::Assistant { timestamp: clock.now_utc(), text: text.to_string() }
}

#[tokio::test]
async fn replays_then_follows_until_terminal() {
    let (_dir, store, clock, mut job) = setup();
    store.append_job_output(&job.id, &assistant(&clock, "first")).unwrap();

    let mut stream = JobOutputStream::start(store.clone(), job.id.clone());

    // Replayed line.
    match stream.next().await {
        Some(StreamEvent::Message(TranscriptMessage::Assistant { text, .. })) => {
            assert_eq!(text, "first");
        }
        other => panic!("unexpected: {other:?}"),
    }

    // Live append.
    store.append_job_output(&job.id, &assistant(&clock, "second")).unwrap();
    match tokio::time::timeout(Duration::from_secs(2), stream.next()).await.unwrap() {
        Some(StreamEvent::Message(TranscriptMessage::Assistant { text, .. })) => {
            assert_eq!(text, "second");
        }
        other => panic!("unexpected: {other:?}"),
    }

    // Terminal status ends the stream.
    job.finalize(JobStatus::Completed, ExitReason::Success, clock.now_utc());
    store.write_job(&job).unwrap();
    let end = tokio::time::timeout(Duration::from_secs(2), stream.next()).await.unwrap();
    assert_eq!(end, None);
}

#[tokio::test]
async fn terminal_job_replays_and_ends() {
    let (_dir, store, clock, mut job) = setup();
    store.append_job_output(&job.id, &assistant(&clock, "a")).unwrap();
    store.append_job_output(&job.id, &assistant(&clock, "b")).unwrap();
    job.finalize(JobStatus::Failed, ExitReason::Error, clock.now_utc());
    store.write_job(&job).unwrap();

    let mut stream = JobOutputStream::start(store, job.id.clone());
    let mut texts = Vec::new();
    while let Some(event) = stream.next().await {
        if let StreamEvent::Message(TranscriptMessage::Assistant { text, .. }) = event {
            texts.push(text);
        }
    }
    assert_eq!(texts, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn stop_is_idempotent_and_ends_stream() {
    let (_dir, store, _clock, job) = setup();
    let mut stream = JobOutputStream::start(store, job.id.clone());
    stream.stop();
    stream.stop();
    let end = tokio::time::timeout(Duration::from_secs(2), stream.next()).await.unwrap();
    assert_eq!(end, None);
}

#[tokio::test]
async fn missing_job_ends_quickly() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(StateStore::open(dir.path()).unwrap());
    let clock = FakeClock::new();
    let mut stream = JobOutputStream::start(store, JobId::new(&clock));
    let end = tokio::time::timeout(Duration::from_secs(2), stream.next()).await.unwrap();
    assert_eq!(end, None);
}
