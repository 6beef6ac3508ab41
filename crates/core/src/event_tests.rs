// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn tagged_names_match_wire_format() {
    let event = Event::ScheduleTriggered {
        agent: "ops.pager".to_string(),
        schedule: "nightly".to_string(),
        reason: "cron".to_string(),
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"schedule:triggered\""), "json: {json}");
    assert_eq!(event.name(), "schedule:triggered");
}

#[test]
fn only_job_output_is_high_volume() {
    let job = Job::builder().build();
    let output = Event::JobOutput {
        job_id: job.id.clone(),
        agent: job.agent.clone(),
        output: TranscriptMessage::Error {
            timestamp: chrono::Utc::now(),
            message: "x".to_string(),
        },
        message_type: "error".to_string(),
    };
    assert!(output.is_high_volume());
    assert!(!Event::Started.is_high_volume());
    assert!(!Event::JobCompleted { job }.is_high_volume());
}

#[test]
fn job_id_extraction() {
    let job = Job::builder().build();
    let id = job.id.clone();
    assert_eq!(Event::JobCompleted { job: job.clone() }.job_id(), Some(&id));
    assert_eq!(
        Event::JobForked { parent: id.clone(), child: job }.job_id(),
        Some(&id)
    );
    assert_eq!(Event::Stopped.job_id(), None);
}

#[test]
fn reload_summary_emptiness() {
    assert!(ReloadSummary::default().is_empty());
    let changes = ReloadSummary {
        added: vec!["a".to_string()],
        ..Default::default()
    };
    assert!(!changes.is_empty());
}

#[test]
fn round_trip() {
    let event = Event::ConfigReloaded {
        changes: ReloadSummary {
            added: vec!["new-agent".to_string()],
            removed: vec![],
            modified: vec!["ops.pager".to_string()],
        },
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}
