// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use herd_core::job::Job;
use herd_core::message::TranscriptMessage;

fn output_event(n: usize) -> Event {
    let job = Job::builder().build();
    Event::JobOutput {
        job_id: job.id.clone(),
        agent: job.agent,
        output: TranscriptMessage::Assistant {
            timestamp: chrono::Utc::now(),
            text: format!("message {n}"),
        },
        message_type: "assistant".to_string(),
    }
}

#[tokio::test]
async fn delivers_in_emit_order() {
    let bus = EventBus::new();
    let mut stream = bus.subscribe();

    bus.emit(Event::Started);
    bus.emit(Event::Stopped);

    assert_eq!(stream.next().await, Some(Event::Started));
    assert_eq!(stream.next().await, Some(Event::Stopped));
}

#[tokio::test]
async fn each_subscriber_sees_every_event() {
    let bus = EventBus::new();
    let mut a = bus.subscribe();
    let mut b = bus.subscribe();

    bus.emit(Event::Started);
    assert_eq!(a.next().await, Some(Event::Started));
    assert_eq!(b.next().await, Some(Event::Started));
}

#[tokio::test]
async fn dropped_subscriber_is_pruned() {
    let bus = EventBus::new();
    let stream = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 1);
    drop(stream);
    bus.emit(Event::Started);
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn overflow_drops_oldest_output_only() {
    let bus = EventBus::new();
    let mut stream = bus.subscribe_with_capacity(2);

    bus.emit(Event::Started);
    bus.emit(output_event(1));
    bus.emit(output_event(2)); // at capacity: drops output 1
    bus.emit(output_event(3)); // drops output 2

    assert_eq!(stream.next().await, Some(Event::Started));
    match stream.next().await {
        Some(Event::JobOutput { output: TranscriptMessage::Assistant { text, .. }, .. }) => {
            assert_eq!(text, "message 3");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn lifecycle_events_are_never_dropped() {
    let bus = EventBus::new();
    let mut stream = bus.subscribe_with_capacity(1);

    bus.emit(output_event(1));
    bus.emit(Event::Started);
    bus.emit(Event::Stopped); // over capacity, still delivered

    let mut lifecycle = 0;
    for _ in 0..3 {
        match stream.try_next() {
            Some(Event::Started) | Some(Event::Stopped) => lifecycle += 1,
            Some(_) => {}
            None => break,
        }
    }
    assert_eq!(lifecycle, 2);
}

#[tokio::test]
async fn close_ends_stream_after_drain() {
    let bus = EventBus::new();
    let mut stream = bus.subscribe();
    bus.emit(Event::Started);
    bus.close();

    assert_eq!(stream.next().await, Some(Event::Started));
    assert_eq!(stream.next().await, None);
}
