// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event fan-out.
//!
//! Subscribers each own a bounded buffer. Emission snapshots the
//! subscriber list, so unsubscribing mid-delivery never corrupts the
//! iteration. When a slow subscriber's buffer is full, the oldest
//! `job:output` entry is dropped to make room; low-volume lifecycle
//! events are always enqueued.

use herd_core::event::Event;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;

const DEFAULT_BUFFER: usize = 1024;

struct SubscriberInner {
    queue: Mutex<VecDeque<Event>>,
    notify: Notify,
    capacity: usize,
    closed: AtomicBool,
}

impl SubscriberInner {
    fn push(&self, event: Event) {
        {
            let mut queue = self.queue.lock();
            if queue.len() >= self.capacity {
                if event.is_high_volume() {
                    // Drop the oldest high-volume entry; if the backlog is
                    // all lifecycle events, keep growing rather than lose one.
                    if let Some(index) = queue.iter().position(Event::is_high_volume) {
                        queue.remove(index);
                    }
                }
                // Low-volume events always get through.
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

/// Fan-out hub owned by the supervisor.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Weak<SubscriberInner>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> EventStream {
        self.subscribe_with_capacity(DEFAULT_BUFFER)
    }

    pub fn subscribe_with_capacity(&self, capacity: usize) -> EventStream {
        let inner = Arc::new(SubscriberInner {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        });
        self.subscribers.lock().push(Arc::downgrade(&inner));
        EventStream { inner }
    }

    /// Deliver to every live subscriber, in this emitter's order.
    pub fn emit(&self, event: Event) {
        let snapshot: Vec<Arc<SubscriberInner>> = {
            let mut subscribers = self.subscribers.lock();
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for subscriber in snapshot {
            subscriber.push(event.clone());
        }
    }

    /// End every stream after its backlog drains.
    pub fn close(&self) {
        let subscribers = self.subscribers.lock();
        for subscriber in subscribers.iter().filter_map(Weak::upgrade) {
            subscriber.close();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|w| w.strong_count() > 0);
        subscribers.len()
    }
}

/// One subscriber's view of the event sequence. Dropping it unsubscribes.
pub struct EventStream {
    inner: Arc<SubscriberInner>,
}

impl EventStream {
    /// Next event, or `None` once the bus is closed and the backlog is
    /// drained.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            // Register for wakeup before checking, so a push between the
            // check and the await is not lost.
            let notified = self.inner.notify.notified();
            if let Some(event) = self.inner.queue.lock().pop_front() {
                // Keep a pending wakeup for any remaining backlog.
                self.inner.notify.notify_one();
                return Some(event);
            }
            if self.inner.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Non-blocking poll.
    pub fn try_next(&mut self) -> Option<Event> {
        self.inner.queue.lock().pop_front()
    }

    pub fn buffered(&self) -> usize {
        self.inner.queue.lock().len()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
