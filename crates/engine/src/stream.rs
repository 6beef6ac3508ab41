// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live transcript tailing.
//!
//! A stream replays the existing transcript, then follows appended bytes
//! until the job reaches a terminal status. Reads go by byte offset
//! (re-open and seek on each wakeup), so concurrent writers are never
//! disturbed. File-change notifications wake the loop early when the
//! platform provides them; a poll at 4 Hz is the safety net, and job
//! terminal status is checked at least once a second either way.

use herd_core::id::JobId;
use herd_core::message::TranscriptMessage;
use herd_storage::StateStore;
use notify::Watcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const POLL_PERIOD: Duration = Duration::from_millis(250);

/// One element observed by a stream consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Message(TranscriptMessage),
    /// Tail loop failure; the stream ends after this.
    Error(String),
}

/// Handle returned by `stream_job_output`.
///
/// `next()` yields replayed then live messages and returns `None` once
/// the job is terminal and the transcript is drained. `stop()` is
/// idempotent and ends the stream early.
pub struct JobOutputStream {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
    stop: CancellationToken,
}

impl JobOutputStream {
    pub fn start(store: Arc<StateStore>, job_id: JobId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        tokio::spawn(tail_loop(store, job_id, tx, stop.clone()));
        Self { rx, stop }
    }

    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// End the stream. Safe to call any number of times.
    pub fn stop(&self) {
        self.stop.cancel();
    }
}

impl Drop for JobOutputStream {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn tail_loop(
    store: Arc<StateStore>,
    job_id: JobId,
    tx: mpsc::UnboundedSender<StreamEvent>,
    stop: CancellationToken,
) {
    // Best-effort file watcher; polling covers platforms where it fails.
    let (wake_tx, mut wake_rx) = mpsc::unbounded_channel::<()>();
    let transcript_path = store.paths().job_transcript(&job_id);
    let _watcher = {
        let wake_tx = wake_tx.clone();
        let mut watcher = match notify::recommended_watcher(move |_res| {
            let _ = wake_tx.send(());
        }) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::debug!(error = %e, "transcript watcher unavailable, polling only");
                None
            }
        };
        if let Some(w) = watcher.as_mut() {
            if let Err(e) = w.watch(&transcript_path, notify::RecursiveMode::NonRecursive) {
                tracing::debug!(error = %e, "cannot watch transcript, polling only");
            }
        }
        watcher
    };

    let mut offset: u64 = 0;
    loop {
        match store.tail_job_output(&job_id, offset) {
            Ok((messages, next_offset)) => {
                offset = next_offset;
                for message in messages {
                    if tx.send(StreamEvent::Message(message)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(e.to_string()));
                return;
            }
        }

        // Terminal status check doubles as the >= 1 Hz safety net; the
        // poll period keeps it well inside that bound.
        let terminal = store.read_job(&job_id).map(|j| j.is_terminal()).unwrap_or(true);
        if terminal {
            // One final drain catches bytes appended between the read
            // above and the status check.
            if let Ok((messages, _)) = store.tail_job_output(&job_id, offset) {
                for message in messages {
                    if tx.send(StreamEvent::Message(message)).is_err() {
                        return;
                    }
                }
            }
            return;
        }

        tokio::select! {
            _ = stop.cancelled() => return,
            _ = wake_rx.recv() => {}
            _ = tokio::time::sleep(POLL_PERIOD) => {}
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
