// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runtime contract: the external collaborator that turns an agent
//! plus prompt into a stream of typed messages.
//!
//! A runtime produces a lazy, finite sequence of [`RuntimeEvent`]s.
//! Cancellation is delivered out of band through a token and must end
//! the sequence promptly. Errors may surface either as a terminal
//! `error` transcript message or as an `Err`; the executor accepts both.

use async_trait::async_trait;
use herd_core::agent::AgentSpec;
use herd_core::id::JobId;
use herd_core::message::TranscriptMessage;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime failed to start: {0}")]
    Spawn(String),
    #[error("runtime failed: {0}")]
    Failed(String),
}

/// Everything a runtime needs for one invocation.
#[derive(Debug, Clone)]
pub struct RuntimeRequest {
    pub agent: AgentSpec,
    pub job_id: JobId,
    /// Effective prompt: trigger override, else schedule prompt, else none
    /// (the runtime falls back to the agent's configured behavior).
    pub prompt: Option<String>,
    /// Session to resume from, for forks.
    pub resume_session: Option<String>,
    /// Runtime-owned scratch space: `<stateDir>/sessions`.
    pub sessions_dir: PathBuf,
}

/// How a finished run ended, when the runtime says so explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    MaxTurns,
}

/// One element of the runtime's output sequence.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// The underlying session exists; recorded on the job for forks.
    Session { session_id: String },
    Message(TranscriptMessage),
    /// Explicit end marker. A stream that closes without one counts as
    /// `Success` unless a terminal `error` message preceded the close.
    Done(RunOutcome),
}

#[async_trait]
pub trait AgentRuntime: Send + Sync + 'static {
    /// Start one invocation. The receiver yields the message sequence;
    /// dropping it or cancelling the token must end the run promptly.
    async fn run(
        &self,
        request: RuntimeRequest,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RuntimeEvent>, RuntimeError>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    //! Scripted runtime for tests.

    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    /// Script for one agent's runs.
    #[derive(Debug, Clone)]
    pub struct ScriptedRun {
        pub session_id: Option<String>,
        /// Assistant texts emitted in order.
        pub messages: Vec<String>,
        /// Pause before each message; lets tests exercise cancellation.
        pub delay: Duration,
        pub outcome: RunOutcome,
        /// Emit a terminal error message instead of finishing cleanly.
        pub fail_with: Option<String>,
        /// Refuse to start at all.
        pub spawn_error: Option<String>,
    }

    impl Default for ScriptedRun {
        fn default() -> Self {
            Self {
                session_id: Some("sess-fake".to_string()),
                messages: vec!["ok".to_string()],
                delay: Duration::from_millis(0),
                outcome: RunOutcome::Success,
                fail_with: None,
                spawn_error: None,
            }
        }
    }

    /// A runtime that replays scripts and records every request.
    #[derive(Default)]
    pub struct FakeRuntime {
        scripts: Mutex<HashMap<String, ScriptedRun>>,
        default_script: Mutex<ScriptedRun>,
        requests: Mutex<Vec<RuntimeRequest>>,
    }

    impl FakeRuntime {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Script runs for one agent (by qualified name).
        pub fn script(&self, agent: &str, run: ScriptedRun) {
            self.scripts.lock().insert(agent.to_string(), run);
        }

        /// Script runs for agents without a specific script.
        pub fn script_default(&self, run: ScriptedRun) {
            *self.default_script.lock() = run;
        }

        /// Requests seen so far, in order.
        pub fn requests(&self) -> Vec<RuntimeRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl AgentRuntime for FakeRuntime {
        async fn run(
            &self,
            request: RuntimeRequest,
            cancel: CancellationToken,
        ) -> Result<mpsc::Receiver<RuntimeEvent>, RuntimeError> {
            let script = self
                .scripts
                .lock()
                .get(&request.agent.qualified_name)
                .cloned()
                .unwrap_or_else(|| self.default_script.lock().clone());
            self.requests.lock().push(request);

            if let Some(reason) = script.spawn_error {
                return Err(RuntimeError::Spawn(reason));
            }

            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(async move {
                if let Some(session_id) = script.session_id.clone() {
                    if tx.send(RuntimeEvent::Session { session_id }).await.is_err() {
                        return;
                    }
                }
                for text in &script.messages {
                    if !script.delay.is_zero() {
                        tokio::select! {
                            _ = tokio::time::sleep(script.delay) => {}
                            _ = cancel.cancelled() => return,
                        }
                    }
                    if cancel.is_cancelled() {
                        return;
                    }
                    let message = TranscriptMessage::Assistant {
                        timestamp: Utc::now(),
                        text: text.clone(),
                    };
                    if tx.send(RuntimeEvent::Message(message)).await.is_err() {
                        return;
                    }
                }
                if let Some(error) = script.fail_with {
                    let _ = tx
                        .send(RuntimeEvent::Message(TranscriptMessage::Error {
                            timestamp: Utc::now(),
                            message: error,
                        }))
                        .await;
                    return;
                }
                let _ = tx.send(RuntimeEvent::Done(script.outcome)).await;
            });
            Ok(rx)
        }
    }
}
