// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-backed agent runtime.
//!
//! Spawns one CLI process per job (the `claude` binary by default,
//! overridable with `HERD_RUNTIME_CMD`), maps its stdout lines to
//! assistant messages, and kills the child on cancellation. This is the
//! reference runtime for `herd start`; richer runtimes (SDK, container)
//! plug in through the same trait.

use async_trait::async_trait;
use chrono::Utc;
use herd_core::agent::PermissionMode;
use herd_core::message::TranscriptMessage;
use herd_engine::{AgentRuntime, RunOutcome, RuntimeError, RuntimeEvent, RuntimeRequest};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct ProcessRuntime {
    command: String,
}

impl ProcessRuntime {
    pub fn from_env() -> Self {
        let command = std::env::var("HERD_RUNTIME_CMD").unwrap_or_else(|_| "claude".to_string());
        Self { command }
    }
}

fn permission_flag(mode: PermissionMode) -> Option<&'static str> {
    match mode {
        PermissionMode::Default => None,
        PermissionMode::AcceptEdits => Some("acceptEdits"),
        PermissionMode::BypassPermissions => Some("bypassPermissions"),
        PermissionMode::Plan => Some("plan"),
    }
}

#[async_trait]
impl AgentRuntime for ProcessRuntime {
    async fn run(
        &self,
        request: RuntimeRequest,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RuntimeEvent>, RuntimeError> {
        let agent = &request.agent;
        let mut command = tokio::process::Command::new(&self.command);
        command.arg("--print");
        if let Some(model) = &agent.model {
            command.args(["--model", model]);
        }
        if let Some(max_turns) = agent.max_turns {
            command.args(["--max-turns", &max_turns.to_string()]);
        }
        if let Some(mode) = permission_flag(agent.permission_mode) {
            command.args(["--permission-mode", mode]);
        }
        if !agent.allowed_tools.is_empty() {
            command.args(["--allowed-tools", &agent.allowed_tools.join(",")]);
        }
        if !agent.disallowed_tools.is_empty() {
            command.args(["--disallowed-tools", &agent.disallowed_tools.join(",")]);
        }
        if let Some(system_prompt) = &agent.system_prompt {
            command.args(["--append-system-prompt", system_prompt]);
        }
        if let Some(session) = &request.resume_session {
            command.args(["--resume", session]);
        }
        if let Some(prompt) = &request.prompt {
            command.arg(prompt);
        }
        command
            .env("HERD_JOB_ID", request.job_id.as_str())
            .env("HERD_SESSIONS_DIR", &request.sessions_dir)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| RuntimeError::Spawn(format!("{}: {e}", self.command)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::Spawn("no stdout pipe".to_string()))?;
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = child.kill().await;
                        return;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(text)) => {
                            let message = TranscriptMessage::Assistant {
                                timestamp: Utc::now(),
                                text,
                            };
                            if tx.send(RuntimeEvent::Message(message)).await.is_err() {
                                let _ = child.kill().await;
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            let _ = tx
                                .send(RuntimeEvent::Message(TranscriptMessage::Error {
                                    timestamp: Utc::now(),
                                    message: format!("cannot read runtime output: {e}"),
                                }))
                                .await;
                            let _ = child.kill().await;
                            return;
                        }
                    },
                }
            }

            match child.wait().await {
                Ok(status) if status.success() => {
                    let _ = tx.send(RuntimeEvent::Done(RunOutcome::Success)).await;
                }
                Ok(status) => {
                    let mut detail = String::new();
                    if let Some(stderr) = stderr {
                        let mut err_lines = BufReader::new(stderr).lines();
                        while let Ok(Some(line)) = err_lines.next_line().await {
                            if !detail.is_empty() {
                                detail.push('\n');
                            }
                            detail.push_str(&line);
                        }
                    }
                    let message = if detail.is_empty() {
                        format!("runtime exited with {status}")
                    } else {
                        format!("runtime exited with {status}: {detail}")
                    };
                    let _ = tx
                        .send(RuntimeEvent::Message(TranscriptMessage::Error {
                            timestamp: Utc::now(),
                            message,
                        }))
                        .await;
                }
                Err(e) => {
                    let _ = tx
                        .send(RuntimeEvent::Message(TranscriptMessage::Error {
                            timestamp: Utc::now(),
                            message: format!("cannot reap runtime process: {e}"),
                        }))
                        .await;
                }
            }
        });

        Ok(rx)
    }
}
