// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript messages.
//!
//! One JSON record per line of the append-only `<id>.jsonl` transcript.
//! The union is append-only: readers must tolerate unknown fields and
//! partially written trailing lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single typed record in a job transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptMessage {
    System {
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    Assistant {
        timestamp: DateTime<Utc>,
        text: String,
    },
    ToolUse {
        timestamp: DateTime<Utc>,
        tool: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        timestamp: DateTime<Utc>,
        tool: String,
        #[serde(default)]
        output: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },
    Error {
        timestamp: DateTime<Utc>,
        message: String,
    },
}

impl TranscriptMessage {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TranscriptMessage::System { timestamp, .. }
            | TranscriptMessage::Assistant { timestamp, .. }
            | TranscriptMessage::ToolUse { timestamp, .. }
            | TranscriptMessage::ToolResult { timestamp, .. }
            | TranscriptMessage::Error { timestamp, .. } => *timestamp,
        }
    }

    /// Wire name of the variant, as used in `job:output` events.
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptMessage::System { .. } => "system",
            TranscriptMessage::Assistant { .. } => "assistant",
            TranscriptMessage::ToolUse { .. } => "tool_use",
            TranscriptMessage::ToolResult { .. } => "tool_result",
            TranscriptMessage::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
