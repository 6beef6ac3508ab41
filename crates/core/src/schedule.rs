// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule specifications and durable schedule state.

use crate::cron::CronExpression;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

#[allow(clippy::expect_used)]
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(ms|s|m|h|d)$").expect("constant regex pattern is valid"));

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid interval {0:?}: expected <number><ms|s|m|h|d>")]
pub struct IntervalParseError(pub String);

/// Parse a human duration like `500ms`, `30s`, `5m`, `2h`, `1d`.
pub fn parse_duration(s: &str) -> Result<Duration, IntervalParseError> {
    let caps = DURATION_RE
        .captures(s.trim())
        .ok_or_else(|| IntervalParseError(s.to_string()))?;
    let value: u64 = caps[1]
        .parse()
        .map_err(|_| IntervalParseError(s.to_string()))?;
    let duration = match &caps[2] {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value * 60),
        "h" => Duration::from_secs(value * 3600),
        "d" => Duration::from_secs(value * 86_400),
        _ => return Err(IntervalParseError(s.to_string())),
    };
    Ok(duration)
}

/// What causes a schedule to fire.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleKind {
    /// Fire every `every`, measured from the previous run.
    Interval { every: Duration },
    /// Fire on a five-field cron expression (evaluated in local time).
    Cron { expression: CronExpression },
    /// No time trigger; kicked by an external webhook.
    Webhook,
    /// No time trigger; kicked by a chat connector.
    Chat,
}

impl ScheduleKind {
    /// Reason string recorded on `schedule:triggered` events.
    pub fn trigger_reason(&self) -> &'static str {
        match self {
            ScheduleKind::Interval { .. } => "interval",
            ScheduleKind::Cron { .. } => "cron",
            ScheduleKind::Webhook => "webhook",
            ScheduleKind::Chat => "chat",
        }
    }

    /// Whether the scheduler's tick loop ever fires this schedule.
    pub fn is_timed(&self) -> bool {
        matches!(self, ScheduleKind::Interval { .. } | ScheduleKind::Cron { .. })
    }
}

/// A resolved schedule attached to an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSpec {
    pub name: String,
    pub kind: ScheduleKind,
    /// Prompt used when this schedule fires (unless the trigger overrides it).
    pub prompt: Option<String>,
}

/// Durable status of one `(agent, schedule)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    #[default]
    Idle,
    Running,
    Disabled,
}

crate::simple_display! {
    ScheduleStatus {
        Idle => "idle",
        Running => "running",
        Disabled => "disabled",
    }
}

/// Durable per-schedule state, keyed by `(qualified agent name, schedule name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScheduleState {
    #[serde(default)]
    pub status: ScheduleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
