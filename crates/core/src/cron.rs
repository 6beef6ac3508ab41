// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Five-field cron expressions.
//!
//! `minute hour day-of-month month day-of-week`, with ranges `a-b`,
//! steps `*/n` and `a-b/n`, lists `a,b,c`, and `*`. Day-of-week runs
//! 0-7 where both 0 and 7 mean Sunday. Matching follows the standard
//! rule: when both day fields are restricted, either may match.
//!
//! Expressions are evaluated in local time at minute granularity.

use chrono::{DateTime, Datelike, Duration, Local, Timelike};
use std::collections::BTreeSet;
use thiserror::Error;

/// Upper bound on the next-fire search: a little over a year of minutes.
/// Any satisfiable five-field expression fires within this window.
const MAX_SEARCH_MINUTES: i64 = 366 * 24 * 60 + 60;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid cron expression {expression:?}: {reason}")]
pub struct CronParseError {
    pub expression: String,
    pub reason: String,
}

impl CronParseError {
    fn new(expression: &str, reason: impl Into<String>) -> Self {
        Self { expression: expression.to_string(), reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CronField {
    any: bool,
    values: BTreeSet<u32>,
}

impl CronField {
    fn matches(&self, value: u32) -> bool {
        self.any || self.values.contains(&value)
    }
}

/// A parsed five-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
    source: String,
}

impl CronExpression {
    /// Parse the classic `minute hour day-of-month month day-of-week` form.
    pub fn parse(raw: &str) -> Result<Self, CronParseError> {
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronParseError::new(
                raw,
                "expected 5 fields: minute hour day-of-month month day-of-week",
            ));
        }

        Ok(Self {
            minute: parse_field(raw, fields[0], 0, 59, false)?,
            hour: parse_field(raw, fields[1], 0, 23, false)?,
            day_of_month: parse_field(raw, fields[2], 1, 31, false)?,
            month: parse_field(raw, fields[3], 1, 12, false)?,
            day_of_week: parse_field(raw, fields[4], 0, 7, true)?,
            source: raw.to_string(),
        })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the expression matches the given local minute.
    pub fn matches(&self, at: DateTime<Local>) -> bool {
        if !self.minute.matches(at.minute())
            || !self.hour.matches(at.hour())
            || !self.month.matches(at.month())
        {
            return false;
        }

        let dom_match = self.day_of_month.matches(at.day());
        let dow_match = self.day_of_week.matches(at.weekday().num_days_from_sunday());

        // Standard cron: if either day field is a wildcard, both must match;
        // if both are restricted, either may match.
        if self.day_of_month.any || self.day_of_week.any {
            dom_match && dow_match
        } else {
            dom_match || dow_match
        }
    }

    /// The first firing instant strictly after `after`, at minute
    /// granularity. `None` only for unsatisfiable expressions
    /// (e.g. `0 0 31 2 *`).
    pub fn next_after(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        let mut candidate = truncate_to_minute(after) + Duration::minutes(1);
        for _ in 0..MAX_SEARCH_MINUTES {
            if self.matches(candidate) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

impl std::fmt::Display for CronExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn truncate_to_minute(at: DateTime<Local>) -> DateTime<Local> {
    at - Duration::seconds(i64::from(at.second())) - Duration::nanoseconds(i64::from(at.nanosecond()))
}

fn parse_field(
    raw: &str,
    field: &str,
    min: u32,
    max: u32,
    sunday_alias: bool,
) -> Result<CronField, CronParseError> {
    let mut values = BTreeSet::new();
    let mut any = false;

    for part in field.split(',') {
        if part.is_empty() {
            return Err(CronParseError::new(raw, format!("empty list item in {field:?}")));
        }

        let (range_part, step) = match part.split_once('/') {
            Some((r, s)) => {
                let step: u32 = s
                    .parse()
                    .map_err(|_| CronParseError::new(raw, format!("bad step in {part:?}")))?;
                if step == 0 {
                    return Err(CronParseError::new(raw, format!("zero step in {part:?}")));
                }
                (r, step)
            }
            None => (part, 1),
        };

        let (lo, hi) = if range_part == "*" {
            any = step == 1;
            (min, max)
        } else if let Some((a, b)) = range_part.split_once('-') {
            let lo = parse_value(raw, a, min, max)?;
            let hi = parse_value(raw, b, min, max)?;
            if lo > hi {
                return Err(CronParseError::new(raw, format!("inverted range in {part:?}")));
            }
            (lo, hi)
        } else {
            let v = parse_value(raw, range_part, min, max)?;
            (v, v)
        };

        if !any {
            let mut v = lo;
            while v <= hi {
                values.insert(if sunday_alias && v == 7 { 0 } else { v });
                match v.checked_add(step) {
                    Some(next) => v = next,
                    None => break,
                }
            }
        }
    }

    Ok(CronField { any, values })
}

fn parse_value(raw: &str, s: &str, min: u32, max: u32) -> Result<u32, CronParseError> {
    let v: u32 = s
        .parse()
        .map_err(|_| CronParseError::new(raw, format!("bad value {s:?}")))?;
    if v < min || v > max {
        return Err(CronParseError::new(
            raw,
            format!("value {v} out of range {min}-{max}"),
        ));
    }
    Ok(v)
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
