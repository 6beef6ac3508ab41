// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier generation and validation.
//!
//! Job ids are date-prefixed so a directory of job files sorts
//! chronologically: `job-YYYY-MM-DD-<6 lowercase alphanumerics>`.

use crate::clock::Clock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Alphabet for the random suffix: lowercase alphanumerics only.
const SUFFIX_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 6;

#[allow(clippy::expect_used)]
static JOB_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^job-\d{4}-\d{2}-\d{2}-[a-z0-9]{6}$").expect("constant regex pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid job id {0:?}: expected job-YYYY-MM-DD-xxxxxx")]
pub struct InvalidJobIdError(pub String);

/// Unique identifier for one job invocation.
///
/// Always matches `^job-\d{4}-\d{2}-\d{2}-[a-z0-9]{6}$`; parsing and
/// deserialization both enforce the format, so a `JobId` held in memory is
/// known-valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a new id for the clock's current UTC date.
    ///
    /// The suffix comes from `random`; short outputs are right-padded with
    /// `0` and long outputs truncated, so any random source yields exactly
    /// [`SUFFIX_LEN`] characters.
    pub fn generate(clock: &impl Clock, random: impl FnOnce() -> String) -> Self {
        let date = clock.now_utc().format("%Y-%m-%d");
        let suffix = normalize_suffix(&random());
        Self(format!("job-{date}-{suffix}"))
    }

    /// Generate a new id with the default nanoid-backed suffix.
    pub fn new(clock: &impl Clock) -> Self {
        Self::generate(clock, || nanoid::nanoid!(SUFFIX_LEN, &SUFFIX_ALPHABET))
    }

    /// Parse and validate an id string.
    pub fn parse(s: &str) -> Result<Self, InvalidJobIdError> {
        if JOB_ID_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidJobIdError(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `YYYY-MM-DD` date portion.
    pub fn date_part(&self) -> &str {
        &self.0[4..14]
    }

    /// The 6-character random suffix.
    pub fn suffix(&self) -> &str {
        &self.0[15..]
    }
}

fn normalize_suffix(raw: &str) -> String {
    let mut out: String = raw.chars().take(SUFFIX_LEN).collect();
    while out.chars().count() < SUFFIX_LEN {
        out.push('0');
    }
    out
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JobId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for JobId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::str::FromStr for JobId {
    type Err = InvalidJobIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
