// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed configuration errors.
//!
//! Structural failures (unreadable file, cycle) abort the load at once;
//! field-level failures are collected so one load reports every problem.
//! Either way the caller sees a single [`ConfigurationError`].

use herd_core::cron::CronParseError;
use herd_core::schedule::IntervalParseError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}{}: {source}", path.display(), referenced_from(parent))]
    Read {
        path: PathBuf,
        parent: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}{}: {source}", path.display(), referenced_from(parent))]
    Parse {
        path: PathBuf,
        parent: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported config version {version} in {} (expected >= 1)", path.display())]
    UnsupportedVersion { path: PathBuf, version: i64 },

    #[error("fleet cycle detected: {}", join_paths(chain))]
    Cycle { chain: Vec<PathBuf> },

    #[error(
        "duplicate fleet name {name:?} under {}: {} and {}",
        parent.display(), first.display(), second.display()
    )]
    FleetNameCollision {
        name: String,
        parent: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("invalid fleet name {name:?} in {}", path.display())]
    InvalidFleetName { name: String, path: PathBuf },

    #[error("invalid agent name {name:?} in {}", path.display())]
    InvalidAgentName { name: String, path: PathBuf },

    #[error(
        "duplicate agent {qualified:?}: defined in {} and {}",
        first.display(), second.display()
    )]
    DuplicateAgent {
        qualified: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("undefined variable ${{{variable}}} at {path}")]
    UndefinedVariable { variable: String, path: String },

    #[error("agent {agent:?} schedule {schedule:?}: {source}")]
    InvalidInterval {
        agent: String,
        schedule: String,
        #[source]
        source: IntervalParseError,
    },

    #[error("agent {agent:?} schedule {schedule:?}: {source}")]
    InvalidCron {
        agent: String,
        schedule: String,
        #[source]
        source: CronParseError,
    },

    #[error("agent {agent:?} schedule {schedule:?}: {message}")]
    InvalidSchedule {
        agent: String,
        schedule: String,
        message: String,
    },
}

fn referenced_from(parent: &Option<PathBuf>) -> String {
    match parent {
        Some(p) => format!(" (referenced from {})", p.display()),
        None => String::new(),
    }
}

fn join_paths(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Aggregate of every error found in one load attempt.
#[derive(Debug)]
pub struct ConfigurationError {
    pub errors: Vec<ConfigError>,
}

impl std::error::Error for ConfigurationError {}

impl ConfigurationError {
    pub fn new(errors: Vec<ConfigError>) -> Self {
        Self { errors }
    }

    pub fn single(error: ConfigError) -> Self {
        Self { errors: vec![error] }
    }

    /// The first error, for callers that only surface one.
    pub fn first(&self) -> Option<&ConfigError> {
        self.errors.first()
    }
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors.as_slice() {
            [only] => write!(f, "{only}"),
            errors => {
                writeln!(f, "configuration invalid ({} errors):", errors.len())?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}
