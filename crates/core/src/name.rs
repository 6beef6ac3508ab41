// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent and fleet name rules.
//!
//! Dots are reserved as the fleet-path separator, so neither agent nor
//! fleet names may contain them.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("constant regex pattern is valid")
});

/// Check a local agent or fleet name against the shared syntax rule.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Build a globally unique qualified name from a fleet chain and a local name.
///
/// The chain excludes the root fleet, so agents defined directly at the
/// root carry their bare local name.
pub fn qualified_name(fleet_path: &[String], local_name: &str) -> String {
    if fleet_path.is_empty() {
        local_name.to_string()
    } else {
        let mut parts: Vec<&str> = fleet_path.iter().map(String::as_str).collect();
        parts.push(local_name);
        parts.join(".")
    }
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
