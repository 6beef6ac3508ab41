// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment interpolation over YAML documents.
//!
//! Every string scalar is scanned for `${VAR}` and `${VAR:-default}`,
//! replaced left to right. A variable that is set but empty substitutes
//! the empty string; only an unset variable falls back to the default or
//! fails. Non-string values pass through untouched.

use crate::error::ConfigError;
use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static ENV_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("constant regex pattern is valid")
});

/// Interpolate one string, collecting undefined-variable errors under the
/// given dotted path.
fn interpolate_str(
    input: &str,
    dotted_path: &str,
    env: &BTreeMap<String, String>,
    errors: &mut Vec<ConfigError>,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in ENV_PATTERN.captures_iter(input) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        out.push_str(&input[last..whole.start()]);
        last = whole.end();

        let name = &caps[1];
        match env.get(name) {
            Some(value) => out.push_str(value),
            None => match caps.get(2) {
                Some(default) => out.push_str(default.as_str()),
                None => {
                    errors.push(ConfigError::UndefinedVariable {
                        variable: name.to_string(),
                        path: dotted_path.to_string(),
                    });
                }
            },
        }
    }
    out.push_str(&input[last..]);
    out
}

/// Walk a YAML document, interpolating every string scalar in place.
///
/// `prefix` seeds the dotted paths reported in errors (empty at the root).
pub fn interpolate_value(
    value: &mut Value,
    prefix: &str,
    env: &BTreeMap<String, String>,
    errors: &mut Vec<ConfigError>,
) {
    match value {
        Value::String(s) => {
            *s = interpolate_str(s, prefix, env, errors);
        }
        Value::Mapping(map) => {
            for (key, child) in map.iter_mut() {
                let segment = match key {
                    Value::String(k) => k.clone(),
                    other => serde_yaml::to_string(other)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                };
                let child_path = if prefix.is_empty() {
                    segment
                } else {
                    format!("{prefix}.{segment}")
                };
                interpolate_value(child, &child_path, env, errors);
            }
        }
        Value::Sequence(seq) => {
            for (i, child) in seq.iter_mut().enumerate() {
                let child_path = if prefix.is_empty() {
                    format!("[{i}]")
                } else {
                    format!("{prefix}[{i}]")
                };
                interpolate_value(child, &child_path, env, errors);
            }
        }
        _ => {}
    }
}

/// Read a `.env` file of `KEY=VALUE` lines into the environment map.
///
/// Existing entries win: the process environment overrides the file.
/// Missing files are fine; malformed lines are skipped.
pub fn load_env_file(path: &Path, env: &mut BTreeMap<String, String>) {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return,
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"').trim_matches('\'');
        env.entry(key.to_string()).or_insert_with(|| value.to_string());
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
