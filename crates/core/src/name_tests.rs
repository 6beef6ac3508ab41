// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "researcher" },
    leading_digit = { "0dte-watcher" },
    underscores = { "memory_keeper" },
    mixed = { "Agent-7_b" },
    single_char = { "a" },
)]
fn valid_names(name: &str) {
    assert!(is_valid_name(name), "{name:?} should be valid");
}

#[parameterized(
    empty = { "" },
    leading_dash = { "-agent" },
    leading_underscore = { "_agent" },
    dotted = { "ops.agent" },
    spaced = { "my agent" },
    slash = { "a/b" },
)]
fn invalid_names(name: &str) {
    assert!(!is_valid_name(name), "{name:?} should be invalid");
}

#[test]
fn qualified_name_joins_with_dots() {
    let path = vec!["ops".to_string(), "oncall".to_string()];
    assert_eq!(qualified_name(&path, "pager"), "ops.oncall.pager");
}

#[test]
fn qualified_name_root_agent_is_bare() {
    assert_eq!(qualified_name(&[], "pager"), "pager");
}
