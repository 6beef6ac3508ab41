// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn yaml(s: &str) -> Value {
    serde_yaml::from_str(s).unwrap()
}

#[test]
fn inner_keys_override_outer() {
    let mut base = yaml("model: opus\nmax_turns: 40\n");
    deep_merge(&mut base, &yaml("model: sonnet\n"));
    assert_eq!(base, yaml("model: sonnet\nmax_turns: 40\n"));
}

#[test]
fn nested_mappings_merge_key_by_key() {
    let mut base = yaml("docker:\n  image: base\n  network: host\n");
    deep_merge(&mut base, &yaml("docker:\n  image: custom\n"));
    assert_eq!(base, yaml("docker:\n  image: custom\n  network: host\n"));
}

#[test]
fn sequences_replace_wholesale() {
    let mut base = yaml("allow: [Bash, Read]\n");
    deep_merge(&mut base, &yaml("allow: [Glob]\n"));
    assert_eq!(base, yaml("allow: [Glob]\n"));
}

#[test]
fn fold_defaults_applies_outermost_first() {
    let merged = fold_defaults(&[
        yaml("model: opus\nsession:\n  timeout: 1h\n"),
        yaml("model: sonnet\n"),
        yaml("max_turns: 10\n"),
    ]);
    assert_eq!(
        merged,
        yaml("model: sonnet\nsession:\n  timeout: 1h\nmax_turns: 10\n")
    );
}

#[test]
fn fold_defaults_empty_chain_is_empty_mapping() {
    assert_eq!(fold_defaults(&[]), Value::Mapping(serde_yaml::Mapping::new()));
}
