// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn run(yaml: &str, env: &BTreeMap<String, String>) -> (Value, Vec<ConfigError>) {
    let mut value: Value = serde_yaml::from_str(yaml).unwrap();
    let mut errors = Vec::new();
    interpolate_value(&mut value, "", env, &mut errors);
    (value, errors)
}

#[test]
fn substitutes_defined_variable() {
    let (value, errors) = run("token: ${TOKEN}", &env(&[("TOKEN", "s3cret")]));
    assert!(errors.is_empty());
    assert_eq!(value["token"], Value::String("s3cret".to_string()));
}

#[test]
fn substitutes_left_to_right() {
    let (value, errors) = run(
        "cmd: ${A}-${B}-${A}",
        &env(&[("A", "x"), ("B", "y")]),
    );
    assert!(errors.is_empty());
    assert_eq!(value["cmd"], Value::String("x-y-x".to_string()));
}

#[test]
fn default_applies_when_unset() {
    let (value, errors) = run("model: ${MODEL:-sonnet}", &env(&[]));
    assert!(errors.is_empty());
    assert_eq!(value["model"], Value::String("sonnet".to_string()));
}

#[test]
fn empty_env_value_is_a_valid_substitution() {
    // Set-but-empty does not fall back to the default.
    let (value, errors) = run("model: ${MODEL:-sonnet}", &env(&[("MODEL", "")]));
    assert!(errors.is_empty());
    assert_eq!(value["model"], Value::String(String::new()));
}

#[test]
fn empty_default_is_allowed() {
    let (value, errors) = run("model: x${MODEL:-}y", &env(&[]));
    assert!(errors.is_empty());
    assert_eq!(value["model"], Value::String("xy".to_string()));
}

#[test]
fn undefined_variable_reports_dotted_path() {
    let (_, errors) = run("docker:\n  env:\n    TOKEN: ${MISSING}\n", &env(&[]));
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UndefinedVariable { variable, path } => {
            assert_eq!(variable, "MISSING");
            assert_eq!(path, "docker.env.TOKEN");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn sequence_paths_are_indexed() {
    let (_, errors) = run("volumes:\n  - ${VOL}\n", &env(&[]));
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UndefinedVariable { path, .. } => assert_eq!(path, "volumes[0]"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_string_values_pass_through() {
    let (value, errors) = run("max_turns: 40\nenabled: true\n", &env(&[]));
    assert!(errors.is_empty());
    assert_eq!(value["max_turns"], Value::Number(40.into()));
    assert_eq!(value["enabled"], Value::Bool(true));
}

#[test]
fn literal_text_without_placeholders_is_untouched() {
    let (value, errors) = run("prompt: a $plain {brace} $\n", &env(&[]));
    assert!(errors.is_empty());
    assert_eq!(
        value["prompt"],
        Value::String("a $plain {brace} $".to_string())
    );
}

#[test]
fn env_file_does_not_override_process_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env");
    std::fs::write(&path, "TOKEN=from-file\nEXTRA=loaded\n# comment\nbroken line\n").unwrap();

    let mut env = env(&[("TOKEN", "from-process")]);
    load_env_file(&path, &mut env);

    assert_eq!(env.get("TOKEN").map(String::as_str), Some("from-process"));
    assert_eq!(env.get("EXTRA").map(String::as_str), Some("loaded"));
    assert!(!env.contains_key("broken line"));
}

#[test]
fn env_file_missing_is_fine() {
    let mut map = env(&[]);
    load_env_file(Path::new("/nonexistent/.env"), &mut map);
    assert!(map.is_empty());
}
