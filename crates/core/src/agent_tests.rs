// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::schedule::{ScheduleKind, ScheduleSpec};

#[test]
fn permission_mode_serde_uses_spec_strings() {
    assert_eq!(
        serde_json::to_string(&PermissionMode::AcceptEdits).unwrap(),
        "\"acceptEdits\""
    );
    assert_eq!(
        serde_json::from_str::<PermissionMode>("\"bypassPermissions\"").unwrap(),
        PermissionMode::BypassPermissions
    );
}

#[test]
fn runtime_kind_serde() {
    assert_eq!(serde_json::to_string(&RuntimeKind::Cli).unwrap(), "\"cli\"");
    assert_eq!(serde_json::from_str::<RuntimeKind>("\"sdk\"").unwrap(), RuntimeKind::Sdk);
}

#[test]
fn builder_defaults() {
    let agent = AgentSpec::builder().build();
    assert_eq!(agent.qualified_name, "worker");
    assert_eq!(agent.max_concurrent, 1);
    assert_eq!(agent.permission_mode, PermissionMode::Default);
    assert!(agent.schedules.is_empty());
}

#[test]
fn schedule_lookup() {
    let mut schedules = BTreeMap::new();
    schedules.insert(
        "tick".to_string(),
        ScheduleSpec {
            name: "tick".to_string(),
            kind: ScheduleKind::Webhook,
            prompt: None,
        },
    );
    let agent = AgentSpec::builder().schedules(schedules).build();
    assert!(agent.schedule("tick").is_some());
    assert!(agent.schedule("missing").is_none());
}
