// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config diffing for reloads.
//!
//! Two loads producing the same resolved agent set diff to an empty
//! change list; that property is what makes `reload` idempotent.

use herd_core::agent::AgentSpec;
use herd_core::event::ReloadSummary;
use std::collections::BTreeMap;

/// Schedule-level changes for one surviving agent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModifiedAgent {
    pub qualified_name: String,
    pub schedules_added: Vec<String>,
    pub schedules_removed: Vec<String>,
    pub schedules_modified: Vec<String>,
    /// True when non-schedule fields (prompt, permissions, limits) changed.
    pub settings_changed: bool,
}

/// The full change set between two resolved configs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigChanges {
    pub added: Vec<AgentSpec>,
    pub removed: Vec<AgentSpec>,
    pub modified: Vec<ModifiedAgent>,
}

impl ConfigChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Name-only view for the `config:reloaded` event.
    pub fn summary(&self) -> ReloadSummary {
        ReloadSummary {
            added: self.added.iter().map(|a| a.qualified_name.clone()).collect(),
            removed: self.removed.iter().map(|a| a.qualified_name.clone()).collect(),
            modified: self.modified.iter().map(|m| m.qualified_name.clone()).collect(),
        }
    }
}

/// Compare two resolved agent sets by qualified name.
pub fn compute_config_changes(old: &[AgentSpec], new: &[AgentSpec]) -> ConfigChanges {
    let old_by_name: BTreeMap<&str, &AgentSpec> =
        old.iter().map(|a| (a.qualified_name.as_str(), a)).collect();
    let new_by_name: BTreeMap<&str, &AgentSpec> =
        new.iter().map(|a| (a.qualified_name.as_str(), a)).collect();

    let mut changes = ConfigChanges::default();

    for (name, new_agent) in &new_by_name {
        match old_by_name.get(name) {
            None => changes.added.push((*new_agent).clone()),
            Some(old_agent) if old_agent != new_agent => {
                changes.modified.push(diff_agent(old_agent, new_agent));
            }
            Some(_) => {}
        }
    }

    for (name, old_agent) in &old_by_name {
        if !new_by_name.contains_key(name) {
            changes.removed.push((*old_agent).clone());
        }
    }

    changes
}

fn diff_agent(old: &AgentSpec, new: &AgentSpec) -> ModifiedAgent {
    let mut modified = ModifiedAgent {
        qualified_name: new.qualified_name.clone(),
        ..Default::default()
    };

    for name in new.schedules.keys() {
        match old.schedules.get(name) {
            None => modified.schedules_added.push(name.clone()),
            Some(old_spec) if old_spec != &new.schedules[name] => {
                modified.schedules_modified.push(name.clone());
            }
            Some(_) => {}
        }
    }
    for name in old.schedules.keys() {
        if !new.schedules.contains_key(name) {
            modified.schedules_removed.push(name.clone());
        }
    }

    let mut old_sans = old.clone();
    let mut new_sans = new.clone();
    old_sans.schedules.clear();
    new_sans.schedules.clear();
    modified.settings_changed = old_sans != new_sans;

    modified
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
