// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive fleet loading and resolution.

use crate::env::{interpolate_value, load_env_file};
use crate::error::{ConfigError, ConfigurationError};
use crate::merge::{deep_merge, fold_defaults};
use crate::raw::{AgentFile, FleetFile, FleetRef, RawSchedule, RawScheduleKind};
use herd_core::agent::{AgentSpec, SessionPolicy};
use herd_core::cron::CronExpression;
use herd_core::name::{is_valid_name, qualified_name};
use herd_core::schedule::{parse_duration, ScheduleKind, ScheduleSpec};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Canonical fleet file names looked up when a directory is given.
pub const FLEET_FILE_NAMES: [&str; 2] = ["herdctl.yaml", "herdctl.yml"];

/// Inputs to a load: the environment and whether to read a `.env` file
/// next to the root config.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub env: BTreeMap<String, String>,
    pub use_env_file: bool,
}

impl LoadOptions {
    /// Options seeded from the process environment.
    pub fn from_process_env() -> Self {
        Self {
            env: std::env::vars().collect(),
            use_env_file: true,
        }
    }
}

/// Fleet-wide job retention limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_jobs_per_agent: usize,
    pub max_total_jobs: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { max_jobs_per_agent: 100, max_total_jobs: None }
    }
}

/// The immutable result of a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub agents: Vec<AgentSpec>,
    pub retention: RetentionPolicy,
    /// The root fleet file.
    pub config_path: PathBuf,
    /// Its containing directory.
    pub config_dir: PathBuf,
}

impl ResolvedConfig {
    pub fn agent(&self, qualified: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.qualified_name == qualified)
    }

    /// All agents carrying the given local name, across fleets.
    pub fn agents_by_local_name(&self, local: &str) -> Vec<&AgentSpec> {
        self.agents.iter().filter(|a| a.local_name == local).collect()
    }

    pub fn qualified_names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.qualified_name.clone()).collect()
    }
}

/// Load and resolve a fleet configuration.
///
/// `root` may be the fleet file itself or a directory containing one of
/// [`FLEET_FILE_NAMES`].
pub fn load(root: &Path, opts: &LoadOptions) -> Result<ResolvedConfig, ConfigurationError> {
    let config_path = resolve_root(root).map_err(ConfigurationError::single)?;
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut env = opts.env.clone();
    if opts.use_env_file {
        load_env_file(&config_dir.join(".env"), &mut env);
    }

    let mut loader = Loader {
        env,
        errors: Vec::new(),
        stack: Vec::new(),
        agents: Vec::new(),
        agent_sources: HashMap::new(),
        retention: RetentionPolicy::default(),
    };

    if let Err(fatal) = loader.load_fleet(&config_path, None, Vec::new(), Vec::new(), true) {
        loader.errors.push(fatal);
    }

    if loader.errors.is_empty() {
        tracing::debug!(
            agents = loader.agents.len(),
            config = %config_path.display(),
            "fleet config loaded"
        );
        Ok(ResolvedConfig {
            agents: loader.agents,
            retention: loader.retention,
            config_path,
            config_dir,
        })
    } else {
        Err(ConfigurationError::new(loader.errors))
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf, ConfigError> {
    let read_err = |path: &Path, source: std::io::Error| ConfigError::Read {
        path: path.to_path_buf(),
        parent: None,
        source,
    };

    let metadata = std::fs::metadata(root).map_err(|e| read_err(root, e))?;
    if metadata.is_dir() {
        for name in FLEET_FILE_NAMES {
            let candidate = root.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        return Err(read_err(
            &root.join(FLEET_FILE_NAMES[0]),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no fleet file in directory"),
        ));
    }
    Ok(root.to_path_buf())
}

/// Resolve a fleet reference path to a concrete file.
fn resolve_fleet_ref(base_dir: &Path, reference: &str) -> PathBuf {
    let joined = base_dir.join(reference);
    if joined.is_dir() {
        for name in FLEET_FILE_NAMES {
            let candidate = joined.join(name);
            if candidate.is_file() {
                return candidate;
            }
        }
        return joined.join(FLEET_FILE_NAMES[0]);
    }
    joined
}

/// Fallback fleet name: the parent directory for canonically named files,
/// the file stem otherwise.
fn fleet_name_from_path(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if FLEET_FILE_NAMES.contains(&file_name) {
        Some(path.parent()?.file_name()?.to_str()?.to_string())
    } else {
        Some(path.file_stem()?.to_str()?.to_string())
    }
}

struct Loader {
    env: BTreeMap<String, String>,
    errors: Vec<ConfigError>,
    /// Canonical paths of fleet files currently on the load stack.
    stack: Vec<PathBuf>,
    agents: Vec<AgentSpec>,
    agent_sources: HashMap<String, PathBuf>,
    retention: RetentionPolicy,
}

impl Loader {
    /// Load one fleet file and everything below it.
    ///
    /// Structural failures (unreadable, unparseable, cycle) return `Err`;
    /// field-level problems are pushed onto `self.errors` and loading
    /// continues so one pass reports as much as possible.
    fn load_fleet(
        &mut self,
        path: &Path,
        parent: Option<&Path>,
        fleet_path: Vec<String>,
        defaults_chain: Vec<Value>,
        is_root: bool,
    ) -> Result<(), ConfigError> {
        let (file, canonical) = self.open_fleet_file(path, parent)?;
        self.process_fleet(file, path, canonical, fleet_path, defaults_chain, is_root)
    }

    /// Canonicalize, cycle-check, read, and version-check a fleet file.
    fn open_fleet_file(
        &mut self,
        path: &Path,
        parent: Option<&Path>,
    ) -> Result<(FleetFile, PathBuf), ConfigError> {
        let canonical = std::fs::canonicalize(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            parent: parent.map(Path::to_path_buf),
            source: e,
        })?;

        if self.stack.contains(&canonical) {
            let mut chain = self.stack.clone();
            chain.push(canonical);
            return Err(ConfigError::Cycle { chain });
        }

        let file = self.read_fleet_file(path, parent)?;
        if file.version < 1 {
            return Err(ConfigError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: file.version,
            });
        }
        Ok((file, canonical))
    }

    fn process_fleet(
        &mut self,
        file: FleetFile,
        path: &Path,
        canonical: PathBuf,
        fleet_path: Vec<String>,
        defaults_chain: Vec<Value>,
        is_root: bool,
    ) -> Result<(), ConfigError> {
        if is_root {
            if let Some(raw) = file.retention {
                let defaults = RetentionPolicy::default();
                self.retention = RetentionPolicy {
                    max_jobs_per_agent: raw
                        .max_jobs_per_agent
                        .unwrap_or(defaults.max_jobs_per_agent),
                    max_total_jobs: raw.max_total_jobs,
                };
            }
        }

        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut chain = defaults_chain;
        if let Some(defaults) = &file.defaults {
            chain.push(defaults.clone());
        }

        self.stack.push(canonical);

        for agent_ref in &file.agents {
            let agent_path = base_dir.join(&agent_ref.path);
            if let Err(e) = self.load_agent(&agent_path, path, &fleet_path, &chain) {
                self.errors.push(e);
            }
        }

        // Sub-fleet names must be unique within this parent.
        let mut seen_names: HashMap<String, PathBuf> = HashMap::new();
        for fleet_ref in &file.fleets {
            match self.descend(path, &base_dir, fleet_ref, &fleet_path, &chain, &mut seen_names) {
                Ok(()) => {}
                Err(e) => self.errors.push(e),
            }
        }

        self.stack.pop();
        Ok(())
    }

    fn descend(
        &mut self,
        parent_path: &Path,
        base_dir: &Path,
        fleet_ref: &FleetRef,
        fleet_path: &[String],
        defaults_chain: &[Value],
        seen_names: &mut HashMap<String, PathBuf>,
    ) -> Result<(), ConfigError> {
        let sub_path = resolve_fleet_ref(base_dir, &fleet_ref.path);

        // One read serves both the name peek and the recursion below.
        let (sub_file, canonical) = self.open_fleet_file(&sub_path, Some(parent_path))?;

        let name = fleet_ref
            .name
            .clone()
            .or_else(|| sub_file.fleet.as_ref().and_then(|m| m.name.clone()))
            .or_else(|| fleet_name_from_path(&sub_path))
            .unwrap_or_default();

        if !is_valid_name(&name) {
            return Err(ConfigError::InvalidFleetName { name, path: sub_path });
        }

        if let Some(first) = seen_names.get(&name) {
            return Err(ConfigError::FleetNameCollision {
                name,
                parent: parent_path.to_path_buf(),
                first: first.clone(),
                second: sub_path,
            });
        }
        seen_names.insert(name.clone(), sub_path.clone());

        let mut child_fleet_path = fleet_path.to_vec();
        child_fleet_path.push(name);

        self.process_fleet(
            sub_file,
            &sub_path,
            canonical,
            child_fleet_path,
            defaults_chain.to_vec(),
            false,
        )
    }

    /// Read, interpolate, and deserialize one fleet file.
    fn read_fleet_file(
        &mut self,
        path: &Path,
        parent: Option<&Path>,
    ) -> Result<FleetFile, ConfigError> {
        let value = self.read_yaml(path, parent)?;
        serde_yaml::from_value(value).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            parent: parent.map(Path::to_path_buf),
            source: e,
        })
    }

    fn read_yaml(&mut self, path: &Path, parent: Option<&Path>) -> Result<Value, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            parent: parent.map(Path::to_path_buf),
            source: e,
        })?;
        let mut value: Value = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            parent: parent.map(Path::to_path_buf),
            source: e,
        })?;
        interpolate_value(&mut value, "", &self.env, &mut self.errors);
        Ok(value)
    }

    fn load_agent(
        &mut self,
        path: &Path,
        parent: &Path,
        fleet_path: &[String],
        defaults_chain: &[Value],
    ) -> Result<(), ConfigError> {
        let agent_value = self.read_yaml(path, Some(parent))?;

        // Defaults under the agent's own keys, agent file winning.
        let mut merged = fold_defaults(defaults_chain);
        deep_merge(&mut merged, &agent_value);

        let file: AgentFile = serde_yaml::from_value(merged).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            parent: Some(parent.to_path_buf()),
            source: e,
        })?;

        if !is_valid_name(&file.name) {
            return Err(ConfigError::InvalidAgentName {
                name: file.name,
                path: path.to_path_buf(),
            });
        }

        let qualified = qualified_name(fleet_path, &file.name);
        if let Some(first) = self.agent_sources.get(&qualified) {
            return Err(ConfigError::DuplicateAgent {
                qualified,
                first: first.clone(),
                second: path.to_path_buf(),
            });
        }

        let mut schedules = BTreeMap::new();
        for (schedule_name, raw) in &file.schedules {
            match build_schedule(&qualified, schedule_name, raw) {
                Ok(spec) => {
                    schedules.insert(schedule_name.clone(), spec);
                }
                Err(e) => self.errors.push(e),
            }
        }

        let permissions = file.permissions.unwrap_or_default();
        let session = SessionPolicy {
            timeout: match file.session.and_then(|s| s.timeout) {
                Some(raw) => match parse_duration(&raw) {
                    Ok(d) => Some(d),
                    Err(source) => {
                        self.errors.push(ConfigError::InvalidInterval {
                            agent: qualified.clone(),
                            schedule: "session.timeout".to_string(),
                            source,
                        });
                        None
                    }
                },
                None => None,
            },
        };

        self.agent_sources.insert(qualified.clone(), path.to_path_buf());
        self.agents.push(AgentSpec {
            local_name: file.name,
            fleet_path: fleet_path.to_vec(),
            qualified_name: qualified,
            description: file.description,
            system_prompt: file.system_prompt,
            permission_mode: permissions.mode.unwrap_or_default(),
            allowed_tools: permissions.allow,
            disallowed_tools: permissions.deny,
            runtime: file.runtime.unwrap_or_default(),
            docker: file.docker,
            model: file.model,
            max_turns: file.max_turns,
            session,
            max_concurrent: file.max_concurrent.unwrap_or(1).max(1),
            schedules,
        });
        Ok(())
    }
}

fn build_schedule(
    agent: &str,
    name: &str,
    raw: &RawSchedule,
) -> Result<ScheduleSpec, ConfigError> {
    let kind = match raw.kind {
        RawScheduleKind::Interval => {
            let text = raw.interval.as_deref().ok_or_else(|| ConfigError::InvalidSchedule {
                agent: agent.to_string(),
                schedule: name.to_string(),
                message: "interval schedules require an `interval` field".to_string(),
            })?;
            let every = parse_duration(text).map_err(|source| ConfigError::InvalidInterval {
                agent: agent.to_string(),
                schedule: name.to_string(),
                source,
            })?;
            ScheduleKind::Interval { every }
        }
        RawScheduleKind::Cron => {
            let text = raw.expression.as_deref().ok_or_else(|| ConfigError::InvalidSchedule {
                agent: agent.to_string(),
                schedule: name.to_string(),
                message: "cron schedules require an `expression` field".to_string(),
            })?;
            let expression =
                CronExpression::parse(text).map_err(|source| ConfigError::InvalidCron {
                    agent: agent.to_string(),
                    schedule: name.to_string(),
                    source,
                })?;
            ScheduleKind::Cron { expression }
        }
        RawScheduleKind::Webhook => ScheduleKind::Webhook,
        RawScheduleKind::Chat => ScheduleKind::Chat,
    };

    Ok(ScheduleSpec {
        name: name.to_string(),
        kind,
        prompt: raw.prompt.clone(),
    })
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
