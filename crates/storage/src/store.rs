// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state store: typed, atomic operations over the state directory.

use crate::atomic::write_atomic;
use crate::error::StorageError;
use crate::filter::{JobFilter, JobListing};
use crate::paths::StatePaths;
use herd_core::id::JobId;
use herd_core::job::Job;
use herd_core::message::TranscriptMessage;
use herd_core::state::{AgentState, FleetState};
use parking_lot::Mutex;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Durable state handle. One instance per supervisor; the fleet state
/// file has exactly one writer at a time, serialized by the internal
/// mutex (never held across I/O completion boundaries other than the
/// state file's own read-modify-write).
pub struct StateStore {
    paths: StatePaths,
    state_lock: Mutex<()>,
}

impl StateStore {
    /// Open a store, creating the directory layout if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let paths = StatePaths::new(root);
        for dir in [
            paths.root().to_path_buf(),
            paths.jobs_dir(),
            paths.sessions_dir(),
            paths.logs_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        }
        Ok(Self { paths, state_lock: Mutex::new(()) })
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    // -- fleet state --

    /// Read the fleet state file. A missing or corrupted file degrades to
    /// the default state with a WARN; history must never crash the
    /// supervisor.
    pub fn read_fleet_state(&self) -> FleetState {
        let path = self.paths.state_file();
        read_yaml_or_default(&path)
    }

    pub fn write_fleet_state(&self, state: &FleetState) -> Result<(), StorageError> {
        let _guard = self.state_lock.lock();
        self.write_fleet_state_locked(state)
    }

    fn write_fleet_state_locked(&self, state: &FleetState) -> Result<(), StorageError> {
        let path = self.paths.state_file();
        let body = serde_yaml::to_string(state)
            .map_err(|e| StorageError::Encode { path: path.clone(), source: e })?;
        write_atomic(&path, body.as_bytes()).map_err(|e| StorageError::io(&path, e))
    }

    /// Read-modify-write the fleet state under the writer lock.
    pub fn update_fleet_state(
        &self,
        mutate: impl FnOnce(&mut FleetState),
    ) -> Result<FleetState, StorageError> {
        let _guard = self.state_lock.lock();
        let mut state = self.read_fleet_state();
        mutate(&mut state);
        self.write_fleet_state_locked(&state)?;
        Ok(state)
    }

    /// Update one agent's entry, creating it if absent.
    pub fn update_agent_state(
        &self,
        qualified_name: &str,
        mutate: impl FnOnce(&mut AgentState),
    ) -> Result<AgentState, StorageError> {
        let state = self.update_fleet_state(|fleet| {
            mutate(fleet.agent_mut(qualified_name));
        })?;
        Ok(state.agent(qualified_name).cloned().unwrap_or_default())
    }

    pub fn remove_agent_state(&self, qualified_name: &str) -> Result<(), StorageError> {
        self.update_fleet_state(|fleet| {
            fleet.agents.remove(qualified_name);
        })?;
        Ok(())
    }

    // -- job metadata --

    /// Read one job's metadata. Missing or corrupted files yield `None`
    /// (corruption is logged at WARN).
    pub fn read_job(&self, id: &JobId) -> Option<Job> {
        let path = self.paths.job_metadata(id);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return None,
        };
        match serde_yaml::from_str(&content) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping corrupt job file");
                None
            }
        }
    }

    pub fn write_job(&self, job: &Job) -> Result<(), StorageError> {
        let path = self.paths.job_metadata(&job.id);
        let body = serde_yaml::to_string(job)
            .map_err(|e| StorageError::Encode { path: path.clone(), source: e })?;
        write_atomic(&path, body.as_bytes()).map_err(|e| StorageError::io(&path, e))
    }

    /// Delete a job's metadata and transcript.
    pub fn delete_job(&self, id: &JobId) -> Result<(), StorageError> {
        let meta = self.paths.job_metadata(id);
        match std::fs::remove_file(&meta) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io(&meta, e)),
        }
        let transcript = self.paths.job_transcript(id);
        match std::fs::remove_file(&transcript) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&transcript, e)),
        }
    }

    /// List job history, newest first, with unreadable-file accounting.
    pub fn list_jobs(&self, filter: &JobFilter) -> JobListing {
        let mut jobs = Vec::new();
        let mut unreadable = 0usize;

        let entries = match std::fs::read_dir(self.paths.jobs_dir()) {
            Ok(entries) => entries,
            Err(_) => return JobListing::default(),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable job file");
                    unreadable += 1;
                    continue;
                }
            };
            match serde_yaml::from_str::<Job>(&content) {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "corrupt job file");
                    unreadable += 1;
                }
            }
        }

        jobs.retain(|j| filter.matches(j));
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        let total = jobs.len();

        let offset = filter.offset.unwrap_or(0).min(jobs.len());
        let jobs = jobs.split_off(offset);
        let mut jobs = jobs;
        if let Some(limit) = filter.limit {
            jobs.truncate(limit);
        }

        JobListing { jobs, total, unreadable }
    }

    // -- transcripts --

    /// Create an empty transcript file for a new job.
    pub fn create_transcript(&self, id: &JobId) -> Result<(), StorageError> {
        let path = self.paths.job_transcript(id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        Ok(())
    }

    /// Append one message as a JSON line. The whole line goes out in a
    /// single buffered write so concurrent readers never see an interleaved
    /// record (they may see a partial trailing line, which they skip).
    pub fn append_job_output(
        &self,
        id: &JobId,
        message: &TranscriptMessage,
    ) -> Result<(), StorageError> {
        let path = self.paths.job_transcript(id);
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        file.write_all(line.as_bytes()).map_err(|e| StorageError::io(&path, e))
    }

    /// Read transcript messages from a byte offset.
    ///
    /// Returns the parsed messages and the offset just past the last
    /// complete line. Malformed lines are skipped; a partially written
    /// trailing line is left for the next read.
    pub fn tail_job_output(
        &self,
        id: &JobId,
        from_offset: u64,
    ) -> Result<(Vec<TranscriptMessage>, u64), StorageError> {
        let path = self.paths.job_transcript(id);
        let mut file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Vec::new(), from_offset));
            }
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        file.seek(SeekFrom::Start(from_offset))
            .map_err(|e| StorageError::io(&path, e))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| StorageError::io(&path, e))?;

        let mut messages = Vec::new();
        let mut consumed = 0usize;
        let mut line_start = 0usize;
        for (i, byte) in buf.iter().enumerate() {
            if *byte != b'\n' {
                continue;
            }
            let line = &buf[line_start..i];
            line_start = i + 1;
            consumed = line_start;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<TranscriptMessage>(line) {
                Ok(msg) => messages.push(msg),
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        error = %e,
                        "skipping malformed transcript line"
                    );
                }
            }
        }

        Ok((messages, from_offset + consumed as u64))
    }

    /// Whole-transcript convenience read.
    pub fn read_job_output(&self, id: &JobId) -> Result<Vec<TranscriptMessage>, StorageError> {
        self.tail_job_output(id, 0).map(|(messages, _)| messages)
    }

    /// Current transcript length in bytes.
    pub fn transcript_len(&self, id: &JobId) -> u64 {
        std::fs::metadata(self.paths.job_transcript(id))
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

/// Parse a YAML state file, degrading to `T::default()` on any failure.
fn read_yaml_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "cannot read state file");
            }
            return T::default();
        }
    };
    match serde_yaml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "corrupt state file, using defaults"
            );
            T::default()
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
