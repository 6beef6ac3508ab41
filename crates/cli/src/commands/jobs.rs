// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd jobs` / `herd show` / `herd logs` — job history queries.

use anyhow::{bail, Context};
use herd_core::id::JobId;
use herd_core::job::JobStatus;
use herd_core::message::TranscriptMessage;
use herd_engine::{JobOutputStream, StreamEvent};
use herd_storage::{JobFilter, StateStore};
use std::path::Path;
use std::sync::Arc;

fn open(state_dir: &Path) -> anyhow::Result<StateStore> {
    StateStore::open(state_dir).context("cannot open state directory")
}

fn parse_status(raw: &str) -> anyhow::Result<JobStatus> {
    Ok(match raw {
        "pending" => JobStatus::Pending,
        "running" => JobStatus::Running,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        "cancelled" => JobStatus::Cancelled,
        other => bail!("unknown status {other:?}"),
    })
}

pub fn list(
    state_dir: &Path,
    agent: Option<String>,
    status: Option<String>,
    limit: usize,
) -> anyhow::Result<()> {
    let store = open(state_dir)?;
    let filter = JobFilter {
        agent,
        status: status.as_deref().map(parse_status).transpose()?,
        limit: Some(limit),
        ..Default::default()
    };
    let listing = store.list_jobs(&filter);

    for job in &listing.jobs {
        let reason = job
            .exit_reason
            .map(|r| format!(" ({r})"))
            .unwrap_or_default();
        println!("{} {} {}{}", job.id, job.agent, job.status, reason);
    }
    if listing.total > listing.jobs.len() {
        println!("... {} of {} shown", listing.jobs.len(), listing.total);
    }
    if listing.unreadable > 0 {
        eprintln!("warning: {} unreadable job files", listing.unreadable);
    }
    Ok(())
}

pub fn show(state_dir: &Path, job_id: &str, output: bool) -> anyhow::Result<()> {
    let id = JobId::parse(job_id)?;
    let store = open(state_dir)?;
    let Some(job) = store.read_job(&id) else {
        bail!("job {job_id} not found");
    };

    println!("id:        {}", job.id);
    println!("agent:     {}", job.agent);
    if let Some(schedule) = &job.schedule {
        println!("schedule:  {schedule}");
    }
    println!("trigger:   {}", job.trigger_type);
    println!("status:    {}", job.status);
    if let Some(reason) = job.exit_reason {
        println!("exit:      {reason}");
    }
    println!("started:   {}", job.started_at.to_rfc3339());
    if let Some(finished) = job.finished_at {
        println!("finished:  {}", finished.to_rfc3339());
    }
    if let Some(duration) = job.duration_seconds {
        println!("duration:  {duration}s");
    }
    if let Some(parent) = &job.forked_from {
        println!("forked:    {parent}");
    }
    if let Some(session) = &job.session_id {
        println!("session:   {session}");
    }
    if let Some(prompt) = &job.prompt {
        println!("prompt:    {prompt}");
    }

    if output {
        println!();
        for message in store.read_job_output(&id)? {
            print_message(&message);
        }
    }
    Ok(())
}

pub async fn logs(state_dir: &Path, job_id: &str, follow: bool) -> anyhow::Result<()> {
    let id = JobId::parse(job_id)?;
    let store = Arc::new(open(state_dir)?);
    if store.read_job(&id).is_none() {
        bail!("job {job_id} not found");
    }

    if !follow {
        for message in store.read_job_output(&id)? {
            print_message(&message);
        }
        return Ok(());
    }

    let mut stream = JobOutputStream::start(store, id);
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Message(message) => print_message(&message),
            StreamEvent::Error(error) => bail!("stream failed: {error}"),
        }
    }
    Ok(())
}

fn print_message(message: &TranscriptMessage) {
    let at = message.timestamp().format("%H:%M:%S");
    match message {
        TranscriptMessage::System { text, .. } => {
            println!("[{at}] system: {}", text.as_deref().unwrap_or(""));
        }
        TranscriptMessage::Assistant { text, .. } => println!("[{at}] {text}"),
        TranscriptMessage::ToolUse { tool, .. } => println!("[{at}] tool: {tool}"),
        TranscriptMessage::ToolResult { tool, is_error, .. } => {
            let marker = if *is_error { " (error)" } else { "" };
            println!("[{at}] tool result: {tool}{marker}");
        }
        TranscriptMessage::Error { message, .. } => println!("[{at}] error: {message}"),
    }
}
