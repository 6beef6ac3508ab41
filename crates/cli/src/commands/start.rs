// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `herd start` — host the supervisor until interrupted.

use crate::runtime::ProcessRuntime;
use herd_config::LoadOptions;
use herd_engine::{FleetSupervisor, StopOptions, SupervisorError, SupervisorOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub async fn run(config: PathBuf, state_dir: Option<PathBuf>, env_file: bool) -> ExitCode {
    let state_dir = state_dir.unwrap_or_else(|| default_state_dir(&config));

    let _log_guard = init_tracing(&state_dir);

    let mut load = LoadOptions::from_process_env();
    load.use_env_file = env_file;

    let mut options = SupervisorOptions::new(config, state_dir);
    options.load = load;

    let runtime = Arc::new(ProcessRuntime::from_env());
    let supervisor = Arc::new(FleetSupervisor::new(options, runtime));

    if let Err(e) = supervisor.initialize() {
        eprintln!("initialization failed: {e:#}");
        return ExitCode::from(1);
    }
    if let Err(e) = supervisor.start() {
        eprintln!("start failed: {e:#}");
        return ExitCode::from(match e {
            SupervisorError::InvalidState { .. } => 1,
            _ => 2,
        });
    }

    tracing::info!("supervisor running, press ctrl-c to stop");
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("cannot listen for interrupt signal");
        let _ = supervisor.stop(StopOptions::default()).await;
        return ExitCode::from(2);
    }

    tracing::info!("interrupt received, stopping");
    match supervisor.stop(StopOptions::default()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("stop failed: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn default_state_dir(config: &Path) -> PathBuf {
    let base = if config.is_dir() {
        config.to_path_buf()
    } else {
        config.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
    };
    base.join(".herd")
}

/// Stderr plus a non-blocking file appender under `<stateDir>/logs`.
fn init_tracing(state_dir: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let logs_dir = state_dir.join("logs");
    match std::fs::create_dir_all(&logs_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&logs_dir, "herd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
            None
        }
    }
}
