//! Waypost CLI - binary entry point.
//!
//! ```text
//! main() -> load config -> connect() -> run() -> device report
//!                                          `--> run_monitor() until Ctrl-C / SIGTERM
//! ```
//!
//! There are no command-line flags. Everything comes from
//! `~/.waypost/config.toml` (or `$WAYPOST_CONFIG`) and the environment.

use anyhow::{Context, Result};
use std::{
    env,
    fs::{self, OpenOptions},
    io::stdout,
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use waypost_engine::waypost_config::{
    GeofenceSettings, SessionSettings, WaypostConfig, config_path, data_dir,
};
use waypost_engine::{RunOutcome, connect, run};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    // File when available, stderr otherwise.
    let (log_path, file_layer, stderr_layer) = match log_file {
        Some((path, file)) => (
            Some(path),
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            None,
        ),
        None => (None, None, Some(fmt::layer().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(env_filter)
        .init();

    if let Some(log_path) = log_path {
        tracing::debug!(path = %log_path.display(), "Logging initialized");
    }
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.waypost/logs/waypost.log
    if let Some(dir) = data_dir() {
        candidates.push(dir.join("logs").join("waypost.log"));
    }

    // Fallback: ./.waypost/logs/waypost.log
    candidates.push(PathBuf::from(".waypost").join("logs").join("waypost.log"));

    candidates
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    if let Some(path) = config_path() {
        tracing::debug!(path = %path.display(), "Loading configuration");
    }
    let config = WaypostConfig::load()
        .context("failed to load configuration")?
        .unwrap_or_default();
    let lookup = |name: &str| env::var(name).ok();
    let session_settings = SessionSettings::resolve(config.session.as_ref(), lookup)?;
    let geofence = GeofenceSettings::resolve(config.geofence.as_ref(), lookup)?;

    let session = connect(&session_settings).await?;

    let mut out = stdout();
    let outcome = run(&session, geofence.as_ref(), &mut out, shutdown_signal()).await?;

    match outcome {
        RunOutcome::NoDevices => {}
        RunOutcome::Reported { devices, located } => {
            tracing::info!(devices, located, "Device report complete");
        }
        RunOutcome::Monitored {
            devices,
            located,
            summary,
        } => {
            tracing::info!(
                devices,
                located,
                cycles = summary.cycles,
                breaches = summary.breaches,
                "Monitoring finished"
            );
        }
    }

    Ok(())
}
