//! End-to-end run: authenticate, report devices, then optionally monitor.

use std::future::Future;
use std::io::Write;

use waypost_client::{ClientError, ClientOptions, FindClient, FindSession};
use waypost_config::{GeofenceSettings, SessionSettings};

use crate::geofence::GeofenceMonitor;
use crate::notify::{Notifier, notifier_for};
use crate::report::write_device_report;
use crate::scheduler::{MonitorSummary, run_monitor};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to get CSRF token, JSESSIONID might be invalid or expired: {0}")]
    Authentication(#[source] ClientError),
    #[error("failed to set up API client: {0}")]
    Client(#[source] ClientError),
    #[error("failed to get devices: {0}")]
    DeviceList(#[source] ClientError),
    #[error("failed to write device report: {0}")]
    Report(#[from] std::io::Error),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The account has no devices; nothing to report or monitor.
    NoDevices,
    /// Devices were reported and geofencing is not configured.
    Reported { devices: usize, located: usize },
    /// Devices were reported, then the monitor ran until shutdown.
    Monitored {
        devices: usize,
        located: usize,
        summary: MonitorSummary,
    },
}

/// Open an authenticated session from validated settings.
pub async fn connect(settings: &SessionSettings) -> Result<FindSession, EngineError> {
    let client = FindClient::new(
        settings.session.clone(),
        ClientOptions {
            base_url: settings.base_url.clone(),
            request_timeout: settings.request_timeout,
        },
    )
    .map_err(EngineError::Client)?;

    client.authenticate().await.map_err(|e| match e {
        ClientError::InvalidBaseUrl { .. } | ClientError::Build(_) => EngineError::Client(e),
        other => EngineError::Authentication(other),
    })
}

/// Run the full flow against `session`, writing the report to `out`.
///
/// With `geofence` set, monitoring runs until `shutdown` resolves; the
/// configured notifier delivers breach alerts.
pub async fn run<W, F>(
    session: &FindSession,
    geofence: Option<&GeofenceSettings>,
    out: &mut W,
    shutdown: F,
) -> Result<RunOutcome, EngineError>
where
    W: Write,
    F: Future<Output = ()>,
{
    let notifier = geofence.map(|settings| notifier_for(settings.notifier));
    run_with_notifier(session, geofence.zip(notifier), out, shutdown).await
}

/// [`run`] with an explicit notifier instead of the configured one.
pub async fn run_with_notifier<W, F, N>(
    session: &FindSession,
    geofence: Option<(&GeofenceSettings, N)>,
    out: &mut W,
    shutdown: F,
) -> Result<RunOutcome, EngineError>
where
    W: Write,
    F: Future<Output = ()>,
    N: Notifier,
{
    let devices = session
        .list_devices()
        .await
        .map_err(EngineError::DeviceList)?;
    if devices.is_empty() {
        writeln!(out, "No devices found")?;
        out.flush()?;
        return Ok(RunOutcome::NoDevices);
    }

    let located = write_device_report(out, session, &devices).await?;

    let Some((settings, notifier)) = geofence else {
        tracing::info!("Geofence monitoring disabled: no device configured");
        return Ok(RunOutcome::Reported {
            devices: devices.len(),
            located,
        });
    };

    if !devices.iter().any(|device| device.id == settings.device_id) {
        tracing::warn!(
            device_id = %settings.device_id,
            "Geofence device is not in the account's device list"
        );
    }

    tracing::debug!(
        device_id = %settings.device_id,
        notifier = settings.notifier.as_str(),
        "Geofence monitoring configured"
    );
    let mut monitor = GeofenceMonitor::from_settings(settings, notifier);
    let summary = run_monitor(&mut monitor, session, settings.interval, shutdown).await;

    Ok(RunOutcome::Monitored {
        devices: devices.len(),
        located,
        summary,
    })
}
