//! Full runs against a mock SmartThings Find server.

use std::time::Duration;

use waypost_config::{GeofenceSettings, NotifierKind};
use waypost_engine::{EngineError, MonitorSummary, RunOutcome, connect, run, run_with_notifier};
use waypost_types::{DeviceId, GeofenceRadius, PollInterval};
use wiremock::MockServer;

use crate::common::{
    Reply, SignalingNotifier, mount_devices, mount_location_script, mount_login,
    session_settings, until_fired_or,
};

const SAFETY_LIMIT: Duration = Duration::from_secs(10);

fn geofence(device: &str, interval_ms: u64) -> GeofenceSettings {
    GeofenceSettings {
        device_id: DeviceId::new(device).unwrap(),
        radius: GeofenceRadius::from_km(0.5).unwrap(),
        interval: PollInterval::from_millis(interval_ms).unwrap(),
        notifier: NotifierKind::Log,
    }
}

#[tokio::test]
async fn report_only_when_geofence_not_configured() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_devices(&server, &[("dev-1", "Galaxy S23"), ("dev-2", "Galaxy Buds")]).await;
    mount_location_script(&server, "dev-1", vec![Reply::Fix(37.5665, 126.978)]).await;
    mount_location_script(&server, "dev-2", vec![Reply::NoFix]).await;

    let session = connect(&session_settings(&server)).await.unwrap();
    let mut out = Vec::new();
    let outcome = run(&session, None, &mut out, std::future::pending())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Reported {
            devices: 2,
            located: 1,
        }
    );
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Device: Galaxy S23 - dev-1\n\
         Latitude: 37.5665\n\
         Longitude: 126.978\n\
         Date: 2024-03-07 14:05\n\
         \n\
         \n"
    );
}

#[tokio::test]
async fn empty_account_prints_no_devices() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_devices(&server, &[]).await;

    let session = connect(&session_settings(&server)).await.unwrap();
    let settings = geofence("dev-1", 10);
    let mut out = Vec::new();
    let outcome = run(&session, Some(&settings), &mut out, std::future::pending())
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::NoDevices);
    assert_eq!(String::from_utf8(out).unwrap(), "No devices found\n");
}

#[tokio::test]
async fn invalid_session_fails_authentication() {
    let server = MockServer::start().await;
    // Login check answers, but without a CSRF header.
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/chkLogin.do"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = connect(&session_settings(&server)).await.unwrap_err();
    assert!(matches!(err, EngineError::Authentication(_)));
    assert!(err.to_string().contains("JSESSIONID might be invalid or expired"));
}

#[tokio::test]
async fn breach_is_reported_once_and_becomes_the_new_reference() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_devices(&server, &[("dev-1", "Galaxy S23")]).await;
    // report, seed, one quiet cycle, then ~1.1 km east.
    mount_location_script(
        &server,
        "dev-1",
        vec![
            Reply::Fix(0.0, 0.0),
            Reply::Fix(0.0, 0.0),
            Reply::Fix(0.0, 0.0043),
            Reply::Fix(0.0, 0.01),
        ],
    )
    .await;

    let session = connect(&session_settings(&server)).await.unwrap();
    let settings = geofence("dev-1", 20);
    let notifier = SignalingNotifier::default();
    let shutdown = until_fired_or(notifier.fired(), SAFETY_LIMIT);

    let mut out = Vec::new();
    let outcome = run_with_notifier(&session, Some((&settings, &notifier)), &mut out, shutdown)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Monitored {
            devices: 1,
            located: 1,
            summary: MonitorSummary {
                cycles: 2,
                skipped: 0,
                breaches: 1,
            },
        }
    );
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("moved too far from the stable location"));
}

#[tokio::test]
async fn failing_cycles_are_skipped_without_stopping_the_monitor() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_devices(&server, &[("dev-1", "Galaxy S23")]).await;
    mount_location_script(
        &server,
        "dev-1",
        vec![
            Reply::Fix(0.0, 0.0),
            Reply::Fix(0.0, 0.0),
            Reply::ServerError,
            Reply::NoFix,
            Reply::Fix(0.0, 0.01),
        ],
    )
    .await;

    let session = connect(&session_settings(&server)).await.unwrap();
    let settings = geofence("dev-1", 20);
    let notifier = SignalingNotifier::default();
    let shutdown = until_fired_or(notifier.fired(), SAFETY_LIMIT);

    let mut out = Vec::new();
    let outcome = run_with_notifier(&session, Some((&settings, &notifier)), &mut out, shutdown)
        .await
        .unwrap();

    let RunOutcome::Monitored { summary, .. } = outcome else {
        panic!("expected a monitoring run, got {outcome:?}");
    };
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.breaches, 1);
    assert_eq!(summary.cycles, 3);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn device_list_failure_is_a_startup_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/device/getDeviceList.do"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let session = connect(&session_settings(&server)).await.unwrap();
    let mut out = Vec::new();
    let err = run(&session, None, &mut out, std::future::pending())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DeviceList(_)));
}
