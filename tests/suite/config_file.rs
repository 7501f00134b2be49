//! Config file on disk -> resolved settings -> a live run.

use std::collections::HashMap;
use std::fs;

use tempfile::TempDir;
use waypost_config::{ConfigError, GeofenceSettings, NotifierKind, SessionSettings, WaypostConfig};
use waypost_engine::{RunOutcome, connect, run};
use wiremock::MockServer;

use crate::common::{CSRF, Reply, SESSION, mount_devices, mount_location_script, mount_login};

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[tokio::test]
async fn session_from_environment_and_placeholder_device_reports_only() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_devices(&server, &[("dev-1", "Galaxy S23")]).await;
    mount_location_script(&server, "dev-1", vec![Reply::Fix(10.0, 20.0)]).await;

    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[session]
jsessionid = "${FIND_SESSION}"
base_url = "${FIND_URL}"
timeout_seconds = 5

[geofence]
device_id = "<YOUR_DEVICE_ID>"
"#,
    );

    let config = WaypostConfig::load_from(&path).unwrap().unwrap();
    let uri = server.uri();
    let lookup = env(&[("FIND_SESSION", SESSION), ("FIND_URL", uri.as_str())]);
    let session_settings = SessionSettings::resolve(config.session.as_ref(), &lookup).unwrap();
    let geofence = GeofenceSettings::resolve(config.geofence.as_ref(), &lookup).unwrap();
    assert!(geofence.is_none());

    let session = connect(&session_settings).await.unwrap();
    assert_eq!(session.csrf_token().as_str(), CSRF);

    let mut out = Vec::new();
    let outcome = run(&session, geofence.as_ref(), &mut out, std::future::pending())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Reported {
            devices: 1,
            located: 1,
        }
    );
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Device: Galaxy S23 - dev-1\nLatitude: 10\nLongitude: 20\n"));
}

#[test]
fn configured_geofence_resolves_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[geofence]
device_id = "dev-1"
notifier = "log"
"#,
    );

    let config = WaypostConfig::load_from(&path).unwrap().unwrap();
    let settings = GeofenceSettings::resolve(config.geofence.as_ref(), env(&[]))
        .unwrap()
        .unwrap();

    assert_eq!(settings.device_id.as_str(), "dev-1");
    assert!((settings.radius.km() - 0.5).abs() < f64::EPSILON);
    assert_eq!(settings.interval.as_millis(), 60_000);
    assert_eq!(settings.notifier, NotifierKind::Log);
}

#[test]
fn missing_session_is_reported_with_remedy() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[geofence]\ndevice_id = \"dev-1\"\n");

    let config = WaypostConfig::load_from(&path).unwrap().unwrap();
    let err = SessionSettings::resolve(config.session.as_ref(), env(&[])).unwrap_err();

    assert!(matches!(err, ConfigError::MissingSession));
    assert!(err.to_string().contains("WAYPOST_JSESSIONID"));
}

#[test]
fn unknown_keys_are_rejected_with_the_file_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[geofence]\nradius = 2.0\n");

    let err = WaypostConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.path(), Some(&path));
}
