//! Shared test utilities and fixtures
//!
//! A mock SmartThings Find server plus a notifier that can end a monitoring
//! run as soon as an alert fires.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::Notify;
use waypost_config::SessionSettings;
use waypost_engine::Notifier;
use waypost_types::SessionId;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION: &str = "integration-session";
pub const CSRF: &str = "csrf-123";

pub fn session_settings(server: &MockServer) -> SessionSettings {
    SessionSettings {
        session: SessionId::new(SESSION).unwrap(),
        base_url: server.uri(),
        request_timeout: Duration::from_secs(5),
    }
}

/// `chkLogin.do` handing out [`CSRF`] for the [`SESSION`] cookie.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/chkLogin.do"))
        .and(header("cookie", format!("JSESSIONID={SESSION}").as_str()))
        .respond_with(ResponseTemplate::new(200).insert_header("_csrf", CSRF))
        .mount(server)
        .await;
}

/// `getDeviceList.do` returning `(id, model name)` pairs.
pub async fn mount_devices(server: &MockServer, devices: &[(&str, &str)]) {
    let list: Vec<Value> = devices
        .iter()
        .map(|(id, name)| json!({"dvceID": id, "modelName": name}))
        .collect();

    Mock::given(method("POST"))
        .and(path("/device/getDeviceList.do"))
        .and(header("_csrf", CSRF))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deviceList": list })))
        .mount(server)
        .await;
}

pub fn location_body(lat: f64, lon: f64, gps_utc_dt: &str) -> Value {
    json!({
        "operation": [
            {"oprnType": "CHECK_CONNECTION"},
            {
                "oprnType": "LASTLOC",
                "latitude": lat.to_string(),
                "longitude": lon.to_string(),
                "extra": {"gpsUtcDt": gps_utc_dt}
            }
        ]
    })
}

pub fn no_location_body() -> Value {
    json!({"operation": [{"oprnType": "CHECK_CONNECTION"}]})
}

/// One reply of a scripted location sequence.
#[derive(Debug, Clone)]
pub enum Reply {
    Fix(f64, f64),
    NoFix,
    ServerError,
}

/// `setLastSelect.do` for `device_id`, answering request `n` with
/// `script[n]` and repeating the last entry afterwards.
pub async fn mount_location_script(server: &MockServer, device_id: &str, script: Vec<Reply>) {
    assert!(!script.is_empty());
    let attempt = AtomicU32::new(0);

    Mock::given(method("POST"))
        .and(path("/device/setLastSelect.do"))
        .and(header("_csrf", CSRF))
        .and(body_partial_json(json!({"dvceId": device_id})))
        .respond_with(move |_: &wiremock::Request| {
            let n = attempt.fetch_add(1, Ordering::SeqCst) as usize;
            match &script[n.min(script.len() - 1)] {
                Reply::Fix(lat, lon) => ResponseTemplate::new(200)
                    .set_body_json(location_body(*lat, *lon, "20240307140559")),
                Reply::NoFix => ResponseTemplate::new(200).set_body_json(no_location_body()),
                Reply::ServerError => ResponseTemplate::new(500),
            }
        })
        .mount(server)
        .await;
}

/// Records alerts and wakes whoever waits on [`SignalingNotifier::fired`].
#[derive(Debug, Default)]
pub struct SignalingNotifier {
    messages: Mutex<Vec<String>>,
    fired: Arc<Notify>,
}

impl SignalingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn fired(&self) -> Arc<Notify> {
        Arc::clone(&self.fired)
    }
}

impl Notifier for SignalingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
        self.fired.notify_one();
    }
}

/// Resolves when `notify` fires, or after `limit` as a safety net.
pub async fn until_fired_or(notify: Arc<Notify>, limit: Duration) {
    tokio::select! {
        () = notify.notified() => {}
        () = tokio::time::sleep(limit) => {}
    }
}
