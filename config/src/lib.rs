//! Configuration loading for Waypost.
//!
//! The config file lives at `~/.waypost/config.toml` (override with
//! `WAYPOST_CONFIG`). Every table is optional:
//!
//! ```toml
//! [session]
//! jsessionid = "${WAYPOST_JSESSIONID}"
//! base_url = "https://smartthingsfind.samsung.com"
//! timeout_seconds = 30
//!
//! [geofence]
//! device_id = "..."
//! threshold_km = 0.5
//! interval_ms = 60000
//! notifier = "console"
//! ```
//!
//! Raw file contents deserialize into [`WaypostConfig`]; [`SessionSettings`]
//! and [`GeofenceSettings`] are the validated, typed forms the rest of the
//! workspace consumes.

use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf, time::Duration};
use waypost_types::{DeviceId, GeofenceRadius, PollInterval, SessionId};

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "WAYPOST_CONFIG";
/// Session cookie used when the file has no `[session]` table.
pub const JSESSIONID_ENV: &str = "WAYPOST_JSESSIONID";

pub const DEFAULT_BASE_URL: &str = "https://smartthingsfind.samsung.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_THRESHOLD_KM: f64 = waypost_types::DEFAULT_GEOFENCE_RADIUS_KM;
pub const DEFAULT_INTERVAL_MS: u64 = waypost_types::DEFAULT_POLL_INTERVAL_MS;

/// Device id shipped in the sample config; treated as "not configured".
pub const PLACEHOLDER_DEVICE_ID: &str = "<YOUR_DEVICE_ID>";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaypostConfig {
    pub session: Option<SessionConfig>,
    pub geofence: Option<GeofenceConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("no session configured: set [session] jsessionid or the WAYPOST_JSESSIONID environment variable")]
    MissingSession,
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } | ConfigError::MissingSession => None,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// `JSESSIONID` cookie from a logged-in browser. Supports `${ENV}`.
    pub jsessionid: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

// Manual Debug impl to prevent leaking the session cookie in logs.
impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field(
                "jsessionid",
                &if self.jsessionid.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// How breach alerts are delivered.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// `[?] message` on stdout.
    #[default]
    Console,
    /// A `warn`-level tracing event.
    Log,
}

impl NotifierKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Log => "log",
        }
    }
}

/// Geofence monitoring for a single device.
///
/// ```toml
/// [geofence]
/// device_id = "..."
/// threshold_km = 0.5
/// interval_ms = 60000
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeofenceConfig {
    pub device_id: Option<String>,
    /// Default: 0.5 km.
    pub threshold_km: Option<f64>,
    /// Default: 60000 ms.
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub notifier: NotifierKind,
}

/// Validated connection settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub session: SessionId,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl SessionSettings {
    /// Resolve from the `[session]` table, falling back to
    /// [`JSESSIONID_ENV`] when the table (or its `jsessionid`) is absent.
    pub fn resolve(
        config: Option<&SessionConfig>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let configured = config
            .and_then(|cfg| cfg.jsessionid.as_deref())
            .map(|raw| expand_env_vars_with(raw, &lookup));
        let raw_session = configured.or_else(|| lookup(JSESSIONID_ENV));
        let session = raw_session
            .and_then(SessionId::new)
            .ok_or(ConfigError::MissingSession)?;

        let base_url = config
            .and_then(|cfg| cfg.base_url.as_deref())
            .map(|raw| expand_env_vars_with(raw, &lookup))
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = config
            .and_then(|cfg| cfg.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.timeout_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            session,
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Validated geofence settings. Exists only when a device is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceSettings {
    pub device_id: DeviceId,
    pub radius: GeofenceRadius,
    pub interval: PollInterval,
    pub notifier: NotifierKind,
}

impl GeofenceSettings {
    /// `Ok(None)` means monitoring is disabled: no `[geofence]` table, no
    /// `device_id`, or the sample placeholder id.
    pub fn resolve(
        config: Option<&GeofenceConfig>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(config) = config else {
            return Ok(None);
        };
        let Some(raw_id) = config.device_id.as_deref() else {
            return Ok(None);
        };
        let raw_id = expand_env_vars_with(raw_id, &lookup);
        if raw_id.trim() == PLACEHOLDER_DEVICE_ID {
            return Ok(None);
        }
        let Ok(device_id) = DeviceId::new(raw_id) else {
            return Ok(None);
        };

        let threshold = config.threshold_km.unwrap_or(DEFAULT_THRESHOLD_KM);
        let radius = GeofenceRadius::from_km(threshold).map_err(|e| ConfigError::Invalid {
            field: "geofence.threshold_km",
            reason: e.to_string(),
        })?;

        let interval_ms = config.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS);
        let interval = PollInterval::from_millis(interval_ms).map_err(|e| ConfigError::Invalid {
            field: "geofence.interval_ms",
            reason: e.to_string(),
        })?;

        Ok(Some(Self {
            device_id,
            radius,
            interval,
            notifier: config.notifier,
        }))
    }
}

/// Replace `${VAR}` references with values from `lookup`.
///
/// Unset variables expand to the empty string; an unclosed `${` is kept
/// verbatim.
pub fn expand_env_vars_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.is_empty() {
                    out.push_str(&lookup(name).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

impl WaypostConfig {
    /// Load the config file. `Ok(None)` when it does not exist.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        warn_if_world_readable(path, &content);

        match Self::parse(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// `$WAYPOST_CONFIG`, else `~/.waypost/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".waypost").join("config.toml"))
}

/// `~/.waypost`, the parent of the default config and log files.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".waypost"))
}

#[cfg(unix)]
fn warn_if_world_readable(path: &Path, content: &str) {
    use std::os::unix::fs::PermissionsExt;

    let has_literal_cookie = content
        .lines()
        .map(str::trim)
        .any(|line| line.starts_with("jsessionid") && !line.contains("${"));
    if !has_literal_cookie {
        return;
    }
    if let Ok(metadata) = fs::metadata(path)
        && metadata.permissions().mode() & 0o077 != 0
    {
        tracing::warn!(
            path = %path.display(),
            "Config file contains a literal JSESSIONID and is readable by other users. \
             Consider chmod 600 or ${{ENV_VAR}} syntax."
        );
    }
}

#[cfg(not(unix))]
fn warn_if_world_readable(_path: &Path, _content: &str) {}
