//! SmartThings Find web API client.
//!
//! # Session model
//!
//! The service has no public API. Waypost borrows an existing browser session:
//! every request carries the `JSESSIONID` cookie, and all `POST` endpoints
//! additionally require the CSRF token that `chkLogin.do` hands out in its
//! `_csrf` response header.
//!
//! ```text
//! FindClient::new(session) -> authenticate() -> FindSession
//!                                                 |-- list_devices()
//!                                                 `-- device_location(id)
//! ```
//!
//! [`FindSession`] can only be obtained with a token in hand, so an
//! unauthenticated device request cannot be expressed.
//!
//! # Error Handling
//!
//! Every call returns [`ClientError`]. There is no retry or session renewal;
//! callers that poll decide themselves whether a failure is worth more than a
//! log line.

mod wire;

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use waypost_types::{
    Coordinate, CoordinateError, Device, DeviceId, DeviceLocationSample, SessionId,
    parse_gps_utc,
};

pub use waypost_types;

/// Canonical SmartThings Find web origin.
pub const DEFAULT_BASE_URL: &str = "https://smartthingsfind.samsung.com";

/// Header that carries the CSRF token in both directions.
pub const CSRF_HEADER: &str = "_csrf";

const CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// The three web endpoints Waypost talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    LoginCheck,
    DeviceList,
    LocationUpdate,
}

impl Endpoint {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::LoginCheck => "/chkLogin.do",
            Self::DeviceList => "/device/getDeviceList.do",
            Self::LocationUpdate => "/device/setLastSelect.do",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: Endpoint,
        status: StatusCode,
    },
    #[error("response from {endpoint} could not be decoded: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
    #[error("no CSRF token in login check response; JSESSIONID might be invalid or expired")]
    MissingCsrfToken,
    #[error("no location reported for device {0}")]
    MissingLocation(DeviceId),
    #[error("device {device} reported an invalid position: {source}")]
    InvalidCoordinate {
        device: DeviceId,
        #[source]
        source: CoordinateError,
    },
}

impl ClientError {
    /// The server answered but had no usable position for the device.
    ///
    /// Everything else that can go wrong while fetching a location is a
    /// transport, status or decoding failure.
    #[must_use]
    pub const fn is_missing_location(&self) -> bool {
        matches!(
            self,
            Self::MissingLocation(_) | Self::InvalidCoordinate { .. }
        )
    }
}

/// CSRF token issued for the current session.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CsrfToken(<redacted>)")
    }
}

/// Transport knobs for [`FindClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

fn client_builder(request_timeout: Duration) -> reqwest::ClientBuilder {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("waypost/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(request_timeout)
        // A redirect here is the login page; surface it as a status error.
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {:?}", parsed.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

/// Cookie-authenticated client that has not yet obtained a CSRF token.
#[derive(Debug, Clone)]
pub struct FindClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionId,
}

impl FindClient {
    pub fn new(session: SessionId, options: ClientOptions) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(&options.base_url)?;
        let http = client_builder(options.request_timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// `GET /chkLogin.do` and read the `_csrf` response header.
    pub async fn csrf_token(&self) -> Result<CsrfToken, ClientError> {
        let endpoint = Endpoint::LoginCheck;
        let response = self
            .http
            .get(self.url(endpoint))
            .header(COOKIE, self.session.cookie_header())
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { endpoint, status });
        }

        response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CsrfToken(value.to_string()))
            .ok_or(ClientError::MissingCsrfToken)
    }

    /// Fetch a CSRF token and bind it to this client.
    pub async fn authenticate(self) -> Result<FindSession, ClientError> {
        let csrf = self.csrf_token().await?;
        tracing::debug!(base_url = %self.base_url, "Obtained CSRF token");
        Ok(FindSession { client: self, csrf })
    }
}

/// A client holding a CSRF token; the only handle that can query devices.
#[derive(Debug, Clone)]
pub struct FindSession {
    client: FindClient,
    csrf: CsrfToken,
}

impl FindSession {
    #[must_use]
    pub fn csrf_token(&self) -> &CsrfToken {
        &self.csrf
    }

    async fn post_json<T, B>(&self, endpoint: Endpoint, body: Option<&B>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let mut request = self
            .client
            .http
            .post(self.client.url(endpoint))
            .header(COOKIE, self.client.session.cookie_header())
            .header(CSRF_HEADER, self.csrf.as_str());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { endpoint, status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;
        serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode { endpoint, source })
    }

    /// List every device registered to the account.
    ///
    /// Entries without an id are skipped; a missing model name becomes an
    /// empty display name.
    pub async fn list_devices(&self) -> Result<Vec<Device>, ClientError> {
        let response: wire::DeviceListResponse =
            self.post_json::<_, ()>(Endpoint::DeviceList, None).await?;

        let devices = response
            .device_list
            .into_iter()
            .filter_map(|raw| {
                let Some(id) = raw.id.and_then(|id| DeviceId::new(id).ok()) else {
                    tracing::debug!(model = ?raw.model_name, "Skipping device entry without id");
                    return None;
                };
                Some(Device {
                    id,
                    display_name: raw.model_name.unwrap_or_default(),
                })
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = devices.len(), "Listed devices");
        Ok(devices)
    }

    /// Last known location of `device`.
    ///
    /// Uses the first `LOCATION` or `LASTLOC` operation in the response. When
    /// the fix carries no parseable `gpsUtcDt` the sample is undated.
    pub async fn device_location(
        &self,
        device: &DeviceId,
    ) -> Result<DeviceLocationSample, ClientError> {
        let body = wire::LocationRequest {
            device_id: device.as_str(),
            operation: wire::CHECK_CONNECTION_WITH_LOCATION,
        };
        let response: wire::LocationResponse = self
            .post_json(Endpoint::LocationUpdate, Some(&body))
            .await?;

        let Some(op) = response.operation.into_iter().find(wire::Operation::is_location) else {
            return Err(ClientError::MissingLocation(device.clone()));
        };
        let (Some(latitude), Some(longitude)) = (op.latitude, op.longitude) else {
            return Err(ClientError::MissingLocation(device.clone()));
        };
        let coordinate =
            Coordinate::new(latitude, longitude).map_err(|source| ClientError::InvalidCoordinate {
                device: device.clone(),
                source,
            })?;

        let raw_ts = op.extra.and_then(|extra| extra.gps_utc_dt);
        match raw_ts.as_deref().map(parse_gps_utc) {
            Some(Ok(ts)) => Ok(DeviceLocationSample::new(coordinate, ts)),
            Some(Err(e)) => {
                tracing::warn!(device_id = %device, error = %e, "Fix has an unreadable timestamp");
                Ok(DeviceLocationSample::undated(coordinate))
            }
            None => {
                tracing::warn!(device_id = %device, "Fix has no timestamp");
                Ok(DeviceLocationSample::undated(coordinate))
            }
        }
    }
}
