//! Core domain types for Waypost.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

mod geo;
mod interval;
mod location;
mod sanitize;

pub use geo::{
    Coordinate, CoordinateError, DEFAULT_GEOFENCE_RADIUS_KM, EARTH_RADIUS_KM, GeofenceRadius,
    InvalidRadius, distance_km,
};
pub use interval::{DEFAULT_POLL_INTERVAL_MS, InvalidInterval, PollInterval};
pub use location::{
    DeviceLocationSample, GeofenceEvent, GpsTimestampError, OBSERVED_AT_FORMAT, UNKNOWN_OBSERVED_AT,
    parse_gps_utc,
};
pub use sanitize::sanitize_label;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

#[derive(Debug, Error)]
#[error("device id must not be empty")]
pub struct EmptyDeviceIdError;

/// Opaque identifier the location service assigns to a tracked device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyDeviceIdError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Err(EmptyDeviceIdError)
        } else if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeviceId {
    type Error = EmptyDeviceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for DeviceId {
    type Error = EmptyDeviceIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(value: DeviceId) -> Self {
        value.0
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A device as listed by the location service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    /// Model name as reported by the service. Untrusted; render through
    /// [`sanitize_label`].
    pub display_name: String,
}

// ============================================================================
// Session credentials
// ============================================================================

/// Value of the `JSESSIONID` cookie for an already logged-in web session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    /// Returns `None` for empty or whitespace-only values.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `Cookie` header value carrying this session.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        format!("JSESSIONID={}", self.0)
    }
}

// Manual Debug impl to prevent leaking the session cookie in logs.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId(<redacted>)")
    }
}
