//! Location samples and geofence evaluation results.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::Coordinate;

/// Display format for observation timestamps (`2024-03-07 14:05`).
pub const OBSERVED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Shown in place of a timestamp when the fix did not report one.
pub const UNKNOWN_OBSERVED_AT: &str = "unknown";

/// One location fix for a device. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceLocationSample {
    coordinate: Coordinate,
    observed_at: Option<DateTime<Utc>>,
}

impl DeviceLocationSample {
    #[must_use]
    pub const fn new(coordinate: Coordinate, observed_at: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            observed_at: Some(observed_at),
        }
    }

    /// A fix whose age is unknown.
    #[must_use]
    pub const fn undated(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            observed_at: None,
        }
    }

    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    #[must_use]
    pub const fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at
    }

    #[must_use]
    pub fn observed_at_display(&self) -> String {
        self.observed_at.map_or_else(
            || UNKNOWN_OBSERVED_AT.to_string(),
            |ts| ts.format(OBSERVED_AT_FORMAT).to_string(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid GPS timestamp {raw:?}: expected at least YYYYMMDDHHMM")]
pub struct GpsTimestampError {
    pub raw: String,
}

/// Parse the compact UTC timestamp reported with a GPS fix.
///
/// The value is `YYYYMMDDHHMM` optionally followed by seconds and further
/// digits (milliseconds on some firmware), all UTC. Anything after the
/// seconds is ignored.
pub fn parse_gps_utc(raw: &str) -> Result<DateTime<Utc>, GpsTimestampError> {
    let err = || GpsTimestampError {
        raw: raw.to_string(),
    };
    let trimmed = raw.trim();
    if trimmed.len() < 12 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let seconds = trimmed.get(12..14).unwrap_or("00");
    let normalized = format!("{}{seconds}", &trimmed[..12]);
    NaiveDateTime::parse_from_str(&normalized, "%Y%m%d%H%M%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| err())
}

/// Outcome of comparing one fresh sample against the stable location.
///
/// A sum type rather than a `changed` flag with an optional payload: a
/// breach always carries the location that should become the new reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeofenceEvent {
    /// Device is within the radius; the reference stays as it is.
    Stayed { distance_km: f64 },
    /// Device moved beyond the radius; `location` replaces the reference.
    Breached {
        distance_km: f64,
        location: DeviceLocationSample,
    },
}

impl GeofenceEvent {
    #[must_use]
    pub const fn changed(&self) -> bool {
        matches!(self, Self::Breached { .. })
    }

    #[must_use]
    pub const fn new_location(&self) -> Option<&DeviceLocationSample> {
        match self {
            Self::Breached { location, .. } => Some(location),
            Self::Stayed { .. } => None,
        }
    }

    #[must_use]
    pub const fn distance_km(&self) -> f64 {
        match self {
            Self::Stayed { distance_km } | Self::Breached { distance_km, .. } => *distance_km,
        }
    }
}
