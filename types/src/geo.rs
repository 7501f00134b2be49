//! Geographic coordinates and great-circle distance.
//!
//! Distances use the haversine formula on a spherical Earth of radius
//! [`EARTH_RADIUS_KM`]. The result is accurate to roughly 0.5% which is far
//! below the resolution of a consumer GPS fix.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Mean Earth radius used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default geofence radius: 500 meters.
pub const DEFAULT_GEOFENCE_RADIUS_KM: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// A WGS84 position in decimal degrees.
///
/// Latitude is always within `[-90, 90]` and longitude within `[-180, 180]`;
/// the only way to build one is through [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate", into = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize, Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in kilometers.
    #[must_use]
    pub fn distance_km(self, other: Coordinate) -> f64 {
        distance_km(self, other)
    }
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl From<Coordinate> for RawCoordinate {
    fn from(value: Coordinate) -> Self {
        Self {
            latitude: value.latitude,
            longitude: value.longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Haversine distance between two coordinates in kilometers.
///
/// Symmetric and non-negative. The intermediate haversine term is clamped to
/// `[0, 1]` so rounding on equal or antipodal points can never yield NaN.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let sin_lat = (d_lat / 2.0).sin();
    let sin_lon = (d_lon / 2.0).sin();
    let h = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lon * sin_lon;
    let h = h.clamp(0.0, 1.0);

    let central_angle = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * central_angle
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("geofence radius must be a finite, non-negative number of kilometers (got {0})")]
pub struct InvalidRadius(pub f64);

/// Maximum distance, in kilometers, a device may drift from its stable
/// location before the geofence counts as breached.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct GeofenceRadius(f64);

impl GeofenceRadius {
    pub fn from_km(km: f64) -> Result<Self, InvalidRadius> {
        if km.is_finite() && km >= 0.0 {
            Ok(Self(km))
        } else {
            Err(InvalidRadius(km))
        }
    }

    #[must_use]
    pub const fn km(self) -> f64 {
        self.0
    }

    /// Strictly greater-than: a distance equal to the radius is still inside.
    #[must_use]
    pub fn is_exceeded_by(self, distance_km: f64) -> bool {
        distance_km > self.0
    }
}

impl Default for GeofenceRadius {
    fn default() -> Self {
        Self(DEFAULT_GEOFENCE_RADIUS_KM)
    }
}

impl TryFrom<f64> for GeofenceRadius {
    type Error = InvalidRadius;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_km(value)
    }
}

impl From<GeofenceRadius> for f64 {
    fn from(value: GeofenceRadius) -> Self {
        value.0
    }
}

impl fmt::Display for GeofenceRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} km", self.0)
    }
}
