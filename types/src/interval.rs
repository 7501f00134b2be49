//! Polling cadence for the geofence monitor.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default time between location polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("poll interval must be greater than zero")]
pub struct InvalidInterval;

/// Time between two monitoring cycles. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PollInterval(Duration);

impl PollInterval {
    pub fn new(interval: Duration) -> Result<Self, InvalidInterval> {
        if interval.is_zero() {
            Err(InvalidInterval)
        } else {
            Ok(Self(interval))
        }
    }

    pub fn from_millis(millis: u64) -> Result<Self, InvalidInterval> {
        Self::new(Duration::from_millis(millis))
    }

    #[must_use]
    pub const fn duration(self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn as_millis(self) -> u64 {
        u64::try_from(self.0.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        Self(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl TryFrom<u64> for PollInterval {
    type Error = InvalidInterval;

    fn try_from(millis: u64) -> Result<Self, Self::Error> {
        Self::from_millis(millis)
    }
}

impl From<PollInterval> for u64 {
    fn from(value: PollInterval) -> Self {
        value.as_millis()
    }
}

impl From<PollInterval> for Duration {
    fn from(value: PollInterval) -> Self {
        value.0
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ms", self.as_millis())
    }
}
