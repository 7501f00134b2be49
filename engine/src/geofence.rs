//! Geofence monitor for a single device.
//!
//! # State machine
//!
//! ```text
//!   Uninitialized --(first successful fetch)--> Active { stable }
//!   Active --(fetch failed / no fix)-----------> Active (unchanged, Skipped)
//!   Active --(distance <= radius)--------------> Active (unchanged, Stayed)
//!   Active --(distance >  radius)--------------> Active { stable = current }, Breached + notify
//! ```
//!
//! There is no terminal state. The monitor runs until whoever drives
//! [`GeofenceMonitor::tick`] stops calling it.
//!
//! # Single writer
//!
//! The stable location is only replaced through `&mut self` ([`commit`],
//! [`observe`], [`tick`]). [`evaluate`] takes `&self` and never touches it, so
//! a breach decision and the reference update it implies cannot interleave
//! with another cycle.
//!
//! [`commit`]: GeofenceMonitor::commit
//! [`observe`]: GeofenceMonitor::observe
//! [`tick`]: GeofenceMonitor::tick
//! [`evaluate`]: GeofenceMonitor::evaluate

use waypost_config::GeofenceSettings;
use waypost_types::{DeviceId, DeviceLocationSample, GeofenceEvent, GeofenceRadius};

use crate::notify::Notifier;
use crate::source::LocationSource;

/// The pure decision: radius plus where to send alerts.
#[derive(Debug, Clone)]
pub struct Geofence<N> {
    radius: GeofenceRadius,
    notifier: N,
}

impl<N: Notifier> Geofence<N> {
    pub const fn new(radius: GeofenceRadius, notifier: N) -> Self {
        Self { radius, notifier }
    }

    #[must_use]
    pub const fn radius(&self) -> GeofenceRadius {
        self.radius
    }

    /// Compare `current` against `stable`.
    ///
    /// A breach notifies once per call; nothing else has side effects.
    pub fn evaluate(
        &self,
        stable: &DeviceLocationSample,
        current: &DeviceLocationSample,
    ) -> GeofenceEvent {
        let distance_km = stable.coordinate().distance_km(current.coordinate());
        tracing::info!(distance_km, "Distance from last stable location");

        if self.radius.is_exceeded_by(distance_km) {
            self.notifier.notify(&breach_message(distance_km));
            GeofenceEvent::Breached {
                distance_km,
                location: *current,
            }
        } else {
            GeofenceEvent::Stayed { distance_km }
        }
    }
}

#[must_use]
pub fn breach_message(distance_km: f64) -> String {
    format!(
        "The device has moved too far from the stable location. Distance: {distance_km:.3} km"
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorState {
    Uninitialized,
    Active { stable: DeviceLocationSample },
}

/// Result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Fetch failed or returned no fix; nothing changed.
    Skipped,
    /// First fix recorded as the stable location.
    Initialized(DeviceLocationSample),
    Evaluated(GeofenceEvent),
}

#[derive(Debug)]
pub struct GeofenceMonitor<N> {
    device_id: DeviceId,
    geofence: Geofence<N>,
    state: MonitorState,
}

impl<N: Notifier> GeofenceMonitor<N> {
    pub fn new(device_id: DeviceId, radius: GeofenceRadius, notifier: N) -> Self {
        Self {
            device_id,
            geofence: Geofence::new(radius, notifier),
            state: MonitorState::Uninitialized,
        }
    }

    pub fn from_settings(settings: &GeofenceSettings, notifier: N) -> Self {
        Self::new(settings.device_id.clone(), settings.radius, notifier)
    }

    /// Start in the Active state with a known stable location.
    pub fn with_stable_location(mut self, stable: DeviceLocationSample) -> Self {
        self.state = MonitorState::Active { stable };
        self
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    #[must_use]
    pub const fn radius(&self) -> GeofenceRadius {
        self.geofence.radius
    }

    #[must_use]
    pub const fn state(&self) -> &MonitorState {
        &self.state
    }

    #[must_use]
    pub const fn stable_location(&self) -> Option<&DeviceLocationSample> {
        match &self.state {
            MonitorState::Active { stable } => Some(stable),
            MonitorState::Uninitialized => None,
        }
    }

    /// Evaluate `current` against the stable location without committing.
    ///
    /// `None` while Uninitialized.
    pub fn evaluate(&self, current: &DeviceLocationSample) -> Option<GeofenceEvent> {
        self.stable_location()
            .map(|stable| self.geofence.evaluate(stable, current))
    }

    /// Apply an evaluation result. Only a breach replaces the reference.
    pub fn commit(&mut self, event: &GeofenceEvent) {
        if let Some(location) = event.new_location() {
            tracing::info!(
                device_id = %self.device_id,
                location = %location.coordinate(),
                "Stable location updated"
            );
            self.state = MonitorState::Active { stable: *location };
        }
    }

    /// Feed one successfully fetched sample through the state machine.
    pub fn observe(&mut self, current: DeviceLocationSample) -> CycleOutcome {
        match self.evaluate(&current) {
            Some(event) => {
                self.commit(&event);
                CycleOutcome::Evaluated(event)
            }
            None => {
                tracing::info!(
                    device_id = %self.device_id,
                    location = %current.coordinate(),
                    "Recorded initial stable location"
                );
                self.state = MonitorState::Active { stable: current };
                CycleOutcome::Initialized(current)
            }
        }
    }

    /// One full cycle: fetch, evaluate, commit.
    ///
    /// Never fails. A fetch that yields nothing is logged by the source and
    /// reported here as [`CycleOutcome::Skipped`].
    pub async fn tick<S: LocationSource>(&mut self, source: &S) -> CycleOutcome {
        match source.device_location(&self.device_id).await {
            Some(current) => self.observe(current),
            None => {
                tracing::debug!(device_id = %self.device_id, "Geofence cycle skipped");
                CycleOutcome::Skipped
            }
        }
    }
}
