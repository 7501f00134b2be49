//! Waypost engine - geofence monitoring on top of the location client.
//!
//! # Architecture
//!
//! ```text
//! run() -> list devices -> write_device_report()
//!       -> run_monitor() --interval--> GeofenceMonitor::tick()
//!                                        |-- LocationSource::device_location()
//!                                        |-- Geofence::evaluate() -> distance_km()
//!                                        `-- Notifier::notify()  (breach only)
//! ```
//!
//! - [`geofence`] - the monitor state machine and breach decision
//! - [`scheduler`] - the fixed-interval loop, one cycle in flight at a time
//! - [`source`] - the fail-soft [`LocationSource`] seam over the API client
//! - [`notify`] - pluggable [`Notifier`] implementations
//! - [`report`] - the startup device listing
//!
//! # Failure policy
//!
//! Nothing that happens inside a monitoring cycle can stop the loop. Fetch
//! failures become [`CycleOutcome::Skipped`] plus a `warn` log. Only startup
//! steps (authentication, device listing) return [`EngineError`].

mod app;
pub mod geofence;
pub mod notify;
pub mod report;
pub mod scheduler;
pub mod source;

pub use app::{EngineError, RunOutcome, connect, run, run_with_notifier};
pub use geofence::{CycleOutcome, Geofence, GeofenceMonitor, MonitorState, breach_message};
pub use notify::{ConsoleNotifier, LogNotifier, Notifier, notifier_for};
pub use report::write_device_report;
pub use scheduler::{MonitorSummary, run_monitor};
pub use source::LocationSource;

pub use waypost_client;
pub use waypost_config;
pub use waypost_types;
