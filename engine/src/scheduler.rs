//! Fixed-interval driver for the geofence monitor.
//!
//! Cycles are serialized: the loop awaits each [`GeofenceMonitor::tick`]
//! before waiting for the next interval tick, so at most one fetch is in
//! flight and cycles observe each other's reference updates in order. A fetch
//! that outlasts the interval delays the following cycle instead of queueing a
//! burst of catch-up ticks ([`MissedTickBehavior::Delay`]).

use std::future::Future;

use tokio::time::{Instant, MissedTickBehavior};
use waypost_types::PollInterval;

use crate::geofence::{CycleOutcome, GeofenceMonitor};
use crate::notify::Notifier;
use crate::source::LocationSource;

/// Counters for a finished monitoring session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSummary {
    pub cycles: u64,
    pub skipped: u64,
    pub breaches: u64,
}

impl MonitorSummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Skipped => self.skipped += 1,
            CycleOutcome::Evaluated(event) if event.changed() => self.breaches += 1,
            CycleOutcome::Initialized(_) | CycleOutcome::Evaluated(_) => {}
        }
    }
}

/// Run `monitor` until `shutdown` resolves.
///
/// The stable location is seeded by an immediate fetch; periodic cycles then
/// start one full `interval` later. If the seeding fetch fails the monitor
/// stays uninitialized and the next cycle retries. Shutdown drops an
/// in-flight fetch.
pub async fn run_monitor<N, S, F>(
    monitor: &mut GeofenceMonitor<N>,
    source: &S,
    interval: PollInterval,
    shutdown: F,
) -> MonitorSummary
where
    N: Notifier,
    S: LocationSource,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut summary = MonitorSummary::default();

    tracing::info!(
        device_id = %monitor.device_id(),
        radius_km = monitor.radius().km(),
        interval_ms = interval.as_millis(),
        "Geofence monitoring started"
    );

    if monitor.stable_location().is_none() {
        tokio::select! {
            biased;
            () = &mut shutdown => return summary,
            outcome = monitor.tick(source) => {
                if outcome == CycleOutcome::Skipped {
                    tracing::warn!(
                        device_id = %monitor.device_id(),
                        "No initial location; will retry on the next cycle"
                    );
                }
            }
        }
    }

    let period = interval.duration();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            () = &mut shutdown => break,
            outcome = monitor.tick(source) => outcome,
        };
        summary.record(&outcome);
    }

    tracing::info!(
        cycles = summary.cycles,
        skipped = summary.skipped,
        breaches = summary.breaches,
        "Geofence monitoring stopped"
    );
    summary
}
