//! Where the monitor gets fresh locations from.

use std::future::Future;

use waypost_client::{ClientError, FindSession};
use waypost_types::{DeviceId, DeviceLocationSample};

/// Fail-soft location lookup.
///
/// `None` covers every failure: unreachable service, expired session,
/// undecodable response, or a device that has no fix yet. Implementations
/// log the reason; callers treat all of them as "skip this cycle".
pub trait LocationSource {
    fn device_location(
        &self,
        device: &DeviceId,
    ) -> impl Future<Output = Option<DeviceLocationSample>> + Send;
}

impl LocationSource for FindSession {
    async fn device_location(&self, device: &DeviceId) -> Option<DeviceLocationSample> {
        match FindSession::device_location(self, device).await {
            Ok(sample) => Some(sample),
            Err(e) => {
                log_fetch_failure(device, &e);
                None
            }
        }
    }
}

fn log_fetch_failure(device: &DeviceId, error: &ClientError) {
    if error.is_missing_location() {
        tracing::warn!(device_id = %device, error = %error, "Location not found for device");
    } else {
        tracing::warn!(device_id = %device, error = %error, "Failed to get device location");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::LocationSource;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use waypost_types::{DeviceId, DeviceLocationSample};

    /// Replays a fixed script of fetch results, then keeps returning the
    /// fallback.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedSource {
        script: Mutex<VecDeque<Option<DeviceLocationSample>>>,
        fallback: Option<DeviceLocationSample>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(
            script: impl IntoIterator<Item = Option<DeviceLocationSample>>,
            fallback: Option<DeviceLocationSample>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LocationSource for ScriptedSource {
        async fn device_location(&self, _device: &DeviceId) -> Option<DeviceLocationSample> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or(self.fallback)
        }
    }
}
