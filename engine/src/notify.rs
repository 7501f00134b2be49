//! Breach alert delivery.
//!
//! The monitor only knows the [`Notifier`] capability; which channel carries
//! the message is picked at startup from [`NotifierKind`].

use std::io::Write;
use std::sync::Arc;

use waypost_config::NotifierKind;

/// Fire-and-forget alert sink. Delivery is best effort and never fails the
/// caller.
pub trait Notifier {
    fn notify(&self, message: &str);
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, message: &str) {
        (**self).notify(message);
    }
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, message: &str) {
        (**self).notify(message);
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, message: &str) {
        (**self).notify(message);
    }
}

/// Prints `[?] {message}` to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "[?] {message}").and_then(|()| out.flush()) {
            tracing::debug!(error = %e, "Console notification not delivered");
        }
    }
}

/// Emits a `warn` tracing event on the `waypost::alert` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "waypost::alert", "{message}");
    }
}

#[must_use]
pub fn notifier_for(kind: NotifierKind) -> Box<dyn Notifier + Send + Sync> {
    match kind {
        NotifierKind::Console => Box::new(ConsoleNotifier),
        NotifierKind::Log => Box::new(LogNotifier),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Notifier;
    use std::sync::Mutex;

    /// Collects messages for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        pub(crate) fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}
