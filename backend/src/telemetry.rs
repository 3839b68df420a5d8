//! Logging handle injected into services.
//!
//! Services hold a [`Telemetry`] and run every operation inside its
//! dispatcher, so hosts and tests choose where events go per component
//! instead of relying on a process-wide logger.

use std::fmt;
use std::future::Future;

use tracing::dispatcher::{self, SetGlobalDefaultError};
use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing::Dispatch;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

/// Default filter directive when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Injected tracing dispatcher.
#[derive(Clone)]
pub struct Telemetry {
    dispatch: Dispatch,
}

impl Telemetry {
    /// Wrap an existing dispatcher.
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// JSON formatter filtered by `filter`.
    pub fn json(filter: EnvFilter) -> Self {
        let subscriber = tracing_fmt().with_env_filter(filter).json().finish();
        Self::new(Dispatch::new(subscriber))
    }

    /// JSON formatter filtered by `RUST_LOG`, falling back to
    /// [`DEFAULT_FILTER`].
    pub fn from_env() -> Self {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        Self::json(filter)
    }

    /// Whatever dispatcher is current for the calling thread.
    pub fn current() -> Self {
        Self::new(dispatcher::get_default(Dispatch::clone))
    }

    /// Discard every event.
    pub fn disabled() -> Self {
        Self::new(Dispatch::none())
    }

    /// Run `future` with this dispatcher as the default.
    pub fn scope<F: Future>(&self, future: F) -> WithDispatch<F> {
        future.with_subscriber(self.dispatch.clone())
    }

    /// Install this dispatcher process-wide for code outside the services.
    pub fn install_global(&self) -> Result<(), SetGlobalDefaultError> {
        dispatcher::set_global_default(self.dispatch.clone())
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Capturing subscriber for asserting on log output.

    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::Dispatch;
    use tracing_subscriber::fmt::MakeWriter;

    use super::Telemetry;

    /// Shared in-memory log sink.
    #[derive(Clone, Default)]
    pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub(crate) fn contents(&self) -> String {
            let guard = self.0.lock().unwrap_or_else(|err| err.into_inner());
            String::from_utf8_lossy(&guard).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut guard = self.0.lock().unwrap_or_else(|err| err.into_inner());
            guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Telemetry writing JSON lines into the returned sink.
    pub(crate) fn capturing_telemetry() -> (Telemetry, CapturedLogs) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::TRACE)
            .json()
            .finish();
        (Telemetry::new(Dispatch::new(subscriber)), logs)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::test_support::capturing_telemetry;
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn scope_routes_events_to_injected_dispatcher() {
        let (telemetry, logs) = capturing_telemetry();
        telemetry
            .scope(async {
                tracing::warn!(auth_id = "abc", "orphaned identity");
            })
            .await;
        let output = logs.contents();
        assert!(output.contains("orphaned identity"), "got {output}");
        assert!(output.contains("\"auth_id\":\"abc\""), "got {output}");
    }

    #[rstest]
    #[tokio::test]
    async fn events_outside_scope_are_not_captured() {
        let (telemetry, logs) = capturing_telemetry();
        tracing::warn!("unscoped");
        telemetry.scope(async {}).await;
        assert!(logs.contents().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn disabled_telemetry_swallows_events() {
        let telemetry = Telemetry::disabled();
        let value = telemetry
            .scope(async {
                tracing::error!("dropped");
                7
            })
            .await;
        assert_eq!(value, 7);
    }
}
