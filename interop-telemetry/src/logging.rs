//! ## interop-telemetry::logging
//! **Console logging with `tracing`**
//!
//! Output goes to stderr: the runner prints its report on stdout, and endpoint
//! stderr is captured into per-run log files.

use tracing::info_span;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct InteropLogger;

impl InteropLogger {
    /// Installs the global subscriber. `RUST_LOG` overrides `level`.
    /// Only the first call in a process has an effect.
    pub fn init(level: &str, ansi: bool) {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
            )
            .with_thread_names(true)
            .with_ansi(ansi)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Records a run lifecycle event under its own span.
    pub fn log_event(event_type: &str, fields: &[(&str, &str)]) {
        let span = info_span!("run_event", event_type = event_type);
        let _entered = span.enter();
        tracing::info!(fields = ?fields, "Run event: {}", event_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_logging() {
        InteropLogger::log_event(
            "run_finished",
            &[("scenario", "handshake"), ("outcome", "success")],
        );
        assert!(logs_contain("Run event: run_finished"));
        assert!(logs_contain("handshake"));
    }
}
