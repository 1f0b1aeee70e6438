//! # Interop Telemetry
//!
//! Logging bootstrap shared by the runner and the in-repo endpoints, and the
//! Prometheus metrics the runner records for every run.

pub mod logging;
pub mod metrics;

pub use logging::InteropLogger;
pub use metrics::MetricsRecorder;
