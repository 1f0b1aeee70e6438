//! # interop-engine
//!
//! Runs the cross-product of scenarios, server implementations and client
//! implementations as pairs of real processes, and reports the outcome of each
//! pair.
//!
//! ### Key Submodules:
//! - `endpoint`: Launching one implementation in one role and observing its exit
//! - `readiness`: Deciding when a server may be handed a client
//! - `ports`: Exclusive port leases
//! - `orchestrator`: Scheduling, supervision and timeouts
//! - `matrix` / `report`: Collecting and rendering the results

pub mod endpoint;
pub mod error;
pub mod matrix;
pub mod orchestrator;
pub mod outcome;
pub mod ports;
pub mod readiness;
pub mod report;

use interop_config::InteropConfig;
use interop_telemetry::MetricsRecorder;

pub use error::EngineError;
pub use matrix::ResultMatrix;
pub use orchestrator::{Orchestrator, RunSpec};
pub use outcome::{EndpointExit, Outcome, RunResult};

/// Validates `config` and runs the full sweep it describes.
pub async fn run_sweep(
    config: InteropConfig,
    metrics: MetricsRecorder,
) -> Result<ResultMatrix, EngineError> {
    config.check()?;
    Orchestrator::new(config, metrics).run().await
}
