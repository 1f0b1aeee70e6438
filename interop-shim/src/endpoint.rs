//! ## interop-shim::endpoint
//! **Process entry point for the rustls client and server**
//!
//! Resolves the scenario, loads the endpoint settings and trust material, and
//! plays the scenario through the protocol executor. The process exit code
//! carries the outcome back to the runner.

use std::process::ExitCode;

use interop_config::ShimConfig;
use interop_core::{Role, RunReport, Scenario, ScenarioExecutor, UNIMPLEMENTED_EXIT_CODE};
use interop_telemetry::InteropLogger;
use tracing::{error, info};

use crate::args::EndpointArgs;
use crate::error::ShimError;
use crate::tls::{self, ClientHandshake, ServerHandshake};

/// Endpoint log level when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Codes that do not fit a process exit status become a generic failure.
fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

pub fn exit_status(code: i32) -> ExitCode {
    ExitCode::from(exit_byte(code))
}

pub async fn run(role: Role, args: EndpointArgs) -> ExitCode {
    InteropLogger::init(DEFAULT_LOG_LEVEL, false);

    let scenario = match Scenario::from_name(&args.scenario) {
        Ok(scenario) => scenario,
        Err(e) => {
            info!("{}, exiting as unimplemented", e);
            return exit_status(UNIMPLEMENTED_EXIT_CODE);
        }
    };

    match play(role, scenario, args.port).await {
        Ok(report) => {
            info!(
                "Scenario {} passed: {} steps, {} bytes, {} key updates",
                scenario.id, report.steps_completed, report.bytes_transferred, report.key_updates
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Scenario {} failed: {}", scenario.id, e);
            exit_status(e.exit_code())
        }
    }
}

/// Plays `scenario` as `role` on `port` with settings from the environment.
pub async fn play(
    role: Role,
    scenario: &'static Scenario,
    port: u16,
) -> Result<RunReport, ShimError> {
    let config = ShimConfig::load()?;
    play_with(&config, role, scenario, port).await
}

pub async fn play_with(
    config: &ShimConfig,
    role: Role,
    scenario: &'static Scenario,
    port: u16,
) -> Result<RunReport, ShimError> {
    let executor = ScenarioExecutor::new(role, scenario)
        .with_layout(config.transfer.layout())
        .with_transfer_gb(config.transfer.gigabytes);

    let report = match role {
        Role::Client => {
            let tls = tls::client_config(&config.pem_dir, scenario.mutual_auth)?;
            executor
                .run(ClientHandshake::new(tls, &config.host, port)?)
                .await?
        }
        Role::Server => {
            let tls = tls::server_config(&config.pem_dir, scenario.mutual_auth)?;
            executor.run(ServerHandshake::bind(tls, port).await?).await?
        }
    };
    Ok(report)
}
