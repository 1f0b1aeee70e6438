//! A server that breaks the script on purpose, so the runner's failure and
//! timeout classification can be exercised against real processes.

use std::process::ExitCode;

use interop_config::ShimConfig;
use interop_core::scenario::{StepKind, CLIENT_GREETING};
use interop_core::{Handshake, Scenario, ScenarioId, StepError, UNIMPLEMENTED_EXIT_CODE};
use interop_telemetry::InteropLogger;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info, warn};

use crate::args::EndpointArgs;
use crate::endpoint::{exit_status, DEFAULT_LOG_LEVEL};
use crate::error::ShimError;
use crate::tls::{self, ServerHandshake};

/// Sent in place of the server greeting.
pub const WRONG_GREETING: &[u8] = b"wrong message";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Misbehaviour {
    /// Answers the client greeting with [`WRONG_GREETING`].
    WrongGreeting,
    /// Completes the handshake and never reads or writes again.
    Stall,
}

impl Misbehaviour {
    pub fn for_scenario(id: ScenarioId) -> Option<Misbehaviour> {
        match id {
            ScenarioId::Greeting | ScenarioId::MtlsRequestResponse => {
                Some(Misbehaviour::WrongGreeting)
            }
            ScenarioId::Handshake => Some(Misbehaviour::Stall),
            ScenarioId::LargeDataDownload
            | ScenarioId::LargeDataDownloadWithFrequentKeyUpdates => None,
        }
    }
}

pub async fn run(args: EndpointArgs) -> ExitCode {
    InteropLogger::init(DEFAULT_LOG_LEVEL, false);

    let planned = Scenario::from_name(&args.scenario)
        .ok()
        .and_then(|scenario| Some((scenario, Misbehaviour::for_scenario(scenario.id)?)));
    let Some((scenario, misbehaviour)) = planned else {
        info!("No misbehaviour for '{}', exiting as unimplemented", args.scenario);
        return exit_status(UNIMPLEMENTED_EXIT_CODE);
    };

    match misbehave(scenario, misbehaviour, args.port).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Faulty server failed: {}", e);
            exit_status(e.exit_code())
        }
    }
}

pub async fn misbehave(
    scenario: &'static Scenario,
    misbehaviour: Misbehaviour,
    port: u16,
) -> Result<(), ShimError> {
    let config = ShimConfig::load()?;
    let tls = tls::server_config(&config.pem_dir, scenario.mutual_auth)?;
    let mut stream = ServerHandshake::bind(tls, port)
        .await?
        .handshake()
        .await
        .map_err(StepError::Handshake)?;

    match misbehaviour {
        Misbehaviour::Stall => {
            warn!("Handshake complete, stalling");
            std::future::pending::<()>().await;
        }
        Misbehaviour::WrongGreeting => {
            let io_error = |source: std::io::Error| StepError::Io {
                step: StepKind::SendGreeting,
                source,
            };
            let mut greeting = vec![0u8; CLIENT_GREETING.len()];
            stream.read_exact(&mut greeting).await.map_err(io_error)?;

            let io_error = |source: std::io::Error| StepError::Io {
                step: StepKind::RecvGreeting,
                source,
            };
            warn!("Answering with the wrong greeting");
            stream.write_all(WRONG_GREETING).await.map_err(io_error)?;
            stream.shutdown().await.map_err(io_error)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_scenarios_are_not_misbehaved() {
        assert_eq!(
            Misbehaviour::for_scenario(ScenarioId::Greeting),
            Some(Misbehaviour::WrongGreeting)
        );
        assert_eq!(
            Misbehaviour::for_scenario(ScenarioId::MtlsRequestResponse),
            Some(Misbehaviour::WrongGreeting)
        );
        assert_eq!(
            Misbehaviour::for_scenario(ScenarioId::Handshake),
            Some(Misbehaviour::Stall)
        );
        assert_eq!(Misbehaviour::for_scenario(ScenarioId::LargeDataDownload), None);
    }

    #[test]
    fn wrong_greeting_differs_from_the_real_one() {
        assert_ne!(WRONG_GREETING, interop_core::scenario::SERVER_GREETING.as_bytes());
    }
}
