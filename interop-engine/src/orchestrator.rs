//! ## interop-engine::orchestrator
//! **Test matrix orchestrator**
//!
//! Runs every (scenario, server, client) combination once. Each run leases a
//! port, starts the server, waits for it to listen, starts the client and
//! supervises both until they exit or the scenario's timeout expires. Runs
//! execute concurrently up to the configured parallelism and report back over
//! a channel; only the orchestrator touches the [`ResultMatrix`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use interop_config::{ImplementationConfig, InteropConfig};
use interop_core::{Role, ScenarioId};
use interop_telemetry::{InteropLogger, MetricsRecorder};
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::endpoint::Endpoint;
use crate::error::EngineError;
use crate::matrix::ResultMatrix;
use crate::outcome::{verdict, EndpointExit, Outcome, RunResult};
use crate::ports::PortAllocator;
use crate::readiness::{wait_until_ready, Readiness};

/// One combination of the sweep.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub scenario: ScenarioId,
    pub server: ImplementationConfig,
    pub client: ImplementationConfig,
}

impl RunSpec {
    fn log_path(&self, log_dir: &std::path::Path, role: Role) -> PathBuf {
        log_dir.join(format!(
            "{}_{}_{}_{}.log",
            self.scenario, self.server.name, self.client.name, role
        ))
    }
}

/// Shared by all runs of a sweep.
struct RunContext {
    config: Arc<InteropConfig>,
    ports: PortAllocator,
    transfer_env: Vec<(String, String)>,
}

pub struct Orchestrator {
    config: Arc<InteropConfig>,
    ports: PortAllocator,
    metrics: MetricsRecorder,
}

impl Orchestrator {
    pub fn new(config: InteropConfig, metrics: MetricsRecorder) -> Self {
        let ports = PortAllocator::new(
            config.runner.port_range_start,
            config.runner.port_range_end,
        );
        Self {
            config: Arc::new(config),
            ports,
            metrics,
        }
    }

    pub fn ports(&self) -> &PortAllocator {
        &self.ports
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Every combination, in report order.
    pub fn plan(&self) -> Vec<RunSpec> {
        let mut plan = Vec::new();
        for scenario in self.config.runner.enabled_scenarios() {
            for server in &self.config.servers {
                for client in &self.config.clients {
                    plan.push(RunSpec {
                        scenario,
                        server: server.clone(),
                        client: client.clone(),
                    });
                }
            }
        }
        plan
    }

    fn empty_matrix(&self) -> ResultMatrix {
        ResultMatrix::new(
            self.config.runner.enabled_scenarios(),
            self.config.servers.iter().map(|s| s.name.clone()).collect(),
            self.config.clients.iter().map(|c| c.name.clone()).collect(),
        )
    }

    #[instrument(level = "info", name = "sweep", skip(self))]
    pub async fn run(&self) -> Result<ResultMatrix, EngineError> {
        let log_dir = &self.config.runner.log_dir;
        tokio::fs::create_dir_all(log_dir)
            .await
            .map_err(|source| EngineError::LogDir {
                path: log_dir.clone(),
                source,
            })?;

        let plan = self.plan();
        let parallelism = self.config.runner.parallelism;
        info!("Starting sweep: {} runs, {} at a time", plan.len(), parallelism);

        let ctx = Arc::new(RunContext {
            config: Arc::clone(&self.config),
            ports: self.ports.clone(),
            transfer_env: self.config.transfer.to_env(),
        });
        let semaphore = Arc::new(Semaphore::new(parallelism));
        let (tx, mut rx) = mpsc::unbounded_channel::<RunResult>();

        let dispatcher = tokio::spawn(async move {
            for spec in plan {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                let ctx = Arc::clone(&ctx);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = execute(&ctx, &spec).await;
                    drop(permit);
                    let _ = tx.send(result);
                });
            }
        });

        let mut matrix = self.empty_matrix();
        while let Some(result) = rx.recv().await {
            self.metrics
                .record_run(result.outcome.label(), result.duration);
            InteropLogger::log_event(
                "run_finished",
                &[
                    ("scenario", result.scenario.as_str()),
                    ("server", result.server.as_str()),
                    ("client", result.client.as_str()),
                    ("outcome", result.outcome.label()),
                ],
            );
            matrix.insert(result);
        }
        if let Err(e) = dispatcher.await {
            warn!("Run dispatcher stopped early: {}", e);
        }

        // a run task that panicked never reported
        for (scenario, server, client) in matrix.missing() {
            warn!("No result for {} {} -> {}", scenario, client, server);
            matrix.insert(RunResult {
                scenario,
                client,
                server,
                outcome: Outcome::Failure("run aborted".into()),
                duration: Duration::ZERO,
            });
        }

        info!("Sweep finished: {} results", matrix.len());
        Ok(matrix)
    }
}

#[instrument(
    level = "info",
    name = "run",
    skip_all,
    fields(
        scenario = %spec.scenario,
        server = %spec.server.name,
        client = %spec.client.name,
        port = tracing::field::Empty,
    )
)]
async fn execute(ctx: &RunContext, spec: &RunSpec) -> RunResult {
    let started = Instant::now();
    let outcome = match attempt(ctx, spec).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Run could not be carried out: {}", e);
            Outcome::Failure(e.to_string())
        }
    };
    let duration = started.elapsed();
    info!("Finished with {} in {:.1}s", outcome, duration.as_secs_f64());

    RunResult {
        scenario: spec.scenario,
        client: spec.client.name.clone(),
        server: spec.server.name.clone(),
        outcome,
        duration,
    }
}

async fn attempt(ctx: &RunContext, spec: &RunSpec) -> Result<Outcome, EngineError> {
    let runner = &ctx.config.runner;
    // held until both process groups are gone; declared first so that early
    // returns drop it after the endpoints
    let lease = ctx.ports.lease()?;
    let port = lease.port();
    tracing::Span::current().record("port", port);

    let deadline = Instant::now() + runner.timeout_for(spec.scenario);
    let mut server = Endpoint::spawn(
        &spec.server,
        Role::Server,
        spec.scenario,
        port,
        &ctx.transfer_env,
        &spec.log_path(&runner.log_dir, Role::Server),
    )
    .await?;

    match timeout_at(deadline, wait_until_ready(&runner.readiness, port, &mut server)).await {
        Ok(Readiness::Ready) => {}
        Ok(Readiness::Exited(exit)) => {
            debug!("Server exited before the client started: {:?}", exit);
            return Ok(match exit {
                EndpointExit::Code(0) => {
                    Outcome::Failure("server exited before the client started".into())
                }
                other => other.outcome(Role::Server),
            });
        }
        Ok(Readiness::NeverReady) => {
            server.terminate().await;
            return Ok(Outcome::Failure("server never became ready".into()));
        }
        Err(_) => {
            server.terminate().await;
            return Ok(Outcome::Timeout);
        }
    }

    let mut client = match Endpoint::spawn(
        &spec.client,
        Role::Client,
        spec.scenario,
        port,
        &ctx.transfer_env,
        &spec.log_path(&runner.log_dir, Role::Client),
    )
    .await
    {
        Ok(client) => client,
        Err(e) => {
            server.terminate().await;
            return Err(e);
        }
    };

    let (client_exit, server_exit) = supervise(&mut client, &mut server, deadline).await;
    debug!("client {:?}, server {:?}", client_exit, server_exit);
    // process groups first, so nothing left behind still holds the port
    drop(client);
    drop(server);
    drop(lease);
    Ok(verdict(&client_exit, &server_exit))
}

/// Waits for both endpoints. An endpoint that does not implement the scenario
/// ends its peer; the deadline ends both.
async fn supervise(
    client: &mut Endpoint,
    server: &mut Endpoint,
    deadline: Instant,
) -> (EndpointExit, EndpointExit) {
    let mut client_exit: Option<EndpointExit> = None;
    let mut server_exit: Option<EndpointExit> = None;
    let expiry = sleep_until(deadline);
    tokio::pin!(expiry);

    loop {
        if let (Some(c), Some(s)) = (&client_exit, &server_exit) {
            return (c.clone(), s.clone());
        }

        tokio::select! {
            exit = client.wait(), if client_exit.is_none() => {
                if exit.is_unimplemented() && server_exit.is_none() {
                    server.terminate().await;
                    server_exit = Some(EndpointExit::Cancelled);
                }
                client_exit = Some(exit);
            }
            exit = server.wait(), if server_exit.is_none() => {
                if exit.is_unimplemented() && client_exit.is_none() {
                    client.terminate().await;
                    client_exit = Some(EndpointExit::Cancelled);
                }
                server_exit = Some(exit);
            }
            _ = &mut expiry => {
                warn!("Timed out after {:?}", client.elapsed());
                if client_exit.is_none() {
                    client.terminate().await;
                    client_exit = Some(EndpointExit::TimedOut);
                }
                if server_exit.is_none() {
                    server.terminate().await;
                    server_exit = Some(EndpointExit::TimedOut);
                }
            }
        }
    }
}
