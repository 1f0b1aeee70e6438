use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use interop_config::{ImplementationConfig, InteropConfig};
use interop_core::scenario::CATALOG;
use interop_core::Role;
use interop_engine::{report, run_sweep, ResultMatrix};
use interop_telemetry::{InteropLogger, MetricsRecorder};
use tracing::info;

use crate::error::CliError;

/// File under the log directory that receives the Prometheus exposition.
const METRICS_FILE: &str = "metrics.prom";

#[derive(Parser, Debug)]
#[command(version, about = "Runs TLS implementations against each other")]
pub struct Cli {
    /// Configuration file; replaces config/interop.yaml and config/<INTEROP_ENV>.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every scenario for every server/client pair and print the result table
    Run(RunArgs),
    /// Show the scenario catalog and the registered implementations
    List,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Only run this scenario (repeatable)
    #[arg(long = "scenario", value_name = "ID")]
    pub scenarios: Vec<String>,

    /// Only run this client implementation (repeatable)
    #[arg(long = "client", value_name = "NAME")]
    pub clients: Vec<String>,

    /// Only run this server implementation (repeatable)
    #[arg(long = "server", value_name = "NAME")]
    pub servers: Vec<String>,

    /// Runs in flight at once
    #[arg(short = 'j', long)]
    pub parallelism: Option<usize>,

    /// Timeout in seconds for scenarios without their own
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Also write the result table to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exit non-zero when any run failed or timed out
    #[arg(long)]
    pub strict: bool,
}

pub async fn run_command(cli: Cli) -> Result<ExitCode, CliError> {
    let config = match &cli.config {
        Some(path) => InteropConfig::load_from_path(path)?,
        None => InteropConfig::load()?,
    };
    InteropLogger::init(&config.telemetry.log_level, config.telemetry.ansi);

    match cli.command {
        Commands::Run(args) => run_matrix(config, args).await,
        Commands::List => {
            print!("{}", render_listing(&config));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_matrix(mut config: InteropConfig, args: RunArgs) -> Result<ExitCode, CliError> {
    apply_overrides(&mut config, &args)?;
    let log_dir = config.runner.log_dir.clone();

    let metrics = MetricsRecorder::new()?;
    let matrix = run_sweep(config, metrics.clone()).await?;

    print!("{}", report::render(&matrix));
    if let Some(path) = &args.output {
        write_file(path, &report::render_table(&matrix))?;
        info!("Result table written to {}", path.display());
    }
    write_file(&log_dir.join(METRICS_FILE), &metrics.gather_metrics()?)?;

    if fails_strict_mode(&matrix, args.strict) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn fails_strict_mode(matrix: &ResultMatrix, strict: bool) -> bool {
    strict && matrix.has_defects()
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Narrows the sweep to the requested scenarios and implementations and
/// applies the scheduling overrides. The result is validated by the sweep.
pub fn apply_overrides(config: &mut InteropConfig, args: &RunArgs) -> Result<(), CliError> {
    if !args.scenarios.is_empty() {
        config.runner.scenarios = args.scenarios.clone();
    }
    select(&mut config.clients, &args.clients, Role::Client)?;
    select(&mut config.servers, &args.servers, Role::Server)?;
    if let Some(parallelism) = args.parallelism {
        config.runner.parallelism = parallelism;
    }
    if let Some(timeout) = args.timeout {
        config.runner.default_timeout_secs = timeout;
    }
    Ok(())
}

/// Keeps the registered implementations named in `names`, in registration
/// order. An empty filter keeps all of them.
fn select(
    registry: &mut Vec<ImplementationConfig>,
    names: &[String],
    role: Role,
) -> Result<(), CliError> {
    if names.is_empty() {
        return Ok(());
    }
    if let Some(name) = names
        .iter()
        .find(|name| !registry.iter().any(|entry| &entry.name == *name))
    {
        return Err(CliError::UnknownImplementation {
            role,
            name: name.clone(),
        });
    }
    registry.retain(|entry| names.contains(&entry.name));
    Ok(())
}

pub fn render_listing(config: &InteropConfig) -> String {
    let mut out = String::from("scenarios:\n");
    let enabled = config.runner.enabled_scenarios();
    for scenario in CATALOG.iter() {
        let steps: Vec<&str> = scenario.steps.iter().map(|step| step.name()).collect();
        let _ = writeln!(
            out,
            "  {}{} [{}] timeout {}s{}",
            scenario.id,
            if scenario.mutual_auth { " (mutual auth)" } else { "" },
            steps.join(", "),
            config.runner.timeout_for(scenario.id).as_secs(),
            if enabled.contains(&scenario.id) { "" } else { ", disabled" },
        );
    }
    for (heading, registry) in [("servers", &config.servers), ("clients", &config.clients)] {
        let _ = writeln!(out, "{heading}:");
        for implementation in registry {
            let command = std::iter::once(implementation.program.as_str())
                .chain(implementation.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "  {}: {}", implementation.name, command);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use interop_core::ScenarioId;

    fn two_of_each() -> InteropConfig {
        let mut config = InteropConfig::default();
        config.clients = vec![
            ImplementationConfig::new("rustls", "rustls_client"),
            ImplementationConfig::new("openssl", "openssl_client"),
        ];
        config.servers = config.clients.clone();
        config
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "interop",
            "--config",
            "ci.yaml",
            "run",
            "--scenario",
            "greeting",
            "--scenario",
            "handshake",
            "--client",
            "rustls",
            "-j",
            "4",
            "--strict",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("ci.yaml")));
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scenarios, vec!["greeting", "handshake"]);
        assert_eq!(args.clients, vec!["rustls"]);
        assert!(args.servers.is_empty());
        assert_eq!(args.parallelism, Some(4));
        assert!(args.strict);
        assert_eq!(args.output, None);
    }

    #[test]
    fn filters_keep_registration_order() {
        let mut config = two_of_each();
        let args = RunArgs {
            scenarios: vec!["mtls_request_response".into(), "handshake".into()],
            clients: vec!["openssl".into(), "rustls".into()],
            servers: vec!["openssl".into()],
            timeout: Some(60),
            ..RunArgs::default()
        };
        apply_overrides(&mut config, &args).unwrap();

        let clients: Vec<_> = config.clients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(clients, vec!["rustls", "openssl"]);
        assert_eq!(config.servers.len(), 1);
        assert_eq!(
            config.runner.enabled_scenarios(),
            vec![ScenarioId::Handshake, ScenarioId::MtlsRequestResponse]
        );
        assert_eq!(config.runner.default_timeout_secs, 60);
        assert!(config.check().is_ok());
    }

    #[test]
    fn unknown_implementation_is_an_error() {
        let mut config = two_of_each();
        let args = RunArgs {
            servers: vec!["boringssl".into()],
            ..RunArgs::default()
        };
        let err = apply_overrides(&mut config, &args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No server implementation named 'boringssl' is registered"
        );
    }

    #[test]
    fn unknown_scenario_fails_validation() {
        let mut config = two_of_each();
        let args = RunArgs {
            scenarios: vec!["session_resumption".into()],
            ..RunArgs::default()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert!(config.check().is_err());
    }

    #[test]
    fn listing_shows_catalog_and_registries() {
        let mut config = two_of_each();
        config.runner.scenarios = vec!["handshake".into()];
        let listing = render_listing(&config);

        assert!(listing.contains("  handshake [handshake, graceful_close] timeout"));
        assert!(listing.contains("  mtls_request_response (mutual auth) ["));
        assert!(listing.contains("disabled"));
        assert!(listing.contains("servers:\n  rustls: rustls_client"));
        assert!(listing.ends_with("  openssl: openssl_client\n"));
    }

    #[test]
    fn write_failure_names_the_file() {
        let path = Path::new("/nonexistent/interop/results.csv");
        let err = write_file(path, "scenario\n").unwrap_err();
        assert!(matches!(err, CliError::Write { .. }));
        assert!(err.to_string().contains("results.csv"));
    }

    #[test]
    fn strict_mode_fails_on_defects_only() {
        use interop_engine::{Outcome, RunResult};
        use std::time::Duration;

        let mut matrix = ResultMatrix::new(
            vec![ScenarioId::Handshake],
            vec!["rustls".into()],
            vec!["rustls".into()],
        );
        matrix.insert(RunResult {
            scenario: ScenarioId::Handshake,
            client: "rustls".into(),
            server: "rustls".into(),
            outcome: Outcome::Unimplemented,
            duration: Duration::ZERO,
        });
        assert!(!fails_strict_mode(&matrix, true));

        matrix.insert(RunResult {
            scenario: ScenarioId::Handshake,
            client: "rustls".into(),
            server: "rustls".into(),
            outcome: Outcome::Timeout,
            duration: Duration::ZERO,
        });
        assert!(fails_strict_mode(&matrix, true));
        assert!(!fails_strict_mode(&matrix, false));
    }
}
