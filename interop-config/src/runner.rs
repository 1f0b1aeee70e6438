//! Test matrix runner configuration.
//!
//! Controls how the sweep is scheduled:
//! - Port range handed out to runs
//! - Parallelism and per-scenario timeouts
//! - Server readiness detection

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use interop_core::ScenarioId;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation;

/// Runner configuration parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = validate_port_range))]
pub struct RunnerConfig {
    /// First port handed out to runs.
    #[validate(range(min = 1024))]
    pub port_range_start: u16,

    /// End of the port range (exclusive).
    pub port_range_end: u16,

    /// Maximum number of runs in flight.
    #[validate(range(min = 1))]
    pub parallelism: usize,

    /// Applied to scenarios without an entry in `scenario_timeouts_secs`.
    #[validate(range(min = 1))]
    pub default_timeout_secs: u64,

    #[validate(custom(function = validation::validate_scenario_timeouts))]
    pub scenario_timeouts_secs: BTreeMap<String, u64>,

    /// Enabled scenarios. Runs always follow catalog order.
    #[validate(length(min = 1))]
    #[validate(custom(function = validation::validate_scenario_ids))]
    pub scenarios: Vec<String>,

    /// Per-run endpoint logs and the metrics snapshot are written here.
    pub log_dir: PathBuf,

    #[validate(nested)]
    pub readiness: ReadinessConfig,
}

fn default_parallelism() -> usize {
    // each bulk run keeps two cores busy
    (num_cpus::get() / 2).max(1)
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            port_range_start: 9001,
            port_range_end: 9101,
            parallelism: default_parallelism(),
            default_timeout_secs: 420,
            scenario_timeouts_secs: BTreeMap::new(),
            scenarios: ScenarioId::ALL
                .iter()
                .map(|id| id.as_str().to_string())
                .collect(),
            log_dir: PathBuf::from("interop_logs"),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Enabled scenarios in catalog order.
    pub fn enabled_scenarios(&self) -> Vec<ScenarioId> {
        ScenarioId::ALL
            .into_iter()
            .filter(|id| self.scenarios.iter().any(|s| s == id.as_str()))
            .collect()
    }

    pub fn timeout_for(&self, scenario: ScenarioId) -> Duration {
        let secs = self
            .scenario_timeouts_secs
            .get(scenario.as_str())
            .copied()
            .unwrap_or(self.default_timeout_secs);
        Duration::from_secs(secs)
    }

    pub fn port_count(&self) -> usize {
        usize::from(self.port_range_end.saturating_sub(self.port_range_start))
    }
}

fn validate_port_range(config: &RunnerConfig) -> Result<(), ValidationError> {
    if config.port_range_end <= config.port_range_start {
        let mut error = ValidationError::new("empty_port_range");
        error.message = Some(Cow::Owned(format!(
            "port range {}..{} is empty",
            config.port_range_start, config.port_range_end
        )));
        return Err(error);
    }
    if config.port_count() < config.parallelism {
        let mut error = ValidationError::new("port_range_too_small");
        error.message = Some(Cow::Owned(format!(
            "{} ports cannot serve {} parallel runs",
            config.port_count(),
            config.parallelism
        )));
        return Err(error);
    }
    Ok(())
}

/// How the runner decides a server is accepting connections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Look for the port in LISTEN state in the kernel socket tables.
    ListenTable,
    /// Open and immediately close a TCP connection.
    Connect,
    /// Sleep for one interval.
    Delay,
}

impl Default for ProbeKind {
    fn default() -> Self {
        if cfg!(target_os = "linux") {
            ProbeKind::ListenTable
        } else {
            ProbeKind::Connect
        }
    }
}

/// Server readiness probe parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ReadinessConfig {
    pub probe: ProbeKind,

    /// Time between probe attempts; the whole wait for `delay`.
    #[validate(range(min = 1))]
    pub interval_ms: u64,

    /// Give up on a server that is not ready after this long.
    #[validate(range(min = 1))]
    pub deadline_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            probe: ProbeKind::default(),
            interval_ms: 25,
            deadline_ms: 5000,
        }
    }
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}
