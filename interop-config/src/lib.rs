//! # Interop Configuration System
//!
//! Layered configuration for the TLS interoperability runner and the in-repo
//! endpoints.
//!
//! ## Layers
//! - **Defaults**: compiled in, enough to sweep the in-repo implementation
//! - **Files**: `config/interop.yaml`, then `config/<INTEROP_ENV>.yaml`
//! - **Environment**: `INTEROP_*`, with `__` separating nested keys
//!
//! Everything is validated after extraction, so the runner never starts with
//! a port range it cannot use or a scenario it does not know.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

mod error;
mod registry;
mod runner;
mod shim;
mod telemetry;
mod transfer;
mod validation;

pub use error::ConfigError;
pub use registry::ImplementationConfig;
pub use runner::{ProbeKind, ReadinessConfig, RunnerConfig};
pub use shim::ShimConfig;
pub use telemetry::TelemetryConfig;
pub use transfer::TransferConfig;

const BASE_CONFIG: &str = "config/interop.yaml";

/// Top-level configuration of an interop sweep.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = validate_registries))]
pub struct InteropConfig {
    /// Scheduling, timeouts and readiness.
    #[validate(nested)]
    pub runner: RunnerConfig,

    /// Bulk transfer shape forwarded to every endpoint.
    #[validate(nested)]
    pub transfer: TransferConfig,

    #[validate(nested)]
    pub telemetry: TelemetryConfig,

    /// Client implementations, in report order.
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub clients: Vec<ImplementationConfig>,

    /// Server implementations, in report order. Usually a subset of the clients.
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub servers: Vec<ImplementationConfig>,
}

impl Default for InteropConfig {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            transfer: TransferConfig::default(),
            telemetry: TelemetryConfig::default(),
            clients: registry::default_clients(),
            servers: registry::default_servers(),
        }
    }
}

fn validate_registries(config: &InteropConfig) -> Result<(), ValidationError> {
    validation::validate_unique_names(config.clients.iter().map(|c| c.name.as_str()))?;
    validation::validate_unique_names(config.servers.iter().map(|s| s.name.as_str()))
}

impl InteropConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/interop.yaml`, if present
    /// 3. `config/<INTEROP_ENV>.yaml`, if present (`INTEROP_ENV` defaults to `local`)
    /// 4. `INTEROP_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(InteropConfig::default()));

        if Path::new(BASE_CONFIG).exists() {
            figment = figment.merge(Yaml::file(BASE_CONFIG));
        }

        let env = std::env::var("INTEROP_ENV").unwrap_or_else(|_| "local".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific file on top of the defaults.
    /// Environment variables still apply.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment =
            Figment::from(Serialized::defaults(InteropConfig::default())).merge(Yaml::file(path));
        Self::finish(figment)
    }

    /// Re-validates after programmatic changes such as command-line overrides.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        Ok(())
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed("INTEROP_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.check()?;
                Ok(config)
            })
    }
}
