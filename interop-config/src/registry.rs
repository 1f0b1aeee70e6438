//! Implementation registries.
//!
//! Each entry describes how to launch one implementation in one role. The
//! runner appends `<scenario_id> <port>` to `args`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct ImplementationConfig {
    /// Name used in report rows and log file names.
    #[validate(custom(function = validation::validate_implementation_name))]
    pub name: String,

    #[validate(length(min = 1))]
    pub program: String,

    /// Placed before the scenario id and port.
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ImplementationConfig {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

pub(crate) fn default_clients() -> Vec<ImplementationConfig> {
    vec![ImplementationConfig::new(
        "rustls",
        "target/release/rustls_client",
    )]
}

pub(crate) fn default_servers() -> Vec<ImplementationConfig> {
    vec![ImplementationConfig::new(
        "rustls",
        "target/release/rustls_server",
    )]
}
