use std::io;
use std::path::PathBuf;

use interop_config::ConfigError;
use interop_core::Role;
use interop_engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("No {role} implementation named '{name}' is registered")]
    UnknownImplementation { role: Role, name: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
