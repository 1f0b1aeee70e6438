use std::io;
use std::path::PathBuf;

use interop_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create log directory {path}: {source}")]
    LogDir { path: PathBuf, source: io::Error },

    #[error("Failed to open log file {path}: {source}")]
    LogFile { path: PathBuf, source: io::Error },

    #[error("Failed to launch {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("No free port in {start}..{end}")]
    PortsExhausted { start: u16, end: u16 },
}
