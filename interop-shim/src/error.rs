use std::io;
use std::path::PathBuf;

use interop_config::ConfigError;
use interop_core::error::GENERIC_FAILURE_EXIT_CODE;
use interop_core::StepError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read PEM file {path}: {source}")]
    Pem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No certificates in {0}")]
    NoCertificates(PathBuf),

    #[error("No private key in {0}")]
    NoPrivateKey(PathBuf),

    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Client certificate verifier error: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),

    #[error("Invalid server name: {0}")]
    ServerName(#[from] rustls::pki_types::InvalidDnsNameError),

    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Step(#[from] StepError),
}

impl ShimError {
    /// Scenario failures keep their own exit code; everything that happens
    /// before the first step is a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShimError::Step(step) => step.exit_code(),
            _ => GENERIC_FAILURE_EXIT_CODE,
        }
    }
}
