//! # interop-shim
//!
//! A TLS implementation under test built on `tokio-rustls`, plus a faulty peer
//! for exercising the runner. Each binary takes `<scenario_id> <port>` and
//! reports its outcome through the exit code.
//!
//! ### Key Submodules:
//! - `tls`: rustls configurations and the executor transport
//! - `pem`: Trust material loading
//! - `endpoint`: `rustls_client` and `rustls_server` entry point
//! - `faulty`: `faulty_server` entry point

pub mod args;
pub mod endpoint;
pub mod error;
pub mod faulty;
pub mod pem;
pub mod tls;

pub use args::EndpointArgs;
pub use error::ShimError;
