//! # interop-core
//!
//! Shared vocabulary of the TLS interoperability harness.
//!
//! Every implementation under test, whatever language it is written in, plays
//! the same scripts: a fixed catalog of scenarios, each a list of steps that a
//! client and a server interpret with complementary actions. This crate holds
//! that catalog and a transport-agnostic executor for it.
//!
//! ### Key Submodules:
//! - `scenario`: Scenario catalog, roles and step kinds
//! - `codec`: Tagged data stream used by the bulk download scenarios
//! - `executor`: Step interpreter over any [`executor::SecureStream`]
//! - `error`: Step failures and the exit-code contract shared with the runner
//! - `loopback`: In-memory transport for exercising the executor

pub mod codec;
pub mod error;
pub mod executor;
pub mod loopback;
pub mod scenario;

pub mod prelude {
    pub use crate::codec::*;
    pub use crate::error::*;
    pub use crate::executor::*;
    pub use crate::scenario::*;
}

pub use error::{FailureKind, StepError, UNIMPLEMENTED_EXIT_CODE};
pub use executor::{Handshake, RunReport, ScenarioExecutor, SecureStream};
pub use scenario::{Role, Scenario, ScenarioId};
