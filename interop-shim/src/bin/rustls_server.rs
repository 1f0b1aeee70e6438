use std::process::ExitCode;

use clap::Parser;
use interop_core::Role;
use interop_shim::{endpoint, EndpointArgs};

#[tokio::main]
async fn main() -> ExitCode {
    endpoint::run(Role::Server, EndpointArgs::parse()).await
}
