use std::process::ExitCode;

use clap::Parser;
use interop_shim::{faulty, EndpointArgs};

#[tokio::main]
async fn main() -> ExitCode {
    faulty::run(EndpointArgs::parse()).await
}
