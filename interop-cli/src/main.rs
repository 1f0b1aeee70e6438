//! ## interop-cli
//! **Command-line entry point of the interop runner**
//!
//! `interop run` sweeps every configured scenario across every server/client
//! pair and prints the result table; `interop list` shows what would run.

use std::process::ExitCode;

use clap::Parser;

mod commands;
mod error;

use commands::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match commands::run_command(cli).await {
        Ok(code) => code,
        Err(e) => {
            // the logger is not installed when configuration fails to load
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
