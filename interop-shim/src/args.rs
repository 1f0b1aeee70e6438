use clap::Parser;

/// Command line shared by every endpoint: `<scenario_id> <port>`. Everything
/// else comes from `INTEROP_*` variables.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct EndpointArgs {
    /// Scenario identifier, e.g. `greeting`
    pub scenario: String,

    /// Port the server listens on and the client connects to
    pub port: u16,
}
