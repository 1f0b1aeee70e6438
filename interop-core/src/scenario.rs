//! ## interop-core::scenario
//! **Static scenario catalog**
//!
//! Each scenario is a fixed list of [`StepKind`]s written once and interpreted
//! by both roles. A step names an exchange, not a direction: `SendGreeting`
//! means "the client's greeting crosses the wire", so the client writes it and
//! the server reads it. [`StepKind::action`] resolves the per-role half.

use std::fmt;
use std::str::FromStr;

/// The greeting the client sends once the handshake has completed.
pub const CLIENT_GREETING: &str = "i am the client. nice to meet you server.";

/// The greeting the server answers with after receiving [`CLIENT_GREETING`].
pub const SERVER_GREETING: &str = "i am the server. a pleasure to make your acquaintance.";

/// Nominal size of the bulk download, in gigabytes.
pub const LARGE_DATA_DOWNLOAD_GB: u64 = 256;

/// Which side of the connection an executor plays.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn peer(self) -> Role {
        match self {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a catalog scenario, as passed on the command line of every
/// implementation under test.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScenarioId {
    Handshake,
    Greeting,
    LargeDataDownload,
    LargeDataDownloadWithFrequentKeyUpdates,
    MtlsRequestResponse,
}

impl ScenarioId {
    /// Every scenario, in catalog order.
    pub const ALL: [ScenarioId; 5] = [
        ScenarioId::Handshake,
        ScenarioId::Greeting,
        ScenarioId::LargeDataDownload,
        ScenarioId::LargeDataDownloadWithFrequentKeyUpdates,
        ScenarioId::MtlsRequestResponse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioId::Handshake => "handshake",
            ScenarioId::Greeting => "greeting",
            ScenarioId::LargeDataDownload => "large_data_download",
            ScenarioId::LargeDataDownloadWithFrequentKeyUpdates => {
                "large_data_download_with_frequent_key_updates"
            }
            ScenarioId::MtlsRequestResponse => "mtls_request_response",
        }
    }

    /// Position in the catalog; reports are ordered by it.
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn scenario(self) -> &'static Scenario {
        &CATALOG[self.ordinal()]
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a scenario name is not part of the catalog. Implementations
/// answer this with the "unimplemented" exit code rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scenario '{0}'")]
pub struct UnknownScenario(pub String);

impl FromStr for ScenarioId {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownScenario(s.to_string()))
    }
}

/// Parameters of a bulk download step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BulkTransfer {
    /// Number of gigabytes (segment groups) the server emits.
    pub size_gb: u64,
    /// When set, the server updates its send key after every this many gigabytes.
    pub key_update_interval_gb: Option<u64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepKind {
    Handshake,
    /// The client greeting crosses the wire.
    SendGreeting,
    /// The server greeting crosses the wire.
    RecvGreeting,
    BulkTransfer(BulkTransfer),
    GracefulClose,
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Handshake => "handshake",
            StepKind::SendGreeting => "send_greeting",
            StepKind::RecvGreeting => "recv_greeting",
            StepKind::BulkTransfer(_) => "bulk_transfer",
            StepKind::GracefulClose => "graceful_close",
        }
    }

    /// Resolves the concrete action `role` performs for this step.
    pub fn action(&self, role: Role) -> StepAction {
        match (self, role) {
            (StepKind::Handshake, _) => StepAction::Handshake,
            (StepKind::SendGreeting, Role::Client) => StepAction::Write(Greeting::Client),
            (StepKind::SendGreeting, Role::Server) => StepAction::Read(Greeting::Client),
            (StepKind::RecvGreeting, Role::Client) => StepAction::Read(Greeting::Server),
            (StepKind::RecvGreeting, Role::Server) => StepAction::Write(Greeting::Server),
            (StepKind::BulkTransfer(bulk), Role::Server) => StepAction::EmitBulk(*bulk),
            (StepKind::BulkTransfer(bulk), Role::Client) => StepAction::VerifyBulk(*bulk),
            (StepKind::GracefulClose, Role::Client) => StepAction::HalfCloseAndDrain,
            (StepKind::GracefulClose, Role::Server) => StepAction::AwaitCloseAndShutdown,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the two fixed greeting literals.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Greeting {
    Client,
    Server,
}

impl Greeting {
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Greeting::Client => CLIENT_GREETING.as_bytes(),
            Greeting::Server => SERVER_GREETING.as_bytes(),
        }
    }

    /// The role whose greeting this is.
    pub fn sender(self) -> Role {
        match self {
            Greeting::Client => Role::Client,
            Greeting::Server => Role::Server,
        }
    }
}

/// What one role does for one step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepAction {
    Handshake,
    Write(Greeting),
    Read(Greeting),
    EmitBulk(BulkTransfer),
    VerifyBulk(BulkTransfer),
    /// Client: close the write half, then read until a clean end of stream.
    HalfCloseAndDrain,
    /// Server: wait for the client's half-close, then close the connection.
    AwaitCloseAndShutdown,
}

#[derive(Debug)]
pub struct Scenario {
    pub id: ScenarioId,
    pub steps: &'static [StepKind],
    /// The server requires, and the client presents, a certificate.
    pub mutual_auth: bool,
}

impl Scenario {
    /// Looks a scenario up by its command-line name.
    pub fn from_name(name: &str) -> Result<&'static Scenario, UnknownScenario> {
        name.parse::<ScenarioId>().map(ScenarioId::scenario)
    }

    /// The bulk step of this scenario, if it has one.
    pub fn bulk_transfer(&self) -> Option<BulkTransfer> {
        self.steps.iter().find_map(|step| match step {
            StepKind::BulkTransfer(bulk) => Some(*bulk),
            _ => None,
        })
    }
}

const NOMINAL_DOWNLOAD: BulkTransfer = BulkTransfer {
    size_gb: LARGE_DATA_DOWNLOAD_GB,
    key_update_interval_gb: None,
};

const KEY_UPDATING_DOWNLOAD: BulkTransfer = BulkTransfer {
    size_gb: LARGE_DATA_DOWNLOAD_GB,
    key_update_interval_gb: Some(1),
};

/// The scenario catalog, indexed by [`ScenarioId::ordinal`].
pub static CATALOG: [Scenario; 5] = [
    Scenario {
        id: ScenarioId::Handshake,
        steps: &[StepKind::Handshake, StepKind::GracefulClose],
        mutual_auth: false,
    },
    Scenario {
        id: ScenarioId::Greeting,
        steps: &[
            StepKind::Handshake,
            StepKind::SendGreeting,
            StepKind::RecvGreeting,
            StepKind::GracefulClose,
        ],
        mutual_auth: false,
    },
    Scenario {
        id: ScenarioId::LargeDataDownload,
        steps: &[
            StepKind::Handshake,
            StepKind::SendGreeting,
            StepKind::BulkTransfer(NOMINAL_DOWNLOAD),
            StepKind::GracefulClose,
        ],
        mutual_auth: false,
    },
    Scenario {
        id: ScenarioId::LargeDataDownloadWithFrequentKeyUpdates,
        steps: &[
            StepKind::Handshake,
            StepKind::SendGreeting,
            StepKind::BulkTransfer(KEY_UPDATING_DOWNLOAD),
            StepKind::GracefulClose,
        ],
        mutual_auth: false,
    },
    Scenario {
        id: ScenarioId::MtlsRequestResponse,
        steps: &[
            StepKind::Handshake,
            StepKind::SendGreeting,
            StepKind::RecvGreeting,
            StepKind::GracefulClose,
        ],
        mutual_auth: true,
    },
];
