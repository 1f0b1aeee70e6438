//! Verdicts: how one endpoint ended, and what that means for the run.

use std::fmt;
use std::time::Duration;

use interop_core::{FailureKind, Role, ScenarioId, UNIMPLEMENTED_EXIT_CODE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Unimplemented,
    Failure(String),
    Timeout,
}

impl Outcome {
    /// Timeout > Failure > Unimplemented > Success.
    pub fn severity(&self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Unimplemented => 1,
            Outcome::Failure(_) => 2,
            Outcome::Timeout => 3,
        }
    }

    /// The more severe of the two; the client's on a tie.
    pub fn combine(client: Outcome, server: Outcome) -> Outcome {
        if server.severity() > client.severity() {
            server
        } else {
            client
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::Success => "🥳",
            Outcome::Unimplemented => "🚧",
            Outcome::Failure(_) | Outcome::Timeout => "💔",
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Unimplemented => "unimplemented",
            Outcome::Failure(_) => "failure",
            Outcome::Timeout => "timeout",
        }
    }

    pub fn is_defect(&self) -> bool {
        matches!(self, Outcome::Failure(_) | Outcome::Timeout)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Failure(reason) => write!(f, "failure: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// How one endpoint process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointExit {
    Code(i32),
    /// Killed by a signal it did not ask for.
    Signal,
    /// Still running at the run deadline; killed.
    TimedOut,
    /// Killed because its peer does not implement the scenario.
    Cancelled,
    /// Never started, or its status could not be collected.
    Lost(String),
}

impl EndpointExit {
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, EndpointExit::Code(UNIMPLEMENTED_EXIT_CODE))
    }

    /// Outcome of this endpoint on its own.
    pub fn outcome(&self, role: Role) -> Outcome {
        match self {
            EndpointExit::Code(0) => Outcome::Success,
            EndpointExit::Code(UNIMPLEMENTED_EXIT_CODE) => Outcome::Unimplemented,
            EndpointExit::Code(code) => match FailureKind::from_exit_code(*code) {
                Some(kind) => Outcome::Failure(kind.describe(role)),
                None => Outcome::Failure(format!("{} exited with status {}", role, code)),
            },
            EndpointExit::Signal => Outcome::Failure(format!("{} crashed", role)),
            EndpointExit::TimedOut => Outcome::Timeout,
            EndpointExit::Cancelled => Outcome::Unimplemented,
            EndpointExit::Lost(reason) => Outcome::Failure(reason.clone()),
        }
    }
}

/// Verdict of a run from both endpoint exits.
///
/// An endpoint that does not implement the scenario makes the whole run
/// unimplemented: its peer was cancelled rather than tested.
pub fn verdict(client: &EndpointExit, server: &EndpointExit) -> Outcome {
    if client.is_unimplemented() || server.is_unimplemented() {
        return Outcome::Unimplemented;
    }
    Outcome::combine(client.outcome(Role::Client), server.outcome(Role::Server))
}

/// One cell of the result matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub scenario: ScenarioId,
    pub client: String,
    pub server: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order() {
        let ordered = [
            Outcome::Success,
            Outcome::Unimplemented,
            Outcome::Failure("x".into()),
            Outcome::Timeout,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].severity() < pair[1].severity());
        }
    }

    #[test]
    fn equal_severity_keeps_the_client_reason() {
        let combined = Outcome::combine(
            Outcome::Failure("unexpected server greeting".into()),
            Outcome::Failure("peer did not close cleanly".into()),
        );
        assert_eq!(combined, Outcome::Failure("unexpected server greeting".into()));
    }

    #[test]
    fn exit_codes_are_described_from_the_failing_side() {
        assert_eq!(
            EndpointExit::Code(11).outcome(Role::Client),
            Outcome::Failure("unexpected server greeting".into())
        );
        assert_eq!(
            EndpointExit::Code(3).outcome(Role::Server),
            Outcome::Failure("server exited with status 3".into())
        );
        assert_eq!(
            EndpointExit::Signal.outcome(Role::Client),
            Outcome::Failure("client crashed".into())
        );
    }

    #[test]
    fn unimplemented_endpoint_overrides_its_cancelled_peer() {
        assert_eq!(
            verdict(&EndpointExit::Code(127), &EndpointExit::Cancelled),
            Outcome::Unimplemented
        );
        assert_eq!(
            verdict(&EndpointExit::Code(1), &EndpointExit::Code(127)),
            Outcome::Unimplemented
        );
    }

    #[test]
    fn timeout_dominates_failure() {
        assert_eq!(
            verdict(&EndpointExit::Code(11), &EndpointExit::TimedOut),
            Outcome::Timeout
        );
        assert_eq!(
            verdict(&EndpointExit::Code(0), &EndpointExit::Code(0)),
            Outcome::Success
        );
    }

    #[test]
    fn symbols_separate_gaps_from_defects() {
        assert_eq!(Outcome::Success.symbol(), "🥳");
        assert_eq!(Outcome::Unimplemented.symbol(), "🚧");
        assert_eq!(Outcome::Timeout.symbol(), "💔");
        assert_eq!(Outcome::Failure("x".into()).symbol(), "💔");
    }
}
