use std::io;

use thiserror::Error;

use crate::codec::CodecError;
use crate::scenario::{Greeting, Role, StepKind};

/// Exit code of an implementation that does not support the requested scenario.
pub const UNIMPLEMENTED_EXIT_CODE: i32 = 127;

/// Exit code for failures outside the scripted taxonomy (setup, I/O).
pub const GENERIC_FAILURE_EXIT_CODE: i32 = 1;

/// Failure categories an endpoint can report through its exit code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Handshake,
    GreetingMismatch,
    TagMismatch,
    StreamTruncation,
    UncleanClose,
    Other,
}

impl FailureKind {
    pub fn exit_code(self) -> i32 {
        match self {
            FailureKind::Handshake => 10,
            FailureKind::GreetingMismatch => 11,
            FailureKind::TagMismatch => 12,
            FailureKind::StreamTruncation => 13,
            FailureKind::UncleanClose => 14,
            FailureKind::Other => GENERIC_FAILURE_EXIT_CODE,
        }
    }

    /// Recognises the scripted exit codes. Any other non-zero code is not
    /// attributable to a category.
    pub fn from_exit_code(code: i32) -> Option<FailureKind> {
        match code {
            10 => Some(FailureKind::Handshake),
            11 => Some(FailureKind::GreetingMismatch),
            12 => Some(FailureKind::TagMismatch),
            13 => Some(FailureKind::StreamTruncation),
            14 => Some(FailureKind::UncleanClose),
            _ => None,
        }
    }

    /// Reason text for a failure observed by `role`.
    pub fn describe(self, role: Role) -> String {
        match self {
            FailureKind::Handshake => "handshake failed".to_string(),
            FailureKind::GreetingMismatch => format!("unexpected {} greeting", role.peer()),
            FailureKind::TagMismatch => "bulk data tag mismatch".to_string(),
            FailureKind::StreamTruncation => "bulk data stream truncated".to_string(),
            FailureKind::UncleanClose => "peer did not close cleanly".to_string(),
            FailureKind::Other => format!("{role} failed"),
        }
    }
}

/// Why a scenario script stopped early.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error(
        "unexpected {} greeting: received {:?}",
        .greeting.sender(),
        String::from_utf8_lossy(.observed)
    )]
    GreetingMismatch {
        greeting: Greeting,
        observed: Vec<u8>,
    },

    #[error(transparent)]
    Bulk(#[from] CodecError),

    #[error("peer did not close cleanly: {0}")]
    UncleanClose(String),

    #[error("{step} failed: {source}")]
    Io { step: StepKind, source: io::Error },

    #[error("{step} attempted without an established connection")]
    NotConnected { step: StepKind },
}

impl StepError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StepError::Handshake(_) => FailureKind::Handshake,
            StepError::GreetingMismatch { .. } => FailureKind::GreetingMismatch,
            StepError::Bulk(CodecError::TagMismatch { .. }) => FailureKind::TagMismatch,
            StepError::Bulk(CodecError::Truncated { .. }) => FailureKind::StreamTruncation,
            StepError::UncleanClose(_) => FailureKind::UncleanClose,
            StepError::Io { .. } | StepError::NotConnected { .. } => FailureKind::Other,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_exit_codes_round_trip() {
        for kind in [
            FailureKind::Handshake,
            FailureKind::GreetingMismatch,
            FailureKind::TagMismatch,
            FailureKind::StreamTruncation,
            FailureKind::UncleanClose,
        ] {
            assert_eq!(FailureKind::from_exit_code(kind.exit_code()), Some(kind));
        }
        assert_eq!(FailureKind::from_exit_code(GENERIC_FAILURE_EXIT_CODE), None);
        assert_eq!(FailureKind::from_exit_code(UNIMPLEMENTED_EXIT_CODE), None);
    }

    #[test]
    fn greeting_mismatch_is_described_from_the_reader_side() {
        assert_eq!(
            FailureKind::GreetingMismatch.describe(Role::Client),
            "unexpected server greeting"
        );
        assert_eq!(
            FailureKind::GreetingMismatch.describe(Role::Server),
            "unexpected client greeting"
        );
    }

    #[test]
    fn greeting_mismatch_message_shows_received_text() {
        let err = StepError::GreetingMismatch {
            greeting: Greeting::Server,
            observed: b"wrong message".to_vec(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected server greeting: received \"wrong message\""
        );
        assert_eq!(err.exit_code(), 11);
    }
}
