//! ## interop-core::executor
//! **Protocol executor**
//!
//! Interprets a [`Scenario`]'s step list for one [`Role`] over one secure
//! connection. Steps run strictly in order and the first failure ends the run;
//! the caller turns the returned [`StepError`] into a process exit code.
//!
//! The executor is generic over the transport: anything that can complete a
//! handshake ([`Handshake`]) and then behaves as a byte stream with a
//! key-update primitive ([`SecureStream`]) can be driven through a scenario.

use std::io;
use std::mem;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument};

use crate::codec::{StreamLayout, TaggedStreamEncoder, TaggedStreamVerifier};
use crate::error::StepError;
use crate::scenario::{BulkTransfer, Greeting, Role, Scenario, StepAction, StepKind};

/// Bulk transfer progress is logged every this many gigabytes.
const PROGRESS_INTERVAL_GB: u64 = 10;

/// Scratch size for reads during the close exchange.
const DRAIN_BUF_LEN: usize = 4096;

/// An established, authenticated byte stream.
pub trait SecureStream: AsyncRead + AsyncWrite + Unpin + Send {
    /// Updates this side's sending keys. Data already buffered for writing is
    /// protected under the old keys.
    fn update_send_key(&mut self) -> io::Result<()>;
}

/// Connection setup for one endpoint. Consumed by the handshake step.
#[async_trait]
pub trait Handshake: Send {
    type Stream: SecureStream;

    async fn handshake(self) -> io::Result<Self::Stream>;
}

/// What a successful run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub steps_completed: usize,
    pub key_updates: u64,
    pub bytes_transferred: u64,
}

enum Channel<H: Handshake> {
    Pending(H),
    Open(H::Stream),
    Closed,
}

impl<H: Handshake> Channel<H> {
    fn stream(&mut self, step: StepKind) -> Result<&mut H::Stream, StepError> {
        match self {
            Channel::Open(stream) => Ok(stream),
            _ => Err(StepError::NotConnected { step }),
        }
    }
}

/// Drives one scenario for one role.
#[derive(Debug, Clone)]
pub struct ScenarioExecutor {
    role: Role,
    scenario: &'static Scenario,
    layout: StreamLayout,
    transfer_gb: Option<u64>,
}

impl ScenarioExecutor {
    pub fn new(role: Role, scenario: &'static Scenario) -> Self {
        Self {
            role,
            scenario,
            layout: StreamLayout::NOMINAL,
            transfer_gb: None,
        }
    }

    /// Replaces the nominal 1 MB x 1000 stream shape. Both endpoints must agree.
    pub fn with_layout(mut self, layout: StreamLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Overrides the number of groups sent by bulk transfer steps.
    pub fn with_transfer_gb(mut self, gigabytes: Option<u64>) -> Self {
        self.transfer_gb = gigabytes;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn scenario(&self) -> &'static Scenario {
        self.scenario
    }

    #[instrument(
        level = "info",
        name = "scenario",
        skip(self, handshake),
        fields(role = %self.role, scenario = %self.scenario.id)
    )]
    pub async fn run<H: Handshake>(&self, handshake: H) -> Result<RunReport, StepError> {
        let mut channel = Channel::Pending(handshake);
        let mut report = RunReport::default();
        // Bytes arriving where only a close is expected belong to the last
        // inbound greeting, if that was the last thing read.
        let mut last_inbound: Option<Greeting> = None;

        for &step in self.scenario.steps {
            let action = step.action(self.role);
            info!("Step {}: {:?}", step, action);

            match action {
                StepAction::Handshake => {
                    channel = match mem::replace(&mut channel, Channel::Closed) {
                        Channel::Pending(handshake) => {
                            Channel::Open(handshake.handshake().await.map_err(StepError::Handshake)?)
                        }
                        _ => return Err(StepError::NotConnected { step }),
                    };
                }
                StepAction::Write(greeting) => {
                    let stream = channel.stream(step)?;
                    write_greeting(stream, greeting)
                        .await
                        .map_err(|source| StepError::Io { step, source })?;
                    report.bytes_transferred += greeting.bytes().len() as u64;
                }
                StepAction::Read(greeting) => {
                    let stream = channel.stream(step)?;
                    read_greeting(stream, greeting, step).await?;
                    report.bytes_transferred += greeting.bytes().len() as u64;
                    last_inbound = Some(greeting);
                }
                StepAction::EmitBulk(bulk) => {
                    let stream = channel.stream(step)?;
                    self.emit_bulk(stream, bulk, step, &mut report).await?;
                }
                StepAction::VerifyBulk(bulk) => {
                    let stream = channel.stream(step)?;
                    self.verify_bulk(stream, bulk, step, &mut report).await?;
                    last_inbound = None;
                }
                StepAction::HalfCloseAndDrain => {
                    let stream = channel.stream(step)?;
                    stream
                        .shutdown()
                        .await
                        .map_err(|source| StepError::Io { step, source })?;
                    expect_end_of_stream(stream, last_inbound).await?;
                }
                StepAction::AwaitCloseAndShutdown => {
                    let stream = channel.stream(step)?;
                    expect_end_of_stream(stream, last_inbound).await?;
                    stream
                        .shutdown()
                        .await
                        .map_err(|source| StepError::Io { step, source })?;
                }
            }
            report.steps_completed += 1;
        }

        info!(
            "Scenario complete: {} steps, {} bytes, {} key updates",
            report.steps_completed, report.bytes_transferred, report.key_updates
        );
        Ok(report)
    }

    fn groups(&self, bulk: BulkTransfer) -> u64 {
        self.transfer_gb.unwrap_or(bulk.size_gb)
    }

    async fn emit_bulk<S: SecureStream>(
        &self,
        stream: &mut S,
        bulk: BulkTransfer,
        step: StepKind,
        report: &mut RunReport,
    ) -> Result<(), StepError> {
        let groups = self.groups(bulk);
        let mut encoder = TaggedStreamEncoder::new(self.layout, groups);
        info!("Sending {} GB", groups);

        while let Some(segment) = encoder.next_segment() {
            stream
                .write_all(segment.bytes)
                .await
                .map_err(|source| StepError::Io { step, source })?;
            report.bytes_transferred += segment.bytes.len() as u64;

            if !segment.completes_group {
                continue;
            }
            let sent_gb = segment.group + 1;
            if let Some(interval) = bulk.key_update_interval_gb.filter(|i| *i > 0) {
                if sent_gb % interval == 0 {
                    stream
                        .update_send_key()
                        .map_err(|source| StepError::Io { step, source })?;
                    report.key_updates += 1;
                    debug!("Key update after {} GB", sent_gb);
                }
            }
            if sent_gb % PROGRESS_INTERVAL_GB == 0 {
                info!("Sent {} of {} GB", sent_gb, groups);
            }
        }

        stream
            .flush()
            .await
            .map_err(|source| StepError::Io { step, source })
    }

    async fn verify_bulk<S: SecureStream>(
        &self,
        stream: &mut S,
        bulk: BulkTransfer,
        step: StepKind,
        report: &mut RunReport,
    ) -> Result<(), StepError> {
        let groups = self.groups(bulk);
        let mut verifier = TaggedStreamVerifier::new(self.layout, groups);
        let mut segment = vec![0u8; self.layout.segment_len];
        let progress_every = PROGRESS_INTERVAL_GB * self.layout.segments_per_group;
        info!("Expecting {} GB", groups);

        while !verifier.is_finished() {
            let n = read_full(stream, &mut segment)
                .await
                .map_err(|source| StepError::Io { step, source })?;
            verifier.check(&segment[..n])?;
            report.bytes_transferred += n as u64;

            let verified = verifier.segments_verified();
            if progress_every > 0 && verified % progress_every == 0 {
                info!(
                    "Verified {} of {} GB",
                    verified / self.layout.segments_per_group,
                    groups
                );
            }
        }
        Ok(())
    }
}

async fn write_greeting<S: SecureStream>(stream: &mut S, greeting: Greeting) -> io::Result<()> {
    stream.write_all(greeting.bytes()).await?;
    stream.flush().await
}

async fn read_greeting<S: SecureStream>(
    stream: &mut S,
    greeting: Greeting,
    step: StepKind,
) -> Result<(), StepError> {
    let expected = greeting.bytes();
    let mut received = vec![0u8; expected.len()];
    let n = read_full(stream, &mut received)
        .await
        .map_err(|source| StepError::Io { step, source })?;
    received.truncate(n);

    if received != expected {
        return Err(StepError::GreetingMismatch {
            greeting,
            observed: received,
        });
    }
    Ok(())
}

/// Reads until an orderly end of stream. Any byte or error first is a violation.
async fn expect_end_of_stream<S: SecureStream>(
    stream: &mut S,
    last_inbound: Option<Greeting>,
) -> Result<(), StepError> {
    let mut buf = [0u8; DRAIN_BUF_LEN];
    match stream.read(&mut buf).await {
        Ok(0) => Ok(()),
        Ok(n) => match last_inbound {
            Some(greeting) => {
                let mut observed = greeting.bytes().to_vec();
                observed.extend_from_slice(&buf[..n]);
                Err(StepError::GreetingMismatch { greeting, observed })
            }
            None => Err(StepError::UncleanClose(format!(
                "{n} unexpected bytes before end of stream"
            ))),
        },
        Err(e) => Err(StepError::UncleanClose(e.to_string())),
    }
}

/// Fills `buf` unless the stream ends first; returns the number of bytes read.
/// An abrupt end of stream counts as an end, so the caller sees a short read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
