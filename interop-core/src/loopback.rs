//! In-memory transport for running both roles of a scenario in one process.
//!
//! The "handshake" is a no-op and key updates are only counted, so only the
//! executor's own logic is under test.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

use crate::executor::{Handshake, SecureStream};

/// Buffer size of each direction of the duplex pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug)]
pub struct LoopbackStream {
    inner: DuplexStream,
    key_updates: u64,
}

impl LoopbackStream {
    pub fn key_updates(&self) -> u64 {
        self.key_updates
    }
}

impl SecureStream for LoopbackStream {
    fn update_send_key(&mut self) -> io::Result<()> {
        self.key_updates += 1;
        Ok(())
    }
}

impl AsyncRead for LoopbackStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for LoopbackStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Handshake that either hands over a ready stream or fails with a message.
#[derive(Debug)]
pub enum LoopbackHandshake {
    Ready(LoopbackStream),
    Failing(String),
}

impl LoopbackHandshake {
    pub fn ready(stream: LoopbackStream) -> Self {
        LoopbackHandshake::Ready(stream)
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        LoopbackHandshake::Failing(reason.into())
    }
}

#[async_trait]
impl Handshake for LoopbackHandshake {
    type Stream = LoopbackStream;

    async fn handshake(self) -> io::Result<LoopbackStream> {
        match self {
            LoopbackHandshake::Ready(stream) => Ok(stream),
            LoopbackHandshake::Failing(reason) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                reason,
            )),
        }
    }
}

/// Two connected streams.
pub fn streams() -> (LoopbackStream, LoopbackStream) {
    let (a, b) = tokio::io::duplex(PIPE_CAPACITY);
    (
        LoopbackStream {
            inner: a,
            key_updates: 0,
        },
        LoopbackStream {
            inner: b,
            key_updates: 0,
        },
    )
}

/// Client and server handshakes over one connected pair.
pub fn pair() -> (LoopbackHandshake, LoopbackHandshake) {
    let (client, server) = streams();
    (LoopbackHandshake::ready(client), LoopbackHandshake::ready(server))
}
