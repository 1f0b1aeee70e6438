//! ## interop-shim::tls
//! **rustls transport for the protocol executor**
//!
//! TLS 1.3 only, on the `ring` provider. The server listens before the first
//! step runs so the runner's readiness probe can see it, and the handshake step
//! accepts the first connection that carries data.

use std::io;
use std::net::Ipv4Addr;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use interop_core::{Handshake, SecureStream};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::ServerName;
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, ServerConfig};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::{TlsAcceptor, TlsConnector, TlsStream};
use tracing::{debug, info};

use crate::error::ShimError;
use crate::pem;

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Trusts `ca-cert.pem`; presents the client certificate when `mutual_auth`.
pub fn client_config(pem_dir: &Path, mutual_auth: bool) -> Result<Arc<ClientConfig>, ShimError> {
    let roots = pem::load_roots(&pem_dir.join(pem::CA_CERT))?;
    let builder = ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])?
        .with_root_certificates(roots);

    let config = if mutual_auth {
        builder.with_client_auth_cert(
            pem::load_certs(&pem_dir.join(pem::CLIENT_CERT))?,
            pem::load_private_key(&pem_dir.join(pem::CLIENT_KEY))?,
        )?
    } else {
        builder.with_no_client_auth()
    };
    Ok(Arc::new(config))
}

/// Sends `server-chain.pem`; requires a client certificate chained to
/// `ca-cert.pem` when `mutual_auth`.
pub fn server_config(pem_dir: &Path, mutual_auth: bool) -> Result<Arc<ServerConfig>, ShimError> {
    let builder = ServerConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])?;

    let builder = if mutual_auth {
        let roots = Arc::new(pem::load_roots(&pem_dir.join(pem::CA_CERT))?);
        let verifier = WebPkiClientVerifier::builder_with_provider(roots, provider()).build()?;
        builder.with_client_cert_verifier(verifier)
    } else {
        builder.with_no_client_auth()
    };

    let config = builder.with_single_cert(
        pem::load_certs(&pem_dir.join(pem::SERVER_CHAIN))?,
        pem::load_private_key(&pem_dir.join(pem::SERVER_KEY))?,
    )?;
    Ok(Arc::new(config))
}

/// An established rustls session over TCP.
pub struct RustlsStream(TlsStream<TcpStream>);

impl RustlsStream {
    pub fn into_inner(self) -> TlsStream<TcpStream> {
        self.0
    }
}

impl SecureStream for RustlsStream {
    fn update_send_key(&mut self) -> io::Result<()> {
        let refreshed = match &mut self.0 {
            TlsStream::Client(stream) => stream.get_mut().1.refresh_traffic_keys(),
            TlsStream::Server(stream) => stream.get_mut().1.refresh_traffic_keys(),
        };
        refreshed.map_err(io::Error::other)
    }
}

impl AsyncRead for RustlsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl AsyncWrite for RustlsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_shutdown(cx)
    }
}

/// Connects to `host:port` and verifies the server as `host`.
pub struct ClientHandshake {
    connector: TlsConnector,
    server_name: ServerName<'static>,
    host: String,
    port: u16,
}

impl ClientHandshake {
    pub fn new(config: Arc<ClientConfig>, host: &str, port: u16) -> Result<Self, ShimError> {
        Ok(Self {
            connector: TlsConnector::from(config),
            server_name: ServerName::try_from(host.to_string())?,
            host: host.to_string(),
            port,
        })
    }
}

#[async_trait]
impl Handshake for ClientHandshake {
    type Stream = RustlsStream;

    async fn handshake(self) -> io::Result<RustlsStream> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port)).await?;
        tcp.set_nodelay(true)?;
        let tls = self.connector.connect(self.server_name, tcp).await?;
        Ok(RustlsStream(TlsStream::Client(tls)))
    }
}

/// A bound listener waiting for the one scenario connection.
pub struct ServerHandshake {
    listener: TcpListener,
    acceptor: TlsAcceptor,
}

impl ServerHandshake {
    /// Binds `0.0.0.0:port`. Port 0 picks a free port.
    pub async fn bind(config: Arc<ServerConfig>, port: u16) -> Result<Self, ShimError> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|source| ShimError::Bind { port, source })?;
        info!("Listening on port {}", port);
        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(config),
        })
    }

    pub fn local_port(&self) -> io::Result<u16> {
        self.listener.local_addr().map(|addr| addr.port())
    }
}

#[async_trait]
impl Handshake for ServerHandshake {
    type Stream = RustlsStream;

    async fn handshake(self) -> io::Result<RustlsStream> {
        let tcp = accept_first_speaker(&self.listener).await?;
        tcp.set_nodelay(true)?;
        let tls = self.acceptor.accept(tcp).await?;
        Ok(RustlsStream(TlsStream::Server(tls)))
    }
}

/// Accepts connections until one sends a byte. Readiness probes connect and
/// close without writing anything.
async fn accept_first_speaker(listener: &TcpListener) -> io::Result<TcpStream> {
    let mut first = [0u8; 1];
    loop {
        let (tcp, peer) = listener.accept().await?;
        match tcp.peek(&mut first).await {
            Ok(0) => debug!("Skipping probe connection from {}", peer),
            Ok(_) => return Ok(tcp),
            Err(e) => debug!("Skipping connection from {}: {}", peer, e),
        }
    }
}
