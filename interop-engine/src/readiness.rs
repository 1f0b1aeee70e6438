//! Deciding when a freshly started server can be handed a client.
//!
//! Implementations do not announce readiness, and most of them accept exactly
//! one connection, so the default probe only looks at the kernel's socket
//! tables and never connects.

use std::net::{Ipv4Addr, SocketAddr};

use interop_config::{ProbeKind, ReadinessConfig};
use tokio::net::TcpStream;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::outcome::EndpointExit;

const SOCKET_TABLES: [&str; 2] = ["/proc/net/tcp", "/proc/net/tcp6"];

/// `st` column value of a listening socket.
const TCP_LISTEN: &str = "0A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// The server ended while being probed.
    Exited(EndpointExit),
    /// Still not listening at the deadline.
    NeverReady,
}

/// Polls `port` until the server is ready, it exits, or the deadline passes.
pub async fn wait_until_ready(
    config: &ReadinessConfig,
    port: u16,
    server: &mut Endpoint,
) -> Readiness {
    if config.probe == ProbeKind::Delay {
        return tokio::select! {
            exit = server.wait() => Readiness::Exited(exit),
            _ = sleep(config.interval()) => Readiness::Ready,
        };
    }

    let deadline = Instant::now() + config.deadline();
    loop {
        if probe(config.probe, port).await {
            debug!("Port {} ready after {:?}", port, server.elapsed());
            return Readiness::Ready;
        }
        if Instant::now() >= deadline {
            return Readiness::NeverReady;
        }
        tokio::select! {
            exit = server.wait() => return Readiness::Exited(exit),
            _ = sleep(config.interval()) => {}
        }
    }
}

async fn probe(kind: ProbeKind, port: u16) -> bool {
    match kind {
        ProbeKind::ListenTable => match listening_in_tables(port).await {
            Some(listening) => listening,
            // no socket tables on this platform
            None => connect_probe(port).await,
        },
        ProbeKind::Connect => connect_probe(port).await,
        ProbeKind::Delay => true,
    }
}

async fn connect_probe(port: u16) -> bool {
    TcpStream::connect(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
        .await
        .is_ok()
}

/// `None` when no socket table could be read.
async fn listening_in_tables(port: u16) -> Option<bool> {
    let mut readable = false;
    for table in SOCKET_TABLES {
        if let Ok(contents) = tokio::fs::read_to_string(table).await {
            readable = true;
            if table_has_listener(&contents, port) {
                return Some(true);
            }
        }
    }
    readable.then_some(false)
}

/// Scans a `/proc/net/tcp`-format table for a LISTEN socket on `port`.
pub(crate) fn table_has_listener(table: &str, port: u16) -> bool {
    table.lines().skip(1).any(|line| {
        let mut fields = line.split_whitespace();
        let local = fields.nth(1);
        let state = fields.nth(1);
        match (local, state) {
            (Some(local), Some(state)) => {
                state == TCP_LISTEN
                    && local
                        .rsplit_once(':')
                        .and_then(|(_, hex)| u16::from_str_radix(hex, 16).ok())
                        == Some(port)
            }
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const TABLE: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:2329 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 41772 1 0000000000000000 100 0 0 10 0
   1: 0100007F:232A 0100007F:C350 01 00000000:00000000 00:00000000 00000000  1000        0 41773 1 0000000000000000 20 4 30 10 -1
";

    #[test]
    fn listening_socket_is_found_by_port() {
        // 0x2329 = 9001 listening, 0x232A = 9002 established only
        assert!(table_has_listener(TABLE, 9001));
        assert!(!table_has_listener(TABLE, 9002));
        assert!(!table_has_listener(TABLE, 9003));
    }

    #[test]
    fn ipv6_addresses_are_parsed() {
        let table = "\
  sl  local_address                         remote_address                        st
   0: 00000000000000000000000000000000:2329 00000000000000000000000000000000:0000 0A
";
        assert!(table_has_listener(table, 9001));
    }

    #[tokio::test]
    async fn connect_probe_sees_a_bound_listener() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(probe(ProbeKind::Connect, port).await);
        drop(listener);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn listen_table_probe_sees_a_bound_listener() {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(probe(ProbeKind::ListenTable, port).await);
    }
}
