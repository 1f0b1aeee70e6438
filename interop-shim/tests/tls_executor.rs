//! The protocol executor over real rustls sessions, in process.

mod common;

use std::path::Path;

use interop_config::{ShimConfig, TransferConfig};
use interop_core::prelude::*;
use interop_shim::endpoint::play_with;
use interop_shim::tls::{self, ServerHandshake};
use interop_shim::ShimError;
use tempfile::TempDir;

fn small_transfer() -> TransferConfig {
    TransferConfig {
        gigabytes: Some(4),
        segment_len: 4096,
        segments_per_group: 8,
    }
}

fn shim_config(dir: &Path) -> ShimConfig {
    ShimConfig {
        pem_dir: dir.to_path_buf(),
        host: "localhost".into(),
        transfer: small_transfer(),
    }
}

/// Plays `id` with a server built from `server_dir` and a client from
/// `client_config`.
async fn play_pair(
    id: ScenarioId,
    server_dir: &Path,
    client_config: &ShimConfig,
) -> (Result<RunReport, ShimError>, Result<RunReport, StepError>) {
    let scenario = id.scenario();
    let tls = tls::server_config(server_dir, scenario.mutual_auth).unwrap();
    let server = ServerHandshake::bind(tls, 0).await.unwrap();
    let port = server.local_port().unwrap();

    let executor = ScenarioExecutor::new(Role::Server, scenario)
        .with_layout(client_config.transfer.layout())
        .with_transfer_gb(client_config.transfer.gigabytes);
    let server = tokio::spawn(async move { executor.run(server).await });

    let client = play_with(client_config, Role::Client, scenario, port).await;
    (client, server.await.unwrap())
}

#[tokio::test]
async fn every_scenario_passes_between_rustls_endpoints() {
    let dir = TempDir::new().unwrap();
    common::write_trust_material(dir.path());
    let config = shim_config(dir.path());

    for id in ScenarioId::ALL {
        let (client, server) = play_pair(id, dir.path(), &config).await;
        assert!(client.is_ok(), "{id} client: {:?}", client.err());
        assert!(server.is_ok(), "{id} server: {:?}", server.err());
    }
}

#[tokio::test]
async fn key_updates_cross_the_wire() {
    let dir = TempDir::new().unwrap();
    common::write_trust_material(dir.path());
    let config = shim_config(dir.path());

    let (client, server) = play_pair(
        ScenarioId::LargeDataDownloadWithFrequentKeyUpdates,
        dir.path(),
        &config,
    )
    .await;
    let client = client.unwrap();
    let server = server.unwrap();
    assert_eq!(server.key_updates, 4);
    assert_eq!(
        client.bytes_transferred,
        CLIENT_GREETING.len() as u64 + 4 * small_transfer().layout().group_len()
    );
}

#[tokio::test]
async fn mutual_auth_server_rejects_a_client_without_certificate() {
    let dir = TempDir::new().unwrap();
    common::write_trust_material(dir.path());
    let client_dir = TempDir::new().unwrap();
    std::fs::copy(
        dir.path().join(interop_shim::pem::CA_CERT),
        client_dir.path().join(interop_shim::pem::CA_CERT),
    )
    .unwrap();

    // the client has no certificate to present
    let scenario = ScenarioId::MtlsRequestResponse.scenario();
    let tls = tls::server_config(dir.path(), true).unwrap();
    let server = ServerHandshake::bind(tls, 0).await.unwrap();
    let port = server.local_port().unwrap();
    let server = tokio::spawn(async move {
        ScenarioExecutor::new(Role::Server, scenario).run(server).await
    });

    let client_tls = tls::client_config(client_dir.path(), false).unwrap();
    let client = ScenarioExecutor::new(Role::Client, scenario)
        .run(tls::ClientHandshake::new(client_tls, "localhost", port).unwrap())
        .await;

    let server = server.await.unwrap();
    assert_eq!(server.unwrap_err().kind(), FailureKind::Handshake);
    assert!(client.is_err());
}

#[tokio::test]
async fn client_missing_its_certificate_cannot_start_mtls() {
    let dir = TempDir::new().unwrap();
    common::write_trust_material(dir.path());
    std::fs::remove_file(dir.path().join(interop_shim::pem::CLIENT_KEY)).unwrap();

    let err = play_with(
        &shim_config(dir.path()),
        Role::Client,
        ScenarioId::MtlsRequestResponse.scenario(),
        9,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("client-key.pem"));
    assert_eq!(err.exit_code(), 1);
}
