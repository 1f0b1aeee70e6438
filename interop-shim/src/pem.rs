//! Trust material, read from fixed file names in the configured PEM directory.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::RootCertStore;

use crate::error::ShimError;

/// Trusted by clients.
pub const CA_CERT: &str = "ca-cert.pem";
/// Leaf first, sent by servers.
pub const SERVER_CHAIN: &str = "server-chain.pem";
pub const SERVER_KEY: &str = "server-key.pem";
/// Presented by clients in `mtls_request_response` only.
pub const CLIENT_CERT: &str = "client-cert.pem";
pub const CLIENT_KEY: &str = "client-key.pem";

fn open(path: &Path) -> Result<BufReader<File>, ShimError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ShimError::Pem {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ShimError> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ShimError::Pem {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(ShimError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

/// The first private key in the file, in any of the PKCS#1, PKCS#8 or SEC1
/// encodings.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ShimError> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|source| ShimError::Pem {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| ShimError::NoPrivateKey(path.to_path_buf()))
}

pub fn load_roots(path: &Path) -> Result<RootCertStore, ShimError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots.add(cert)?;
    }
    Ok(roots)
}
