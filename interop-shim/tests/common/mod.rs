//! Trust material for tests: a throwaway CA, a `localhost` server certificate
//! and a client certificate, all written under the PEM file names the shim
//! expects.

use std::path::Path;

use interop_shim::pem;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
};

pub fn write_trust_material(dir: &Path) {
    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params
        .distinguished_name
        .push(DnType::CommonName, "interop test ca");
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let ca = ca_params.self_signed(&ca_key).unwrap();

    let server_key = KeyPair::generate().unwrap();
    let mut server_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    server_params
        .distinguished_name
        .push(DnType::CommonName, "localhost");
    let server = server_params.signed_by(&server_key, &ca, &ca_key).unwrap();

    let client_key = KeyPair::generate().unwrap();
    let mut client_params =
        CertificateParams::new(vec!["client.interop.test".to_string()]).unwrap();
    client_params
        .distinguished_name
        .push(DnType::CommonName, "interop test client");
    let client = client_params.signed_by(&client_key, &ca, &ca_key).unwrap();

    let write = |name: &str, contents: String| std::fs::write(dir.join(name), contents).unwrap();
    write(pem::CA_CERT, ca.pem());
    write(pem::SERVER_CHAIN, format!("{}{}", server.pem(), ca.pem()));
    write(pem::SERVER_KEY, server_key.serialize_pem());
    write(pem::CLIENT_CERT, client.pem());
    write(pem::CLIENT_KEY, client_key.serialize_pem());
}
