//! Mutual TLS tests of the control channel
//!
//! A throwaway certificate authority issues the server and client
//! certificates; a second authority stands in for an untrusted issuer.

mod common;

use common::TestServer;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose,
};
use wg_control::config::ClientConfig;
use wg_control::control::{ClientMtlsConfig, ControlClient, ServerMtlsConfig};
use wg_control::wireguard::MemoryDeviceControl;
use zeroize::Zeroizing;

struct TestCa {
    cert: Certificate,
    key: KeyPair,
}

impl TestCa {
    fn new(name: &str) -> Self {
        let mut params =
            CertificateParams::new(Vec::<String>::new()).expect("CA params should build");
        params.distinguished_name.push(DnType::CommonName, name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let key = KeyPair::generate().expect("CA key generation should succeed");
        let cert = params.self_signed(&key).expect("CA self-signing should succeed");
        Self { cert, key }
    }

    fn pem(&self) -> String {
        self.cert.pem()
    }

    /// Issue a leaf certificate, returning (cert PEM, key PEM)
    fn issue(&self, name: &str, usage: ExtendedKeyUsagePurpose) -> (String, Zeroizing<String>) {
        let mut params =
            CertificateParams::new(vec![name.to_string()]).expect("leaf params should build");
        params.distinguished_name.push(DnType::CommonName, name);
        params.extended_key_usages = vec![usage];
        let key = KeyPair::generate().expect("leaf key generation should succeed");
        let cert = params
            .signed_by(&key, &self.cert, &self.key)
            .expect("leaf signing should succeed");
        (cert.pem(), Zeroizing::new(key.serialize_pem()))
    }
}

async fn start_mtls_server(ca: &TestCa) -> TestServer {
    let (cert, key) = ca.issue("localhost", ExtendedKeyUsagePurpose::ServerAuth);
    let tls = ServerMtlsConfig::new(cert, key, ca.pem());
    TestServer::start(MemoryDeviceControl::new().with_device("wg0"), Some(tls)).await
}

fn client_config(server: &TestServer) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".to_string(),
        port: server.addr.port(),
        connect_timeout_secs: 2,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_mutual_tls_round_trip() {
    let ca = TestCa::new("wg-control test CA");
    let server = start_mtls_server(&ca).await;

    let (cert, key) = ca.issue("client", ExtendedKeyUsagePurpose::ClientAuth);
    let tls = ClientMtlsConfig::new(cert, key, ca.pem(), "localhost".to_string());
    let client = ControlClient::connect_with(&client_config(&server), Some(tls))
        .await
        .expect("mTLS connection should succeed");

    let device = client.device("wg0").await.expect("GetDevice over mTLS failed");
    assert_eq!(device.name, "wg0");

    drop(client);
    server.stop().await.expect("server stopped with an error");
}

#[tokio::test]
async fn test_client_certificate_from_untrusted_ca_is_rejected() {
    let ca = TestCa::new("wg-control test CA");
    let rogue = TestCa::new("rogue CA");
    let server = start_mtls_server(&ca).await;

    let (cert, key) = rogue.issue("client", ExtendedKeyUsagePurpose::ClientAuth);
    let tls = ClientMtlsConfig::new(cert, key, ca.pem(), "localhost".to_string());

    // TLS 1.3 may report the rejection on the first call instead of the handshake
    match ControlClient::connect_with(&client_config(&server), Some(tls)).await {
        Err(_) => {}
        Ok(client) => assert!(client.device("wg0").await.is_err()),
    }

    server.stop().await.expect("server stopped with an error");
}

#[tokio::test]
async fn test_server_from_untrusted_ca_is_rejected() {
    let ca = TestCa::new("wg-control test CA");
    let other = TestCa::new("other CA");
    let server = start_mtls_server(&ca).await;

    let (cert, key) = other.issue("client", ExtendedKeyUsagePurpose::ClientAuth);
    let tls = ClientMtlsConfig::new(cert, key, other.pem(), "localhost".to_string());

    match ControlClient::connect_with(&client_config(&server), Some(tls)).await {
        Err(_) => {}
        Ok(client) => assert!(client.device("wg0").await.is_err()),
    }

    server.stop().await.expect("server stopped with an error");
}
