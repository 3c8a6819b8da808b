//! Mutual TLS material for the control channel
//!
//! Both sides present a certificate and verify the peer against the same
//! certificate authority. Private key PEMs are zeroized on drop.

use crate::config::TlsPaths;
use crate::error::{Result, WgControlError};
use std::path::Path;
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};
use tracing::debug;
use zeroize::Zeroizing;

fn read_pem(what: &str, path: &Path) -> Result<String> {
    let pem = std::fs::read_to_string(path)
        .map_err(|e| WgControlError::Tls(format!("cannot read {} {:?}: {}", what, path, e)))?;
    check_pem(what, &pem)?;
    debug!("Loaded {} from {:?}", what, path);
    Ok(pem)
}

fn check_pem(what: &str, pem: &str) -> Result<()> {
    if !pem.contains("-----BEGIN ") {
        return Err(WgControlError::Tls(format!("{} is not PEM encoded", what)));
    }
    Ok(())
}

/// Server-side mTLS configuration
pub struct ServerMtlsConfig {
    /// Server certificate PEM
    pub server_cert_pem: String,
    /// Server private key PEM (zeroized on drop)
    pub server_key_pem: Zeroizing<String>,
    /// CA certificate PEM for verifying clients
    pub ca_cert_pem: String,
}

impl ServerMtlsConfig {
    /// Create a new server mTLS config
    pub fn new(
        server_cert_pem: String,
        server_key_pem: Zeroizing<String>,
        ca_cert_pem: String,
    ) -> Self {
        Self {
            server_cert_pem,
            server_key_pem,
            ca_cert_pem,
        }
    }

    /// Load certificate, key and CA from the configured files
    pub fn from_files(paths: &TlsPaths) -> Result<Self> {
        Ok(Self::new(
            read_pem("certificate", &paths.cert)?,
            Zeroizing::new(read_pem("private key", &paths.key)?),
            read_pem("CA certificate", &paths.ca)?,
        ))
    }

    /// Build a tonic ServerTlsConfig that requires client certificates
    pub fn to_tonic_config(&self) -> Result<ServerTlsConfig> {
        check_pem("certificate", &self.server_cert_pem)?;
        check_pem("private key", &self.server_key_pem)?;
        check_pem("CA certificate", &self.ca_cert_pem)?;

        let identity = Identity::from_pem(&self.server_cert_pem, &*self.server_key_pem);
        let ca_cert = Certificate::from_pem(&self.ca_cert_pem);

        Ok(ServerTlsConfig::new()
            .identity(identity)
            .client_ca_root(ca_cert))
    }
}

/// Client-side mTLS configuration
pub struct ClientMtlsConfig {
    /// Client certificate PEM
    pub client_cert_pem: String,
    /// Client private key PEM (zeroized on drop)
    pub client_key_pem: Zeroizing<String>,
    /// CA certificate PEM for verifying the server
    pub ca_cert_pem: String,
    /// Server domain name for verification
    pub server_domain: String,
}

impl ClientMtlsConfig {
    /// Create a new client mTLS config
    pub fn new(
        client_cert_pem: String,
        client_key_pem: Zeroizing<String>,
        ca_cert_pem: String,
        server_domain: String,
    ) -> Self {
        Self {
            client_cert_pem,
            client_key_pem,
            ca_cert_pem,
            server_domain,
        }
    }

    /// Load certificate, key and CA from the configured files
    pub fn from_files(paths: &TlsPaths, server_domain: &str) -> Result<Self> {
        Ok(Self::new(
            read_pem("certificate", &paths.cert)?,
            Zeroizing::new(read_pem("private key", &paths.key)?),
            read_pem("CA certificate", &paths.ca)?,
            server_domain.to_string(),
        ))
    }

    /// Build a tonic ClientTlsConfig
    pub fn to_tonic_config(&self) -> Result<ClientTlsConfig> {
        check_pem("certificate", &self.client_cert_pem)?;
        check_pem("private key", &self.client_key_pem)?;
        check_pem("CA certificate", &self.ca_cert_pem)?;

        let identity = Identity::from_pem(&self.client_cert_pem, &*self.client_key_pem);
        let ca_cert = Certificate::from_pem(&self.ca_cert_pem);

        Ok(ClientTlsConfig::new()
            .identity(identity)
            .ca_certificate(ca_cert)
            .domain_name(&self.server_domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair};
    use std::fs;
    use tempfile::TempDir;

    fn self_signed() -> (String, String) {
        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        (cert.pem(), key.serialize_pem())
    }

    fn write_paths(dir: &TempDir, cert: &str, key: &str) -> TlsPaths {
        let paths = TlsPaths {
            cert: dir.path().join("tls.crt"),
            key: dir.path().join("tls.key"),
            ca: dir.path().join("ca.crt"),
        };
        fs::write(&paths.cert, cert).unwrap();
        fs::write(&paths.key, key).unwrap();
        fs::write(&paths.ca, cert).unwrap();
        paths
    }

    #[test]
    fn test_server_config_from_files() {
        let dir = TempDir::new().unwrap();
        let (cert, key) = self_signed();
        let paths = write_paths(&dir, &cert, &key);

        let config = ServerMtlsConfig::from_files(&paths).unwrap();
        assert_eq!(config.ca_cert_pem, cert);
        assert!(config.to_tonic_config().is_ok());
    }

    #[test]
    fn test_client_config_from_files() {
        let dir = TempDir::new().unwrap();
        let (cert, key) = self_signed();
        let paths = write_paths(&dir, &cert, &key);

        let config = ClientMtlsConfig::from_files(&paths, "localhost").unwrap();
        assert_eq!(config.server_domain, "localhost");
        assert!(config.to_tonic_config().is_ok());
    }

    #[test]
    fn test_missing_file_is_tls_error() {
        let dir = TempDir::new().unwrap();
        let paths = TlsPaths {
            cert: dir.path().join("missing.crt"),
            key: dir.path().join("missing.key"),
            ca: dir.path().join("missing-ca.crt"),
        };
        let err = ServerMtlsConfig::from_files(&paths).err().unwrap();
        assert!(matches!(err, WgControlError::Tls(m) if m.contains("missing.crt")));
    }

    #[test]
    fn test_non_pem_rejected() {
        let dir = TempDir::new().unwrap();
        let (cert, _) = self_signed();
        let paths = write_paths(&dir, &cert, "not a key");
        assert!(ClientMtlsConfig::from_files(&paths, "localhost").is_err());
    }
}
