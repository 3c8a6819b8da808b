//! Configuration management
//!
//! Server and client settings are explicit structs built once at startup
//! from an optional TOML file and command-line overrides, then passed by
//! value into the transport. JSON documents describe configuration changes
//! for a single device.

mod json;
pub mod validation;

pub use json::{DeltaDocument, PeerDelta};

use crate::error::{Result, WgControlError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default port of the control service
pub const DEFAULT_PORT: u16 = 8080;

/// Default host for both server and client
pub const DEFAULT_HOST: &str = "localhost";

/// Paths of the PEM files used for mutual TLS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsPaths {
    /// Certificate presented to the peer
    pub cert: PathBuf,
    /// Private key of `cert`
    pub key: PathBuf,
    /// Certificate authority that signed the peer's certificate
    pub ca: PathBuf,
}

impl TlsPaths {
    /// Default server credentials under `certs/`
    pub fn server_default() -> Self {
        Self {
            cert: PathBuf::from("certs/server.crt"),
            key: PathBuf::from("certs/server.key"),
            ca: PathBuf::from("certs/ca.crt"),
        }
    }

    /// Default client credentials under `certs/`
    pub fn client_default() -> Self {
        Self {
            cert: PathBuf::from("certs/client.crt"),
            key: PathBuf::from("certs/client.key"),
            ca: PathBuf::from("certs/ca.crt"),
        }
    }
}

/// Device-control backend used by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Userspace implementations over their configuration sockets
    #[default]
    Uapi,
    /// Process-local devices, for diagnostics
    Memory,
}

/// Control server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to listen on
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Serve without TLS (diagnostics only)
    pub insecure: bool,
    /// Server credentials
    pub tls: TlsPaths,
    /// Device-control backend
    pub backend: Backend,
    /// Directory holding userspace device sockets
    pub socket_dir: PathBuf,
    /// Devices created at startup by the memory backend
    pub memory_devices: Vec<String>,
    /// Upper bound for a single request
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            insecure: false,
            tls: TlsPaths::server_default(),
            backend: Backend::default(),
            socket_dir: PathBuf::from("/var/run/wireguard"),
            memory_devices: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Validate the server settings
    pub fn validate(&self) -> Result<()> {
        validation::validate_host(&self.host)?;
        validation::validate_timeout("request_timeout_secs", self.request_timeout_secs)?;
        for name in &self.memory_devices {
            validation::validate_interface_name(name)
                .map_err(|e| WgControlError::Config(format!("memory_devices: {}", e)))?;
        }
        Ok(())
    }

    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        join_host_port(&self.host, self.port)
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Control client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Connect without TLS (diagnostics only)
    pub insecure: bool,
    /// Client credentials
    pub tls: TlsPaths,
    /// Upper bound for establishing the connection
    pub connect_timeout_secs: u64,
    /// Upper bound for a single call
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            insecure: false,
            tls: TlsPaths::client_default(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Validate the client settings
    pub fn validate(&self) -> Result<()> {
        validation::validate_host(&self.host)?;
        validation::validate_timeout("connect_timeout_secs", self.connect_timeout_secs)?;
        validation::validate_timeout("request_timeout_secs", self.request_timeout_secs)?;
        Ok(())
    }

    /// URI of the server, with the scheme matching the security mode
    pub fn endpoint_uri(&self) -> String {
        let scheme = if self.insecure { "http" } else { "https" };
        format!("{}://{}", scheme, join_host_port(&self.host, self.port))
    }

    /// Connection establishment timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Per-call timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings file holding `[server]` and `[client]` sections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Server section
    pub server: ServerConfig,
    /// Client section
    pub client: ClientConfig,
}

impl FileConfig {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WgControlError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.server.validate()?;
        config.client.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
