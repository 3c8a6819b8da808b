//! Human-readable device reports
//!
//! Serializable summaries of devices with base64 keys, CIDR strings and
//! endpoint strings, printed as JSON by the command-line client. Private
//! keys are never included.

use crate::wireguard::{Device, Peer};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Summary of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    /// Interface name
    pub name: String,
    /// Implementation backing the device
    #[serde(rename = "type")]
    pub kind: String,
    /// Public key (base64)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Whether a private key is configured
    pub has_private_key: bool,
    /// Listening port
    pub listen_port: u16,
    /// Firewall mark (omitted when 0)
    #[serde(skip_serializing_if = "is_zero")]
    pub firewall_mark: u32,
    /// Peers in device order
    pub peers: Vec<PeerReport>,
}

/// Summary of one peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerReport {
    /// Public key (base64)
    pub public_key: String,
    /// Whether a preshared key is configured
    pub has_preshared_key: bool,
    /// Endpoint as `ip:port`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Keepalive interval in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_keepalive_secs: Option<u64>,
    /// Last handshake, seconds since the Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_handshake_unix: Option<u64>,
    /// Bytes received
    pub receive_bytes: u64,
    /// Bytes sent
    pub transmit_bytes: u64,
    /// Allowed IPs in CIDR notation
    pub allowed_ips: Vec<String>,
    /// Protocol version
    pub protocol_version: u32,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn unix_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

impl From<&Peer> for PeerReport {
    fn from(peer: &Peer) -> Self {
        Self {
            public_key: peer.public_key.to_base64(),
            has_preshared_key: peer.preshared_key.is_some(),
            endpoint: peer.endpoint.map(|e| e.to_string()),
            persistent_keepalive_secs: peer.persistent_keepalive_interval.map(|d| d.as_secs()),
            last_handshake_unix: peer.last_handshake_time.and_then(unix_secs),
            receive_bytes: peer.receive_bytes,
            transmit_bytes: peer.transmit_bytes,
            allowed_ips: peer.allowed_ips.iter().map(ToString::to_string).collect(),
            protocol_version: peer.protocol_version,
        }
    }
}

impl From<&Device> for DeviceReport {
    fn from(device: &Device) -> Self {
        Self {
            name: device.name.clone(),
            kind: device.kind.to_string(),
            public_key: device.public_key.map(|k| k.to_base64()),
            has_private_key: device.private_key.is_some(),
            listen_port: device.listen_port,
            firewall_mark: device.firewall_mark,
            peers: device.peers.iter().map(PeerReport::from).collect(),
        }
    }
}
