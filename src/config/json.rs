//! JSON configuration-change documents
//!
//! A document describes one change to one device in human-editable form:
//! base64 keys, CIDR strings for allowed IPs, `host:port` endpoints and
//! keepalive intervals in seconds. Fields left out of the document are left
//! unchanged on the device.

use crate::config::validation::parse_endpoint;
use crate::control::adapter::endpoint_to_wire;
use crate::error::{Result, WgControlError};
use crate::proto;
use crate::wireguard::{IpNet, PresharedKey, PrivateKey, PublicKey};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Change to a device, as written by a person
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeltaDocument {
    /// New private key (base64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    /// New listening port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u16>,

    /// New firewall mark
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall_mark: Option<u32>,

    /// Drop all peers not listed below
    #[serde(default)]
    pub replace_peers: bool,

    /// Per-peer changes
    #[serde(default)]
    pub peers: Vec<PeerDelta>,
}

/// Change to one peer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerDelta {
    /// Peer public key (base64)
    pub public_key: String,

    /// Remove the peer
    #[serde(default)]
    pub remove: bool,

    /// Only change the peer if it exists
    #[serde(default)]
    pub update_only: bool,

    /// Preshared key (base64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preshared_key: Option<String>,

    /// Endpoint (`host:port`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Keepalive interval in seconds (0 disables)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_keepalive_interval: Option<u16>,

    /// Replace the allowed IPs instead of adding to them
    #[serde(default)]
    pub replace_allowed_ips: bool,

    /// Allowed IPs in CIDR notation
    #[serde(default)]
    pub allowed_ips: Vec<String>,
}

impl DeltaDocument {
    /// Parse a document from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| WgControlError::Config(format!("Invalid change document: {}", e)))
    }

    /// Read a document from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WgControlError::Config(format!("Failed to read change document {:?}: {}", path, e))
        })?;
        Self::from_json(&content)
    }

    /// Convert into the wire configuration delta
    pub fn to_wire(&self) -> Result<proto::Config> {
        let private_key = self
            .private_key
            .as_deref()
            .map(|k| PrivateKey::from_base64(k).map(|k| k.as_bytes().to_vec()))
            .transpose()?;

        let peers = self
            .peers
            .iter()
            .map(PeerDelta::to_wire)
            .collect::<Result<Vec<_>>>()?;

        Ok(proto::Config {
            private_key,
            listen_port: self.listen_port.map(i32::from),
            firewall_mark: self.firewall_mark.map(|mark| mark as i32),
            replace_peers: self.replace_peers,
            peers,
        })
    }
}

impl PeerDelta {
    /// Convert into the wire peer change
    pub fn to_wire(&self) -> Result<proto::PeerConfig> {
        let public_key = PublicKey::from_base64(&self.public_key)?;

        let preshared_key = self
            .preshared_key
            .as_deref()
            .map(|k| PresharedKey::from_base64(k).map(|k| k.as_bytes().to_vec()))
            .transpose()?;

        let endpoint = self
            .endpoint
            .as_deref()
            .map(|e| parse_endpoint(e).map(|addr| endpoint_to_wire(&addr)))
            .transpose()?;

        let allowed_ips = self
            .allowed_ips
            .iter()
            .map(|cidr| {
                IpNet::from_cidr(cidr).map(|net| proto::IpNet {
                    ip: net.ip,
                    ip_mask: net.mask,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(proto::PeerConfig {
            public_key: public_key.as_bytes().to_vec(),
            remove: self.remove,
            update_only: self.update_only,
            preshared_key,
            endpoint,
            persistent_keepalive_interval: self.persistent_keepalive_interval.map(|secs| {
                prost_types::Duration {
                    seconds: i64::from(secs),
                    nanos: 0,
                }
            }),
            replace_allowed_ips: self.replace_allowed_ips,
            allowed_ips,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wireguard::KeyPair;

    #[test]
    fn test_parse_document() {
        let peer = KeyPair::generate();
        let json = format!(
            r#"{{
                "replace_peers": true,
                "peers": [{{
                    "public_key": "{}",
                    "endpoint": "203.0.113.7:51820",
                    "persistent_keepalive_interval": 25,
                    "allowed_ips": ["192.168.2.2/32"]
                }}]
            }}"#,
            peer.public.to_base64()
        );

        let doc = DeltaDocument::from_json(&json).unwrap();
        assert!(doc.replace_peers);
        assert!(doc.private_key.is_none());

        let wire = doc.to_wire().unwrap();
        assert!(wire.replace_peers);
        assert_eq!(wire.listen_port, None);
        assert_eq!(wire.private_key, None);
        assert_eq!(wire.peers.len(), 1);

        let p = &wire.peers[0];
        assert_eq!(p.public_key, peer.public.as_bytes().to_vec());
        assert_eq!(p.preshared_key, None);
        assert_eq!(p.endpoint.as_ref().unwrap().ip, vec![203, 0, 113, 7]);
        assert_eq!(p.endpoint.as_ref().unwrap().port, 51820);
        assert_eq!(p.persistent_keepalive_interval.as_ref().unwrap().seconds, 25);
        assert_eq!(p.allowed_ips[0].ip, vec![192, 168, 2, 2]);
        assert_eq!(p.allowed_ips[0].ip_mask, vec![255; 4]);
    }

    #[test]
    fn test_device_fields() {
        let key = KeyPair::generate();
        let json = format!(
            r#"{{"private_key": "{}", "listen_port": 51820, "firewall_mark": 4294967295}}"#,
            key.private.to_base64()
        );
        let wire = DeltaDocument::from_json(&json).unwrap().to_wire().unwrap();
        assert_eq!(wire.private_key, Some(key.private.as_bytes().to_vec()));
        assert_eq!(wire.listen_port, Some(51820));
        assert_eq!(wire.firewall_mark, Some(-1));
        assert!(wire.peers.is_empty());
    }

    #[test]
    fn test_invalid_documents() {
        assert!(DeltaDocument::from_json("not json").is_err());
        assert!(DeltaDocument::from_json(r#"{"listen_port": 70000}"#).is_err());
        assert!(DeltaDocument::from_json(r#"{"unknown": 1}"#).is_err());

        let bad_key = DeltaDocument::from_json(r#"{"peers": [{"public_key": "short"}]}"#).unwrap();
        assert!(bad_key.to_wire().is_err());

        let key = KeyPair::generate().public.to_base64();
        let bad_cidr = DeltaDocument {
            peers: vec![PeerDelta {
                public_key: key,
                allowed_ips: vec!["10.0.0.0/33".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(bad_cidr.to_wire().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("delta.json");
        fs::write(&path, r#"{"replace_peers": true}"#).unwrap();
        assert!(DeltaDocument::from_file(&path).unwrap().replace_peers);
        assert!(DeltaDocument::from_file(dir.path().join("missing.json")).is_err());
    }
}
