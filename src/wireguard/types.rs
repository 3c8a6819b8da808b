//! Native device-control data model
//!
//! These types describe WireGuard devices the way a device-control
//! backend sees them. Optional values are `Option`s throughout: `None`
//! in a [`Config`] always means "leave unchanged", never "set to zero".

use crate::error::{Result, WgControlError};
use crate::wireguard::keys::encode_hex;
use crate::wireguard::{PresharedKey, PrivateKey, PublicKey};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, SystemTime};

/// Implementation backing a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceKind {
    /// Kind could not be determined
    #[default]
    Unknown,
    /// Backend chooses the implementation
    Auto,
    /// Linux kernel module
    LinuxKernel,
    /// OpenBSD kernel driver
    OpenbsdKernel,
    /// FreeBSD kernel driver
    FreebsdKernel,
    /// Windows kernel driver
    WindowsKernel,
    /// Userspace implementation on Linux
    UserspaceLinux,
    /// Userspace implementation on Windows
    UserspaceWindows,
    /// Userspace implementation on macOS
    UserspaceDarwin,
    /// Userspace implementation on OpenBSD
    UserspaceOpenbsd,
    /// Userspace implementation on FreeBSD
    UserspaceFreebsd,
}

impl DeviceKind {
    /// Userspace kind for the operating system we are running on
    pub fn userspace() -> Self {
        match std::env::consts::OS {
            "linux" => Self::UserspaceLinux,
            "windows" => Self::UserspaceWindows,
            "macos" => Self::UserspaceDarwin,
            "openbsd" => Self::UserspaceOpenbsd,
            "freebsd" => Self::UserspaceFreebsd,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Auto => "auto",
            Self::LinuxKernel => "Linux kernel",
            Self::OpenbsdKernel => "OpenBSD kernel",
            Self::FreebsdKernel => "FreeBSD kernel",
            Self::WindowsKernel => "Windows kernel",
            Self::UserspaceLinux => "userspace (Linux)",
            Self::UserspaceWindows => "userspace (Windows)",
            Self::UserspaceDarwin => "userspace (macOS)",
            Self::UserspaceOpenbsd => "userspace (OpenBSD)",
            Self::UserspaceFreebsd => "userspace (FreeBSD)",
        };
        f.write_str(s)
    }
}

/// IP network as raw address and mask bytes
///
/// Nothing is checked on construction from raw parts; [`IpNet::prefix`]
/// reports whether the pair forms a legal CIDR network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpNet {
    /// Address bytes (4 or 16 when well formed)
    pub ip: Vec<u8>,
    /// Mask bytes (same length as `ip` when well formed)
    pub mask: Vec<u8>,
}

impl IpNet {
    /// Build a network from an address and a prefix length
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self> {
        let (ip, bits) = match addr {
            IpAddr::V4(v4) => (v4.octets().to_vec(), 32u8),
            IpAddr::V6(v6) => (v6.octets().to_vec(), 128u8),
        };
        if prefix > bits {
            return Err(WgControlError::InvalidArgument(format!(
                "Prefix length {} exceeds maximum {} for IP address {}",
                prefix, bits, addr
            )));
        }
        let mask = (0..bits / 8)
            .map(|i| {
                let covered = prefix.saturating_sub(i * 8).min(8);
                (0xffu16 << (8 - covered)) as u8
            })
            .collect();
        Ok(Self { ip, mask })
    }

    /// Parse CIDR notation (`10.0.0.0/24`, `fd00::1/128`)
    pub fn from_cidr(cidr: &str) -> Result<Self> {
        let (addr, prefix) = cidr.trim().split_once('/').ok_or_else(|| {
            WgControlError::InvalidArgument(format!(
                "Invalid CIDR notation: {} (expected format: IP/prefix)",
                cidr
            ))
        })?;
        let addr: IpAddr = addr.parse().map_err(|_| {
            WgControlError::InvalidArgument(format!("Invalid IP address in CIDR: {}", cidr))
        })?;
        let prefix: u8 = prefix.parse().map_err(|_| {
            WgControlError::InvalidArgument(format!("Invalid prefix length in CIDR: {}", cidr))
        })?;
        Self::new(addr, prefix)
    }

    /// Address and prefix length, or `None` if the pair is malformed
    pub fn prefix(&self) -> Option<(IpAddr, u8)> {
        if self.ip.len() != self.mask.len() {
            return None;
        }
        let addr = match self.ip.len() {
            4 => IpAddr::V4(Ipv4Addr::from(<[u8; 4]>::try_from(self.ip.as_slice()).ok()?)),
            16 => IpAddr::V6(Ipv6Addr::from(<[u8; 16]>::try_from(self.ip.as_slice()).ok()?)),
            _ => return None,
        };

        let ones: u32 = self.mask.iter().map(|b| b.count_ones()).sum();
        let expected = Self::new(addr, ones as u8).ok()?;
        if expected.mask != self.mask {
            // non-contiguous mask
            return None;
        }
        Some((addr, ones as u8))
    }
}

impl fmt::Display for IpNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix() {
            Some((addr, prefix)) => write!(f, "{}/{}", addr, prefix),
            None => write!(
                f,
                "<invalid ip {} mask {}>",
                encode_hex(&self.ip),
                encode_hex(&self.mask)
            ),
        }
    }
}

/// Snapshot of one WireGuard device
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Device {
    /// Interface name
    pub name: String,
    /// Implementation backing the device
    pub kind: DeviceKind,
    /// Device private key, if one is configured
    pub private_key: Option<PrivateKey>,
    /// Public key derived from the private key
    pub public_key: Option<PublicKey>,
    /// UDP listening port
    pub listen_port: u16,
    /// Firewall mark applied to outgoing packets (0 = none)
    pub firewall_mark: u32,
    /// Peers in device order
    pub peers: Vec<Peer>,
}

/// Snapshot of one peer of a device
#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    /// Peer identity
    pub public_key: PublicKey,
    /// Optional symmetric preshared key
    pub preshared_key: Option<PresharedKey>,
    /// Last known endpoint
    pub endpoint: Option<SocketAddr>,
    /// Keepalive interval; `None` means disabled
    pub persistent_keepalive_interval: Option<Duration>,
    /// Time of the last completed handshake
    pub last_handshake_time: Option<SystemTime>,
    /// Bytes received from this peer
    pub receive_bytes: u64,
    /// Bytes sent to this peer
    pub transmit_bytes: u64,
    /// Address ranges routed to this peer
    pub allowed_ips: Vec<IpNet>,
    /// WireGuard protocol version
    pub protocol_version: u32,
}

impl Peer {
    /// Create a peer with nothing but its identity
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            preshared_key: None,
            endpoint: None,
            persistent_keepalive_interval: None,
            last_handshake_time: None,
            receive_bytes: 0,
            transmit_bytes: 0,
            allowed_ips: Vec::new(),
            protocol_version: 1,
        }
    }
}

/// Configuration change applied to a device
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    /// New private key
    pub private_key: Option<PrivateKey>,
    /// New listening port
    pub listen_port: Option<u16>,
    /// New firewall mark
    pub firewall_mark: Option<u32>,
    /// Drop every peer not listed in `peers`
    pub replace_peers: bool,
    /// Per-peer changes, applied in order
    pub peers: Vec<PeerConfig>,
}

/// Change for one peer within a [`Config`]
#[derive(Debug, Clone, PartialEq)]
pub struct PeerConfig {
    /// Peer identity
    pub public_key: PublicKey,
    /// Remove the peer; takes precedence over every other field
    pub remove: bool,
    /// Only touch the peer if it already exists
    pub update_only: bool,
    /// New preshared key (all zeros clears it)
    pub preshared_key: Option<PresharedKey>,
    /// New endpoint
    pub endpoint: Option<SocketAddr>,
    /// New keepalive interval (zero disables it)
    pub persistent_keepalive_interval: Option<Duration>,
    /// Replace the allowed IPs instead of appending to them
    pub replace_allowed_ips: bool,
    /// Allowed IPs to add, or the full set when replacing
    pub allowed_ips: Vec<IpNet>,
}

impl PeerConfig {
    /// Create a change entry that only names the peer
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            remove: false,
            update_only: false,
            preshared_key: None,
            endpoint: None,
            persistent_keepalive_interval: None,
            replace_allowed_ips: false,
            allowed_ips: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipnet_from_cidr() {
        let net = IpNet::from_cidr("192.168.2.2/32").unwrap();
        assert_eq!(net.ip, vec![192, 168, 2, 2]);
        assert_eq!(net.mask, vec![255, 255, 255, 255]);

        let net = IpNet::from_cidr("10.0.0.0/20").unwrap();
        assert_eq!(net.mask, vec![255, 255, 240, 0]);

        let net = IpNet::from_cidr("fe80::/64").unwrap();
        assert_eq!(net.mask.len(), 16);
        assert_eq!(net.to_string(), "fe80::/64");
    }

    #[test]
    fn test_ipnet_invalid_cidr() {
        assert!(IpNet::from_cidr("10.0.0.0").is_err());
        assert!(IpNet::from_cidr("10.0.0.0/33").is_err());
        assert!(IpNet::from_cidr("invalid/24").is_err());
    }

    #[test]
    fn test_ipnet_prefix_detects_malformed() {
        let good = IpNet::from_cidr("0.0.0.0/0").unwrap();
        assert_eq!(good.prefix(), Some(("0.0.0.0".parse().unwrap(), 0)));

        let short_ip = IpNet {
            ip: vec![10, 0, 0],
            mask: vec![255, 255, 255],
        };
        assert_eq!(short_ip.prefix(), None);

        let mismatched = IpNet {
            ip: vec![10, 0, 0, 1],
            mask: vec![255; 16],
        };
        assert_eq!(mismatched.prefix(), None);

        let holes = IpNet {
            ip: vec![10, 0, 0, 1],
            mask: vec![255, 0, 255, 0],
        };
        assert_eq!(holes.prefix(), None);
        assert!(holes.to_string().starts_with("<invalid"));
    }

    #[test]
    fn test_userspace_kind_matches_os() {
        #[cfg(target_os = "linux")]
        assert_eq!(DeviceKind::userspace(), DeviceKind::UserspaceLinux);
        #[cfg(target_os = "macos")]
        assert_eq!(DeviceKind::userspace(), DeviceKind::UserspaceDarwin);
    }
}
