//! Translation between the wire schema and the native device model
//!
//! Every optional wire field maps to an `Option` on the native side and back.
//! Absent means "leave unchanged" when writing and "not set" when reading;
//! no zero value ever stands in for absence.
//!
//! Writing is strict: the first malformed field fails the whole
//! configuration with `InvalidArgument`. Reading fails only when the native
//! snapshot itself holds data the wire cannot represent; callers decide
//! whether to skip such a device or abort.

use crate::error::{Result, WgControlError};
use crate::proto;
use crate::wireguard::{
    Config, Device, DeviceKind, IpNet, Peer, PeerConfig, PresharedKey, PrivateKey, PublicKey,
};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::time::{Duration, SystemTime};

/// Longest keepalive interval a device accepts
pub const MAX_KEEPALIVE: Duration = Duration::from_secs(u16::MAX as u64);

impl From<DeviceKind> for proto::DeviceType {
    fn from(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Unknown => Self::Unknown,
            DeviceKind::Auto => Self::Auto,
            DeviceKind::LinuxKernel => Self::LinuxKernel,
            DeviceKind::OpenbsdKernel => Self::OpenbsdKernel,
            DeviceKind::FreebsdKernel => Self::FreebsdKernel,
            DeviceKind::WindowsKernel => Self::WindowsKernel,
            DeviceKind::UserspaceLinux => Self::UserspaceLinux,
            DeviceKind::UserspaceWindows => Self::UserspaceWindows,
            DeviceKind::UserspaceDarwin => Self::UserspaceDarwin,
            DeviceKind::UserspaceOpenbsd => Self::UserspaceOpenbsd,
            DeviceKind::UserspaceFreebsd => Self::UserspaceFreebsd,
        }
    }
}

impl From<proto::DeviceType> for DeviceKind {
    fn from(kind: proto::DeviceType) -> Self {
        match kind {
            proto::DeviceType::Unknown => Self::Unknown,
            proto::DeviceType::Auto => Self::Auto,
            proto::DeviceType::LinuxKernel => Self::LinuxKernel,
            proto::DeviceType::OpenbsdKernel => Self::OpenbsdKernel,
            proto::DeviceType::FreebsdKernel => Self::FreebsdKernel,
            proto::DeviceType::WindowsKernel => Self::WindowsKernel,
            proto::DeviceType::UserspaceLinux => Self::UserspaceLinux,
            proto::DeviceType::UserspaceWindows => Self::UserspaceWindows,
            proto::DeviceType::UserspaceDarwin => Self::UserspaceDarwin,
            proto::DeviceType::UserspaceOpenbsd => Self::UserspaceOpenbsd,
            proto::DeviceType::UserspaceFreebsd => Self::UserspaceFreebsd,
        }
    }
}

/// Translate a wire configuration delta into a native one
pub fn config_from_wire(config: &proto::Config) -> Result<Config> {
    let private_key = config
        .private_key
        .as_deref()
        .map(PrivateKey::from_slice)
        .transpose()?;

    let listen_port = config
        .listen_port
        .map(|port| {
            u16::try_from(port).map_err(|_| {
                WgControlError::InvalidArgument(format!(
                    "listen port {} is out of range (0-65535)",
                    port
                ))
            })
        })
        .transpose()?;

    let peers = config
        .peers
        .iter()
        .enumerate()
        .map(|(i, peer)| {
            peer_config_from_wire(peer).map_err(|e| match e {
                WgControlError::InvalidArgument(m) => {
                    WgControlError::InvalidArgument(format!("peer #{}: {}", i, m))
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Config {
        private_key,
        listen_port,
        // opaque mark, same bits either way
        firewall_mark: config.firewall_mark.map(|mark| mark as u32),
        replace_peers: config.replace_peers,
        peers,
    })
}

/// Translate one wire peer change into a native one
pub fn peer_config_from_wire(peer: &proto::PeerConfig) -> Result<PeerConfig> {
    let public_key = PublicKey::from_slice(&peer.public_key)?;

    let preshared_key = peer
        .preshared_key
        .as_deref()
        .map(PresharedKey::from_slice)
        .transpose()?;

    let endpoint = peer.endpoint.as_ref().map(endpoint_from_wire).transpose()?;

    let persistent_keepalive_interval = peer
        .persistent_keepalive_interval
        .as_ref()
        .map(keepalive_from_wire)
        .transpose()?;

    Ok(PeerConfig {
        public_key,
        remove: peer.remove,
        // a removal never falls back to "update if present"
        update_only: peer.update_only && !peer.remove,
        preshared_key,
        endpoint,
        persistent_keepalive_interval,
        replace_allowed_ips: peer.replace_allowed_ips,
        allowed_ips: peer.allowed_ips.iter().map(ipnet_from_wire).collect(),
    })
}

/// Devices count keepalive in whole seconds
fn keepalive_from_wire(interval: &prost_types::Duration) -> Result<Duration> {
    if interval.nanos != 0 {
        return Err(WgControlError::InvalidArgument(format!(
            "keepalive interval must be whole seconds, got {}s {}ns",
            interval.seconds, interval.nanos
        )));
    }
    let interval = prost_types::Duration {
        seconds: interval.seconds,
        nanos: interval.nanos,
    };
    let duration = Duration::try_from(interval).map_err(|e| {
        WgControlError::InvalidArgument(format!("invalid keepalive interval: {}", e))
    })?;
    if duration > MAX_KEEPALIVE {
        return Err(WgControlError::InvalidArgument(format!(
            "keepalive interval {:?} exceeds maximum {:?}",
            duration, MAX_KEEPALIVE
        )));
    }
    Ok(duration)
}

/// Allowed IPs pass through untouched; the device judges their legality
fn ipnet_from_wire(net: &proto::IpNet) -> IpNet {
    IpNet {
        ip: net.ip.clone(),
        mask: net.ip_mask.clone(),
    }
}

fn ipnet_to_wire(net: &IpNet) -> Result<proto::IpNet> {
    if net.prefix().is_none() {
        return Err(WgControlError::Internal(format!(
            "cannot represent allowed IP {}",
            net
        )));
    }
    Ok(proto::IpNet {
        ip: net.ip.clone(),
        ip_mask: net.mask.clone(),
    })
}

/// Translate a wire UDP address into a socket address
pub fn endpoint_from_wire(addr: &proto::UdpAddr) -> Result<SocketAddr> {
    let port = u16::try_from(addr.port).map_err(|_| {
        WgControlError::InvalidArgument(format!(
            "endpoint port {} is out of range (0-65535)",
            addr.port
        ))
    })?;

    match addr.ip.len() {
        4 => {
            if !addr.zone.is_empty() {
                return Err(WgControlError::InvalidArgument(format!(
                    "IPv4 endpoint cannot carry zone '{}'",
                    addr.zone
                )));
            }
            let octets = <[u8; 4]>::try_from(addr.ip.as_slice())
                .map_err(|_| WgControlError::Internal("IPv4 length mismatch".to_string()))?;
            Ok(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::from(octets), port)))
        }
        16 => {
            let octets = <[u8; 16]>::try_from(addr.ip.as_slice())
                .map_err(|_| WgControlError::Internal("IPv6 length mismatch".to_string()))?;
            let scope_id = resolve_zone(&addr.zone)?;
            Ok(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(octets),
                port,
                0,
                scope_id,
            )))
        }
        n => Err(WgControlError::InvalidArgument(format!(
            "endpoint IP must be 4 or 16 bytes, got {}",
            n
        ))),
    }
}

/// Translate a socket address into a wire UDP address
pub fn endpoint_to_wire(addr: &SocketAddr) -> proto::UdpAddr {
    let (ip, zone) = match addr {
        SocketAddr::V4(v4) => (v4.ip().octets().to_vec(), String::new()),
        SocketAddr::V6(v6) => {
            let zone = match v6.scope_id() {
                0 => String::new(),
                id => id.to_string(),
            };
            (v6.ip().octets().to_vec(), zone)
        }
    };
    proto::UdpAddr {
        ip,
        port: i32::from(addr.port()),
        zone,
    }
}

/// IPv6 scope: empty, a numeric interface index, or an interface name
pub fn resolve_zone(zone: &str) -> Result<u32> {
    if zone.is_empty() {
        return Ok(0);
    }
    if let Ok(index) = zone.parse::<u32>() {
        return Ok(index);
    }
    interface_index(zone)
}

#[cfg(unix)]
fn interface_index(name: &str) -> Result<u32> {
    let c_name = std::ffi::CString::new(name).map_err(|_| {
        WgControlError::InvalidArgument(format!("invalid zone '{}'", name.escape_default()))
    })?;
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(WgControlError::InvalidArgument(format!(
            "zone '{}' does not name an interface",
            name
        )));
    }
    Ok(index)
}

#[cfg(not(unix))]
fn interface_index(name: &str) -> Result<u32> {
    Err(WgControlError::InvalidArgument(format!(
        "zone '{}' must be a numeric interface index on this platform",
        name
    )))
}

/// Translate a native device snapshot into its wire form
pub fn device_to_wire(device: &Device) -> Result<proto::Device> {
    let peers = device
        .peers
        .iter()
        .map(peer_to_wire)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| WgControlError::Internal(format!("device '{}': {}", device.name, e)))?;

    Ok(proto::Device {
        name: device.name.clone(),
        r#type: proto::DeviceType::from(device.kind) as i32,
        private_key: device
            .private_key
            .as_ref()
            .map(|k| k.as_bytes().to_vec())
            .unwrap_or_default(),
        public_key: device
            .public_key
            .map(|k| k.as_bytes().to_vec())
            .unwrap_or_default(),
        listen_port: i32::from(device.listen_port),
        firewall_mark: device.firewall_mark as i32,
        peers,
    })
}

fn peer_to_wire(peer: &Peer) -> Result<proto::Peer> {
    let allowed_ips = peer
        .allowed_ips
        .iter()
        .map(ipnet_to_wire)
        .collect::<Result<Vec<_>>>()
        .map_err(|e| WgControlError::Internal(format!("peer {}: {}", peer.public_key, e)))?;

    Ok(proto::Peer {
        public_key: peer.public_key.as_bytes().to_vec(),
        preshared_key: peer
            .preshared_key
            .as_ref()
            .map(|k| k.as_bytes().to_vec())
            .unwrap_or_default(),
        endpoint: peer.endpoint.as_ref().map(endpoint_to_wire),
        persistent_keepalive_interval: peer.persistent_keepalive_interval.map(|d| {
            prost_types::Duration {
                seconds: i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
                nanos: d.subsec_nanos() as i32,
            }
        }),
        last_handshake_time: peer.last_handshake_time.map(prost_types::Timestamp::from),
        received_bytes: i64::try_from(peer.receive_bytes).unwrap_or(i64::MAX),
        transmit_bytes: i64::try_from(peer.transmit_bytes).unwrap_or(i64::MAX),
        allowed_ips,
        protocol_version: i32::try_from(peer.protocol_version).unwrap_or(i32::MAX),
    })
}

/// Translate a wire device back into the native model
///
/// Used on the calling side to present what a server reported.
pub fn device_from_wire(device: &proto::Device) -> Result<Device> {
    let kind = proto::DeviceType::try_from(device.r#type)
        .map(DeviceKind::from)
        .unwrap_or_default();

    let private_key = (!device.private_key.is_empty())
        .then(|| PrivateKey::from_slice(&device.private_key))
        .transpose()?;
    let public_key = (!device.public_key.is_empty())
        .then(|| PublicKey::from_slice(&device.public_key))
        .transpose()?;

    let listen_port = u16::try_from(device.listen_port).map_err(|_| {
        WgControlError::InvalidArgument(format!(
            "listen port {} is out of range",
            device.listen_port
        ))
    })?;

    Ok(Device {
        name: device.name.clone(),
        kind,
        private_key,
        public_key,
        listen_port,
        firewall_mark: device.firewall_mark as u32,
        peers: device
            .peers
            .iter()
            .map(peer_from_wire)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn peer_from_wire(peer: &proto::Peer) -> Result<Peer> {
    let preshared_key = (!peer.preshared_key.is_empty())
        .then(|| PresharedKey::from_slice(&peer.preshared_key))
        .transpose()?;

    let last_handshake_time = peer
        .last_handshake_time
        .as_ref()
        .map(|ts| {
            let ts = prost_types::Timestamp {
                seconds: ts.seconds,
                nanos: ts.nanos,
            };
            SystemTime::try_from(ts).map_err(|e| {
                WgControlError::InvalidArgument(format!("invalid handshake time: {}", e))
            })
        })
        .transpose()?;

    Ok(Peer {
        public_key: PublicKey::from_slice(&peer.public_key)?,
        preshared_key,
        endpoint: peer.endpoint.as_ref().map(endpoint_from_wire).transpose()?,
        persistent_keepalive_interval: peer
            .persistent_keepalive_interval
            .as_ref()
            .map(keepalive_from_wire)
            .transpose()?,
        last_handshake_time,
        receive_bytes: non_negative("received bytes", peer.received_bytes)?,
        transmit_bytes: non_negative("transmitted bytes", peer.transmit_bytes)?,
        allowed_ips: peer.allowed_ips.iter().map(ipnet_from_wire).collect(),
        protocol_version: non_negative("protocol version", peer.protocol_version)?,
    })
}

fn non_negative<S, T>(what: &str, value: S) -> Result<T>
where
    S: Copy + std::fmt::Display,
    T: TryFrom<S>,
{
    T::try_from(value)
        .map_err(|_| WgControlError::InvalidArgument(format!("{} {} is negative", what, value)))
}
