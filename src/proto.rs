//! Wire schema for the WireGuard control service
//!
//! The messages mirror package `wg` and are exchanged as protobuf over gRPC.
//! Key material is carried as raw bytes: on the read side (`Device`, `Peer`)
//! a zero-length key means "not set", on the write side (`Config`,
//! `PeerConfig`) secrets are `optional` so that "leave unchanged" and
//! "present but empty" can be told apart.
//!
//! # Example
//!
//! ```ignore
//! use wg_control::proto::wire_guard_client::WireGuardClient;
//! use wg_control::proto::DeviceRequest;
//!
//! let mut client = WireGuardClient::connect("http://localhost:8080").await?;
//! let device = client
//!     .device(DeviceRequest { name: "wg0".to_string() })
//!     .await?
//!     .into_inner()
//!     .device;
//! ```

#![allow(missing_docs)] // Generated service code doesn't have docs

/// Kind of device implementation backing an interface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DeviceType {
    Unknown = 0,
    Auto = 1,
    LinuxKernel = 2,
    OpenbsdKernel = 3,
    FreebsdKernel = 4,
    WindowsKernel = 5,
    UserspaceLinux = 6,
    UserspaceWindows = 7,
    UserspaceDarwin = 8,
    UserspaceOpenbsd = 9,
    UserspaceFreebsd = 10,
}

/// IP network: raw address bytes plus raw mask bytes
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IpNet {
    #[prost(bytes = "vec", tag = "1")]
    pub ip: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub ip_mask: Vec<u8>,
}

/// UDP endpoint; `zone` is the IPv6 scope (interface index or name)
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UdpAddr {
    #[prost(bytes = "vec", tag = "1")]
    pub ip: Vec<u8>,
    #[prost(int32, tag = "2")]
    pub port: i32,
    #[prost(string, tag = "3")]
    pub zone: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Device {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(enumeration = "DeviceType", tag = "2")]
    pub r#type: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub private_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub public_key: Vec<u8>,
    #[prost(int32, tag = "5")]
    pub listen_port: i32,
    #[prost(int32, tag = "6")]
    pub firewall_mark: i32,
    #[prost(message, repeated, tag = "7")]
    pub peers: Vec<Peer>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Peer {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub preshared_key: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub endpoint: Option<UdpAddr>,
    #[prost(message, optional, tag = "4")]
    pub persistent_keepalive_interval: Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "5")]
    pub last_handshake_time: Option<::prost_types::Timestamp>,
    #[prost(int64, tag = "6")]
    pub received_bytes: i64,
    #[prost(int64, tag = "7")]
    pub transmit_bytes: i64,
    #[prost(message, repeated, tag = "8")]
    pub allowed_ips: Vec<IpNet>,
    #[prost(int32, tag = "9")]
    pub protocol_version: i32,
}

/// Configuration delta for a device
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Config {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub private_key: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "2")]
    pub listen_port: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub firewall_mark: Option<i32>,
    #[prost(bool, tag = "4")]
    pub replace_peers: bool,
    #[prost(message, repeated, tag = "5")]
    pub peers: Vec<PeerConfig>,
}

/// Change for a single peer within a [`Config`]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PeerConfig {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: Vec<u8>,
    #[prost(bool, tag = "2")]
    pub remove: bool,
    #[prost(bool, tag = "3")]
    pub update_only: bool,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub preshared_key: Option<Vec<u8>>,
    #[prost(message, optional, tag = "5")]
    pub endpoint: Option<UdpAddr>,
    #[prost(message, optional, tag = "6")]
    pub persistent_keepalive_interval: Option<::prost_types::Duration>,
    #[prost(bool, tag = "7")]
    pub replace_allowed_ips: bool,
    #[prost(message, repeated, tag = "8")]
    pub allowed_ips: Vec<IpNet>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DevicesRequest {}

/// A device left out of a listing because it could not be converted
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SkippedDevice {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub reason: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DevicesResponse {
    #[prost(message, repeated, tag = "1")]
    pub devices: Vec<Device>,
    #[prost(message, repeated, tag = "2")]
    pub skipped: Vec<SkippedDevice>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceResponse {
    #[prost(message, optional, tag = "1")]
    pub device: Option<Device>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigureDeviceRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub config: Option<Config>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigureDeviceResponse {}

include!(concat!(env!("OUT_DIR"), "/wg.WireGuard.rs"));
