//! WireGuard device model and device control
//!
//! This module holds the native view of WireGuard devices, key management,
//! and the backends able to read and reconfigure devices: the userspace
//! configuration protocol on Unix hosts and an in-memory store.

mod client;
mod keys;
mod memory;
mod types;

#[cfg(unix)]
pub mod uapi;

pub use client::DeviceControl;
pub use keys::{KeyPair, PresharedKey, PrivateKey, PublicKey, KEY_LEN};
pub use memory::{apply_config, MemoryDeviceControl};
pub use types::{Config, Device, DeviceKind, IpNet, Peer, PeerConfig};

#[cfg(test)]
pub use client::MockDeviceControl;

#[cfg(unix)]
pub use uapi::UapiClient;
