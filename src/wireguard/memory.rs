//! In-memory device control
//!
//! Holds device state in process and applies configuration changes with
//! the same rules a WireGuard device does. Used as a test double and for
//! running the control server without touching real interfaces.

use crate::error::{Result, WgControlError};
use crate::wireguard::{Config, Device, DeviceControl, DeviceKind, Peer, PeerConfig};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Device control backed by a map of device snapshots
#[derive(Debug, Default)]
pub struct MemoryDeviceControl {
    devices: RwLock<BTreeMap<String, Device>>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl MemoryDeviceControl {
    /// Create a backend without any devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty device with the given interface name
    pub fn with_device(self, name: &str) -> Self {
        let device = Device {
            name: name.to_string(),
            kind: DeviceKind::userspace(),
            ..Default::default()
        };
        self.with_snapshot(device)
    }

    /// Add a device exactly as given
    pub fn with_snapshot(mut self, device: Device) -> Self {
        self.devices
            .get_mut()
            .insert(device.name.clone(), device);
        self
    }

    /// Record traffic for a peer, as the data plane would
    pub async fn record_traffic(
        &self,
        name: &str,
        public_key: &crate::wireguard::PublicKey,
        rx: u64,
        tx: u64,
    ) -> Result<()> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(name)
            .ok_or_else(|| WgControlError::NotFound(format!("device '{}'", name)))?;
        let peer = device
            .peers
            .iter_mut()
            .find(|p| p.public_key == *public_key)
            .ok_or_else(|| WgControlError::NotFound(format!("peer {}", public_key)))?;
        peer.receive_bytes = peer.receive_bytes.saturating_add(rx);
        peer.transmit_bytes = peer.transmit_bytes.saturating_add(tx);
        Ok(())
    }

    /// Number of times `close` was called
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WgControlError::Unavailable(
                "device control is closed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Apply `config` to a copy of `device`; the original is untouched on error
pub fn apply_config(device: &Device, config: &Config) -> Result<Device> {
    for peer in &config.peers {
        if let Some(bad) = peer.allowed_ips.iter().find(|ip| ip.prefix().is_none()) {
            return Err(WgControlError::InvalidArgument(format!(
                "peer {}: invalid allowed IP {}",
                peer.public_key, bad
            )));
        }
    }

    let mut next = device.clone();

    if let Some(key) = &config.private_key {
        next.public_key = Some(key.public_key());
        next.private_key = Some(key.clone());
    }
    if let Some(port) = config.listen_port {
        next.listen_port = port;
    }
    if let Some(mark) = config.firewall_mark {
        next.firewall_mark = mark;
    }
    if config.replace_peers {
        next.peers.clear();
    }

    for change in &config.peers {
        apply_peer(&mut next, change);
    }

    Ok(next)
}

fn apply_peer(device: &mut Device, change: &PeerConfig) {
    let index = device
        .peers
        .iter()
        .position(|p| p.public_key == change.public_key);

    if change.remove {
        if let Some(index) = index {
            device.peers.remove(index);
        }
        return;
    }

    let index = match index {
        Some(index) => index,
        None if change.update_only => return,
        None => {
            device.peers.push(Peer::new(change.public_key));
            device.peers.len() - 1
        }
    };

    // An allowed IP routes to exactly one peer, so claiming it here
    // takes it away from any other peer.
    for (i, other) in device.peers.iter_mut().enumerate() {
        if i != index {
            other
                .allowed_ips
                .retain(|ip| !change.allowed_ips.contains(ip));
        }
    }

    let peer = &mut device.peers[index];
    if let Some(psk) = &change.preshared_key {
        peer.preshared_key = if psk.is_zero() { None } else { Some(psk.clone()) };
    }
    if let Some(endpoint) = change.endpoint {
        peer.endpoint = Some(endpoint);
    }
    if let Some(interval) = change.persistent_keepalive_interval {
        peer.persistent_keepalive_interval = (interval != Duration::ZERO).then_some(interval);
    }
    if change.replace_allowed_ips {
        peer.allowed_ips.clear();
    }
    for ip in &change.allowed_ips {
        if !peer.allowed_ips.contains(ip) {
            peer.allowed_ips.push(ip.clone());
        }
    }
}

#[async_trait]
impl DeviceControl for MemoryDeviceControl {
    async fn devices(&self) -> Result<Vec<Device>> {
        self.ensure_open()?;
        Ok(self.devices.read().await.values().cloned().collect())
    }

    async fn device(&self, name: &str) -> Result<Device> {
        self.ensure_open()?;
        self.devices
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| WgControlError::NotFound(format!("device '{}' does not exist", name)))
    }

    async fn configure_device(&self, name: &str, config: Config) -> Result<()> {
        self.ensure_open()?;
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(name)
            .ok_or_else(|| WgControlError::NotFound(format!("device '{}' does not exist", name)))?;
        *device = apply_config(device, &config)?;
        debug!(device = %name, peers = device.peers.len(), "Applied configuration");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
