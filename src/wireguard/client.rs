//! Device-control capability
//!
//! The service only ever talks to devices through [`DeviceControl`], so the
//! real backend and test doubles are interchangeable.

use crate::error::Result;
use crate::wireguard::{Config, Device};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Read and reconfigure WireGuard devices on this host
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Every WireGuard device the backend can see
    async fn devices(&self) -> Result<Vec<Device>>;

    /// One device by interface name; `NotFound` if it does not exist
    async fn device(&self, name: &str) -> Result<Device>;

    /// Apply a configuration change to the named device as a single call
    async fn configure_device(&self, name: &str, config: Config) -> Result<()>;

    /// Release backend resources
    async fn close(&self) -> Result<()>;
}
