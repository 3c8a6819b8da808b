//! Device-control service
//!
//! Validates the identifying parameters of each call, converts through the
//! adapter, and delegates to the native device-control capability. This is
//! also the gRPC service implementation served by the control server.

use crate::control::adapter::{config_from_wire, device_to_wire};
use crate::error::{Result, WgControlError};
use crate::proto::{self, wire_guard_server::WireGuard};
use crate::wireguard::{Config, DeviceControl};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

/// Result of enumerating devices
#[derive(Debug, Default)]
pub struct DeviceListing {
    /// Devices converted to their wire form, in native order
    pub devices: Vec<proto::Device>,
    /// Devices that could not be converted, with the reason
    pub skipped: Vec<(String, WgControlError)>,
}

/// Service facade over one native device-control handle
pub struct DeviceService {
    control: Arc<dyn DeviceControl>,
    closed: AtomicBool,
}

impl DeviceService {
    /// Create a service owning the given device-control handle
    pub fn new(control: Arc<dyn DeviceControl>) -> Self {
        Self {
            control,
            closed: AtomicBool::new(false),
        }
    }

    /// Enumerate every device, skipping those that cannot be converted
    pub async fn list_devices(&self) -> Result<DeviceListing> {
        let devices = self.control.devices().await?;

        let mut listing = DeviceListing::default();
        for device in devices {
            match device_to_wire(&device) {
                Ok(wire) => listing.devices.push(wire),
                Err(e) => {
                    warn!(device = %device.name, "Skipping device: {}", e);
                    listing.skipped.push((device.name, e));
                }
            }
        }

        debug!(
            devices = listing.devices.len(),
            skipped = listing.skipped.len(),
            "Listed devices"
        );
        Ok(listing)
    }

    /// Fetch one device by name
    pub async fn get_device(&self, name: &str) -> Result<proto::Device> {
        require_name(name)?;
        let device = self.control.device(name).await?;
        device_to_wire(&device)
    }

    /// Translate and apply a configuration change to one device
    pub async fn configure_device(&self, name: &str, config: Option<&proto::Config>) -> Result<()> {
        require_name(name)?;
        let config = match config {
            Some(config) => config_from_wire(config)?,
            None => Config::default(),
        };

        let peers = config.peers.len();
        let replace_peers = config.replace_peers;
        self.control.configure_device(name, config).await?;

        info!(device = %name, peers, replace_peers, "Device configured");
        Ok(())
    }

    /// Release the device-control handle; later calls are no-ops
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Device control already closed");
            return Ok(());
        }
        info!("Closing device control");
        self.control.close().await
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(WgControlError::InvalidArgument(
            "device name must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[tonic::async_trait]
impl WireGuard for DeviceService {
    async fn devices(
        &self,
        _request: Request<proto::DevicesRequest>,
    ) -> std::result::Result<Response<proto::DevicesResponse>, Status> {
        let listing = self.list_devices().await?;
        let skipped = listing
            .skipped
            .into_iter()
            .map(|(name, e)| proto::SkippedDevice {
                name,
                reason: e.to_string(),
            })
            .collect();

        Ok(Response::new(proto::DevicesResponse {
            devices: listing.devices,
            skipped,
        }))
    }

    async fn device(
        &self,
        request: Request<proto::DeviceRequest>,
    ) -> std::result::Result<Response<proto::DeviceResponse>, Status> {
        let request = request.into_inner();
        let device = self.get_device(&request.name).await?;
        Ok(Response::new(proto::DeviceResponse {
            device: Some(device),
        }))
    }

    async fn configure_device(
        &self,
        request: Request<proto::ConfigureDeviceRequest>,
    ) -> std::result::Result<Response<proto::ConfigureDeviceResponse>, Status> {
        let request = request.into_inner();
        DeviceService::configure_device(self, &request.name, request.config.as_ref()).await?;
        Ok(Response::new(proto::ConfigureDeviceResponse {}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wireguard::{Device, IpNet, MockDeviceControl, Peer, PrivateKey};
    use tonic::Code;

    fn device(name: &str) -> Device {
        Device {
            name: name.to_string(),
            listen_port: 51820,
            ..Default::default()
        }
    }

    fn malformed_device(name: &str) -> Device {
        let mut peer = Peer::new(PrivateKey::generate().public_key());
        peer.allowed_ips.push(IpNet {
            ip: vec![10, 0, 0, 1],
            mask: vec![255, 255],
        });
        Device {
            peers: vec![peer],
            ..device(name)
        }
    }

    fn service(mock: MockDeviceControl) -> DeviceService {
        DeviceService::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_list_skips_unconvertible_device() {
        let mut mock = MockDeviceControl::new();
        mock.expect_devices()
            .times(1)
            .returning(|| Ok(vec![device("wg0"), malformed_device("wg1")]));

        let listing = service(mock).list_devices().await.unwrap();
        assert_eq!(listing.devices.len(), 1);
        assert_eq!(listing.devices[0].name, "wg0");
        assert_eq!(listing.skipped.len(), 1);
        assert_eq!(listing.skipped[0].0, "wg1");
        assert!(matches!(listing.skipped[0].1, WgControlError::Internal(_)));
    }

    #[tokio::test]
    async fn test_list_reports_skipped_on_the_wire() {
        let mut mock = MockDeviceControl::new();
        mock.expect_devices()
            .returning(|| Ok(vec![malformed_device("wg1"), device("wg0")]));

        let response = WireGuard::devices(&service(mock), Request::new(proto::DevicesRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.devices.len(), 1);
        assert_eq!(response.skipped[0].name, "wg1");
        assert!(!response.skipped[0].reason.is_empty());
    }

    #[tokio::test]
    async fn test_list_native_failure_is_an_error() {
        let mut mock = MockDeviceControl::new();
        mock.expect_devices()
            .times(1)
            .returning(|| Err(WgControlError::Unavailable("no backend".to_string())));

        let err = service(mock).list_devices().await.unwrap_err();
        assert!(matches!(err, WgControlError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_get_device_empty_name() {
        let mut mock = MockDeviceControl::new();
        mock.expect_device().times(0);

        let err = service(mock).get_device("").await.unwrap_err();
        assert!(matches!(err, WgControlError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_get_device_not_found_propagates() {
        let mut mock = MockDeviceControl::new();
        mock.expect_device()
            .withf(|name| name == "wg9")
            .times(1)
            .returning(|name| Err(WgControlError::NotFound(format!("device '{}'", name))));

        let status = WireGuard::device(
            &service(mock),
            Request::new(proto::DeviceRequest {
                name: "wg9".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_get_device_malformed_is_internal() {
        let mut mock = MockDeviceControl::new();
        mock.expect_device()
            .returning(|name| Ok(malformed_device(name)));

        let err = service(mock).get_device("wg1").await.unwrap_err();
        assert!(matches!(err, WgControlError::Internal(_)));
    }

    #[tokio::test]
    async fn test_configure_empty_name_never_reaches_native_layer() {
        let mut mock = MockDeviceControl::new();
        mock.expect_configure_device().times(0);

        let config = proto::Config {
            replace_peers: true,
            ..Default::default()
        };
        let status = WireGuard::configure_device(
            &service(mock),
            Request::new(proto::ConfigureDeviceRequest {
                name: String::new(),
                config: Some(config),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_configure_invalid_delta_never_reaches_native_layer() {
        let mut mock = MockDeviceControl::new();
        mock.expect_configure_device().times(0);

        let config = proto::Config {
            private_key: Some(vec![1, 2, 3]),
            ..Default::default()
        };
        let err = service(mock)
            .configure_device("wg0", Some(&config))
            .await
            .unwrap_err();
        assert!(matches!(err, WgControlError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_configure_passes_translated_delta() {
        let key = PrivateKey::generate().public_key();
        let mut mock = MockDeviceControl::new();
        mock.expect_configure_device()
            .withf(move |name, config| {
                name == "wg0"
                    && config.replace_peers
                    && config.listen_port.is_none()
                    && config.peers.len() == 1
                    && config.peers[0].public_key == key
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let config = proto::Config {
            replace_peers: true,
            peers: vec![proto::PeerConfig {
                public_key: key.as_bytes().to_vec(),
                ..Default::default()
            }],
            ..Default::default()
        };
        service(mock)
            .configure_device("wg0", Some(&config))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_configure_native_error_propagates() {
        let mut mock = MockDeviceControl::new();
        mock.expect_configure_device()
            .returning(|_, _| Err(WgControlError::PermissionDenied("operation not permitted".to_string())));

        let err = service(mock).configure_device("wg0", None).await.unwrap_err();
        assert!(matches!(err, WgControlError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_close_releases_handle_once() {
        let mut mock = MockDeviceControl::new();
        mock.expect_close().times(1).returning(|| Ok(()));

        let service = service(mock);
        service.close().await.unwrap();
        service.close().await.unwrap();
    }
}
