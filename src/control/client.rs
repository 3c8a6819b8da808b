//! Control client
//!
//! Dials the control server once and reuses the connection for every call;
//! gRPC multiplexes concurrent calls over the single HTTP/2 channel.

use crate::config::ClientConfig;
use crate::control::tls::ClientMtlsConfig;
use crate::error::{Result, WgControlError};
use crate::proto::{self, wire_guard_client::WireGuardClient};
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

/// Client for the WireGuard control service
#[derive(Debug, Clone)]
pub struct ControlClient {
    inner: WireGuardClient<Channel>,
}

impl ControlClient {
    /// Connect using the configured credential files
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let tls = if config.insecure {
            None
        } else {
            Some(ClientMtlsConfig::from_files(&config.tls, &config.host)?)
        };
        Self::connect_with(config, tls).await
    }

    /// Connect with the given credentials (`None` only in insecure mode)
    pub async fn connect_with(config: &ClientConfig, tls: Option<ClientMtlsConfig>) -> Result<Self> {
        let uri = config.endpoint_uri();
        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| WgControlError::Config(format!("Invalid server address {}: {}", uri, e)))?
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());

        match (config.insecure, tls) {
            (true, _) => warn!("Connecting WITHOUT transport security; use only for testing"),
            (false, Some(tls)) => {
                endpoint = endpoint
                    .tls_config(tls.to_tonic_config()?)
                    .map_err(|e| WgControlError::Tls(e.to_string()))?;
            }
            (false, None) => {
                return Err(WgControlError::Tls(
                    "credentials are required unless insecure mode is enabled".to_string(),
                ))
            }
        }

        debug!("Connecting to {}", uri);
        let channel = endpoint.connect().await.map_err(|e| {
            WgControlError::Unavailable(format!("Failed to connect to {}: {}", uri, e))
        })?;
        info!("Connected to {}", uri);

        Ok(Self {
            inner: WireGuardClient::new(channel),
        })
    }

    /// List every device on the server host
    pub async fn list_devices(&self) -> Result<proto::DevicesResponse> {
        let response = self
            .inner
            .clone()
            .devices(proto::DevicesRequest {})
            .await?
            .into_inner();
        for skipped in &response.skipped {
            warn!(device = %skipped.name, "Server skipped device: {}", skipped.reason);
        }
        Ok(response)
    }

    /// Fetch one device by name
    pub async fn device(&self, name: &str) -> Result<proto::Device> {
        self.inner
            .clone()
            .device(proto::DeviceRequest {
                name: name.to_string(),
            })
            .await?
            .into_inner()
            .device
            .ok_or_else(|| {
                WgControlError::Internal(format!("server returned no device for '{}'", name))
            })
    }

    /// Apply a configuration change to one device
    pub async fn configure_device(&self, name: &str, config: proto::Config) -> Result<()> {
        self.inner
            .clone()
            .configure_device(proto::ConfigureDeviceRequest {
                name: name.to_string(),
                config: Some(config),
            })
            .await?;
        Ok(())
    }
}
