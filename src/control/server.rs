//! Control server
//!
//! Serves the WireGuard control service over gRPC on a TCP socket, with
//! mutual TLS unless insecure mode was explicitly requested. The native
//! device-control handle is released once the server has drained.

use crate::config::ServerConfig;
use crate::control::service::DeviceService;
use crate::control::tls::ServerMtlsConfig;
use crate::error::{Result, WgControlError};
use crate::proto::wire_guard_server::WireGuardServer;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info, warn};

/// Control server owns the listening socket configuration and the service
pub struct ControlServer {
    config: ServerConfig,
    service: Arc<DeviceService>,
    tls: Option<ServerMtlsConfig>,
}

impl ControlServer {
    /// Create a new control server
    pub fn new(config: ServerConfig, service: Arc<DeviceService>) -> Self {
        Self {
            config,
            service,
            tls: None,
        }
    }

    /// Use the given credentials instead of loading the configured files
    pub fn with_tls(mut self, tls: ServerMtlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_address();
        TcpListener::bind(&addr).await.map_err(|e| {
            WgControlError::Transport(format!("Failed to bind {}: {}", addr, e))
        })
    }

    /// Bind, then serve until `shutdown` resolves.
    ///
    /// The device-control handle is released on every exit path.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        match self.bind().await {
            Ok(listener) => self.serve(listener, shutdown).await,
            Err(e) => {
                release(&self.service).await;
                Err(e)
            }
        }
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let service = self.service.clone();
        let result = self.serve_until(listener, shutdown).await;
        release(&service).await;
        result
    }

    async fn serve_until<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr: SocketAddr = listener.local_addr()?;

        let mut builder = Server::builder().timeout(self.config.request_timeout());
        if self.config.insecure {
            warn!("Serving WITHOUT transport security; use only for testing");
        } else {
            let tls = match self.tls {
                Some(tls) => tls,
                None => ServerMtlsConfig::from_files(&self.config.tls)?,
            };
            builder = builder
                .tls_config(tls.to_tonic_config()?)
                .map_err(|e| WgControlError::Tls(e.to_string()))?;
            info!("Mutual TLS enabled; client certificates are required");
        }

        info!("Control server listening on {}", local_addr);

        let result = builder
            .add_service(WireGuardServer::from_arc(self.service.clone()))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await;

        info!("Control server stopped accepting requests");
        result.map_err(WgControlError::from)
    }
}

async fn release(service: &DeviceService) {
    if let Err(e) = service.close().await {
        error!("Failed to close device control: {}", e);
    }
}
