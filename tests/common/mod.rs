//! Shared helpers for the integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wg_control::config::ServerConfig;
use wg_control::control::{ControlServer, DeviceService, ServerMtlsConfig};
use wg_control::wireguard::MemoryDeviceControl;

/// A control server running in the background on 127.0.0.1
pub struct TestServer {
    pub addr: SocketAddr,
    pub control: Arc<MemoryDeviceControl>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<wg_control::Result<()>>>,
}

impl TestServer {
    /// Start a server over the given devices; insecure when `tls` is None
    pub async fn start(control: MemoryDeviceControl, tls: Option<ServerMtlsConfig>) -> Self {
        let control = Arc::new(control);
        let service = Arc::new(DeviceService::new(control.clone()));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: addr.port(),
            insecure: tls.is_none(),
            ..Default::default()
        };
        let mut server = ControlServer::new(config, service);
        if let Some(tls) = tls {
            server = server.with_tls(tls);
        }

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(listener, async {
            let _ = rx.await;
        }));

        Self {
            addr,
            control,
            shutdown: Some(tx),
            task: Some(task),
        }
    }

    /// Stop the server and wait for it to drain
    pub async fn stop(mut self) -> wg_control::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.take() {
            Some(task) => task.await.expect("Server task panicked"),
            None => Ok(()),
        }
    }
}
