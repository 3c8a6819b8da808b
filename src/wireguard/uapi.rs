//! Userspace device control
//!
//! Talks to userspace WireGuard implementations (wireguard-go, boringtun)
//! through the cross-platform configuration protocol: one Unix socket per
//! interface under `/var/run/wireguard`, a `get=1` or `set=1` request made
//! of `key=value` lines, and a reply terminated by `errno=N` and an empty
//! line.

use crate::config::validation::validate_interface_name;
use crate::error::{Result, WgControlError};
use crate::wireguard::{
    Config, Device, DeviceControl, DeviceKind, IpNet, Peer, PresharedKey, PrivateKey, PublicKey,
};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Directory where userspace implementations create their sockets
pub const DEFAULT_SOCKET_DIR: &str = "/var/run/wireguard";

/// Upper bound for one request/reply exchange with a device
const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Device control over the userspace configuration protocol
#[derive(Debug, Clone)]
pub struct UapiClient {
    socket_dir: PathBuf,
}

impl UapiClient {
    /// Open device control rooted at `socket_dir`.
    ///
    /// A missing directory is fine (no userspace devices yet); a directory
    /// that cannot be read is not.
    pub fn open<P: AsRef<Path>>(socket_dir: P) -> Result<Self> {
        let socket_dir = socket_dir.as_ref().to_path_buf();
        match std::fs::read_dir(&socket_dir) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Socket directory {:?} does not exist yet", socket_dir);
            }
            Err(e) => {
                return Err(WgControlError::from_io(
                    format!("open socket directory {:?}", socket_dir),
                    e,
                ));
            }
        }
        Ok(Self { socket_dir })
    }

    fn socket_path(&self, name: &str) -> Result<PathBuf> {
        validate_interface_name(name)?;
        Ok(self.socket_dir.join(format!("{}.sock", name)))
    }

    async fn interface_names(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.socket_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(WgControlError::from_io(
                    format!("list {:?}", self.socket_dir),
                    e,
                ))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WgControlError::from_io(format!("list {:?}", self.socket_dir), e))?
        {
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(".sock")) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Send one request and collect the reply lines up to `errno=`
    async fn exchange(&self, name: &str, request: &str) -> Result<Vec<String>> {
        let path = self.socket_path(name)?;
        let context = format!("device '{}'", name);

        match timeout(IO_TIMEOUT, round_trip(&path, request)).await {
            Ok(result) => result.map_err(|e| WgControlError::from_io(&context, e)),
            Err(_) => Err(WgControlError::Unavailable(format!(
                "{}: no reply within {:?}",
                context, IO_TIMEOUT
            ))),
        }
    }
}

async fn round_trip(path: &Path, request: &str) -> io::Result<Vec<String>> {
    let stream = UnixStream::connect(path).await?;
    let (reader, mut writer) = stream.into_split();
    writer.write_all(request.as_bytes()).await?;
    writer.flush().await?;

    let mut reader = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before errno",
            ));
        }
        let line = line.trim_end();
        if let Some(errno) = line.strip_prefix("errno=") {
            let errno: i32 = errno.parse().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, format!("bad errno '{}'", errno))
            })?;
            if errno != 0 {
                return Err(io::Error::from_raw_os_error(errno));
            }
            return Ok(lines);
        }
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
}

/// Build the device snapshot from a `get=1` reply
pub fn parse_get_reply(name: &str, lines: &[String]) -> Result<Device> {
    let mut device = Device {
        name: name.to_string(),
        kind: DeviceKind::userspace(),
        ..Default::default()
    };
    let mut handshake_sec = 0u64;
    let mut handshake_nsec = 0u32;

    fn finish_peer(device: &mut Device, peer: &mut Option<Peer>, sec: &mut u64, nsec: &mut u32) {
        if let Some(mut peer) = peer.take() {
            if *sec != 0 || *nsec != 0 {
                peer.last_handshake_time =
                    Some(SystemTime::UNIX_EPOCH + Duration::new(*sec, *nsec));
            }
            device.peers.push(peer);
        }
        *sec = 0;
        *nsec = 0;
    }

    let mut peer: Option<Peer> = None;
    for line in lines {
        let (key, value) = line.split_once('=').ok_or_else(|| {
            WgControlError::Internal(format!("device '{}': malformed line '{}'", name, line))
        })?;
        let invalid = |what: &str| {
            WgControlError::Internal(format!(
                "device '{}': invalid {} '{}'",
                name, what, value
            ))
        };

        if key == "public_key" {
            finish_peer(&mut device, &mut peer, &mut handshake_sec, &mut handshake_nsec);
            let public_key = PublicKey::from_hex(value).map_err(|_| invalid("public_key"))?;
            peer = Some(Peer::new(public_key));
            continue;
        }

        match (peer.as_mut(), key) {
            (None, "private_key") => {
                let key = PrivateKey::from_hex(value).map_err(|_| invalid(key))?;
                device.public_key = Some(key.public_key());
                device.private_key = Some(key);
            }
            (None, "listen_port") => {
                device.listen_port = value.parse().map_err(|_| invalid(key))?;
            }
            (None, "fwmark") => {
                device.firewall_mark = value.parse().map_err(|_| invalid(key))?;
            }
            (Some(p), "preshared_key") => {
                let psk = PresharedKey::from_hex(value).map_err(|_| invalid(key))?;
                p.preshared_key = (!psk.is_zero()).then_some(psk);
            }
            (Some(p), "endpoint") => {
                let addr: SocketAddr = value.parse().map_err(|_| invalid(key))?;
                p.endpoint = Some(addr);
            }
            (Some(p), "persistent_keepalive_interval") => {
                let secs: u64 = value.parse().map_err(|_| invalid(key))?;
                p.persistent_keepalive_interval = (secs != 0).then(|| Duration::from_secs(secs));
            }
            (Some(_), "last_handshake_time_sec") => {
                handshake_sec = value.parse().map_err(|_| invalid(key))?;
            }
            (Some(_), "last_handshake_time_nsec") => {
                handshake_nsec = value.parse().map_err(|_| invalid(key))?;
            }
            (Some(p), "rx_bytes") => p.receive_bytes = value.parse().map_err(|_| invalid(key))?,
            (Some(p), "tx_bytes") => p.transmit_bytes = value.parse().map_err(|_| invalid(key))?,
            (Some(p), "protocol_version") => {
                p.protocol_version = value.parse().map_err(|_| invalid(key))?;
            }
            (Some(p), "allowed_ip") => {
                p.allowed_ips
                    .push(IpNet::from_cidr(value).map_err(|_| invalid(key))?);
            }
            _ => debug!(device = %name, key, "Ignoring unknown key"),
        }
    }
    finish_peer(&mut device, &mut peer, &mut handshake_sec, &mut handshake_nsec);

    Ok(device)
}

/// Render a configuration change as a `set=1` request.
///
/// Fails before anything is sent if the change contains a malformed
/// allowed IP, so a device never sees half a change.
pub fn render_set_request(config: &Config) -> Result<String> {
    let mut lines = vec!["set=1".to_string()];

    if let Some(key) = &config.private_key {
        lines.push(format!("private_key={}", key.to_hex().as_str()));
    }
    if let Some(port) = config.listen_port {
        lines.push(format!("listen_port={}", port));
    }
    if let Some(mark) = config.firewall_mark {
        lines.push(format!("fwmark={}", mark));
    }
    if config.replace_peers {
        lines.push("replace_peers=true".to_string());
    }

    for peer in &config.peers {
        lines.push(format!("public_key={}", peer.public_key.to_hex()));
        if peer.remove {
            lines.push("remove=true".to_string());
            continue;
        }
        if peer.update_only {
            lines.push("update_only=true".to_string());
        }
        if let Some(psk) = &peer.preshared_key {
            lines.push(format!("preshared_key={}", psk.to_hex().as_str()));
        }
        if let Some(endpoint) = peer.endpoint {
            lines.push(format!("endpoint={}", endpoint));
        }
        if let Some(interval) = peer.persistent_keepalive_interval {
            lines.push(format!(
                "persistent_keepalive_interval={}",
                keepalive_secs(interval)
            ));
        }
        if peer.replace_allowed_ips {
            lines.push("replace_allowed_ips=true".to_string());
        }
        for ip in &peer.allowed_ips {
            let (addr, prefix) = ip.prefix().ok_or_else(|| {
                WgControlError::InvalidArgument(format!(
                    "peer {}: invalid allowed IP {}",
                    peer.public_key, ip
                ))
            })?;
            lines.push(format!("allowed_ip={}/{}", addr, prefix));
        }
    }

    let mut req = lines.join("\n");
    req.push_str("\n\n");
    Ok(req)
}

/// Whole seconds on the protocol; a fraction rounds up so a non-zero
/// interval never reads as "disabled"
fn keepalive_secs(interval: Duration) -> u64 {
    interval.as_secs() + u64::from(interval.subsec_nanos() != 0)
}

#[async_trait]
impl DeviceControl for UapiClient {
    async fn devices(&self) -> Result<Vec<Device>> {
        let mut devices = Vec::new();
        for name in self.interface_names().await? {
            match self.device(&name).await {
                Ok(device) => devices.push(device),
                // Stale socket left behind by an implementation that exited
                Err(WgControlError::Unavailable(e)) => {
                    warn!(device = %name, "Skipping unreachable device: {}", e);
                }
                Err(WgControlError::InvalidArgument(e)) => {
                    debug!("Skipping socket with invalid interface name: {}", e);
                }
                // Socket removed after the directory was read
                Err(WgControlError::NotFound(e)) => {
                    debug!(device = %name, "Skipping vanished device: {}", e);
                }
                Err(WgControlError::Internal(e)) => {
                    warn!(device = %name, "Skipping device with malformed state: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(devices)
    }

    async fn device(&self, name: &str) -> Result<Device> {
        let lines = self.exchange(name, "get=1\n\n").await?;
        parse_get_reply(name, &lines)
    }

    async fn configure_device(&self, name: &str, config: Config) -> Result<()> {
        let request = render_set_request(&config)?;
        self.exchange(name, &request).await?;
        debug!(device = %name, peers = config.peers.len(), "Configuration sent");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Each exchange uses its own connection; nothing stays open.
        Ok(())
    }
}
