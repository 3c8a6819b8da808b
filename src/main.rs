//! wg-control main entry point
//!
//! This binary runs the control server or acts as its client. It handles
//! CLI parsing, logging setup, and settings assembly.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wg_control::config::{Backend, ClientConfig, DeltaDocument, FileConfig, ServerConfig};
use wg_control::control::{adapter, ControlClient, ControlServer, DeviceReport, DeviceService};
use wg_control::wireguard::{DeviceControl, KeyPair, MemoryDeviceControl};
use wg_control::{security, APP_NAME, VERSION};

/// Remote control of WireGuard devices
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (TOML with [server] and [client] sections)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve device control over gRPC
    Serve(ServeArgs),

    /// List all devices on the server host
    List(ConnectArgs),

    /// Show one device
    Show {
        /// Interface name
        name: String,
        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Apply a JSON change document to one device
    Configure {
        /// Interface name
        name: String,
        /// Path to the JSON change document
        file: PathBuf,
        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Generate a key pair
    Genkey,
}

/// Transport settings shared by server and client
#[derive(Args, Debug, Default)]
struct TransportArgs {
    /// Host to listen on / connect to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on / connect to
    #[arg(long)]
    port: Option<u16>,

    /// Disable transport security (testing only)
    #[arg(long)]
    insecure: bool,

    /// Path to the PEM certificate
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Path to the PEM private key
    #[arg(long)]
    key: Option<PathBuf>,

    /// Path to the PEM CA certificate
    #[arg(long)]
    ca: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    transport: TransportArgs,

    /// Device-control backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Directory holding userspace device sockets
    #[arg(long)]
    socket_dir: Option<PathBuf>,

    /// Device to create in the memory backend (repeatable)
    #[arg(long = "device")]
    devices: Vec<String>,
}

#[derive(Args, Debug, Default)]
struct ConnectArgs {
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize structured logging with tracing
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the CLI command
async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => serve(server_config(settings.server, args)?).await,
        Commands::List(connect) => {
            let client = connect_client(settings.client, connect.transport).await?;
            let response = client.list_devices().await?;
            let reports = response
                .devices
                .iter()
                .map(|d| adapter::device_from_wire(d).map(|d| DeviceReport::from(&d)))
                .collect::<wg_control::Result<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
            if !response.skipped.is_empty() {
                anyhow::bail!("{} device(s) could not be reported", response.skipped.len());
            }
            Ok(())
        }
        Commands::Show { name, connect } => {
            let client = connect_client(settings.client, connect.transport).await?;
            let device = adapter::device_from_wire(&client.device(&name).await?)?;
            println!("{}", serde_json::to_string_pretty(&DeviceReport::from(&device))?);
            Ok(())
        }
        Commands::Configure {
            name,
            file,
            connect,
        } => {
            let delta = DeltaDocument::from_file(&file)?.to_wire()?;
            let client = connect_client(settings.client, connect.transport).await?;
            client.configure_device(&name, delta).await?;
            info!("Configured device '{}'", name);
            Ok(())
        }
        Commands::Genkey => {
            let keys = KeyPair::generate();
            let out = serde_json::json!({
                "private_key": keys.private.to_base64(),
                "public_key": keys.public.to_base64(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}

fn server_config(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<ServerConfig> {
    let t = args.transport;
    if let Some(host) = t.host {
        config.host = host;
    }
    if let Some(port) = t.port {
        config.port = port;
    }
    config.insecure |= t.insecure;
    if let Some(cert) = t.cert {
        config.tls.cert = cert;
    }
    if let Some(key) = t.key {
        config.tls.key = key;
    }
    if let Some(ca) = t.ca {
        config.tls.ca = ca;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(dir) = args.socket_dir {
        config.socket_dir = dir;
    }
    config.memory_devices.extend(args.devices);
    config.validate()?;
    Ok(config)
}

fn client_config(mut config: ClientConfig, t: TransportArgs) -> anyhow::Result<ClientConfig> {
    if let Some(host) = t.host {
        config.host = host;
    }
    if let Some(port) = t.port {
        config.port = port;
    }
    config.insecure |= t.insecure;
    if let Some(cert) = t.cert {
        config.tls.cert = cert;
    }
    if let Some(key) = t.key {
        config.tls.key = key;
    }
    if let Some(ca) = t.ca {
        config.tls.ca = ca;
    }
    config.validate()?;
    Ok(config)
}

async fn connect_client(config: ClientConfig, t: TransportArgs) -> anyhow::Result<ControlClient> {
    let config = client_config(config, t)?;
    ControlClient::connect(&config)
        .await
        .with_context(|| format!("cannot reach {}", config.endpoint_uri()))
}

fn open_backend(config: &ServerConfig) -> anyhow::Result<Arc<dyn DeviceControl>> {
    match config.backend {
        Backend::Memory => {
            let control = config
                .memory_devices
                .iter()
                .fold(MemoryDeviceControl::new(), |control, name| control.with_device(name));
            info!(
                "Using in-memory device control with {} device(s)",
                config.memory_devices.len()
            );
            Ok(Arc::new(control))
        }
        #[cfg(unix)]
        Backend::Uapi => {
            let control = wg_control::wireguard::UapiClient::open(&config.socket_dir)
                .context("cannot open device control")?;
            info!("Using userspace device control in {:?}", config.socket_dir);
            Ok(Arc::new(control))
        }
        #[cfg(not(unix))]
        Backend::Uapi => anyhow::bail!("userspace device control is not available on this platform"),
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    info!("Starting {} v{}", APP_NAME, VERSION);
    security::startup_check();

    let control = open_backend(&config)?;
    let service = Arc::new(DeviceService::new(control));

    ControlServer::new(config, service)
        .run(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
