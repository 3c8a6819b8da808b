//! wg-control: remote control of WireGuard devices
//!
//! This library exposes the devices of a host to remote callers over a
//! mutually authenticated gRPC channel. Callers can list devices, fetch the
//! full state of one device, and push configuration changes to it.
//!
//! # Architecture
//!
//! Calls flow from the transport through the device-control service and
//! the wire/native adapter into a device-control backend, and back. The
//! WireGuard protocol itself is implemented by the devices; this crate only
//! configures them and reports on them.
//!
//! # Modules
//!
//! - `config`: Server and client settings, change documents, validation
//! - `control`: Adapter, service, and gRPC transport
//! - `proto`: Wire schema and generated service stubs
//! - `wireguard`: Native device model, keys, and device-control backends
//! - `security`: Privilege checks at startup
//! - `error`: Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod control;
pub mod error;
pub mod proto;
pub mod security;
pub mod wireguard;

// Re-export commonly used types
pub use error::{Result, WgControlError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
