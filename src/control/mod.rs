//! Remote control of WireGuard devices
//!
//! This module exposes device control over gRPC: the adapter between wire
//! messages and the native model, the service that validates and delegates
//! calls, and the mutually authenticated server and client transports.

pub mod adapter;
mod client;
mod report;
mod server;
mod service;
mod tls;

pub use client::ControlClient;
pub use report::{DeviceReport, PeerReport};
pub use server::ControlServer;
pub use service::{DeviceListing, DeviceService};
pub use tls::{ClientMtlsConfig, ServerMtlsConfig};
