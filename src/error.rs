//! Error types for wg-control
//!
//! This module defines the error types used throughout the application.
//! We use `thiserror` for ergonomic error definitions and `anyhow` for
//! error propagation in application code.
//!
//! The first five variants form the taxonomy reported to remote callers;
//! they map one-to-one onto gRPC status codes.

use std::io;
use thiserror::Error;
use tonic::{Code, Status};

/// Main error type for wg-control operations
#[derive(Error, Debug)]
pub enum WgControlError {
    /// Malformed input: empty identifier, bad key length, out-of-range value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Device does not exist or is not a WireGuard device
    #[error("Not found: {0}")]
    NotFound(String),

    /// Device control cannot be opened or enumerated
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Insufficient rights to read or write device state
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Unexpected translation or protocol failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential material could not be loaded or used
    #[error("TLS error: {0}")]
    Tls(String),

    /// Connection establishment or RPC transport failures
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using WgControlError
pub type Result<T> = std::result::Result<T, WgControlError>;

impl WgControlError {
    /// Classify an I/O error raised while talking to a device.
    ///
    /// The original error text is kept in the message so it still shows up
    /// in logs after classification.
    pub fn from_io(context: impl std::fmt::Display, err: io::Error) -> Self {
        let msg = format!("{}: {}", context, err);
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(msg),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(msg),
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => {
                Self::InvalidArgument(msg)
            }
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
            | io::ErrorKind::UnexpectedEof => Self::Unavailable(msg),
            _ => match err.raw_os_error() {
                Some(libc::ENODEV) | Some(libc::ENXIO) => Self::NotFound(msg),
                Some(libc::EPERM) | Some(libc::EACCES) => Self::PermissionDenied(msg),
                Some(libc::EINVAL) | Some(libc::EPROTO) => Self::InvalidArgument(msg),
                _ => Self::Unavailable(msg),
            },
        }
    }

    /// gRPC status code reported for this error
    pub fn code(&self) -> Code {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) => Code::InvalidArgument,
            Self::NotFound(_) => Code::NotFound,
            Self::Unavailable(_) | Self::Transport(_) | Self::Io(_) => Code::Unavailable,
            Self::PermissionDenied(_) => Code::PermissionDenied,
            Self::Internal(_) | Self::Tls(_) => Code::Internal,
        }
    }
}

impl From<WgControlError> for Status {
    fn from(err: WgControlError) -> Self {
        let message = match &err {
            WgControlError::InvalidArgument(m)
            | WgControlError::NotFound(m)
            | WgControlError::Unavailable(m)
            | WgControlError::PermissionDenied(m)
            | WgControlError::Internal(m) => m.clone(),
            other => other.to_string(),
        };
        Status::new(err.code(), message)
    }
}

impl From<Status> for WgControlError {
    fn from(status: Status) -> Self {
        let msg = status.message().to_string();
        match status.code() {
            Code::InvalidArgument | Code::OutOfRange | Code::FailedPrecondition => {
                Self::InvalidArgument(msg)
            }
            Code::NotFound => Self::NotFound(msg),
            Code::PermissionDenied | Code::Unauthenticated => Self::PermissionDenied(msg),
            Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
                Self::Unavailable(msg)
            }
            _ => Self::Internal(msg),
        }
    }
}

impl From<tonic::transport::Error> for WgControlError {
    fn from(err: tonic::transport::Error) -> Self {
        WgControlError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for WgControlError {
    fn from(err: serde_json::Error) -> Self {
        WgControlError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for WgControlError {
    fn from(err: toml::de::Error) -> Self {
        WgControlError::Config(err.to_string())
    }
}
