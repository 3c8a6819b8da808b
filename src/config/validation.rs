//! Input validation functions
//!
//! Checks shared by the configuration files, the JSON change documents and
//! the device-control backends: interface names, hosts, endpoints and
//! timeouts.

use crate::error::{Result, WgControlError};
use std::net::{SocketAddr, ToSocketAddrs};

/// Longest interface name the kernel accepts (IFNAMSIZ - 1)
pub const MAX_INTERFACE_NAME: usize = 15;

/// Validate interface name (alphanumeric, max 15 chars)
pub fn validate_interface_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(WgControlError::InvalidArgument(
            "Interface name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_INTERFACE_NAME {
        return Err(WgControlError::InvalidArgument(format!(
            "Interface name '{}' exceeds maximum length of {} characters",
            name, MAX_INTERFACE_NAME
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        || name == "."
        || name == ".."
    {
        return Err(WgControlError::InvalidArgument(format!(
            "Interface name '{}' contains invalid characters (only alphanumeric, '_', '-' and '.' allowed)",
            name.escape_default()
        )));
    }

    Ok(())
}

/// Validate a host to listen on or connect to
pub fn validate_host(host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(WgControlError::Config("Host cannot be empty".to_string()));
    }
    if host.contains(char::is_whitespace) || host.contains('/') {
        return Err(WgControlError::Config(format!("Invalid host: {}", host)));
    }
    Ok(())
}

/// Validate a timeout given in seconds
pub fn validate_timeout(field: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(WgControlError::Config(format!(
            "{} must be at least 1 second",
            field
        )));
    }
    if secs > 3600 {
        return Err(WgControlError::Config(format!(
            "{} of {} seconds is too long (maximum 3600)",
            field, secs
        )));
    }
    Ok(())
}

/// Parse a peer endpoint (`ip:port`, `[ipv6%zone]:port` or `host:port`)
pub fn parse_endpoint(endpoint: &str) -> Result<SocketAddr> {
    if let Ok(addr) = endpoint.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let (host, port) = endpoint.rsplit_once(':').ok_or_else(|| {
        WgControlError::InvalidArgument(format!(
            "Invalid endpoint format: {} (expected format: host:port)",
            endpoint
        ))
    })?;
    if host.is_empty() {
        return Err(WgControlError::InvalidArgument(
            "Host cannot be empty in endpoint".to_string(),
        ));
    }
    let port: u16 = port.parse().map_err(|_| {
        WgControlError::InvalidArgument(format!("Invalid port in endpoint: {}", endpoint))
    })?;

    (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            WgControlError::InvalidArgument(format!("Cannot resolve endpoint {}: {}", endpoint, e))
        })?
        .next()
        .ok_or_else(|| {
            WgControlError::InvalidArgument(format!("Endpoint {} has no addresses", endpoint))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_interface_name() {
        assert!(validate_interface_name("wg0").is_ok());
        assert!(validate_interface_name("wg-test").is_ok());
        assert!(validate_interface_name("wg_test").is_ok());
        assert!(validate_interface_name("wg0.100").is_ok());
        assert!(validate_interface_name("").is_err());
        assert!(validate_interface_name("wg@test").is_err());
        assert!(validate_interface_name("toolonginterfacename").is_err());
        assert!(validate_interface_name("..").is_err());
        assert!(validate_interface_name("../wg0").is_err());
    }

    #[test]
    fn test_interface_name_error_kind() {
        let err = validate_interface_name("").unwrap_err();
        assert!(matches!(err, WgControlError::InvalidArgument(_)));
    }

    #[test]
    fn test_validate_host() {
        assert!(validate_host("localhost").is_ok());
        assert!(validate_host("0.0.0.0").is_ok());
        assert!(validate_host("::1").is_ok());
        assert!(validate_host("").is_err());
        assert!(validate_host("bad host").is_err());
    }

    #[test]
    fn test_validate_timeout() {
        assert!(validate_timeout("t", 5).is_ok());
        assert!(validate_timeout("t", 0).is_err());
        assert!(validate_timeout("t", 3601).is_err());
    }

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            parse_endpoint("192.168.1.1:51820").unwrap(),
            "192.168.1.1:51820".parse().unwrap()
        );
        assert!(parse_endpoint("[::1]:51820").unwrap().is_ipv6());
        assert_eq!(parse_endpoint("localhost:51820").unwrap().port(), 51820);
        assert!(parse_endpoint("invalid").is_err());
        assert!(parse_endpoint(":51820").is_err());
        assert!(parse_endpoint("example.com:notaport").is_err());
    }
}
