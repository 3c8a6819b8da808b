//! WireGuard key management
//!
//! This module handles generation, parsing, and encoding of WireGuard
//! keys. Raw keys are always exactly 32 bytes; base64 is used for humans
//! and hex for the userspace configuration protocol.

use crate::error::{Result, WgControlError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::fmt;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Length of every WireGuard key in bytes
pub const KEY_LEN: usize = 32;

fn key_from_slice(kind: &str, bytes: &[u8]) -> Result<[u8; KEY_LEN]> {
    <[u8; KEY_LEN]>::try_from(bytes).map_err(|_| {
        WgControlError::InvalidArgument(format!(
            "Invalid {} length: expected {} bytes, got {}",
            kind,
            KEY_LEN,
            bytes.len()
        ))
    })
}

fn key_from_base64(kind: &str, s: &str) -> Result<[u8; KEY_LEN]> {
    let decoded = Zeroizing::new(BASE64.decode(s.trim()).map_err(|e| {
        WgControlError::InvalidArgument(format!("Invalid base64 {}: {}", kind, e))
    })?);
    key_from_slice(kind, &decoded)
}

fn key_from_hex(kind: &str, s: &str) -> Result<[u8; KEY_LEN]> {
    let s = s.trim();
    if s.len() != KEY_LEN * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WgControlError::InvalidArgument(format!(
            "Invalid hex {}: expected {} hex digits",
            kind,
            KEY_LEN * 2
        )));
    }

    let mut bytes = [0u8; KEY_LEN];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16).map_err(|e| {
            WgControlError::InvalidArgument(format!("Invalid hex {}: {}", kind, e))
        })?;
    }
    Ok(bytes)
}

/// Lowercase hex, two digits per byte
pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(char::from(DIGITS[usize::from(b >> 4)]));
        out.push(char::from(DIGITS[usize::from(b & 0x0f)]));
    }
    out
}

/// WireGuard private key (32 bytes, x25519)
#[derive(Clone)]
pub struct PrivateKey {
    secret: Zeroizing<[u8; KEY_LEN]>,
}

impl PrivateKey {
    /// Generate a new random private key
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(rand::rngs::OsRng);
        Self {
            secret: Zeroizing::new(secret.to_bytes()),
        }
    }

    /// Create a private key from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            secret: Zeroizing::new(bytes),
        }
    }

    /// Create a private key from a slice that must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        key_from_slice("private key", bytes).map(Self::from_bytes)
    }

    /// Parse a private key from base64-encoded string
    pub fn from_base64(s: &str) -> Result<Self> {
        key_from_base64("private key", s).map(Self::from_bytes)
    }

    /// Parse a private key from hex-encoded string
    pub fn from_hex(s: &str) -> Result<Self> {
        key_from_hex("private key", s).map(Self::from_bytes)
    }

    /// Convert to base64-encoded string
    pub fn to_base64(&self) -> String {
        BASE64.encode(*self.secret)
    }

    /// Convert to hex-encoded string
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(encode_hex(&*self.secret))
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(*self.secret);
        let public = X25519PublicKey::from(&secret);
        PublicKey {
            key: public.to_bytes(),
        }
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.secret
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        *self.secret == *other.secret
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

// Ensure private keys are never accidentally logged
impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Symmetric preshared key mixed into the handshake of one peer
#[derive(Clone)]
pub struct PresharedKey {
    secret: Zeroizing<[u8; KEY_LEN]>,
}

impl PresharedKey {
    /// Generate a new random preshared key
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        rand::rngs::OsRng.fill_bytes(&mut bytes[..]);
        Self { secret: bytes }
    }

    /// Create a preshared key from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            secret: Zeroizing::new(bytes),
        }
    }

    /// Create a preshared key from a slice that must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        key_from_slice("preshared key", bytes).map(Self::from_bytes)
    }

    /// Parse a preshared key from base64-encoded string
    pub fn from_base64(s: &str) -> Result<Self> {
        key_from_base64("preshared key", s).map(Self::from_bytes)
    }

    /// Parse a preshared key from hex-encoded string
    pub fn from_hex(s: &str) -> Result<Self> {
        key_from_hex("preshared key", s).map(Self::from_bytes)
    }

    /// Convert to hex-encoded string
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(encode_hex(&*self.secret))
    }

    /// The all-zero key, which devices treat as "no preshared key"
    pub fn is_zero(&self) -> bool {
        self.secret.iter().all(|b| *b == 0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.secret
    }
}

impl PartialEq for PresharedKey {
    fn eq(&self, other: &Self) -> bool {
        *self.secret == *other.secret
    }
}

impl Eq for PresharedKey {}

impl fmt::Debug for PresharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PresharedKey([REDACTED])")
    }
}

/// WireGuard public key (32 bytes, x25519)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey {
    key: [u8; KEY_LEN],
}

impl PublicKey {
    /// Create a public key from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { key: bytes }
    }

    /// Create a public key from a slice that must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        key_from_slice("public key", bytes).map(Self::from_bytes)
    }

    /// Parse a public key from base64-encoded string
    pub fn from_base64(s: &str) -> Result<Self> {
        key_from_base64("public key", s).map(Self::from_bytes)
    }

    /// Parse a public key from hex-encoded string
    pub fn from_hex(s: &str) -> Result<Self> {
        key_from_hex("public key", s).map(Self::from_bytes)
    }

    /// Convert to base64-encoded string
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.key)
    }

    /// Convert to hex-encoded string
    pub fn to_hex(&self) -> String {
        encode_hex(&self.key)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

/// WireGuard key pair (private + public)
#[derive(Clone)]
pub struct KeyPair {
    /// Private key
    pub private: PrivateKey,
    /// Public key (derived from private)
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_private(PrivateKey::generate())
    }

    /// Create a key pair from a private key
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private", &"[REDACTED]")
            .field("public", &self.public)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keypair() {
        let keypair = KeyPair::generate();
        assert_eq!(keypair.private.as_bytes().len(), KEY_LEN);
        assert_eq!(keypair.public, keypair.private.public_key());
    }

    #[test]
    fn test_private_key_to_base64() {
        let private = PrivateKey::generate();
        let base64_str = private.to_base64();
        assert_eq!(base64_str.len(), 44); // Base64 of 32 bytes
    }

    #[test]
    fn test_private_key_from_base64() {
        let private = PrivateKey::generate();
        let restored = PrivateKey::from_base64(&private.to_base64()).unwrap();
        assert_eq!(private, restored);
    }

    #[test]
    fn test_hex_round_trip() {
        let public = PrivateKey::generate().public_key();
        assert_eq!(public.to_hex().len(), 64);
        assert_eq!(PublicKey::from_hex(&public.to_hex()).unwrap(), public);

        let private = PrivateKey::generate();
        assert_eq!(PrivateKey::from_hex(&private.to_hex()).unwrap(), private);
    }

    #[test]
    fn test_hex_rejects_malformed_input() {
        let valid = PrivateKey::generate().public_key().to_hex();
        assert!(PublicKey::from_hex(&valid[..62]).is_err());
        assert!(PublicKey::from_hex(&format!("{}00", valid)).is_err());
        assert!(PublicKey::from_hex(&format!("zz{}", &valid[2..])).is_err());
        assert!(PublicKey::from_hex(&format!("+f{}", &valid[2..])).is_err());
        assert_eq!(
            PublicKey::from_hex(&valid.to_uppercase()).unwrap().to_hex(),
            valid
        );
        assert_eq!(encode_hex(&[0x00, 0x0f, 0xa5, 0xff]), "000fa5ff");
    }

    #[test]
    fn test_known_public_key_derivation() {
        // RFC 7748 section 6.1 test vector (Alice)
        let private = PrivateKey::from_hex(
            "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a",
        )
        .unwrap();
        assert_eq!(
            private.public_key().to_hex(),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
    }

    #[test]
    fn test_private_key_not_logged() {
        let private = PrivateKey::generate();
        let debug_str = format!("{:?}", private);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains(&private.to_base64()));
        assert_eq!(format!("{}", private), "[REDACTED]");
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(PublicKey::from_slice(&[0u8; 31]).is_err());
        assert!(PublicKey::from_slice(&[]).is_err());
        assert!(PrivateKey::from_slice(&[0u8; 33]).is_err());
        assert!(PresharedKey::from_slice(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_preshared_key_zero() {
        assert!(PresharedKey::from_bytes([0u8; KEY_LEN]).is_zero());
        assert!(!PresharedKey::generate().is_zero());
    }

    #[test]
    fn test_invalid_base64() {
        assert!(PrivateKey::from_base64("invalid!@#$").is_err());
    }

    #[test]
    fn test_invalid_length() {
        let short_key = BASE64.encode([0u8; 16]);
        assert!(PrivateKey::from_base64(&short_key).is_err());
    }
}
