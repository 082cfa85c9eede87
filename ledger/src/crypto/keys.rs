//! # Keys and Addresses
//!
//! secp256k1 keypairs and the 20-byte addresses derived from them. An
//! address is the low 20 bytes of `BLAKE3(uncompressed_public_key)`, so
//! holding a secret key is the only way to produce signatures that recover
//! to a given address.
//!
//! The all-zero address is reserved as a sentinel: nothing can sign for it,
//! recipients must never be it, and the claim escape hatch uses it to mean
//! "base balance" rather than a real account.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::config::{ADDRESS_LENGTH, SECRET_KEY_LENGTH};
use crate::crypto::hash::blake3_hash;

/// Errors from key material handling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyError {
    /// The bytes are not a valid secp256k1 secret key (zero, or not below
    /// the curve order).
    #[error("invalid secret key material")]
    InvalidSecretKey,

    /// Wrong number of bytes for the key type.
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    /// The hex string did not decode.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The reserved sentinel address. Not derivable from any keypair.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// True for the reserved sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Derives the address of a public key: the low 20 bytes of the BLAKE3
    /// digest of the uncompressed point, SEC1 prefix byte stripped.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let uncompressed = public_key.serialize_uncompressed();
        let digest = blake3_hash(&uncompressed[1..]);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[32 - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Returns the hex-encoded address.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded address.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Addresses key every balance, allowance, and nonce table. JSON map keys
// must be strings, so addresses serialize as hex.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// A secp256k1 keypair for signing ledger authorizations.
///
/// Deliberately does not implement `Serialize`: secret keys leave this
/// struct only through the explicit [`secret_bytes`](Self::secret_bytes)
/// accessor, never by accident through a derive.
#[derive(Clone)]
pub struct CrestKeypair {
    secret: SecretKey,
    public: PublicKey,
}

impl CrestKeypair {
    /// Generates a fresh keypair from the operating system RNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut rand::rngs::OsRng);
        Self { secret, public }
    }

    /// Reconstructs a keypair from 32 secret bytes. Deterministic, so the
    /// same bytes always yield the same address.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(KeyError::InvalidLength {
                expected: SECRET_KEY_LENGTH,
                got: bytes.len(),
            });
        }
        let secret = SecretKey::from_slice(bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        let secp = Secp256k1::new();
        let public = PublicKey::from_secret_key(&secp, &secret);
        Ok(Self { secret, public })
    }

    /// Reconstructs a keypair from a hex-encoded secret key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s)?;
        Self::from_secret_bytes(&bytes)
    }

    /// Returns the raw secret key bytes. Handle with care.
    pub fn secret_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.secret.secret_bytes()
    }

    /// Returns the secp256k1 secret key for signing.
    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Returns the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Returns the address derived from the public key.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public)
    }
}

// Never print the secret half, not even in debug logs.
impl fmt::Debug for CrestKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CrestKeypair(address={})", self.address())
    }
}

// Two keypairs are the same keypair iff they share a public key.
impl PartialEq for CrestKeypair {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
    }
}

impl Eq for CrestKeypair {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_distinct_keypairs() {
        let a = CrestKeypair::generate();
        let b = CrestKeypair::generate();
        assert_ne!(a, b);
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn test_deterministic_from_secret_bytes() {
        let seed = [7u8; 32];
        let a = CrestKeypair::from_secret_bytes(&seed).unwrap();
        let b = CrestKeypair::from_secret_bytes(&seed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.address(), b.address());
        assert_eq!(a.secret_bytes(), seed);
    }

    #[test]
    fn test_hex_roundtrip() {
        let original = CrestKeypair::generate();
        let restored = CrestKeypair::from_hex(&hex::encode(original.secret_bytes())).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn rejects_wrong_length_secret() {
        let err = CrestKeypair::from_secret_bytes(&[1u8; 16]).unwrap_err();
        assert_eq!(
            err,
            KeyError::InvalidLength {
                expected: 32,
                got: 16
            }
        );
    }

    #[test]
    fn rejects_all_zero_secret() {
        // Zero is not a valid scalar on secp256k1.
        let err = CrestKeypair::from_secret_bytes(&[0u8; 32]).unwrap_err();
        assert_eq!(err, KeyError::InvalidSecretKey);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let keypair = CrestKeypair::from_secret_bytes(&[42u8; 32]).unwrap();
        let rendered = format!("{keypair:?}");
        assert!(rendered.contains("address="));
        assert!(!rendered.contains(&hex::encode(keypair.secret_bytes())));
    }

    #[test]
    fn derived_addresses_are_never_zero() {
        let keypair = CrestKeypair::from_secret_bytes(&[9u8; 32]).unwrap();
        assert!(!keypair.address().is_zero());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn address_hex_roundtrip() {
        let addr = CrestKeypair::generate().address();
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
    }

    #[test]
    fn address_rejects_wrong_length_hex() {
        assert!(Address::from_hex("abcd").is_err());
        assert!(Address::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn address_serializes_as_hex_string() {
        let addr = CrestKeypair::from_secret_bytes(&[3u8; 32]).unwrap().address();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn address_works_as_json_map_key() {
        use std::collections::HashMap;

        let addr = CrestKeypair::from_secret_bytes(&[5u8; 32]).unwrap().address();
        let mut map = HashMap::new();
        map.insert(addr, 1234u64);

        let json = serde_json::to_string(&map).unwrap();
        let back: HashMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&addr), Some(&1234));
    }
}
