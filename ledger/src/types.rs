//! # Core Types
//!
//! The small vocabulary the rest of the crate speaks: sequence markers,
//! amounts, nonces, timestamps, and the two 32-byte identifiers
//! ([`LedgerId`] and [`AuthorizationHash`]).
//!
//! All quantities are unsigned 64-bit integers. Amounts are smallest units
//! (no floating point, ever), markers are the host's monotonic sequence
//! numbers, and timestamps are Unix seconds. Keeping everything `u64` means
//! checkpoint entries are two machine words and overflow checks are a single
//! `checked_add`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::crypto::hash::blake3_hash;
use crate::crypto::keys::Address;

/// Monotonically increasing sequence marker (block-height analog).
///
/// Markers index historical checkpoints. They are assigned by the host's
/// sequencing mechanism, not by the ledger itself.
pub type Marker = u64;

/// A value amount in smallest units.
pub type Amount = u64;

/// Per-owner strictly ordered counter for allowance authorizations.
pub type Nonce = u64;

/// Unix-second timestamp used in signed validity windows.
pub type Timestamp = u64;

// ---------------------------------------------------------------------------
// LedgerId
// ---------------------------------------------------------------------------

/// A unique, content-addressed identifier for a ledger.
///
/// Computed as `BLAKE3(sequence || name || symbol || parent_id?)` with
/// `0x00` separators. The universe's creation sequence number is part of the
/// preimage, so two ledgers with identical metadata still get distinct ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerId([u8; 32]);

impl LedgerId {
    /// Creates a `LedgerId` from a raw 32-byte hash.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded id.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded id.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Derives a `LedgerId` from a ledger's canonical creation properties.
    ///
    /// The hash input is the concatenation of:
    /// - `sequence` (big-endian u64, the universe's creation counter)
    /// - `0x00` separator
    /// - `name` (UTF-8 bytes)
    /// - `0x00` separator
    /// - `symbol` (UTF-8 bytes)
    /// - `0x00` separator and the parent's 32-byte id, for forks
    ///
    /// The separators prevent ambiguity when one field's suffix matches
    /// another field's prefix.
    pub fn derive(sequence: u64, name: &str, symbol: &str, parent: Option<&LedgerId>) -> Self {
        let mut preimage = Vec::with_capacity(name.len() + symbol.len() + 44);
        preimage.extend_from_slice(&sequence.to_be_bytes());
        preimage.push(0x00);
        preimage.extend_from_slice(name.as_bytes());
        preimage.push(0x00);
        preimage.extend_from_slice(symbol.as_bytes());
        if let Some(parent) = parent {
            preimage.push(0x00);
            preimage.extend_from_slice(parent.as_bytes());
        }

        Self(blake3_hash(&preimage))
    }

    /// The ledger's account-space identity: the low 20 bytes of the id.
    ///
    /// This is the address checked by the self-transfer guard and used by
    /// the claim escape hatch. It has no corresponding keypair, so nothing
    /// can ever sign on the ledger's behalf.
    pub fn address(&self) -> Address {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&self.0[12..32]);
        Address::from_bytes(bytes)
    }
}

impl fmt::Debug for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerId({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for LedgerId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Ledger ids key the universe's ledger table, and JSON requires map keys to
// be strings. Serializing as hex keeps snapshots readable and round-trippable.
impl Serialize for LedgerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for LedgerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// AuthorizationHash
// ---------------------------------------------------------------------------

/// Caller-chosen 32-byte identifier for a transfer authorization.
///
/// Unlike the nonce counter, these are unordered: each owner may consume
/// their hashes in any order, but each hash exactly once. The bytes carry no
/// meaning to the engine -- signers typically pick them at random or derive
/// them from an invoice reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthorizationHash([u8; 32]);

impl AuthorizationHash {
    /// Creates an `AuthorizationHash` from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded hash.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded hash.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Derives a hash from arbitrary reference data (an invoice id, an
    /// order number). Convenience for signers who want reproducible
    /// identifiers instead of random ones.
    pub fn derive(data: &[u8]) -> Self {
        Self(blake3_hash(data))
    }

    /// A fresh random hash from the thread RNG.
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Debug for AuthorizationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorizationHash({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for AuthorizationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for AuthorizationHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AuthorizationHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
