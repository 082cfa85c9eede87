//! # Recoverable Signatures
//!
//! ECDSA over secp256k1 in recoverable form: 64 compact bytes plus one
//! recovery id byte. Verification never needs the public key up front --
//! we recover the signer's address from the signature itself and compare
//! it to the claimed owner. That keeps signed authorizations small and
//! lets anyone relay them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};

use crate::config::SIGNATURE_LENGTH;
use crate::crypto::keys::{Address, CrestKeypair};

/// Errors from signature encoding and recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignatureError {
    /// Wrong number of bytes for a recoverable signature.
    #[error("invalid signature length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    /// The recovery id byte is outside the valid `0..=3` range.
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// The signature does not recover to any public key for this digest.
    #[error("signature does not recover to a valid public key")]
    RecoveryFailed,

    /// The signing digest was not exactly 32 bytes.
    #[error("signing digest must be exactly 32 bytes")]
    InvalidDigest,

    /// The hex string did not decode.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

// ---------------------------------------------------------------------------
// CrestSignature
// ---------------------------------------------------------------------------

/// A 65-byte recoverable signature: `r || s || recovery_id`.
#[derive(Clone, PartialEq, Eq)]
pub struct CrestSignature {
    bytes: Vec<u8>,
}

impl CrestSignature {
    /// Wraps raw signature bytes, validating length and recovery id range.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(SignatureError::InvalidLength {
                expected: SIGNATURE_LENGTH,
                got: bytes.len(),
            });
        }
        let recovery_id = bytes[SIGNATURE_LENGTH - 1];
        if recovery_id > 3 {
            return Err(SignatureError::InvalidRecoveryId(recovery_id));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Returns the full 65-byte encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the 64-byte compact `r || s` portion.
    pub fn compact(&self) -> &[u8] {
        &self.bytes[..SIGNATURE_LENGTH - 1]
    }

    /// Returns the recovery id byte.
    pub fn recovery_id(&self) -> u8 {
        self.bytes[SIGNATURE_LENGTH - 1]
    }

    /// Returns the hex-encoded signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parses a hex-encoded signature.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for CrestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CrestSignature({}...)", &self.to_hex()[..12])
    }
}

impl Serialize for CrestSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CrestSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Signing and recovery
// ---------------------------------------------------------------------------

/// Signs a 32-byte digest, producing a recoverable signature.
pub fn sign_digest(
    keypair: &CrestKeypair,
    digest: &[u8; 32],
) -> Result<CrestSignature, SignatureError> {
    let message = Message::from_slice(digest).map_err(|_| SignatureError::InvalidDigest)?;
    let secp = Secp256k1::new();
    let signature = secp.sign_ecdsa_recoverable(&message, keypair.secret_key());
    let (recovery_id, compact) = signature.serialize_compact();

    let mut bytes = Vec::with_capacity(SIGNATURE_LENGTH);
    bytes.extend_from_slice(&compact);
    bytes.push(recovery_id.to_i32() as u8);
    Ok(CrestSignature { bytes })
}

/// Recovers the signer's address from a digest and its signature.
///
/// A success only proves that someone holding *some* key signed this exact
/// digest. Callers must still compare the result against the address they
/// expected; a tampered signature recovers to a different, essentially
/// random address rather than failing outright.
pub fn recover_signer(
    digest: &[u8; 32],
    signature: &CrestSignature,
) -> Result<Address, SignatureError> {
    let message = Message::from_slice(digest).map_err(|_| SignatureError::InvalidDigest)?;
    let recovery_id = RecoveryId::from_i32(signature.recovery_id() as i32)
        .map_err(|_| SignatureError::InvalidRecoveryId(signature.recovery_id()))?;
    let recoverable = RecoverableSignature::from_compact(signature.compact(), recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    let secp = Secp256k1::new();
    let public_key = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(Address::from_public_key(&public_key))
}

/// True iff the signature over this digest recovers to `expected`.
pub fn verify_signer(digest: &[u8; 32], signature: &CrestSignature, expected: &Address) -> bool {
    matches!(recover_signer(digest, signature), Ok(addr) if addr == *expected)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::blake3_hash;

    fn test_keypair() -> CrestKeypair {
        CrestKeypair::from_secret_bytes(&[11u8; 32]).unwrap()
    }

    #[test]
    fn test_sign_and_recover() {
        let keypair = test_keypair();
        let digest = blake3_hash(b"authorize something");

        let signature = sign_digest(&keypair, &digest).unwrap();
        let recovered = recover_signer(&digest, &signature).unwrap();
        assert_eq!(recovered, keypair.address());
        assert!(verify_signer(&digest, &signature, &keypair.address()));
    }

    #[test]
    fn different_digest_recovers_different_signer() {
        let keypair = test_keypair();
        let digest = blake3_hash(b"the signed message");
        let other = blake3_hash(b"a different message");

        let signature = sign_digest(&keypair, &digest).unwrap();
        assert!(!verify_signer(&other, &signature, &keypair.address()));
    }

    #[test]
    fn tampered_signature_does_not_verify() {
        let keypair = test_keypair();
        let digest = blake3_hash(b"payload");

        let signature = sign_digest(&keypair, &digest).unwrap();
        let mut bytes = signature.as_bytes().to_vec();
        bytes[10] ^= 0xff;

        // Depending on where the flip lands, recovery either errors out or
        // yields a stranger's address. Both must fail verification.
        match CrestSignature::from_bytes(&bytes) {
            Ok(tampered) => assert!(!verify_signer(&digest, &tampered, &keypair.address())),
            Err(_) => {}
        }
    }

    #[test]
    fn signature_from_wrong_key_recovers_wrong_address() {
        let signer = test_keypair();
        let impostor = CrestKeypair::from_secret_bytes(&[12u8; 32]).unwrap();
        let digest = blake3_hash(b"payload");

        let signature = sign_digest(&impostor, &digest).unwrap();
        assert!(!verify_signer(&digest, &signature, &signer.address()));
        assert!(verify_signer(&digest, &signature, &impostor.address()));
    }

    #[test]
    fn test_hex_roundtrip() {
        let keypair = test_keypair();
        let digest = blake3_hash(b"roundtrip");
        let signature = sign_digest(&keypair, &digest).unwrap();

        let restored = CrestSignature::from_hex(&signature.to_hex()).unwrap();
        assert_eq!(restored, signature);
        assert_eq!(restored.as_bytes().len(), SIGNATURE_LENGTH);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = CrestSignature::from_bytes(&[0u8; 64]).unwrap_err();
        assert_eq!(
            err,
            SignatureError::InvalidLength {
                expected: 65,
                got: 64
            }
        );
    }

    #[test]
    fn rejects_out_of_range_recovery_id() {
        let mut bytes = [0u8; 65];
        bytes[64] = 4;
        let err = CrestSignature::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, SignatureError::InvalidRecoveryId(4));
    }

    #[test]
    fn debug_is_truncated() {
        let keypair = test_keypair();
        let digest = blake3_hash(b"debug");
        let signature = sign_digest(&keypair, &digest).unwrap();

        let rendered = format!("{signature:?}");
        assert!(rendered.starts_with("CrestSignature("));
        assert!(rendered.len() < signature.to_hex().len());
    }

    #[test]
    fn serializes_as_hex_string() {
        let keypair = test_keypair();
        let digest = blake3_hash(b"serde");
        let signature = sign_digest(&keypair, &digest).unwrap();

        let json = serde_json::to_string(&signature).unwrap();
        let back: CrestSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signature);
    }
}
