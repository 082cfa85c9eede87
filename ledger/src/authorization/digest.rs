//! # Signing Digests
//!
//! Canonical 32-byte digests for the two signed authorization flows. Two
//! layers of separation keep a signature from ever meaning more than the
//! signer intended:
//!
//! - a **domain separator** binds the digest to one specific ledger (its
//!   name, its domain version, and its unique id), so an authorization for
//!   a fork is worthless on the parent and vice versa;
//! - a **flow descriptor** is used as the BLAKE3 derivation context, so an
//!   allowance digest and a transfer digest over byte-identical fields are
//!   unrelated values.
//!
//! All numeric fields are encoded fixed-width big-endian, which makes the
//! preimage injective without separators.

use crate::crypto::hash::{blake3_hash_multi, domain_separated_hash};
use crate::crypto::keys::Address;
use crate::types::{Amount, AuthorizationHash, LedgerId, Nonce, Timestamp};

/// Derivation context for allowance-granting authorizations.
///
/// The field list is part of the string on purpose: changing the message
/// layout without changing the descriptor would be a silent compatibility
/// break, and this makes it loud.
pub const ALLOWANCE_DESCRIPTOR: &str =
    "crest.authorization.allowance.v1(owner,spender,amount,nonce,deadline)";

/// Derivation context for direct transfer authorizations.
pub const TRANSFER_DESCRIPTOR: &str =
    "crest.authorization.transfer.v1(from,to,value,valid_after,valid_before,authorization_hash)";

// ---------------------------------------------------------------------------
// SigningDomain
// ---------------------------------------------------------------------------

/// The per-ledger signing domain separator.
///
/// `BLAKE3(name || 0x00 || version || 0x00 || ledger_id)`. Signers derive
/// it from metadata they already know; verifiers derive it from the ledger
/// they are applying the authorization to. If the two disagree, the
/// signature simply fails to recover the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningDomain {
    separator: [u8; 32],
}

impl SigningDomain {
    /// Builds the domain separator for a ledger.
    pub fn new(name: &str, version: &str, ledger_id: &LedgerId) -> Self {
        let separator = blake3_hash_multi(&[
            name.as_bytes(),
            &[0x00],
            version.as_bytes(),
            &[0x00],
            ledger_id.as_bytes(),
        ]);
        Self { separator }
    }

    /// The raw 32-byte separator.
    pub fn separator(&self) -> &[u8; 32] {
        &self.separator
    }
}

// ---------------------------------------------------------------------------
// Message digests
// ---------------------------------------------------------------------------

/// Digest an owner signs to grant `spender` an allowance of `amount`,
/// consuming `nonce`, valid through `deadline` inclusive.
pub fn allowance_digest(
    domain: &SigningDomain,
    owner: &Address,
    spender: &Address,
    amount: Amount,
    nonce: Nonce,
    deadline: Timestamp,
) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(32 + 20 + 20 + 8 * 3);
    preimage.extend_from_slice(domain.separator());
    preimage.extend_from_slice(owner.as_bytes());
    preimage.extend_from_slice(spender.as_bytes());
    preimage.extend_from_slice(&amount.to_be_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    preimage.extend_from_slice(&deadline.to_be_bytes());
    domain_separated_hash(ALLOWANCE_DESCRIPTOR, &preimage)
}

/// Digest an owner signs to push `value` to `to` within the exclusive
/// window `(valid_after, valid_before)`, identified by `authorization_hash`.
pub fn transfer_digest(
    domain: &SigningDomain,
    from: &Address,
    to: &Address,
    value: Amount,
    valid_after: Timestamp,
    valid_before: Timestamp,
    authorization_hash: &AuthorizationHash,
) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(32 + 20 + 20 + 8 * 3 + 32);
    preimage.extend_from_slice(domain.separator());
    preimage.extend_from_slice(from.as_bytes());
    preimage.extend_from_slice(to.as_bytes());
    preimage.extend_from_slice(&value.to_be_bytes());
    preimage.extend_from_slice(&valid_after.to_be_bytes());
    preimage.extend_from_slice(&valid_before.to_be_bytes());
    preimage.extend_from_slice(authorization_hash.as_bytes());
    domain_separated_hash(TRANSFER_DESCRIPTOR, &preimage)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
