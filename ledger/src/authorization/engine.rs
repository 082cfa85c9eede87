//! # Signed Authorizations
//!
//! The two off-band payloads an owner can sign and hand to anyone for
//! submission. Neither requires the owner to be the caller; the signature
//! is the authority.
//!
//! [`AllowanceAuthorization`] grants a spending allowance and is replay
//! protected by a strictly ordered per-owner nonce: authorizations must be
//! consumed in exactly the order they were numbered, and skipping one
//! invalidates it forever once a later nonce lands.
//!
//! [`TransferAuthorization`] pushes value directly and is replay protected
//! by a caller-chosen hash that each owner can consume once, in any order,
//! inside an exclusive time window.
//!
//! Validation here covers the signature-level rules (windows, nonce
//! equality, replay state, signer recovery). Ledger-level rules -- the
//! transfers-enabled gate, recipient checks, balance sufficiency -- are
//! applied by [`Universe`](crate::registry::Universe) when the
//! authorization is submitted.

use serde::{Deserialize, Serialize};

use crate::authorization::digest::{allowance_digest, transfer_digest, SigningDomain};
use crate::crypto::keys::{Address, CrestKeypair};
use crate::crypto::signatures::{sign_digest, verify_signer, CrestSignature, SignatureError};
use crate::error::LedgerError;
use crate::types::{Amount, AuthorizationHash, Nonce, Timestamp};

// ---------------------------------------------------------------------------
// Allowance authorization
// ---------------------------------------------------------------------------

/// A signed grant of spending allowance (consumed in nonce order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceAuthorization {
    /// The granting account; must match the recovered signer.
    pub owner: Address,
    /// The account being granted the allowance.
    pub spender: Address,
    /// Allowance to set. Zero is a valid grant (it revokes) and still
    /// consumes the nonce.
    pub amount: Amount,
    /// Must equal the owner's current counter at submission time.
    pub nonce: Nonce,
    /// Last Unix second at which this authorization may be applied
    /// (inclusive).
    pub deadline: Timestamp,
    /// Recoverable signature over the canonical digest.
    pub signature: CrestSignature,
}

impl AllowanceAuthorization {
    /// Builds and signs an allowance authorization as `keypair`'s account.
    pub fn sign(
        keypair: &CrestKeypair,
        domain: &SigningDomain,
        spender: Address,
        amount: Amount,
        nonce: Nonce,
        deadline: Timestamp,
    ) -> Result<Self, SignatureError> {
        let owner = keypair.address();
        let digest = allowance_digest(domain, &owner, &spender, amount, nonce, deadline);
        let signature = sign_digest(keypair, &digest)?;
        Ok(Self {
            owner,
            spender,
            amount,
            nonce,
            deadline,
            signature,
        })
    }

    /// The digest this authorization signs under `domain`.
    pub fn digest(&self, domain: &SigningDomain) -> [u8; 32] {
        allowance_digest(
            domain,
            &self.owner,
            &self.spender,
            self.amount,
            self.nonce,
            self.deadline,
        )
    }

    /// Checks the signature-level rules: deadline, nonce equality, and
    /// signer recovery, in that order.
    pub fn validate(
        &self,
        domain: &SigningDomain,
        now: Timestamp,
        expected_nonce: Nonce,
    ) -> Result<(), LedgerError> {
        if now > self.deadline {
            return Err(LedgerError::Expired {
                deadline: self.deadline,
                now,
            });
        }
        if self.nonce != expected_nonce {
            return Err(LedgerError::InvalidNonce {
                expected: expected_nonce,
                got: self.nonce,
            });
        }
        self.verify_signature(domain)
    }

    fn verify_signature(&self, domain: &SigningDomain) -> Result<(), LedgerError> {
        let digest = self.digest(domain);
        if verify_signer(&digest, &self.signature, &self.owner) {
            Ok(())
        } else {
            Err(LedgerError::InvalidSignature)
        }
    }
}

// ---------------------------------------------------------------------------
// Transfer authorization
// ---------------------------------------------------------------------------

/// A signed push payment (consumed by hash, in any order, once).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAuthorization {
    /// The paying account; must match the recovered signer.
    pub from: Address,
    /// The receiving account.
    pub to: Address,
    /// Amount to move. Zero is valid and still consumes the hash.
    pub value: Amount,
    /// The window opens strictly after this Unix second.
    pub valid_after: Timestamp,
    /// The window closes strictly before this Unix second.
    pub valid_before: Timestamp,
    /// Owner-scoped single-use identifier.
    pub authorization_hash: AuthorizationHash,
    /// Recoverable signature over the canonical digest.
    pub signature: CrestSignature,
}

impl TransferAuthorization {
    /// Builds and signs a transfer authorization as `keypair`'s account.
    #[allow(clippy::too_many_arguments)]
    pub fn sign(
        keypair: &CrestKeypair,
        domain: &SigningDomain,
        to: Address,
        value: Amount,
        valid_after: Timestamp,
        valid_before: Timestamp,
        authorization_hash: AuthorizationHash,
    ) -> Result<Self, SignatureError> {
        let from = keypair.address();
        let digest = transfer_digest(
            domain,
            &from,
            &to,
            value,
            valid_after,
            valid_before,
            &authorization_hash,
        );
        let signature = sign_digest(keypair, &digest)?;
        Ok(Self {
            from,
            to,
            value,
            valid_after,
            valid_before,
            authorization_hash,
            signature,
        })
    }

    /// The digest this authorization signs under `domain`.
    pub fn digest(&self, domain: &SigningDomain) -> [u8; 32] {
        transfer_digest(
            domain,
            &self.from,
            &self.to,
            self.value,
            self.valid_after,
            self.valid_before,
            &self.authorization_hash,
        )
    }

    /// Checks the signature-level rules: window bounds (both strictly
    /// exclusive), replay state, and signer recovery, in that order.
    pub fn validate(
        &self,
        domain: &SigningDomain,
        now: Timestamp,
        already_used: bool,
    ) -> Result<(), LedgerError> {
        if now <= self.valid_after {
            return Err(LedgerError::NotYetValid {
                valid_after: self.valid_after,
                now,
            });
        }
        if now >= self.valid_before {
            return Err(LedgerError::Expired {
                deadline: self.valid_before,
                now,
            });
        }
        if already_used {
            return Err(LedgerError::AuthorizationReused {
                owner: self.from,
                hash: self.authorization_hash,
            });
        }
        self.verify_signature(domain)
    }

    fn verify_signature(&self, domain: &SigningDomain) -> Result<(), LedgerError> {
        let digest = self.digest(domain);
        if verify_signer(&digest, &self.signature, &self.from) {
            Ok(())
        } else {
            Err(LedgerError::InvalidSignature)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
