//! # Error Taxonomy
//!
//! One enum for every way a ledger operation can refuse to proceed. Precise
//! failure modes matter here: a caller retrying an expired authorization is
//! wasting its time, while one retrying after a nonce race should resign and
//! resubmit. The variants carry enough context (who, how much, which window)
//! for the caller to tell these situations apart without string matching.
//!
//! Validation everywhere is check-then-write: by the time any state mutates,
//! every check has already passed, so a returned error always means nothing
//! changed.

use thiserror::Error;

use crate::crypto::keys::Address;
use crate::types::{Amount, AuthorizationHash, LedgerId, Marker, Nonce, Timestamp};

/// Everything that can go wrong while operating on a ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// An internal consistency rule was broken. Seeing this in the wild
    /// means a bug in the host sequencing or in this crate, not bad input.
    #[error("invariant violation: {detail}")]
    InvariantViolation { detail: String },

    /// A balance or supply update would exceed the `u64` range.
    #[error("arithmetic overflow: {current} + {increment} exceeds u64 range")]
    Overflow { current: Amount, increment: Amount },

    /// The debited account does not hold enough value.
    #[error("insufficient balance for {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        requested: Amount,
    },

    /// The spender's allowance does not cover the requested amount.
    #[error(
        "insufficient allowance from {owner} to {spender}: available {available}, requested {requested}"
    )]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        available: Amount,
        requested: Amount,
    },

    /// Transfers are administratively disabled and the caller is not the
    /// controller.
    #[error("transfers are disabled on this ledger")]
    TransfersDisabled,

    /// The recipient is the zero address or the ledger's own identity.
    #[error("invalid recipient {to}: must not be the zero address or the ledger itself")]
    InvalidRecipient { to: Address },

    /// The signature does not verify, or it recovers to a signer other than
    /// the claimed owner.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The allowance authorization carries a stale or future nonce.
    #[error("invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: Nonce, got: Nonce },

    /// The signed validity window has already closed.
    #[error("authorization expired: deadline {deadline}, current time {now}")]
    Expired { deadline: Timestamp, now: Timestamp },

    /// The signed validity window has not opened yet.
    #[error("authorization not yet valid: opens after {valid_after}, current time {now}")]
    NotYetValid {
        valid_after: Timestamp,
        now: Timestamp,
    },

    /// The transfer authorization's hash was already consumed by this owner.
    #[error("authorization {hash} already used by {owner}")]
    AuthorizationReused {
        owner: Address,
        hash: AuthorizationHash,
    },

    /// A restricted operation was attempted by someone other than the
    /// controller.
    #[error("caller {caller} is not authorized for this operation")]
    Unauthorized { caller: Address },

    /// No ledger with this id exists in the universe.
    #[error("unknown ledger {id}")]
    UnknownLedger { id: LedgerId },
}

impl LedgerError {
    /// Shorthand for the invariant-violation variant, which otherwise gets
    /// noisy at call sites.
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            detail: detail.into(),
        }
    }

    /// Invariant helper for writes landing at or before a fork boundary.
    pub fn write_before_fork(marker: Marker, fork_marker: Marker) -> Self {
        Self::invariant(format!(
            "write at marker {marker} would not be after fork boundary {fork_marker}"
        ))
    }
}
