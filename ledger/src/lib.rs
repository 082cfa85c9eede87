// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Crest — Checkpointed Ledger Core
//!
//! A fungible-value ledger that never forgets. Every balance and the total
//! supply are stored as checkpoint histories indexed by a monotonic sequence
//! marker, so any past state is a binary search away. Ledgers fork: a child
//! mirrors its parent's balances as of a chosen marker without copying a
//! single entry, then evolves on its own. And balance-affecting operations
//! can be authorized off-band with a recoverable secp256k1 signature, with
//! strict replay protection in two flavors.
//!
//! ## Architecture
//!
//! Leaf-first, the modules are:
//!
//! - **checkpoint** — the append-only (marker, value) history primitive.
//! - **ledger** — one ledger's state: balances, supply, controller policy,
//!   allowances, and replay-protection state.
//! - **registry** — the [`Universe`]: the explicit context owning every
//!   ledger, the marker sequence, the clock, and fork delegation.
//! - **authorization** — domain-separated digests and the two signed
//!   operation flows (nonce-ordered allowances, single-use-hash transfers).
//! - **crypto** — BLAKE3 hashing, keypairs, addresses, recoverable ECDSA.
//! - **error** — the one [`LedgerError`] taxonomy every operation speaks.
//! - **config** — compile-time constants.
//!
//! ## Design Philosophy
//!
//! 1. Checkpoints are forever. Failed operations leave no trace at all.
//! 2. No ambient state — a [`Universe`] is a value you construct and own.
//! 3. Signatures come from a vetted curve library, never from here.
//! 4. If it touches value, it has tests. Plural.

pub mod authorization;
pub mod checkpoint;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod types;

pub use authorization::{AllowanceAuthorization, SigningDomain, TransferAuthorization};
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use crypto::{Address, CrestKeypair, CrestSignature};
pub use error::LedgerError;
pub use ledger::{ForkPoint, Ledger, LedgerMetadata};
pub use registry::{Clock, ForkOptions, SharedUniverse, Universe};
pub use types::{Amount, AuthorizationHash, LedgerId, Marker, Nonce, Timestamp};
