//! # Cryptographic Primitives
//!
//! The crypto toolbox for the ledger: BLAKE3 hashing, secp256k1 keypairs
//! with derived 20-byte addresses, and recoverable ECDSA signatures. No
//! cryptography is implemented here -- these modules wrap audited crates
//! behind the narrow API the ledger actually needs.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, blake3_hash_multi, domain_separated_hash};
pub use keys::{Address, CrestKeypair, KeyError};
pub use signatures::{recover_signer, sign_digest, verify_signer, CrestSignature, SignatureError};
