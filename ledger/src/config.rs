//! # Ledger Configuration
//!
//! Compile-time constants for the whole crate. Everything tunable lives
//! here so that a reviewer can audit the numbers in one sitting instead of
//! hunting magic literals through the tree.

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Crate-level semantic version, surfaced by tooling and snapshots.
pub const CREST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version string mixed into every signing domain separator.
///
/// Bump this and every previously signed authorization becomes invalid
/// against the new domain. That is the point: it is the kill switch for a
/// flawed digest layout.
pub const SIGNING_DOMAIN_VERSION: &str = "1";

// ---------------------------------------------------------------------------
// Value semantics
// ---------------------------------------------------------------------------

/// Default display decimals for newly created ledgers.
///
/// Purely cosmetic metadata. The engine itself only ever sees integer
/// smallest units.
pub const DEFAULT_DECIMALS: u8 = 8;

// ---------------------------------------------------------------------------
// Forking
// ---------------------------------------------------------------------------

/// Maximum length of a parent chain.
///
/// Historical reads walk the chain iteratively, so this bounds both the
/// read cost and the memory a pathological fork-of-fork-of-fork setup can
/// make every query pay. Thirty-two generations is far beyond anything a
/// sane deployment produces.
pub const MAX_FORK_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Cryptography
// ---------------------------------------------------------------------------

/// secp256k1 secret key length in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Account address length in bytes (low 20 bytes of a BLAKE3 digest).
pub const ADDRESS_LENGTH: usize = 20;

/// Recoverable signature length in bytes: 64-byte compact form plus one
/// recovery id byte.
pub const SIGNATURE_LENGTH: usize = 65;

/// BLAKE3 output length in bytes.
pub const HASH_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Sanity tests
// ---------------------------------------------------------------------------
