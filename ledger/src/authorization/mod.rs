//! # Authorization Engine
//!
//! Domain-separated signing digests and the two signed payload types built
//! on them. Signing happens off-band with [`crate::crypto::CrestKeypair`];
//! submission happens through [`crate::registry::Universe`], by anyone.

pub mod digest;
pub mod engine;

pub use digest::{allowance_digest, transfer_digest, SigningDomain};
pub use engine::{AllowanceAuthorization, TransferAuthorization};
