//! # Hashing
//!
//! BLAKE3 everywhere. It is fast on every target we care about, has no
//! length-extension weirdness, and ships a keyed derivation mode that gives
//! us domain separation without hand-rolling prefix schemes.
//!
//! Three entry points: plain hashing for content-derived identifiers,
//! multi-part hashing for preimages assembled from several fields, and
//! domain-separated hashing for anything a key will ever sign.

/// Computes the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hashes several byte slices as one continuous stream.
///
/// Equivalent to hashing the concatenation, without allocating the
/// concatenated buffer. Callers that need field boundaries to be
/// unambiguous must include their own separators in the parts.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Computes a domain-separated hash using BLAKE3's key derivation mode.
///
/// The same input under two different domain strings produces unrelated
/// outputs, which is what keeps a signature over an allowance from ever
/// being replayable as a signature over a transfer. Domain strings should
/// be globally unique and never change once signatures exist against them.
pub fn domain_separated_hash(domain: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(domain);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_deterministic() {
        let data = b"crest ledger";
        assert_eq!(blake3_hash(data), blake3_hash(data));
    }

    #[test]
    fn test_different_inputs_different_hashes() {
        assert_ne!(blake3_hash(b"input a"), blake3_hash(b"input b"));
    }

    #[test]
    fn multi_matches_concatenation() {
        let parts: [&[u8]; 3] = [b"one", b"two", b"three"];
        let concatenated = b"onetwothree";
        assert_eq!(blake3_hash_multi(&parts), blake3_hash(concatenated));
    }

    #[test]
    fn multi_without_separators_is_ambiguous() {
        // ["ab", "c"] and ["a", "bc"] hash identically. This is why every
        // preimage builder in this crate inserts 0x00 separators itself.
        let left: [&[u8]; 2] = [b"ab", b"c"];
        let right: [&[u8]; 2] = [b"a", b"bc"];
        assert_eq!(blake3_hash_multi(&left), blake3_hash_multi(&right));
    }

    #[test]
    fn domains_separate() {
        let data = b"same payload";
        let a = domain_separated_hash("crest.test.domain-a", data);
        let b = domain_separated_hash("crest.test.domain-b", data);
        assert_ne!(a, b);
        assert_ne!(a, blake3_hash(data));
    }

    #[test]
    fn domain_hash_is_deterministic() {
        let data = b"payload";
        assert_eq!(
            domain_separated_hash("crest.test.domain", data),
            domain_separated_hash("crest.test.domain", data)
        );
    }
}
