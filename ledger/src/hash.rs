//! # Hashing Utilities
//!
//! One hash function, used everywhere: SHA-256, hex-encoded. Block hashes,
//! content hashes, and the chain linkage all speak lowercase hex, so the
//! digest helpers here return `String` rather than raw bytes — the hex
//! form *is* the canonical form in this ledger (the difficulty predicate
//! counts hex characters, and pre-images embed predecessor hashes as hex).

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of `data` and return it as a lowercase
/// hex string (64 characters).
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Returns `true` if the first `difficulty` characters of `hash_hex` are
/// all `'0'`. Difficulty 0 is satisfied by any string, including an
/// empty one — a zero-difficulty chain accepts every hash.
pub fn meets_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    hash_hex
        .chars()
        .take(difficulty as usize)
        .filter(|c| *c == '0')
        .count()
        == difficulty as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string — the test vector everyone should
        // have memorized by now.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_deterministic() {
        let a = sha256_hex(b"attest");
        let b = sha256_hex(b"attest");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn sha256_is_case_sensitive() {
        assert_ne!(sha256_hex(b"attest"), sha256_hex(b"Attest"));
    }

    #[test]
    fn zero_difficulty_accepts_anything() {
        assert!(meets_difficulty("ffff", 0));
        assert!(meets_difficulty("", 0));
    }

    #[test]
    fn difficulty_counts_leading_zeros() {
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("0ab0", 2));
        assert!(!meets_difficulty("a0ab", 1));
    }

    #[test]
    fn difficulty_longer_than_hash_fails() {
        // A 4-char string cannot carry 5 leading zeros.
        assert!(!meets_difficulty("0000", 5));
    }
}
