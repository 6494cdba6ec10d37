//! # SHA-256 Hashing
//!
//! Hex-encoded SHA-256 digests. Digests travel through the system as
//! lowercase hex strings because every wire payload and ledger field is
//! text; keeping one encoding end to end avoids conversion drift.

use sha2::{Digest, Sha256};

/// SHA-256 digest of `data`, lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA-256 digest over the concatenation of string parts, lowercase hex.
///
/// Equivalent to hashing `parts.concat()` but without building the
/// intermediate string.
pub fn sha256_concat_hex(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // NIST test vector for "abc".
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(sha256_hex(b"delegate"), sha256_hex(b"delegate"));
        assert_ne!(sha256_hex(b"delegate"), sha256_hex(b"delegates"));
    }

    #[test]
    fn test_concat_matches_joined_input() {
        let joined = sha256_hex(b"leftright");
        let parts = sha256_concat_hex(&["left", "right"]);
        assert_eq!(joined, parts);
    }
}
