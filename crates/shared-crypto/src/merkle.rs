//! # Merkle Aggregation
//!
//! Merkle root over an ordered sequence of hex digests. Pairs combine
//! left-to-right as `SHA-256(left ‖ right)`; an odd trailing element pairs
//! with itself. A single-element level is the root.

use crate::hashing::{sha256_concat_hex, sha256_hex};

/// Root of an empty sequence: the SHA-256 digest of zero bytes.
///
/// An empty transaction set has no natural root; this sentinel gives the
/// degenerate case a fixed, collision-safe value.
pub const EMPTY_MERKLE_ROOT: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Compute the Merkle root of an ordered sequence of hex digests.
pub fn merkle_root(hashes: &[String]) -> String {
    if hashes.is_empty() {
        return EMPTY_MERKLE_ROOT.to_owned();
    }
    if hashes.len() == 1 {
        return hashes[0].clone();
    }

    let mut level: Vec<String> = hashes.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let left = &pair[0];
            // Odd trailing element is paired with itself.
            let right = pair.get(1).unwrap_or(left);
            next.push(sha256_concat_hex(&[left, right]));
        }
        level = next;
    }
    level.remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(data: &str) -> String {
        sha256_hex(data.as_bytes())
    }

    #[test]
    fn test_empty_sequence_yields_sentinel() {
        assert_eq!(merkle_root(&[]), EMPTY_MERKLE_ROOT);
        assert_eq!(EMPTY_MERKLE_ROOT, sha256_hex(b""));
    }

    #[test]
    fn test_single_hash_is_its_own_root() {
        let only = h("tx-0");
        assert_eq!(merkle_root(&[only.clone()]), only);
    }

    #[test]
    fn test_pairwise_combination() {
        let (a, b) = (h("tx-0"), h("tx-1"));
        let expected = sha256_concat_hex(&[&a, &b]);
        assert_eq!(merkle_root(&[a, b]), expected);
    }

    #[test]
    fn test_odd_element_duplicates_itself() {
        let (a, b, c) = (h("tx-0"), h("tx-1"), h("tx-2"));
        let left = sha256_concat_hex(&[&a, &b]);
        let right = sha256_concat_hex(&[&c, &c]);
        let expected = sha256_concat_hex(&[&left, &right]);
        assert_eq!(merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn test_deterministic() {
        let hashes: Vec<String> = (0..7).map(|i| h(&format!("tx-{i}"))).collect();
        assert_eq!(merkle_root(&hashes), merkle_root(&hashes));
    }

    #[test]
    fn test_order_sensitive() {
        let forward: Vec<String> = (0..4).map(|i| h(&format!("tx-{i}"))).collect();
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_ne!(merkle_root(&forward), merkle_root(&reversed));
    }
}
