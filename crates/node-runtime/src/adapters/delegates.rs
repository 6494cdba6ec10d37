//! # Delegate Selection Adapter
//!
//! Deterministic delegate selection seeded by the parent block. Every node
//! that sees the same parent hash, timestamp, and neighbor set picks the
//! same delegates, so block validation can recompute the expected set
//! without coordination.

use shared_crypto::sha256_hex;
use shared_types::PeerId;

use dm_03_ledger::DelegateSelector;

/// Selects up to `count` delegates by ranking neighbors on a per-block
/// digest.
///
/// Each neighbor is scored with `sha256(previous_hash:timestamp:peer)`;
/// the lowest digests win. The scoring input binds the selection to the
/// parent block, so a new block re-shuffles the ranking.
pub struct DigestDelegateSelector {
    count: usize,
}

impl DigestDelegateSelector {
    /// Create a selector that picks at most `count` delegates.
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

impl DelegateSelector for DigestDelegateSelector {
    fn select_delegates(
        &self,
        previous_hash: &str,
        timestamp: u64,
        neighbors: &[PeerId],
    ) -> Vec<PeerId> {
        let mut ranked: Vec<(String, PeerId)> = neighbors
            .iter()
            .map(|peer| {
                let score = sha256_hex(format!("{previous_hash}:{timestamp}:{peer}").as_bytes());
                (score, peer.clone())
            })
            .collect();
        ranked.sort();
        ranked.dedup_by(|a, b| a.1 == b.1);
        ranked
            .into_iter()
            .take(self.count)
            .map(|(_, peer)| peer)
            .collect()
    }
}
