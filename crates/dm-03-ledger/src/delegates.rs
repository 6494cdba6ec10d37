//! # Delegate Selection Port
//!
//! The selection algorithm itself lives outside this subsystem; the ledger
//! only requires that it is a pure function of the previous block hash, the
//! proposal timestamp, and the proposer's neighbor list.

use shared_types::PeerId;

/// Deterministic delegate selection.
///
/// Implementations must return the same sequence (order and content) for
/// the same inputs; block validation recomputes the selection and compares
/// it element-for-element against the recorded one.
pub trait DelegateSelector: Send + Sync {
    /// Select the delegate set authorized to produce the block following
    /// `previous_hash`.
    fn select_delegates(
        &self,
        previous_hash: &str,
        timestamp: u64,
        neighbors: &[PeerId],
    ) -> Vec<PeerId>;
}
