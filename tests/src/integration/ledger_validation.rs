//! # Ledger Validation Flows
//!
//! Seals blocks with the digest-based delegate selector and validates them
//! the way a receiving node would: with its own, independently constructed
//! selector instance.

#[cfg(test)]
mod tests {
    use dm_03_ledger::{Block, DelegateSelector};
    use node_runtime::adapters::DigestDelegateSelector;
    use shared_types::Transaction;

    fn neighbors() -> Vec<String> {
        vec!["alpha".into(), "beta".into(), "gamma".into(), "delta".into()]
    }

    fn reward() -> Transaction {
        Transaction::new("reward-1", "mesh", "alpha", 50, 1_700_000_000)
    }

    fn sealed_block(selector: &DigestDelegateSelector) -> Block {
        let previous_hash = "0".repeat(64);
        let timestamp = 1_700_000_000;
        let delegates = selector.select_delegates(&previous_hash, timestamp, &neighbors());
        Block::new(
            1,
            previous_hash,
            timestamp,
            reward(),
            vec![Transaction::new("tx-1", "alpha", "beta", 10, timestamp)],
            Vec::new(),
            Vec::new(),
            neighbors(),
            delegates,
        )
    }

    #[test]
    fn test_block_validates_with_independent_selector() {
        let producer = DigestDelegateSelector::new(3);
        let block = sealed_block(&producer);

        // A receiving node rebuilds the selector from the same parameters.
        let validator = DigestDelegateSelector::new(3);
        assert!(block.is_valid(&validator));
    }

    #[test]
    fn test_selector_size_mismatch_rejects_block() {
        let producer = DigestDelegateSelector::new(3);
        let block = sealed_block(&producer);

        let validator = DigestDelegateSelector::new(2);
        assert!(!block.is_valid(&validator));
    }

    #[test]
    fn test_tampered_delegate_set_rejects_block() {
        let producer = DigestDelegateSelector::new(3);
        let mut block = sealed_block(&producer);

        block.selected_delegates = vec!["mallory".into()];
        block.seal();
        assert!(
            !block.is_valid(&producer),
            "a resealed block with forged delegates must still fail"
        );
    }

    #[test]
    fn test_appended_transaction_requires_reseal() {
        let producer = DigestDelegateSelector::new(3);
        let mut block = sealed_block(&producer);

        let _reseal = block.add_transaction(Transaction::new(
            "tx-2",
            "beta",
            "gamma",
            5,
            1_700_000_001,
        ));
        assert!(!block.is_valid(&producer));

        block.seal();
        assert!(block.is_valid(&producer));
    }
}
