//! # Block
//!
//! One entry of the hash-chained ledger. The hash covers, in fixed order:
//! `index`, `merkle_root`, `previous_hash`, `timestamp`, then the JSON
//! serializations of the transaction set, smart contracts, contract
//! transactions, neighbor list, and selected delegate set.

use serde::Serialize;
use std::fmt;

use shared_crypto::{merkle_root, sha256_concat_hex};
use shared_types::{ContractTransaction, PeerId, SmartContract, Transaction};

use crate::delegates::DelegateSelector;

/// Marker returned by every append operation.
///
/// Holding (and discarding) one means the block's `merkle_root` and `hash`
/// are stale relative to its contents until [`Block::seal`] runs.
#[must_use = "appending leaves the block hash stale until seal() is called"]
#[derive(Debug)]
pub struct NeedsReseal;

/// A ledger block.
///
/// Derived fields (`merkle_root`, `hash`) are computed at construction and
/// refreshed only by [`Block::seal`].
#[derive(Debug, Clone)]
pub struct Block {
    /// Monotonic position in the chain.
    pub index: u64,
    /// Hex digest of the prior block.
    pub previous_hash: String,
    /// Unix timestamp (milliseconds) of the proposal.
    pub timestamp: u64,
    /// The block producer's payout transaction.
    pub reward: Transaction,
    /// Ordered transaction set.
    pub transactions: Vec<Transaction>,
    /// Ordered smart contract deployments.
    pub smart_contracts: Vec<SmartContract>,
    /// Ordered contract invocations.
    pub contract_transactions: Vec<ContractTransaction>,
    /// Peers visible to the proposer at proposal time.
    pub neighbors: Vec<PeerId>,
    /// Delegate set recorded by the proposer.
    pub selected_delegates: Vec<PeerId>,
    /// Merkle root over the transaction hashes (derived).
    pub merkle_root: String,
    /// SHA-256 digest over the canonical field concatenation (derived).
    pub hash: String,
    sealed: bool,
}

impl Block {
    /// Construct a block and compute `merkle_root` and `hash` immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: u64,
        previous_hash: impl Into<String>,
        timestamp: u64,
        reward: Transaction,
        transactions: Vec<Transaction>,
        smart_contracts: Vec<SmartContract>,
        contract_transactions: Vec<ContractTransaction>,
        neighbors: Vec<PeerId>,
        selected_delegates: Vec<PeerId>,
    ) -> Self {
        let mut block = Self {
            index,
            previous_hash: previous_hash.into(),
            timestamp,
            reward,
            transactions,
            smart_contracts,
            contract_transactions,
            neighbors,
            selected_delegates,
            merkle_root: String::new(),
            hash: String::new(),
            sealed: false,
        };
        block.seal();
        block
    }

    /// Construct a block with no transactions, contracts, neighbors, or
    /// delegates.
    pub fn empty(index: u64, previous_hash: impl Into<String>, timestamp: u64, reward: Transaction) -> Self {
        Self::new(
            index,
            previous_hash,
            timestamp,
            reward,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    /// Recompute the Merkle root over the current transaction hashes.
    pub fn calculate_merkle_root(&self) -> String {
        let hashes: Vec<String> = self.transactions.iter().map(|tx| tx.hash.clone()).collect();
        merkle_root(&hashes)
    }

    /// Recompute the block hash over the current field values.
    ///
    /// Uses the stored `merkle_root`; callers mutating the transaction set
    /// must refresh it first (see [`Block::seal`]).
    pub fn calculate_hash(&self) -> String {
        sha256_concat_hex(&[
            &self.index.to_string(),
            &self.merkle_root,
            &self.previous_hash,
            &self.timestamp.to_string(),
            &json(&self.transactions),
            &json(&self.smart_contracts),
            &json(&self.contract_transactions),
            &json(&self.neighbors),
            &json(&self.selected_delegates),
        ])
    }

    /// Refresh the derived fields after appends.
    pub fn seal(&mut self) {
        self.merkle_root = self.calculate_merkle_root();
        self.hash = self.calculate_hash();
        self.sealed = true;
    }

    /// Whether the derived fields reflect the current contents.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Validate the block against the delegate selection collaborator.
    ///
    /// Both checks must hold: the recorded delegate set must equal the
    /// recomputed selection exactly (order and content), and the stored
    /// hash must equal a recomputation over the current fields.
    pub fn is_valid(&self, selector: &dyn DelegateSelector) -> bool {
        let expected =
            selector.select_delegates(&self.previous_hash, self.timestamp, &self.neighbors);
        expected == self.selected_delegates && self.hash == self.calculate_hash()
    }

    /// Append a transaction. The hash stays stale until [`Block::seal`].
    pub fn add_transaction(&mut self, tx: Transaction) -> NeedsReseal {
        self.transactions.push(tx);
        self.sealed = false;
        NeedsReseal
    }

    /// Append a smart contract deployment. The hash stays stale until
    /// [`Block::seal`].
    pub fn add_smart_contract(&mut self, contract: SmartContract) -> NeedsReseal {
        self.smart_contracts.push(contract);
        self.sealed = false;
        NeedsReseal
    }

    /// Append a contract invocation. The hash stays stale until
    /// [`Block::seal`].
    pub fn add_contract_transaction(&mut self, contract_tx: ContractTransaction) -> NeedsReseal {
        self.contract_transactions.push(contract_tx);
        self.sealed = false;
        NeedsReseal
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block #{}", self.index)?;
        writeln!(f, "  Timestamp: {}", self.timestamp)?;
        writeln!(f, "  Previous Hash: {}", self.previous_hash)?;
        writeln!(f, "  Hash: {}", self.hash)?;
        writeln!(f, "  Merkle Root: {}", self.merkle_root)?;
        writeln!(f, "  Transactions: {}", json(&self.transactions))?;
        writeln!(f, "  Smart Contracts: {}", json(&self.smart_contracts))?;
        writeln!(
            f,
            "  Contract Transactions: {}",
            json(&self.contract_transactions)
        )?;
        write!(f, "  Delegates: {}", json(&self.selected_delegates))
    }
}

/// JSON serialization for hashing and display.
///
/// Ledger records contain only strings and integers, so serialization
/// cannot fail.
fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("ledger records serialize infallibly")
}
