//! # Core Domain Entities
//!
//! Ledger records and replication payloads shared across subsystems.
//!
//! All wire-facing types serialize with camelCase field names, matching the
//! JSON payloads exchanged with remote peers. Serialization order is fixed by
//! struct declaration order, which makes `serde_json` output deterministic for
//! a given value. Ledger hashing depends on that determinism.

use serde::{Deserialize, Serialize};

/// Textual identifier for a remote peer.
///
/// Peer identities are negotiated by the transport layer and surface here as
/// opaque strings.
pub type PeerId = String;

/// A value transfer included in a block.
///
/// The `hash` field is assigned by the wallet layer when the transaction is
/// signed; the ledger treats it as an opaque digest and feeds it into the
/// Merkle aggregation unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Digest identifying this transaction.
    pub hash: String,
    /// Sender address.
    pub sender: String,
    /// Receiver address.
    pub receiver: String,
    /// Transferred amount in base units.
    pub amount: u64,
    /// Unix timestamp (milliseconds) when the transaction was created.
    pub timestamp: u64,
}

impl Transaction {
    /// Create a transaction with a caller-supplied digest.
    pub fn new(
        hash: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            hash: hash.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
        }
    }
}

/// A deployed smart contract record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartContract {
    /// Digest identifying this contract.
    pub hash: String,
    /// Owner address that deployed the contract.
    pub owner: String,
    /// Opaque contract code reference.
    pub code: String,
}

/// An invocation of a deployed smart contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractTransaction {
    /// Digest identifying this invocation.
    pub hash: String,
    /// Digest of the contract being invoked.
    pub contract_hash: String,
    /// Caller address.
    pub caller: String,
    /// Opaque call payload.
    pub input: String,
}

/// A replicated key-value record.
///
/// Identified for storage purposes by `sha256(peerId ":" key)`; later writes
/// for the same `(peerId, key)` pair overwrite the prior value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreItem {
    /// Peer that owns the record.
    pub peer_id: PeerId,
    /// Record key, unique per owning peer.
    pub key: String,
    /// Arbitrary JSON value.
    pub value: serde_json::Value,
}

impl StoreItem {
    /// Create a store item.
    pub fn new(peer_id: impl Into<PeerId>, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            peer_id: peer_id.into(),
            key: key.into(),
            value,
        }
    }
}

/// A store protocol request.
///
/// Both filters are optional and independent: a request carrying both fields
/// produces two separate response frames, one per filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    /// Match items by key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Match items by owning peer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<PeerId>,
}

impl StoreRequest {
    /// Request all items matching a key.
    pub fn by_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            peer_id: None,
        }
    }

    /// Request all items owned by a peer.
    pub fn by_peer(peer_id: impl Into<PeerId>) -> Self {
        Self {
            key: None,
            peer_id: Some(peer_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_item_wire_format_uses_camel_case() {
        let item = StoreItem::new("12D3KooWPeer", "role", serde_json::json!("validator"));
        let encoded = serde_json::to_string(&item).unwrap();
        assert!(encoded.contains("\"peerId\":\"12D3KooWPeer\""));
        assert!(!encoded.contains("peer_id"));
    }

    #[test]
    fn test_store_request_omits_absent_filters() {
        let request = StoreRequest::by_key("role");
        let encoded = serde_json::to_string(&request).unwrap();
        assert_eq!(encoded, "{\"key\":\"role\"}");
    }

    #[test]
    fn test_store_request_round_trip() {
        let request = StoreRequest {
            key: Some("balance".into()),
            peer_id: Some("peer-a".into()),
        };
        let encoded = serde_json::to_string(&request).unwrap();
        let decoded: StoreRequest = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_transaction_serialization_is_deterministic() {
        let tx = Transaction::new("abc123", "alice", "bob", 42, 1_700_000_000_000);
        let first = serde_json::to_string(&tx).unwrap();
        let second = serde_json::to_string(&tx).unwrap();
        assert_eq!(first, second);
    }
}
