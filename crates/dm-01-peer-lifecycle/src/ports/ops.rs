//! # Peer Operations Port
//!
//! The named capability set the strategy drives, one method per discovery
//! operation. Implemented by the orchestrator, which layers protocol
//! gating, payload parsing, and rate-limit eviction on top of the raw
//! transport.
//!
//! Every operation returns `Option`: absence means the operation was
//! skipped (protocol not advertised, node not connected) or failed in a
//! recovered way. Failures never escape this boundary.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use shared_types::{Connection, PeerId};

use crate::domain::Node;

/// A registry entry shared between orchestrator and strategy.
pub type SharedNode = Arc<RwLock<Node>>;

/// Discovery and health operations available to the strategy.
#[async_trait]
pub trait PeerOps: Send + Sync {
    /// Dial a multiaddress.
    async fn connect(&self, addr: &str) -> Option<Arc<dyn Connection>>;

    /// Close connections to a multiaddress.
    async fn disconnect(&self, addr: &str);

    /// Fetch the node's roles, gated on the role-discovery protocol.
    async fn fetch_roles(&self, node: &SharedNode) -> Option<Vec<String>>;

    /// Fetch the node's multiaddresses, gated on the multiaddress-discovery
    /// protocol.
    async fn fetch_multiaddrs(&self, node: &SharedNode) -> Option<Vec<String>>;

    /// Fetch the node's connected-peer list, gated on the peer-list
    /// protocol.
    async fn fetch_connected_peers(&self, node: &SharedNode) -> Option<Vec<PeerId>>;

    /// Ping a multiaddress, returning latency in milliseconds.
    async fn ping(&self, addr: &str) -> Option<u64>;
}
