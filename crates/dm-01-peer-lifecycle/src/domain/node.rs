//! # Node
//!
//! The runtime record for one remote peer: its identity, live connections,
//! advertised protocol set, and the strategy's health bookkeeping.
//!
//! A `Node` carries no internal synchronization; the orchestrator and
//! strategy share it as `Arc<RwLock<Node>>` and never hold the lock across
//! a suspension point.

use std::collections::HashSet;
use std::sync::Arc;

use shared_types::{Connection, ConnectionStatus, PeerId};

/// Per-peer runtime state.
pub struct Node {
    /// Peer identity, learned either from the first connection or from a
    /// later protocol-update event.
    pub peer_id: Option<PeerId>,
    /// Live connection handles. A peer may hold several simultaneously.
    pub connections: Vec<Arc<dyn Connection>>,
    /// Protocol identifiers the peer has advertised. Grow-only: support is
    /// discovered, never retracted short of evicting the whole node.
    pub protocols: HashSet<String>,
    /// Roles reported by the peer's role-discovery protocol.
    pub roles: Vec<String>,
    /// Multiaddresses learned for this peer.
    pub multiaddrs: HashSet<String>,
    /// Most recent ping latency, milliseconds.
    pub latency_ms: Option<u64>,
    /// Consecutive failed pings since the last success.
    pub ping_failures: u32,
}

impl Node {
    /// Create a node, optionally seeded with an identity and a connection.
    pub fn new(peer_id: Option<PeerId>, connection: Option<Arc<dyn Connection>>) -> Self {
        Self {
            peer_id,
            connections: connection.into_iter().collect(),
            protocols: HashSet::new(),
            roles: Vec::new(),
            multiaddrs: HashSet::new(),
            latency_ms: None,
            ping_failures: 0,
        }
    }

    /// Whether the peer has at least one known connection.
    pub fn is_connect(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Any one connection whose status is open.
    pub fn opened_connection(&self) -> Option<Arc<dyn Connection>> {
        self.connections
            .iter()
            .find(|conn| conn.status() == ConnectionStatus::Open)
            .cloned()
    }

    /// Attach a connection handle, deduplicating by transport id.
    pub fn attach_connection(&mut self, connection: Arc<dyn Connection>) {
        if !self.connections.iter().any(|c| c.id() == connection.id()) {
            self.connections.push(connection);
        }
    }

    /// Drop handles whose status is no longer open.
    pub fn prune_closed(&mut self) {
        self.connections
            .retain(|conn| conn.status() == ConnectionStatus::Open);
    }

    /// Union newly advertised protocols into the set. Idempotent.
    pub fn add_protocols<I>(&mut self, protocols: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.protocols.extend(protocols);
    }

    /// Record a learned multiaddress. Returns true when it was new.
    pub fn record_multiaddr(&mut self, addr: impl Into<String>) -> bool {
        self.multiaddrs.insert(addr.into())
    }

    /// Record a successful ping, resetting the failure streak.
    pub fn record_latency(&mut self, latency_ms: u64) {
        self.latency_ms = Some(latency_ms);
        self.ping_failures = 0;
    }

    /// Record a failed ping; returns the current streak length.
    pub fn record_ping_failure(&mut self) -> u32 {
        self.ping_failures += 1;
        self.ping_failures
    }

    /// Address to ping: an open connection's remote address, else any
    /// learned multiaddress.
    pub fn ping_addr(&self) -> Option<String> {
        self.opened_connection()
            .map(|conn| conn.remote_addr())
            .or_else(|| self.multiaddrs.iter().next().cloned())
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("peer_id", &self.peer_id)
            .field("connections", &self.connections.len())
            .field("protocols", &self.protocols)
            .field("roles", &self.roles)
            .field("latency_ms", &self.latency_ms)
            .field("ping_failures", &self.ping_failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared_types::{MessageStream, StreamError};

    struct FakeConnection {
        id: u64,
        status: ConnectionStatus,
    }

    #[async_trait]
    impl Connection for FakeConnection {
        fn id(&self) -> u64 {
            self.id
        }
        fn remote_peer(&self) -> Option<PeerId> {
            Some("peer-x".into())
        }
        fn remote_addr(&self) -> String {
            format!("/memory/{}", self.id)
        }
        fn status(&self) -> ConnectionStatus {
            self.status
        }
        async fn open_stream(
            &self,
            _protocol: &str,
        ) -> Result<Box<dyn MessageStream>, StreamError> {
            Err(StreamError::Closed)
        }
    }

    fn conn(id: u64, status: ConnectionStatus) -> Arc<dyn Connection> {
        Arc::new(FakeConnection { id, status })
    }

    #[test]
    fn test_empty_node_is_not_connected() {
        let node = Node::new(None, None);
        assert!(!node.is_connect());
        assert!(node.opened_connection().is_none());
    }

    #[test]
    fn test_attach_deduplicates_by_id() {
        let mut node = Node::new(Some("peer-x".into()), None);
        node.attach_connection(conn(1, ConnectionStatus::Open));
        node.attach_connection(conn(1, ConnectionStatus::Open));
        node.attach_connection(conn(2, ConnectionStatus::Open));
        assert_eq!(node.connections.len(), 2);
    }

    #[test]
    fn test_opened_connection_skips_closed_handles() {
        let mut node = Node::new(None, Some(conn(1, ConnectionStatus::Closed)));
        assert!(node.opened_connection().is_none());
        node.attach_connection(conn(2, ConnectionStatus::Open));
        assert_eq!(node.opened_connection().map(|c| c.id()), Some(2));
    }

    #[test]
    fn test_protocol_union_is_idempotent() {
        let mut node = Node::new(None, None);
        node.add_protocols(vec!["/dmesh/roles/1.0.0".to_string()]);
        node.add_protocols(vec![
            "/dmesh/roles/1.0.0".to_string(),
            "/dmesh/peer-list/1.0.0".to_string(),
        ]);
        assert_eq!(node.protocols.len(), 2);
    }

    #[test]
    fn test_ping_failure_streak_resets_on_success() {
        let mut node = Node::new(None, None);
        assert_eq!(node.record_ping_failure(), 1);
        assert_eq!(node.record_ping_failure(), 2);
        node.record_latency(12);
        assert_eq!(node.ping_failures, 0);
        assert_eq!(node.latency_ms, Some(12));
    }

    #[test]
    fn test_ping_addr_prefers_open_connection() {
        let mut node = Node::new(None, Some(conn(5, ConnectionStatus::Open)));
        node.record_multiaddr("/memory/99");
        assert_eq!(node.ping_addr().as_deref(), Some("/memory/5"));
    }
}
