//! # Network Service
//!
//! The orchestrator bridging transport lifecycle events into the node
//! registry, and the [`PeerOps`] implementation the strategy drives.
//!
//! Every discovery operation is gated twice: the node must be connected
//! with a known identity, and it must have advertised the protocol the
//! operation requires. Payloads arrive as JSON strings; a parse failure is
//! contained (logged, reported as absent), never fatal to the node. A
//! rate-limit failure evicts the node; every other failure is logged and
//! recovered.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use shared_types::{Connection, ConnectionStatus, NetworkConfig, PeerId, TransportError};

use crate::domain::Node;
use crate::ports::{PeerOps, SharedNode, Transport, TransportEvent};
use crate::strategy::NodeStrategy;

/// Orchestrates peer lifecycle for one local node.
pub struct NetworkService<T: Transport + 'static> {
    transport: Arc<T>,
    strategy: Arc<NodeStrategy>,
    config: NetworkConfig,
    local_peer: RwLock<Option<PeerId>>,
}

impl<T: Transport + 'static> NetworkService<T> {
    /// Create the service around a transport collaborator.
    pub fn new(transport: Arc<T>, config: NetworkConfig) -> Self {
        Self {
            transport,
            strategy: Arc::new(NodeStrategy::new(config.clone())),
            config,
            local_peer: RwLock::new(None),
        }
    }

    /// The shared node registry and lifecycle driver.
    pub fn strategy(&self) -> &Arc<NodeStrategy> {
        &self.strategy
    }

    /// The local peer identity, once startup has captured it.
    pub fn local_peer(&self) -> Option<PeerId> {
        self.local_peer.read().clone()
    }

    /// Start the transport, subscribe to its lifecycle events, and launch
    /// the strategy loop.
    ///
    /// Fails fast when the transport cannot report a local peer identity;
    /// nothing is subscribed in that case.
    pub async fn start_async(self: &Arc<Self>) -> Result<(), TransportError> {
        self.transport.start().await?;
        let Some(local) = self.transport.local_peer() else {
            error!("local peer identity not available; not starting");
            return Err(TransportError::NoLocalPeer);
        };
        *self.local_peer.write() = Some(local.clone());
        info!(%local, "network service starting");

        let mut events = self.transport.subscribe();
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                service.handle_event(event);
            }
            debug!("transport event stream ended");
        });

        let strategy = Arc::clone(&self.strategy);
        let ops: Arc<dyn PeerOps> = Arc::clone(self) as Arc<dyn PeerOps>;
        tokio::spawn(strategy.start_strategy(local, ops));
        Ok(())
    }

    /// Stop scheduling strategy cycles.
    pub fn shutdown(&self) {
        self.strategy.stop_strategy();
    }

    fn handle_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::ConnectionOpened(conn) => {
                let Some(peer) = conn.remote_peer() else {
                    return;
                };
                if self.is_local(&peer) || conn.status() != ConnectionStatus::Open {
                    return;
                }
                debug!(%peer, conn = conn.id(), "connection opened");
                self.get_or_create(&peer, Some(conn));
            }
            TransportEvent::ProtocolsUpdated { peer_id, protocols } => {
                if self.is_local(&peer_id) {
                    return;
                }
                let node = self.get_or_create(&peer_id, None);
                node.write().add_protocols(protocols);
            }
            TransportEvent::PeerDisconnected(peer_id) => {
                info!(peer = %peer_id, "connection closed");
                let strategy = Arc::clone(&self.strategy);
                let grace = self.config.disconnect_grace();
                tokio::spawn(async move {
                    strategy
                        .stop_node_strategy(&peer_id, "peer disconnect event", grace)
                        .await;
                });
            }
        }
    }

    fn is_local(&self, peer: &str) -> bool {
        self.local_peer.read().as_deref() == Some(peer)
    }

    /// Get the registry entry for a peer, creating it on first sight.
    /// Reuses the strategy's map rather than keeping a second one.
    fn get_or_create(&self, peer: &str, connection: Option<Arc<dyn Connection>>) -> SharedNode {
        if let Some(node) = self.strategy.get(peer) {
            {
                let mut guard = node.write();
                if guard.peer_id.is_none() {
                    guard.peer_id = Some(peer.to_string());
                }
                if let Some(conn) = connection {
                    guard.attach_connection(conn);
                }
            }
            return node;
        }
        let node: SharedNode = Arc::new(RwLock::new(Node::new(Some(peer.to_string()), connection)));
        self.strategy.set(peer.to_string(), Arc::clone(&node));
        node
    }

    /// Snapshot the identity, open connection, and protocol gate for one
    /// request. Returns `None` (operation skipped) unless the node is
    /// connected, identified, and advertises `protocol`.
    fn gated_connection(
        &self,
        node: &SharedNode,
        protocol: &str,
    ) -> Option<(PeerId, Arc<dyn Connection>)> {
        let guard = node.read();
        if !guard.is_connect() {
            return None;
        }
        let peer = guard.peer_id.clone()?;
        if !guard.protocols.contains(protocol) {
            return None;
        }
        let conn = guard.opened_connection()?;
        Some((peer, conn))
    }

    /// Evict a node for exceeding its rate budget. Runs detached so the
    /// calling operation can return without waiting out the grace period.
    fn evict_rate_limited(&self, peer: PeerId) {
        warn!(%peer, "rate limit exceeded; evicting node");
        let strategy = Arc::clone(&self.strategy);
        let grace = self.config.disconnect_grace();
        tokio::spawn(async move {
            strategy
                .stop_node_strategy(&peer, "rate limit exceeded", grace)
                .await;
        });
    }

    /// Parse a JSON payload, containing failure as "no result".
    fn parse_payload<P: serde::de::DeserializeOwned>(
        peer: &str,
        what: &str,
        raw: &str,
    ) -> Option<P> {
        if raw.is_empty() {
            return None;
        }
        match serde_json::from_str(raw) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(%peer, what, %err, "failed to parse payload");
                None
            }
        }
    }
}

#[async_trait]
impl<T: Transport + 'static> PeerOps for NetworkService<T> {
    async fn connect(&self, addr: &str) -> Option<Arc<dyn Connection>> {
        debug!(addr, "dialing");
        match self.transport.dial(addr).await {
            Ok(conn) => {
                debug!(addr, "dialed");
                Some(conn)
            }
            Err(err) => {
                warn!(addr, %err, "dial failed");
                None
            }
        }
    }

    async fn disconnect(&self, addr: &str) {
        debug!(addr, "disconnecting");
        if let Err(err) = self.transport.disconnect(addr).await {
            warn!(addr, %err, "disconnect failed");
        }
    }

    async fn fetch_roles(&self, node: &SharedNode) -> Option<Vec<String>> {
        let (peer, conn) = self.gated_connection(node, &self.config.protocols.role)?;
        match self.transport.fetch_roles(&conn).await {
            Ok(raw) => {
                let roles = Self::parse_payload::<Vec<String>>(&peer, "roles", &raw)?;
                debug!(%peer, ?roles, "fetched roles");
                Some(roles)
            }
            Err(TransportError::RateLimitExceeded(_)) => {
                self.evict_rate_limited(peer);
                None
            }
            Err(err) => {
                warn!(%peer, %err, "role fetch failed");
                None
            }
        }
    }

    async fn fetch_multiaddrs(&self, node: &SharedNode) -> Option<Vec<String>> {
        let (peer, conn) = self.gated_connection(node, &self.config.protocols.multiaddrs)?;
        match self.transport.fetch_multiaddrs(&conn).await {
            Ok(raw) => {
                let addrs = Self::parse_payload::<Vec<String>>(&peer, "multiaddrs", &raw)?;
                debug!(%peer, count = addrs.len(), "fetched multiaddrs");
                Some(addrs)
            }
            Err(TransportError::RateLimitExceeded(_)) => {
                self.evict_rate_limited(peer);
                None
            }
            Err(err) => {
                warn!(%peer, %err, "multiaddr fetch failed");
                None
            }
        }
    }

    async fn fetch_connected_peers(&self, node: &SharedNode) -> Option<Vec<PeerId>> {
        let (peer, conn) = self.gated_connection(node, &self.config.protocols.peer_list)?;
        match self.transport.fetch_peer_list(&conn).await {
            Ok(raw) => {
                let peers = Self::parse_payload::<Vec<PeerId>>(&peer, "peer list", &raw)?;
                debug!(%peer, count = peers.len(), "fetched connected peers");
                Some(peers)
            }
            Err(TransportError::RateLimitExceeded(_)) => {
                self.evict_rate_limited(peer);
                None
            }
            Err(err) => {
                warn!(%peer, %err, "peer list fetch failed");
                None
            }
        }
    }

    /// Ping is advisory: a rate-limit failure here is logged, not
    /// evict-triggering. The strategy still counts the miss.
    async fn ping(&self, addr: &str) -> Option<u64> {
        match self.transport.ping(addr).await {
            Ok(latency) => {
                debug!(addr, latency, "ping");
                Some(latency)
            }
            Err(TransportError::RateLimitExceeded(_)) => {
                warn!(addr, "rate limited while pinging");
                None
            }
            Err(err) => {
                warn!(addr, %err, "ping failed");
                None
            }
        }
    }
}
