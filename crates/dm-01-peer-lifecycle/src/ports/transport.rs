//! # Transport Port (Outbound SPI)
//!
//! The interface this subsystem **requires** the host transport stack to
//! implement: peer identity, multiaddress dialing, protocol-gated payload
//! fetches over open connections, ping, and a lifecycle event feed.
//!
//! The fetch operations return raw JSON strings; parsing (and parse-failure
//! containment) is the orchestrator's job.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use shared_types::{Connection, PeerId, TransportError};

/// Lifecycle events emitted by the transport.
///
/// Delivery order is causal within a single peer's event stream: a
/// connection-open is observed before protocol updates for that connection.
#[derive(Clone)]
pub enum TransportEvent {
    /// A connection to a remote peer was established (inbound or outbound).
    ConnectionOpened(Arc<dyn Connection>),
    /// The remote peer advertised a (possibly updated) protocol list.
    ProtocolsUpdated {
        /// The advertising peer.
        peer_id: PeerId,
        /// Full list as advertised; the orchestrator unions it.
        protocols: Vec<String>,
    },
    /// All connections to the peer are gone.
    PeerDisconnected(PeerId),
}

impl std::fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionOpened(conn) => f
                .debug_struct("ConnectionOpened")
                .field("id", &conn.id())
                .field("remote_addr", &conn.remote_addr())
                .finish(),
            Self::ProtocolsUpdated { peer_id, protocols } => f
                .debug_struct("ProtocolsUpdated")
                .field("peer_id", peer_id)
                .field("protocols", protocols)
                .finish(),
            Self::PeerDisconnected(peer_id) => {
                f.debug_tuple("PeerDisconnected").field(peer_id).finish()
            }
        }
    }
}

/// Abstract interface for the connection-multiplexing transport stack.
///
/// Implementations must be `Send + Sync`; every method may be called from
/// concurrent tasks. A "rate limit exceeded" failure must surface as
/// [`TransportError::RateLimitExceeded`], distinct from ordinary I/O
/// failure, because the orchestrator evicts on it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start the transport stack.
    async fn start(&self) -> Result<(), TransportError>;

    /// The local peer identity, once the transport has resolved one.
    fn local_peer(&self) -> Option<PeerId>;

    /// Subscribe to the lifecycle event feed.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent>;

    /// Dial a multiaddress, returning the established connection.
    async fn dial(&self, addr: &str) -> Result<Arc<dyn Connection>, TransportError>;

    /// Close all connections to a multiaddress.
    async fn disconnect(&self, addr: &str) -> Result<(), TransportError>;

    /// Fetch the remote peer's role list as a raw JSON payload.
    async fn fetch_roles(&self, conn: &Arc<dyn Connection>) -> Result<String, TransportError>;

    /// Fetch the remote peer's multiaddress list as a raw JSON payload.
    async fn fetch_multiaddrs(&self, conn: &Arc<dyn Connection>) -> Result<String, TransportError>;

    /// Fetch the remote peer's connected-peer list as a raw JSON payload.
    async fn fetch_peer_list(&self, conn: &Arc<dyn Connection>) -> Result<String, TransportError>;

    /// Round-trip latency to a multiaddress, in milliseconds.
    async fn ping(&self, addr: &str) -> Result<u64, TransportError>;
}
