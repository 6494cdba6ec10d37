//! # In-Memory Transport Fabric
//!
//! A process-local implementation of the transport ports. Endpoints attach
//! to a shared fabric; dialing another endpoint's multiaddress yields a
//! paired connection, streams are tokio channels, and discovery payloads
//! are scripted per endpoint.
//!
//! The fabric backs the single-binary demo and the integration suite. It
//! reproduces the behaviors the orchestrator must survive: rate-limited
//! fetches, unreachable peers, and streams that never answer.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

use dm_01_peer_lifecycle::{Transport, TransportEvent};
use shared_types::{
    Connection, ConnectionStatus, MessageStream, PeerId, StreamError, TransportError,
};

/// Callback invoked with the server half of every inbound stream for a
/// registered protocol, along with the dialing peer's identity.
pub type InboundHandler = Arc<dyn Fn(Box<dyn MessageStream>, PeerId) + Send + Sync>;

/// Discovery payloads and fault injection for one endpoint.
///
/// Payloads are raw JSON strings, returned verbatim to fetchers. The
/// `rate_limit_*` flags make the corresponding operation fail with
/// [`TransportError::RateLimitExceeded`], as a resource-exhausted remote
/// would.
#[derive(Debug, Clone)]
pub struct ScriptedDiscovery {
    /// JSON role list served to `fetch_roles`.
    pub roles: String,
    /// JSON multiaddress list served to `fetch_multiaddrs`.
    pub multiaddrs: String,
    /// JSON peer list served to `fetch_peer_list`.
    pub peer_list: String,
    /// Latency reported by `ping`, in milliseconds.
    pub ping_latency_ms: u64,
    /// Fail role fetches with a rate-limit error.
    pub rate_limit_roles: bool,
    /// Fail multiaddress fetches with a rate-limit error.
    pub rate_limit_multiaddrs: bool,
    /// Fail peer-list fetches with a rate-limit error.
    pub rate_limit_peer_list: bool,
    /// Fail pings with a rate-limit error.
    pub rate_limit_ping: bool,
    /// Fail pings with a timeout, simulating an unreachable peer.
    pub unreachable: bool,
}

impl Default for ScriptedDiscovery {
    fn default() -> Self {
        Self {
            roles: "[]".into(),
            multiaddrs: "[]".into(),
            peer_list: "[]".into(),
            ping_latency_ms: 1,
            rate_limit_roles: false,
            rate_limit_multiaddrs: false,
            rate_limit_peer_list: false,
            rate_limit_ping: false,
            unreachable: false,
        }
    }
}

/// Release counters for one stream half, for asserting stream hygiene.
#[derive(Clone)]
pub struct StreamProbe {
    closes: Arc<AtomicUsize>,
    aborts: Arc<AtomicUsize>,
}

impl StreamProbe {
    /// Number of graceful closes observed.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Number of aborts observed.
    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    /// True when the stream was released exactly once, by either path.
    pub fn released_exactly_once(&self) -> bool {
        self.closes() + self.aborts() == 1
    }
}

/// One half of a paired in-memory stream.
///
/// Frames are length-preserved channel messages; dropping or closing the
/// sender is what the peer observes as end-of-stream.
pub struct MemoryStream {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    closes: Arc<AtomicUsize>,
    aborts: Arc<AtomicUsize>,
}

impl MemoryStream {
    /// Create a connected pair of stream halves.
    pub fn pair() -> (MemoryStream, MemoryStream) {
        let (tx_a, rx_b) = mpsc::unbounded_channel();
        let (tx_b, rx_a) = mpsc::unbounded_channel();
        let a = MemoryStream {
            tx: Some(tx_a),
            rx: rx_a,
            closes: Arc::new(AtomicUsize::new(0)),
            aborts: Arc::new(AtomicUsize::new(0)),
        };
        let b = MemoryStream {
            tx: Some(tx_b),
            rx: rx_b,
            closes: Arc::new(AtomicUsize::new(0)),
            aborts: Arc::new(AtomicUsize::new(0)),
        };
        (a, b)
    }

    /// Release counters for this half.
    pub fn probe(&self) -> StreamProbe {
        StreamProbe {
            closes: Arc::clone(&self.closes),
            aborts: Arc::clone(&self.aborts),
        }
    }
}

#[async_trait]
impl MessageStream for MemoryStream {
    async fn read_frame(&mut self) -> Result<String, StreamError> {
        match self.rx.recv().await {
            Some(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            None => Err(StreamError::Closed),
        }
    }

    async fn read_to_end(&mut self) -> Result<String, StreamError> {
        let mut payload = String::new();
        while let Some(bytes) = self.rx.recv().await {
            payload.push_str(&String::from_utf8_lossy(&bytes));
        }
        Ok(payload)
    }

    async fn write_all(&mut self, payload: &[u8]) -> Result<(), StreamError> {
        match &self.tx {
            Some(tx) => tx.send(payload.to_vec()).map_err(|_| StreamError::Closed),
            None => Err(StreamError::Closed),
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        // Dropping the sender surfaces end-of-stream to the remote reader.
        self.tx.take();
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort(&mut self, reason: StreamError) {
        debug!(%reason, "stream aborted");
        self.tx.take();
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

struct EndpointInner {
    peer_id: PeerId,
    addr: String,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<TransportEvent>>>,
    handlers: RwLock<HashMap<String, InboundHandler>>,
    /// Protocols that accept streams but never answer or close.
    silent_protocols: RwLock<HashSet<String>>,
    /// Protocols advertised without a local inbound handler.
    advertised: RwLock<HashSet<String>>,
    discovery: RwLock<ScriptedDiscovery>,
    connections: RwLock<HashMap<u64, Arc<MemoryConnection>>>,
}

impl EndpointInner {
    fn emit(&self, event: TransportEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn advertised_protocols(&self) -> Vec<String> {
        let mut protocols: Vec<String> = self.advertised.read().iter().cloned().collect();
        protocols.extend(self.handlers.read().keys().cloned());
        protocols.sort();
        protocols.dedup();
        protocols
    }
}

struct FabricInner {
    endpoints: RwLock<HashMap<String, Arc<EndpointInner>>>,
    next_conn_id: AtomicU64,
    last_client_probe: Mutex<Option<StreamProbe>>,
}

impl FabricInner {
    fn lookup(&self, addr: &str) -> Option<Arc<EndpointInner>> {
        self.endpoints.read().get(addr).cloned()
    }
}

/// Shared fabric all in-process endpoints attach to.
#[derive(Clone)]
pub struct MemoryFabric {
    inner: Arc<FabricInner>,
}

impl Default for MemoryFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFabric {
    /// Create an empty fabric.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FabricInner {
                endpoints: RwLock::new(HashMap::new()),
                next_conn_id: AtomicU64::new(1),
                last_client_probe: Mutex::new(None),
            }),
        }
    }

    /// Attach a new endpoint listening on `addr`.
    pub fn endpoint(&self, peer_id: impl Into<PeerId>, addr: impl Into<String>) -> Arc<MemoryEndpoint> {
        let inner = Arc::new(EndpointInner {
            peer_id: peer_id.into(),
            addr: addr.into(),
            subscribers: Mutex::new(Vec::new()),
            handlers: RwLock::new(HashMap::new()),
            silent_protocols: RwLock::new(HashSet::new()),
            advertised: RwLock::new(HashSet::new()),
            discovery: RwLock::new(ScriptedDiscovery::default()),
            connections: RwLock::new(HashMap::new()),
        });
        self.inner
            .endpoints
            .write()
            .insert(inner.addr.clone(), Arc::clone(&inner));
        Arc::new(MemoryEndpoint {
            fabric: Arc::clone(&self.inner),
            inner,
        })
    }

    /// Probe for the most recently opened outbound stream, if any.
    pub fn last_stream_probe(&self) -> Option<StreamProbe> {
        self.inner.last_client_probe.lock().clone()
    }
}

/// A fabric endpoint implementing the [`Transport`] port.
pub struct MemoryEndpoint {
    fabric: Arc<FabricInner>,
    inner: Arc<EndpointInner>,
}

impl MemoryEndpoint {
    /// The multiaddress this endpoint listens on.
    pub fn addr(&self) -> &str {
        &self.inner.addr
    }

    /// Register an inbound handler for `protocol`. The protocol is also
    /// advertised to peers on connection open.
    pub fn register_protocol(&self, protocol: impl Into<String>, handler: InboundHandler) {
        self.inner.handlers.write().insert(protocol.into(), handler);
    }

    /// Advertise `protocols` without serving them locally.
    pub fn advertise(&self, protocols: &[&str]) {
        let mut advertised = self.inner.advertised.write();
        for protocol in protocols {
            advertised.insert((*protocol).to_string());
        }
    }

    /// Accept streams for `protocol` but never respond or close them.
    pub fn serve_silently(&self, protocol: impl Into<String>) {
        let protocol = protocol.into();
        self.inner.advertised.write().insert(protocol.clone());
        self.inner.silent_protocols.write().insert(protocol);
    }

    /// Mutate this endpoint's scripted discovery payloads.
    pub fn script_discovery(&self, mutate: impl FnOnce(&mut ScriptedDiscovery)) {
        let mut discovery = self.inner.discovery.write();
        mutate(&mut discovery);
    }

    fn remote_of(&self, conn: &Arc<dyn Connection>) -> Result<Arc<EndpointInner>, TransportError> {
        if conn.status() != ConnectionStatus::Open {
            return Err(TransportError::ConnectionClosed(conn.remote_addr()));
        }
        self.fabric
            .lookup(&conn.remote_addr())
            .ok_or_else(|| TransportError::ConnectionClosed(conn.remote_addr()))
    }
}

#[async_trait]
impl Transport for MemoryEndpoint {
    async fn start(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn local_peer(&self) -> Option<PeerId> {
        Some(self.inner.peer_id.clone())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().push(tx);
        rx
    }

    async fn dial(&self, addr: &str) -> Result<Arc<dyn Connection>, TransportError> {
        if addr == self.inner.addr {
            return Err(TransportError::Dial {
                addr: addr.to_string(),
                reason: "refusing to dial self".into(),
            });
        }
        let remote = self.fabric.lookup(addr).ok_or_else(|| TransportError::Dial {
            addr: addr.to_string(),
            reason: "no endpoint listening".into(),
        })?;

        let open = Arc::new(AtomicBool::new(true));
        let outbound = Arc::new(MemoryConnection {
            id: self.fabric.next_conn_id.fetch_add(1, Ordering::SeqCst),
            local_peer: self.inner.peer_id.clone(),
            remote: Arc::clone(&remote),
            open: Arc::clone(&open),
            fabric: Arc::clone(&self.fabric),
        });
        let inbound = Arc::new(MemoryConnection {
            id: self.fabric.next_conn_id.fetch_add(1, Ordering::SeqCst),
            local_peer: remote.peer_id.clone(),
            remote: Arc::clone(&self.inner),
            open,
            fabric: Arc::clone(&self.fabric),
        });
        self.inner
            .connections
            .write()
            .insert(outbound.id, Arc::clone(&outbound));
        remote
            .connections
            .write()
            .insert(inbound.id, Arc::clone(&inbound));

        debug!(local = %self.inner.peer_id, remote = %remote.peer_id, "dialed");

        self.inner
            .emit(TransportEvent::ConnectionOpened(Arc::clone(&outbound) as Arc<dyn Connection>));
        remote.emit(TransportEvent::ConnectionOpened(inbound as Arc<dyn Connection>));

        // Both sides learn each other's protocol lists, as an identify
        // exchange would deliver.
        self.inner.emit(TransportEvent::ProtocolsUpdated {
            peer_id: remote.peer_id.clone(),
            protocols: remote.advertised_protocols(),
        });
        remote.emit(TransportEvent::ProtocolsUpdated {
            peer_id: self.inner.peer_id.clone(),
            protocols: self.inner.advertised_protocols(),
        });

        Ok(outbound as Arc<dyn Connection>)
    }

    async fn disconnect(&self, addr: &str) -> Result<(), TransportError> {
        let mut dropped = false;
        {
            let mut connections = self.inner.connections.write();
            connections.retain(|_, conn| {
                if conn.remote.addr == addr {
                    conn.open.store(false, Ordering::SeqCst);
                    dropped = true;
                    false
                } else {
                    true
                }
            });
        }
        if let Some(remote) = self.fabric.lookup(addr) {
            {
                let mut connections = remote.connections.write();
                connections.retain(|_, conn| conn.remote.addr != self.inner.addr);
            }
            if dropped {
                self.inner
                    .emit(TransportEvent::PeerDisconnected(remote.peer_id.clone()));
                remote.emit(TransportEvent::PeerDisconnected(self.inner.peer_id.clone()));
            }
        }
        Ok(())
    }

    async fn fetch_roles(&self, conn: &Arc<dyn Connection>) -> Result<String, TransportError> {
        let remote = self.remote_of(conn)?;
        let discovery = remote.discovery.read();
        if discovery.rate_limit_roles {
            return Err(TransportError::RateLimitExceeded(remote.peer_id.clone()));
        }
        Ok(discovery.roles.clone())
    }

    async fn fetch_multiaddrs(&self, conn: &Arc<dyn Connection>) -> Result<String, TransportError> {
        let remote = self.remote_of(conn)?;
        let discovery = remote.discovery.read();
        if discovery.rate_limit_multiaddrs {
            return Err(TransportError::RateLimitExceeded(remote.peer_id.clone()));
        }
        Ok(discovery.multiaddrs.clone())
    }

    async fn fetch_peer_list(&self, conn: &Arc<dyn Connection>) -> Result<String, TransportError> {
        let remote = self.remote_of(conn)?;
        let discovery = remote.discovery.read();
        if discovery.rate_limit_peer_list {
            return Err(TransportError::RateLimitExceeded(remote.peer_id.clone()));
        }
        Ok(discovery.peer_list.clone())
    }

    async fn ping(&self, addr: &str) -> Result<u64, TransportError> {
        let remote = self.fabric.lookup(addr).ok_or(TransportError::Timeout)?;
        let discovery = remote.discovery.read();
        if discovery.rate_limit_ping {
            return Err(TransportError::RateLimitExceeded(remote.peer_id.clone()));
        }
        if discovery.unreachable {
            return Err(TransportError::Timeout);
        }
        Ok(discovery.ping_latency_ms)
    }
}

/// One direction of a paired fabric connection.
pub struct MemoryConnection {
    id: u64,
    local_peer: PeerId,
    remote: Arc<EndpointInner>,
    /// Shared with the twin connection; either side closing closes both.
    open: Arc<AtomicBool>,
    fabric: Arc<FabricInner>,
}

#[async_trait]
impl Connection for MemoryConnection {
    fn id(&self) -> u64 {
        self.id
    }

    fn remote_peer(&self) -> Option<PeerId> {
        Some(self.remote.peer_id.clone())
    }

    fn remote_addr(&self) -> String {
        self.remote.addr.clone()
    }

    fn status(&self) -> ConnectionStatus {
        if self.open.load(Ordering::SeqCst) {
            ConnectionStatus::Open
        } else {
            ConnectionStatus::Closed
        }
    }

    async fn open_stream(&self, protocol: &str) -> Result<Box<dyn MessageStream>, StreamError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(StreamError::Closed);
        }
        let (client, server) = MemoryStream::pair();
        *self.fabric.last_client_probe.lock() = Some(client.probe());

        if self.remote.silent_protocols.read().contains(protocol) {
            // Park the server half so the client sees neither data nor
            // end-of-stream.
            tokio::spawn(async move {
                let _held = server;
                std::future::pending::<()>().await;
            });
            return Ok(Box::new(client));
        }

        let handler = self
            .remote
            .handlers
            .read()
            .get(protocol)
            .cloned()
            .ok_or(StreamError::Reset)?;
        handler(Box::new(server), self.local_peer.clone());
        Ok(Box::new(client))
    }
}
