//! # Store Service
//!
//! Server and client halves of the store exchange plus the local
//! content-addressed map.
//!
//! The wire format is JSON text. Request: `{"key"?, "peerId"?}`. Response:
//! a JSON array of JSON-encoded item strings; an empty store answers with
//! a single `"[]"` frame. When a request carries both filters, each filter
//! produces its own response frame.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use shared_crypto::sha256_hex;
use shared_types::{
    Connection, ConnectionStatus, MessageStream, NetworkConfig, StoreItem, StoreRequest,
    StreamError,
};

use crate::constants::protocol_id;
use crate::errors::StoreError;

/// Content-addressed item map with insertion-order capacity eviction.
///
/// When the map is at capacity, inserting a new digest evicts the oldest
/// insertion. Overwrites of an existing digest never evict.
struct StoreMap {
    items: HashMap<String, StoreItem>,
    order: VecDeque<String>,
    capacity: usize,
}

impl StoreMap {
    fn new(capacity: usize) -> Self {
        Self {
            items: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn upsert(&mut self, digest: String, item: StoreItem) {
        if self.items.insert(digest.clone(), item).is_none() {
            self.order.push_back(digest);
            while self.items.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.items.remove(&oldest);
                }
            }
        }
    }
}

/// The store replication service.
pub struct StoreService {
    protocol: String,
    request_timeout: Duration,
    max_inbound_streams: usize,
    max_outbound_streams: usize,
    run_on_limited_connection: bool,
    store: RwLock<StoreMap>,
    started: AtomicBool,
}

impl StoreService {
    /// Build the service from network configuration.
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            protocol: protocol_id(&config.protocols.store_prefix),
            request_timeout: config.request_timeout(),
            max_inbound_streams: config.max_inbound_streams,
            max_outbound_streams: config.max_outbound_streams,
            run_on_limited_connection: config.run_on_limited_connection,
            store: RwLock::new(StoreMap::new(config.store_capacity)),
            started: AtomicBool::new(false),
        }
    }

    /// The negotiated protocol identifier, `/<prefix>/store/<version>`.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Stream budget the host registrar should enforce for inbound streams.
    pub fn max_inbound_streams(&self) -> usize {
        self.max_inbound_streams
    }

    /// Stream budget the host registrar should enforce for outbound streams.
    pub fn max_outbound_streams(&self) -> usize {
        self.max_outbound_streams
    }

    /// Whether the protocol runs on resource-limited connections.
    pub fn run_on_limited_connection(&self) -> bool {
        self.run_on_limited_connection
    }

    /// Mark the protocol registered with the host.
    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    /// Mark the protocol unregistered.
    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    /// Whether the protocol is currently registered.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Upsert an item, overwriting any prior value for its digest.
    pub fn put_store(&self, item: StoreItem) {
        let digest = Self::item_digest(&item.peer_id, &item.key);
        debug!(peer = %item.peer_id, key = %item.key, "storing item");
        self.store.write().upsert(digest, item);
    }

    /// Fetch the locally stored item for `(peer_id, key)`, if any.
    pub fn get_local(&self, peer_id: &str, key: &str) -> Option<StoreItem> {
        self.store
            .read()
            .items
            .get(&Self::item_digest(peer_id, key))
            .cloned()
    }

    /// Number of locally stored items.
    pub fn store_len(&self) -> usize {
        self.store.read().items.len()
    }

    /// Content digest identifying an item: `sha256(peerId ":" key)`.
    pub fn item_digest(peer_id: &str, key: &str) -> String {
        sha256_hex(format!("{peer_id}:{key}").as_bytes())
    }

    /// Serve one inbound exchange.
    ///
    /// The whole exchange is bounded by the configured timeout; expiry
    /// aborts the stream with [`StreamError::Timeout`]. The stream is
    /// released exactly once on every path: aborted on timeout, closed
    /// otherwise. A close failure is logged, never raised.
    pub async fn handle_message(&self, mut stream: Box<dyn MessageStream>, remote: &str) {
        info!(remote, "incoming store request");
        match timeout(self.request_timeout, self.serve(&mut stream)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(remote, %err, "failed to handle incoming store request");
            }
            Err(_) => {
                warn!(remote, "timeout reached, aborting stream");
                stream.abort(StreamError::Timeout).await;
                return;
            }
        }
        if let Err(err) = stream.close().await {
            warn!(remote, %err, "failed to close stream");
        }
    }

    async fn serve(&self, stream: &mut Box<dyn MessageStream>) -> Result<(), StoreError> {
        let raw = stream.read_frame().await?;
        debug!(request = %raw, "received store request");
        let request: StoreRequest = serde_json::from_str(&raw)?;

        if self.store.read().items.is_empty() {
            stream.write_all(b"[]").await?;
            return Ok(());
        }

        if let Some(key) = &request.key {
            let frame = self.encode_matches(|item| &item.key == key)?;
            debug!(frame = %frame, "sending store response");
            stream.write_all(frame.as_bytes()).await?;
        }
        if let Some(peer_id) = &request.peer_id {
            let frame = self.encode_matches(|item| &item.peer_id == peer_id)?;
            debug!(frame = %frame, "sending store response");
            stream.write_all(frame.as_bytes()).await?;
        }
        Ok(())
    }

    /// Encode all matching items as a JSON array of JSON-encoded strings.
    fn encode_matches<F>(&self, matches: F) -> Result<String, StoreError>
    where
        F: Fn(&StoreItem) -> bool,
    {
        let store = self.store.read();
        let items: Vec<String> = store
            .items
            .values()
            .filter(|item| matches(item))
            .map(serde_json::to_string)
            .collect::<Result<_, _>>()?;
        Ok(serde_json::to_string(&items)?)
    }

    /// Issue a store request over an open connection and merge the
    /// response into the local store.
    ///
    /// The raw response string is returned even when it cannot be parsed;
    /// parse failures are logged and contained. The stream is released
    /// exactly once on every path.
    pub async fn get_store(
        &self,
        connection: &Arc<dyn Connection>,
        request: &StoreRequest,
        deadline: Option<Duration>,
    ) -> Result<String, StoreError> {
        if connection.status() != ConnectionStatus::Open {
            return Err(StoreError::ConnectionNotOpen);
        }
        info!(peer = ?connection.remote_peer(), "requesting store");

        let mut stream = connection.open_stream(&self.protocol).await?;
        let limit = deadline.unwrap_or(self.request_timeout);
        let exchange = async {
            let payload = serde_json::to_string(request)?;
            stream.write_all(payload.as_bytes()).await?;
            let response = stream.read_to_end().await?;
            Ok::<String, StoreError>(response)
        };
        match timeout(limit, exchange).await {
            Ok(Ok(response)) => {
                debug!(response = %response, "received store response");
                self.merge_response(&response);
                if let Err(err) = stream.close().await {
                    warn!(%err, "failed to close stream");
                }
                Ok(response)
            }
            Ok(Err(err)) => {
                warn!(%err, "store exchange failed");
                if let Err(close_err) = stream.close().await {
                    warn!(%close_err, "failed to close stream");
                }
                Err(err)
            }
            Err(_) => {
                warn!("timeout reached, aborting stream");
                stream.abort(StreamError::Timeout).await;
                Err(StoreError::Timeout)
            }
        }
    }

    /// Merge a response payload into the local store, item by item.
    fn merge_response(&self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let encoded_items: Vec<String> = match serde_json::from_str(raw) {
            Ok(items) => items,
            Err(err) => {
                warn!(%err, "failed to parse store response");
                return;
            }
        };
        for encoded in encoded_items {
            match serde_json::from_str::<StoreItem>(&encoded) {
                Ok(item) => self.put_store(item),
                Err(err) => warn!(%err, "failed to parse store item"),
            }
        }
    }
}
