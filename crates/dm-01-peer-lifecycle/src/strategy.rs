//! # Node Strategy
//!
//! The per-node lifecycle driver. On a recurring schedule it runs the
//! discovery operations for every tracked node through the [`PeerOps`]
//! capability set, merges the results back into node state, and decides
//! when a node must leave the registry.
//!
//! Eviction paths:
//! - ordinary unreachability: consecutive ping failures past the
//!   configured threshold
//! - rate-limit violations: reported by the orchestrator, which calls
//!   [`NodeStrategy::stop_node_strategy`] directly
//!
//! `stop_node_strategy` waits up to the grace period for in-flight
//! operations on the node to settle before disconnecting and removing it.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use shared_types::{NetworkConfig, PeerId};

use crate::domain::Node;
use crate::ports::{PeerOps, SharedNode};

/// How often the grace-period wait re-checks the in-flight counter.
const DRAIN_POLL: Duration = Duration::from_millis(25);

/// Per-node strategy bookkeeping, kept outside the node lock so it can be
/// read without contending with field mutation.
struct PeerState {
    /// Discovery operations currently running against this node.
    in_flight: AtomicUsize,
    /// Set once eviction has begun; new cycles skip the node.
    removing: AtomicBool,
}

impl PeerState {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            removing: AtomicBool::new(false),
        }
    }
}

/// Decrements the in-flight counter when a cycle ends, however it ends.
struct InFlightGuard(Arc<PeerState>);

impl InFlightGuard {
    fn enter(state: &Arc<PeerState>) -> Self {
        state.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(state))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The per-node periodic driver and node registry.
pub struct NodeStrategy {
    config: NetworkConfig,
    nodes: RwLock<HashMap<PeerId, SharedNode>>,
    states: RwLock<HashMap<PeerId, Arc<PeerState>>>,
    local_peer: OnceLock<PeerId>,
    ops: OnceLock<Arc<dyn PeerOps>>,
    shutdown: AtomicBool,
}

impl NodeStrategy {
    /// Create a strategy with an empty registry.
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            nodes: RwLock::new(HashMap::new()),
            states: RwLock::new(HashMap::new()),
            local_peer: OnceLock::new(),
            ops: OnceLock::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Look up the registry entry for a peer.
    pub fn get(&self, peer: &str) -> Option<SharedNode> {
        self.nodes.read().get(peer).cloned()
    }

    /// Insert (or replace) a registry entry for a peer.
    pub fn set(&self, peer: impl Into<PeerId>, node: SharedNode) {
        let peer = peer.into();
        self.nodes.write().insert(peer.clone(), node);
        self.states
            .write()
            .entry(peer)
            .or_insert_with(|| Arc::new(PeerState::new()));
    }

    /// Number of tracked nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    /// Whether a peer is currently tracked.
    pub fn is_tracked(&self, peer: &str) -> bool {
        self.nodes.read().contains_key(peer)
    }

    /// Stop scheduling new discovery cycles.
    pub fn stop_strategy(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Run the lifecycle loop until [`NodeStrategy::stop_strategy`].
    ///
    /// Each tick snapshots the registry and spawns one discovery cycle per
    /// tracked node, skipping the local peer and nodes being removed. A
    /// failing cycle never affects the cycle of another node.
    pub async fn start_strategy(self: Arc<Self>, local_peer: PeerId, ops: Arc<dyn PeerOps>) {
        let _ = self.local_peer.set(local_peer.clone());
        let _ = self.ops.set(ops);
        info!(%local_peer, "node strategy started");

        let mut interval = tokio::time::interval(self.config.strategy_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            let snapshot: Vec<(PeerId, SharedNode)> = self
                .nodes
                .read()
                .iter()
                .map(|(peer, node)| (peer.clone(), Arc::clone(node)))
                .collect();
            for (peer, node) in snapshot {
                if peer == local_peer {
                    continue;
                }
                let Some(state) = self.peer_state(&peer) else {
                    continue;
                };
                if state.removing.load(Ordering::SeqCst) {
                    continue;
                }
                let strategy = Arc::clone(&self);
                tokio::spawn(async move {
                    strategy.run_cycle(peer, node, state).await;
                });
            }
        }
        info!("node strategy stopped");
    }

    /// Remove a node: wait up to `grace` for its in-flight operations to
    /// settle, disconnect every live connection, and drop it from the
    /// registry.
    ///
    /// Idempotent: a second concurrent call for the same peer returns
    /// immediately.
    pub async fn stop_node_strategy(&self, peer: &str, reason: &str, grace: Duration) {
        let Some(state) = self.peer_state(peer) else {
            return;
        };
        if state.removing.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(peer, reason, "stopping node strategy");

        let deadline = Instant::now() + grace;
        while state.in_flight.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            sleep(DRAIN_POLL).await;
        }
        if state.in_flight.load(Ordering::SeqCst) > 0 {
            warn!(peer, "grace period elapsed with operations still in flight");
        }

        let addrs: Vec<String> = self
            .get(peer)
            .map(|node| {
                let mut guard = node.write();
                guard.prune_closed();
                guard
                    .connections
                    .iter()
                    .map(|conn| conn.remote_addr())
                    .collect()
            })
            .unwrap_or_default();
        if let Some(ops) = self.ops.get() {
            for addr in addrs {
                ops.disconnect(&addr).await;
            }
        }

        self.nodes.write().remove(peer);
        self.states.write().remove(peer);
        info!(peer, reason, "node removed from registry");
    }

    fn peer_state(&self, peer: &str) -> Option<Arc<PeerState>> {
        self.states.read().get(peer).cloned()
    }

    /// One discovery pass over a single node.
    async fn run_cycle(self: Arc<Self>, peer: PeerId, node: SharedNode, state: Arc<PeerState>) {
        let Some(ops) = self.ops.get().cloned() else {
            return;
        };
        let guard = InFlightGuard::enter(&state);

        if let Some(roles) = ops.fetch_roles(&node).await {
            node.write().roles = roles;
        }
        if state.removing.load(Ordering::SeqCst) {
            return;
        }

        if let Some(addrs) = ops.fetch_multiaddrs(&node).await {
            for addr in addrs {
                if node.write().record_multiaddr(&addr) {
                    if let Some(conn) = ops.connect(&addr).await {
                        node.write().attach_connection(conn);
                    }
                }
            }
        }
        if state.removing.load(Ordering::SeqCst) {
            return;
        }

        if let Some(peers) = ops.fetch_connected_peers(&node).await {
            for discovered in peers {
                if Some(&discovered) == self.local_peer.get() || self.is_tracked(&discovered) {
                    continue;
                }
                debug!(peer = %discovered, via = %peer, "seeding discovered peer");
                self.set(
                    discovered.clone(),
                    Arc::new(RwLock::new(Node::new(Some(discovered), None))),
                );
            }
        }
        if state.removing.load(Ordering::SeqCst) {
            return;
        }

        let ping_addr = node.read().ping_addr();
        if let Some(addr) = ping_addr {
            match ops.ping(&addr).await {
                Some(latency) => node.write().record_latency(latency),
                None => {
                    let failures = node.write().record_ping_failure();
                    if failures >= self.config.ping_failure_threshold {
                        // Release the in-flight slot first: removal waits
                        // for the counter to drain.
                        drop(guard);
                        self.stop_node_strategy(
                            &peer,
                            "unreachable: ping failure threshold reached",
                            self.config.disconnect_grace(),
                        )
                        .await;
                    }
                }
            }
        }
    }
}
