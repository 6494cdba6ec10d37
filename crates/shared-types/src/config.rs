//! # Network Configuration
//!
//! Knobs consumed by the peer lifecycle and store subsystems. Loaded from
//! TOML by the node runtime; every field carries a default so a missing
//! configuration file yields a working node.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol identifiers each discovery operation is gated on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProtocolIds {
    /// Role discovery protocol.
    pub role: String,
    /// Multiaddress discovery protocol.
    pub multiaddrs: String,
    /// Connected-peer-list discovery protocol.
    pub peer_list: String,
    /// Prefix for the store replication protocol id.
    pub store_prefix: String,
}

impl Default for ProtocolIds {
    fn default() -> Self {
        Self {
            role: "/dmesh/roles/1.0.0".into(),
            multiaddrs: "/dmesh/multiaddrs/1.0.0".into(),
            peer_list: "/dmesh/peer-list/1.0.0".into(),
            store_prefix: "dmesh".into(),
        }
    }
}

/// Configuration for the networking core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Protocol identifiers for gated operations.
    pub protocols: ProtocolIds,
    /// Deadline for a single request/response exchange, in milliseconds.
    pub request_timeout_ms: u64,
    /// Grace period granted to in-flight operations before a node is
    /// removed, in milliseconds.
    pub disconnect_grace_ms: u64,
    /// Interval between strategy discovery cycles, in milliseconds.
    pub strategy_interval_ms: u64,
    /// Consecutive ping failures tolerated before a node is evicted.
    pub ping_failure_threshold: u32,
    /// Maximum concurrent inbound streams for the store protocol.
    pub max_inbound_streams: usize,
    /// Maximum concurrent outbound streams for the store protocol.
    pub max_outbound_streams: usize,
    /// Whether the store protocol runs on resource-limited connections.
    pub run_on_limited_connection: bool,
    /// Maximum number of items the local store retains before evicting the
    /// oldest insertion.
    pub store_capacity: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            protocols: ProtocolIds::default(),
            request_timeout_ms: 10_000,
            disconnect_grace_ms: 10_000,
            strategy_interval_ms: 5_000,
            ping_failure_threshold: 3,
            max_inbound_streams: 32,
            max_outbound_streams: 64,
            run_on_limited_connection: true,
            store_capacity: 65_536,
        }
    }
}

impl NetworkConfig {
    /// Request/response deadline as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Eviction grace period as a [`Duration`].
    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }

    /// Strategy cycle interval as a [`Duration`].
    pub fn strategy_interval(&self) -> Duration {
        Duration::from_millis(self.strategy_interval_ms)
    }
}
