//! # Peer Lifecycle Subsystem
//!
//! Tracks an open-ended, churning set of remote peers, gates per-peer
//! operations behind advertised protocol support, and enforces eviction
//! when a peer misbehaves or exceeds its rate budget.
//!
//! ## Architecture
//!
//! The crate follows a hexagonal split:
//! - **Domain:** [`Node`], the runtime record for one remote peer
//! - **Ports:** [`Transport`] (required from the host) and [`PeerOps`]
//!   (the discovery capability set the strategy drives)
//! - **Service:** [`NodeStrategy`] (per-node lifecycle driver) and
//!   [`NetworkService`] (event-to-registry orchestrator implementing
//!   `PeerOps`)
//!
//! ## Failure containment
//!
//! No failure of a per-node operation is allowed to terminate the
//! orchestrator's event loop or the strategy cycle for other nodes. The
//! one distinguished failure is `TransportError::RateLimitExceeded`, which
//! evicts the offending node immediately instead of retrying.

pub mod domain;
pub mod ports;
pub mod service;
pub mod strategy;

pub use domain::Node;
pub use ports::{PeerOps, SharedNode, Transport, TransportEvent};
pub use service::NetworkService;
pub use strategy::NodeStrategy;
