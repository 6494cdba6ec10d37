//! # Store Sync Subsystem
//!
//! A request/response protocol replicating `(peerId, key, value)` records
//! between peers over bidirectional streams, with a content-addressed
//! in-process store.
//!
//! Records are keyed by `sha256(peerId ":" key)`; later writes for the
//! same pair overwrite earlier ones (last-write-wins, no version vector).
//! Every exchange is bounded by a configured timeout; expiry aborts the
//! stream with a timeout-specific error distinct from ordinary I/O
//! failure.

pub mod constants;
pub mod errors;
pub mod service;

pub use constants::{DEFAULT_PROTOCOL_PREFIX, PROTOCOL_NAME, PROTOCOL_VERSION};
pub use errors::StoreError;
pub use service::StoreService;
