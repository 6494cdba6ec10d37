//! # Port Adapters
//!
//! Concrete implementations of the port traits the subsystems depend on:
//! an in-memory transport fabric and a deterministic delegate selector.

pub mod delegates;
pub mod memory;

pub use delegates::DigestDelegateSelector;
pub use memory::{
    InboundHandler, MemoryConnection, MemoryEndpoint, MemoryFabric, MemoryStream,
    ScriptedDiscovery, StreamProbe,
};
