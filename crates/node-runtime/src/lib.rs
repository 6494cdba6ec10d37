//! # Node Runtime Library
//!
//! Exposes the runtime's configuration and adapters for the integration
//! suite. The binary entry point lives in `main.rs`.

#![warn(missing_docs)]

pub mod adapters;
pub mod config;

pub use adapters::{DigestDelegateSelector, MemoryEndpoint, MemoryFabric};
pub use config::RuntimeConfig;
