//! # Shared Types
//!
//! Cross-subsystem type definitions for Delegate-Mesh.
//!
//! ## Clusters
//!
//! - **Ledger**: `Transaction`, `SmartContract`, `ContractTransaction`
//! - **Replication**: `StoreItem`, `StoreRequest`
//! - **Networking**: `PeerId`, `Connection`, `MessageStream`, `TransportError`
//! - **Configuration**: `NetworkConfig`

pub mod config;
pub mod connection;
pub mod entities;
pub mod errors;

pub use config::NetworkConfig;
pub use connection::{Connection, ConnectionStatus, MessageStream};
pub use entities::{
    ContractTransaction, PeerId, SmartContract, StoreItem, StoreRequest, Transaction,
};
pub use errors::{StreamError, TransportError};
