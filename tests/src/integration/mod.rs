//! Cross-subsystem integration flows.

pub mod ledger_validation;
pub mod peer_lifecycle;
pub mod store_replication;
