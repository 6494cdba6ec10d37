//! Protocol identity for the store exchange.
//!
//! The negotiated identifier is `/<prefix>/<name>/<version>`; the prefix
//! comes from configuration, name and version are fixed here.

/// Protocol name segment.
pub const PROTOCOL_NAME: &str = "store";

/// Protocol version segment.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Prefix used when configuration does not supply one.
pub const DEFAULT_PROTOCOL_PREFIX: &str = "dmesh";

/// Build the full protocol identifier.
pub fn protocol_id(prefix: &str) -> String {
    format!("/{prefix}/{PROTOCOL_NAME}/{PROTOCOL_VERSION}")
}
