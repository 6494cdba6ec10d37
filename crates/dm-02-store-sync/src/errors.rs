//! Store protocol failures.

use shared_types::StreamError;
use thiserror::Error;

/// Errors surfaced by store exchanges.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller handed over a connection that is not open.
    #[error("connection is not open")]
    ConnectionNotOpen,

    /// The exchange exceeded its deadline; the stream was aborted.
    #[error("store exchange timed out")]
    Timeout,

    /// Stream-level failure during the exchange.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// A payload could not be encoded.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}
