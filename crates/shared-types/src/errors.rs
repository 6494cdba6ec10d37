//! # Error Taxonomy
//!
//! Failure kinds shared between the peer lifecycle and store subsystems.
//!
//! The split matters operationally: `TransportError::RateLimitExceeded` is
//! the one variant that triggers immediate node eviction, and
//! `StreamError::Timeout` must stay distinguishable from ordinary I/O
//! failure so that aborted exchanges are reported correctly.

use thiserror::Error;

/// Errors surfaced by the transport collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The peer exceeded its capacity or rate budget.
    ///
    /// Distinguished from ordinary I/O failure: discovery operations respond
    /// to this by evicting the offending node.
    #[error("rate limit exceeded for peer {0}")]
    RateLimitExceeded(String),

    /// Operation did not complete within its deadline.
    #[error("transport operation timed out")]
    Timeout,

    /// The connection is no longer open.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Dialing the remote address failed.
    #[error("dial failed for {addr}: {reason}")]
    Dial { addr: String, reason: String },

    /// The transport could not resolve a local peer identity.
    #[error("no local peer identity available")]
    NoLocalPeer,

    /// The remote peer does not speak the requested protocol.
    #[error("protocol {0} not supported by remote")]
    UnsupportedProtocol(String),

    /// Any other transport-level failure.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Errors surfaced by protocol streams.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The exchange exceeded its deadline and the stream was aborted.
    ///
    /// Kept distinct from [`StreamError::Io`] so callers can tell a timed-out
    /// exchange from a broken one.
    #[error("stream timed out")]
    Timeout,

    /// The remote end reset the stream.
    #[error("stream reset by remote")]
    Reset,

    /// The stream was already closed.
    #[error("stream closed")]
    Closed,

    /// Any other stream-level failure.
    #[error("stream I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_distinguishable() {
        let err = TransportError::RateLimitExceeded("peer-a".into());
        assert!(matches!(err, TransportError::RateLimitExceeded(_)));
        assert_ne!(err, TransportError::Timeout);
    }

    #[test]
    fn test_stream_timeout_display() {
        assert_eq!(StreamError::Timeout.to_string(), "stream timed out");
        assert_ne!(
            StreamError::Timeout,
            StreamError::Io("timed out".into()),
            "timeout must not collapse into generic I/O"
        );
    }
}
