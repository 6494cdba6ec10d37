//! # Connection & Stream Ports
//!
//! Abstract interfaces over the transport's connection and stream
//! primitives. The host provides concrete implementations (a libp2p-style
//! network stack in production, an in-memory fabric in tests); the
//! subsystems only ever see these traits.

use async_trait::async_trait;

use crate::entities::PeerId;
use crate::errors::StreamError;

/// Liveness of a transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// The connection is established and usable.
    Open,
    /// The connection has been closed or reset.
    Closed,
}

/// A live transport connection to one remote peer.
///
/// A peer may hold several simultaneous connections; each carries its own
/// identifier. Implementations must be cheap to clone behind an `Arc` and
/// safe to query from concurrent tasks.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Transport-assigned identifier, unique per connection.
    fn id(&self) -> u64;

    /// Identity of the remote peer, when known.
    fn remote_peer(&self) -> Option<PeerId>;

    /// Multiaddress of the remote endpoint.
    fn remote_addr(&self) -> String;

    /// Current liveness of this connection.
    fn status(&self) -> ConnectionStatus;

    /// Open a new bidirectional stream negotiated for `protocol`.
    async fn open_stream(&self, protocol: &str) -> Result<Box<dyn MessageStream>, StreamError>;
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id())
            .field("remote_peer", &self.remote_peer())
            .field("remote_addr", &self.remote_addr())
            .field("status", &self.status())
            .finish()
    }
}

/// A bidirectional protocol stream.
///
/// Writes are framed: each `write_all` delivers one complete message to the
/// remote reader. Closing and aborting both release the stream; an aborted
/// stream must not be closed again.
#[async_trait]
pub trait MessageStream: Send {
    /// Read the next complete frame from the remote writer.
    async fn read_frame(&mut self) -> Result<String, StreamError>;

    /// Read until the remote writer closes, concatenating all frames.
    async fn read_to_end(&mut self) -> Result<String, StreamError>;

    /// Write one complete frame.
    async fn write_all(&mut self, payload: &[u8]) -> Result<(), StreamError>;

    /// Close the stream gracefully. Idempotence is not required of
    /// implementations; callers must close at most once.
    async fn close(&mut self) -> Result<(), StreamError>;

    /// Tear the stream down with a reason, signalling the remote end.
    async fn abort(&mut self, reason: StreamError);
}

impl std::fmt::Debug for dyn MessageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream").finish_non_exhaustive()
    }
}
