//! Port traits: what this subsystem requires from the host transport and
//! the discovery capability set the strategy drives.

mod ops;
mod transport;

pub use ops::{PeerOps, SharedNode};
pub use transport::{Transport, TransportEvent};
