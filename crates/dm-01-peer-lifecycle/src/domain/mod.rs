//! Domain layer: the per-peer runtime record.

mod node;

pub use node::Node;
