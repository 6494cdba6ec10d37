//! # Delegate-Mesh Test Suite
//!
//! Unified test crate for cross-subsystem flows over the in-memory
//! transport fabric.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── peer_lifecycle.rs    # Registry, discovery, eviction flows
//!     ├── store_replication.rs # Store protocol end to end
//!     └── ledger_validation.rs # Block sealing across nodes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dm-tests
//! cargo test -p dm-tests integration::
//! ```

pub mod integration;
