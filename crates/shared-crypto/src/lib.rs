//! # Shared Crypto
//!
//! Pure hashing primitives for the ledger and the replicated store:
//! SHA-256 hex digests and Merkle root aggregation.
//!
//! Everything in this crate is deterministic and free of I/O.

pub mod hashing;
pub mod merkle;

pub use hashing::{sha256_concat_hex, sha256_hex};
pub use merkle::{merkle_root, EMPTY_MERKLE_ROOT};
