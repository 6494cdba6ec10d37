//! # Ledger Subsystem
//!
//! Immutable-after-seal ledger blocks chained by SHA-256 digests over a
//! Merkle-aggregated transaction set.
//!
//! A block is valid only if (1) the delegate set recorded in the block
//! matches what the external selection function computes for the block's
//! own fields, and (2) the stored hash matches a recomputation over the
//! current field values. The two checks are independent; both must hold.
//!
//! ## Append & Seal
//!
//! Appending a transaction or contract does **not** refresh the derived
//! `merkle_root`/`hash` fields. Every append returns a `#[must_use]`
//! [`NeedsReseal`] marker; callers must invoke [`Block::seal`] before
//! validating or broadcasting, or the block stays permanently invalid.

pub mod block;
pub mod delegates;

pub use block::{Block, NeedsReseal};
pub use delegates::DelegateSelector;
