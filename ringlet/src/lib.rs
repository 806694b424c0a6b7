//! Consistent hashing with bounded loads
//!
//! This re-exports [`ringlet_core`] along with a small bencher for timing
//! lookups.

pub mod bencher;
pub mod errors;

pub use ringlet_core::*;
