//! Consistent hashing with bounded loads
//!
//! Nodes are placed on a 32 bit hash ring with a configurable number of
//! virtual nodes each. [`ConsistentHash::get`] routes a key to its natural
//! owner while [`ConsistentHash::get_least`] skips owners that are carrying
//! too much load compared to the rest of the ring.

pub mod bounded;
pub mod conf;
pub mod consistent;
pub mod errors;
pub mod hasher;
pub mod registry;
pub mod ring;
pub mod trace;

pub use bounded::BoundedLoad;
pub use conf::Conf;
pub use consistent::{ConsistentHash, ConsistentHashBuilder};
pub use errors::RingError;
pub use hasher::{Crc32, Gx, HasherKind, RingHasher};
pub use registry::Node;
pub use ring::Ring;
