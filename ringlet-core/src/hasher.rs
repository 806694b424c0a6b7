//! The hash functions used to place nodes and keys on the ring
//!
//! Any `Fn(&str) -> u32` can be used as a [`RingHasher`] so callers can plug in
//! their own placement hash at construction time.

use gxhash::GxHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::Arc;

/// Maps an arbitrary string onto the 32 bit ring key space
pub trait RingHasher: Send + Sync {
    /// Hash a key onto the ring
    ///
    /// # Arguments
    ///
    /// * `key` - The key to hash
    fn hash(&self, key: &str) -> u32;
}

impl<F> RingHasher for F
where
    F: Fn(&str) -> u32 + Send + Sync,
{
    fn hash(&self, key: &str) -> u32 {
        self(key)
    }
}

/// The IEEE crc32 checksum, the default placement hash
#[derive(Debug, Default, Clone, Copy)]
pub struct Crc32;

impl RingHasher for Crc32 {
    fn hash(&self, key: &str) -> u32 {
        crc32fast::hash(key.as_bytes())
    }
}

/// gxhash truncated down to 32 bits
#[derive(Debug, Default, Clone, Copy)]
pub struct Gx;

impl RingHasher for Gx {
    fn hash(&self, key: &str) -> u32 {
        // build a default hasher
        let mut hasher = GxHasher::default();
        // add our key
        hasher.write(key.as_bytes());
        // keep the low 32 bits as our ring key
        hasher.finish() as u32
    }
}

/// The built in hashers that can be picked from a config file
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HasherKind {
    /// Use the crc32 checksum
    #[default]
    Crc32,
    /// Use gxhash
    Gx,
}

impl HasherKind {
    /// Build the hasher this kind describes
    pub fn build(&self) -> Arc<dyn RingHasher> {
        match self {
            HasherKind::Crc32 => Arc::new(Crc32),
            HasherKind::Gx => Arc::new(Gx),
        }
    }
}
