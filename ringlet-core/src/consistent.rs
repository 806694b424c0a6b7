//! A thread safe consistent hash ring with bounded loads
//!
//! [`ConsistentHash`] owns a [`Ring`] and a [`Registry`] behind a single
//! reader/writer lock. Lookups share the lock while adding or removing nodes
//! and changing loads take it exclusively.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::bounded::{BoundedLoad, DEFAULT_LOAD_FACTOR};
use crate::conf::RingConf;
use crate::errors::RingError;
use crate::hasher::{Crc32, RingHasher};
use crate::registry::Registry;
use crate::ring::{Ring, DEFAULT_REPLICAS};

/// Everything guarded by our lock
#[derive(Debug)]
struct Inner {
    /// Where every virtual node sits
    ring: Ring,
    /// The load on every node
    registry: Registry,
}

/// Builds a [`ConsistentHash`]
pub struct ConsistentHashBuilder {
    /// The number of virtual nodes per node
    replicas: usize,
    /// The hash to place nodes and keys with
    hasher: Arc<dyn RingHasher>,
    /// How far over the average load a node may go
    load_factor: f64,
}

impl Default for ConsistentHashBuilder {
    fn default() -> Self {
        ConsistentHashBuilder {
            replicas: DEFAULT_REPLICAS,
            hasher: Arc::new(Crc32),
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl ConsistentHashBuilder {
    /// Set the number of virtual nodes per node
    ///
    /// A count of 0 is ignored and the current count is kept.
    ///
    /// # Arguments
    ///
    /// * `replicas` - The number of virtual nodes per node
    #[must_use]
    pub fn replicas(mut self, replicas: usize) -> Self {
        if replicas > 0 {
            self.replicas = replicas;
        }
        self
    }

    /// Set the hash to place nodes and keys with
    ///
    /// # Arguments
    ///
    /// * `hasher` - The hasher to use
    #[must_use]
    pub fn hasher<H: RingHasher + 'static>(mut self, hasher: H) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    /// Set an already shared hasher
    ///
    /// # Arguments
    ///
    /// * `hasher` - The hasher to use
    #[must_use]
    pub fn shared_hasher(mut self, hasher: Arc<dyn RingHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Set how far over the average load a node may go
    ///
    /// # Arguments
    ///
    /// * `load_factor` - The load factor, raised to 1.0 if lower
    #[must_use]
    pub fn load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Build our consistent hash ring
    #[must_use]
    pub fn build(self) -> ConsistentHash {
        // build our empty ring and registry
        let inner = Inner {
            ring: Ring::new(self.replicas, self.hasher),
            registry: Registry::default(),
        };
        ConsistentHash {
            inner: RwLock::new(inner),
            bounded: BoundedLoad::new(self.load_factor),
        }
    }
}

/// A thread safe consistent hash ring with bounded loads
#[derive(Debug)]
pub struct ConsistentHash {
    /// Our ring and registry
    inner: RwLock<Inner>,
    /// The admission rule for bounded load lookups
    bounded: BoundedLoad,
}

impl Default for ConsistentHash {
    fn default() -> Self {
        ConsistentHash::builder().build()
    }
}

impl ConsistentHash {
    /// Create a ring with 20 replicas per node, crc32 and a 1.25 load factor
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a customized ring
    pub fn builder() -> ConsistentHashBuilder {
        ConsistentHashBuilder::default()
    }

    /// Build a ring from config
    ///
    /// # Arguments
    ///
    /// * `conf` - The ring settings to use
    pub fn from_conf(conf: &RingConf) -> Self {
        ConsistentHash::builder()
            .replicas(conf.replicas)
            .shared_hasher(conf.hasher.build())
            .load_factor(conf.load_factor)
            .build()
    }

    /// Add a node to the ring
    ///
    /// Adding a node that is already on the ring does nothing.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the node to add
    #[instrument(name = "ConsistentHash::add", skip(self), err(Debug))]
    pub fn add(&self, name: &str) -> Result<(), RingError> {
        let mut inner = self.inner.write();
        // place this nodes virtual nodes first so a failure registers nothing
        if inner.ring.add(name)? {
            inner.registry.insert(name);
            debug!(name, vnodes = inner.ring.vnode_count(), "added node");
        }
        Ok(())
    }

    /// Remove a node from the ring, dropping its load
    ///
    /// Returns false if this node was not on the ring.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the node to remove
    #[instrument(name = "ConsistentHash::remove", skip(self))]
    pub fn remove(&self, name: &str) -> bool {
        let mut inner = self.inner.write();
        // remove this node from both our ring and our registry
        let removed = inner.ring.remove(name);
        if let Some(node) = inner.registry.remove(name) {
            debug!(name, load = node.load, "removed node");
        }
        removed
    }

    /// Get the node that owns a key
    ///
    /// # Arguments
    ///
    /// * `key` - The key to route
    pub fn get(&self, key: &str) -> Result<String, RingError> {
        let inner = self.inner.read();
        inner.ring.get(key).map(str::to_owned)
    }

    /// Get the first node at or after a keys owner with room for more load
    ///
    /// This does not change any loads; call [`ConsistentHash::incr_load`] once
    /// the returned node is actually used.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to route
    pub fn get_least(&self, key: &str) -> Result<String, RingError> {
        let inner = self.inner.read();
        self.bounded
            .select(&inner.ring, &inner.registry, key)
            .map(str::to_owned)
    }

    /// Record that a node took on one more assignment
    ///
    /// # Arguments
    ///
    /// * `name` - The node to add load to
    #[instrument(name = "ConsistentHash::incr_load", skip(self), err(Debug))]
    pub fn incr_load(&self, name: &str) -> Result<(), RingError> {
        self.inner.write().registry.incr(name)?;
        Ok(())
    }

    /// Record that a node finished one assignment
    ///
    /// Every call must be paired with an earlier [`ConsistentHash::incr_load`];
    /// loads are not stopped at zero.
    ///
    /// # Arguments
    ///
    /// * `name` - The node to remove load from
    #[instrument(name = "ConsistentHash::decr_load", skip(self), err(Debug))]
    pub fn decr_load(&self, name: &str) -> Result<(), RingError> {
        self.inner.write().registry.decr(name)?;
        Ok(())
    }

    /// Overwrite a nodes load
    ///
    /// # Arguments
    ///
    /// * `name` - The node to update
    /// * `load` - The new load for this node
    #[instrument(name = "ConsistentHash::update_load", skip(self), err(Debug))]
    pub fn update_load(&self, name: &str, load: i64) -> Result<(), RingError> {
        self.inner.write().registry.update(name, load)?;
        Ok(())
    }

    /// Get a nodes current load
    ///
    /// # Arguments
    ///
    /// * `name` - The node to get the load of
    pub fn load(&self, name: &str) -> Result<i64, RingError> {
        self.inner
            .read()
            .registry
            .get(name)
            .map(|node| node.load)
            .ok_or_else(|| RingError::ItemNotFound(name.to_owned()))
    }

    /// Get a snapshot of every nodes load
    pub fn loads(&self) -> BTreeMap<String, i64> {
        self.inner
            .read()
            .registry
            .iter()
            .map(|node| (node.name.clone(), node.load))
            .collect()
    }

    /// The sum of every nodes load
    pub fn total_load(&self) -> i64 {
        self.inner.read().registry.total_load()
    }

    /// The admission threshold for bounded lookups
    ///
    /// A node is only picked by [`ConsistentHash::get_least`] while its load
    /// plus one stays at or under this value.
    pub fn threshold(&self) -> i64 {
        self.bounded.threshold(&self.inner.read().registry)
    }

    /// Get the names of every node in sorted order
    pub fn nodes(&self) -> Vec<String> {
        let mut names = self
            .inner
            .read()
            .registry
            .iter()
            .map(|node| node.name.clone())
            .collect::<Vec<String>>();
        names.sort_unstable();
        names
    }

    /// Whether a node is on the ring
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().ring.contains(name)
    }

    /// The number of nodes on the ring
    pub fn len(&self) -> usize {
        self.inner.read().registry.len()
    }

    /// Whether the ring has no nodes
    pub fn is_empty(&self) -> bool {
        self.inner.read().registry.is_empty()
    }

    /// The number of virtual nodes on the ring
    pub fn vnode_count(&self) -> usize {
        self.inner.read().ring.vnode_count()
    }

    /// The number of virtual nodes per node
    pub fn replicas(&self) -> usize {
        self.inner.read().ring.replicas()
    }

    /// How far over the average load a node may go
    pub fn load_factor(&self) -> f64 {
        self.bounded.load_factor()
    }

    /// Get a copy of the sorted virtual node keys
    pub fn sorted_keys(&self) -> Vec<u32> {
        self.inner.read().ring.sorted().to_vec()
    }
}
