//! The hash ring for ringlet
//!
//! Every node gets `replicas` virtual nodes placed on a circular 32 bit key
//! space. A key is owned by the first virtual node strictly after its hash,
//! wrapping back to the start of the ring.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::errors::RingError;
use crate::hasher::RingHasher;

/// The number of virtual nodes each node gets by default
pub const DEFAULT_REPLICAS: usize = 20;

/// The size of the full ring key space
const KEY_SPACE: u64 = 1 << 32;

/// The placement of virtual nodes onto a circular key space
#[derive(Clone)]
pub struct Ring {
    /// The number of virtual nodes to place for each node
    replicas: usize,
    /// The hash used to place virtual nodes and lookup keys
    hasher: Arc<dyn RingHasher>,
    /// The ring itself: virtual node key -> owning node
    circle: HashMap<u32, String>,
    /// The keys in our circle in ascending order
    ///
    /// Only [`Ring::rebuild`] writes to this.
    sorted: Vec<u32>,
    /// The keys each node actually landed on after probing
    placed: HashMap<String, Vec<u32>>,
    /// The number of distinct keys probing can use
    key_space: u64,
}

impl std::fmt::Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("replicas", &self.replicas)
            .field("nodes", &self.placed.len())
            .field("vnodes", &self.sorted.len())
            .finish()
    }
}

impl Ring {
    /// Create a new empty ring
    ///
    /// # Arguments
    ///
    /// * `replicas` - The number of virtual nodes per node (at least 1)
    /// * `hasher` - The hash to place nodes and keys with
    pub fn new(replicas: usize, hasher: Arc<dyn RingHasher>) -> Self {
        Ring {
            replicas: replicas.max(1),
            hasher,
            circle: HashMap::default(),
            sorted: Vec::default(),
            placed: HashMap::default(),
            key_space: KEY_SPACE,
        }
    }

    /// Shrink the key space probing can use so collisions are easy to force
    ///
    /// # Arguments
    ///
    /// * `key_space` - The number of usable keys
    #[cfg(test)]
    pub(crate) fn with_key_space(mut self, key_space: u64) -> Self {
        self.key_space = key_space.clamp(1, KEY_SPACE);
        self
    }

    /// Hash a key onto our ring
    ///
    /// # Arguments
    ///
    /// * `key` - The key to hash
    pub fn hash_key(&self, key: &str) -> u32 {
        // a full key space leaves the hash untouched
        (u64::from(self.hasher.hash(key)) % self.key_space) as u32
    }

    /// Get the key after this one, wrapping at the end of the key space
    fn next_key(&self, key: u32) -> u32 {
        ((u64::from(key) + 1) % self.key_space) as u32
    }

    /// Find the first free slot at or after a key
    ///
    /// # Arguments
    ///
    /// * `start` - The key to start probing at
    /// * `pending` - Keys claimed by replicas that are not committed yet
    fn probe(&self, start: u32, pending: &HashSet<u32>) -> Result<u32, RingError> {
        let mut key = start;
        // keep stepping forward until we find an unused slot
        while self.circle.contains_key(&key) || pending.contains(&key) {
            key = self.next_key(key);
            // we came all the way around so there is no room left
            if key == start {
                return Err(RingError::FullCircle);
            }
        }
        Ok(key)
    }

    /// Add a node to our ring
    ///
    /// Returns false if this node was already on the ring. Every replica slot
    /// is found before any of them are committed, so a [`RingError::FullCircle`]
    /// leaves the ring untouched.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the node to add
    pub fn add(&mut self, name: &str) -> Result<bool, RingError> {
        // empty names can't be told apart in our replica keys
        if name.is_empty() {
            return Err(RingError::InvalidName);
        }
        // adding a node twice does nothing
        if self.placed.contains_key(name) {
            return Ok(false);
        }
        // find a slot for each of our virtual nodes
        let mut keys = Vec::with_capacity(self.replicas);
        let mut pending = HashSet::with_capacity(self.replicas);
        for replica in 0..self.replicas {
            // get the natural position for this replica
            let natural = self.hash_key(&format!("{replica}_{name}"));
            // move forward past any collisions
            let key = self.probe(natural, &pending)?;
            if key != natural {
                debug!(name, replica, natural, key, "probed past a ring collision");
            }
            pending.insert(key);
            keys.push(key);
        }
        // commit all of our virtual nodes
        for key in &keys {
            self.circle.insert(*key, name.to_owned());
        }
        self.placed.insert(name.to_owned(), keys);
        // rebuild our sorted keys
        self.rebuild();
        Ok(true)
    }

    /// Remove a node and all of its virtual nodes from our ring
    ///
    /// Returns false if this node was not on the ring.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the node to remove
    pub fn remove(&mut self, name: &str) -> bool {
        // remove the keys this node actually landed on
        let removed = match self.placed.remove(name) {
            Some(keys) => {
                for key in keys {
                    self.circle.remove(&key);
                }
                true
            }
            None => false,
        };
        self.rebuild();
        removed
    }

    /// Rebuild our sorted keys from the circle
    fn rebuild(&mut self) {
        // get all of the keys currently on the ring
        let mut sorted = self.circle.keys().copied().collect::<Vec<u32>>();
        // keys in a map are unique so we only need to sort them
        sorted.sort_unstable();
        self.sorted = sorted;
    }

    /// Get the index of the first virtual node strictly after a hash
    ///
    /// This wraps to 0 when no virtual node is after this hash. The ring
    /// must not be empty.
    ///
    /// # Arguments
    ///
    /// * `hash` - The hash to find the successor of
    pub fn successor(&self, hash: u32) -> usize {
        // find the first key greater then our hash
        let index = self.sorted.partition_point(|key| *key <= hash);
        // wrap around if we fell off the end of the ring
        if index == self.sorted.len() {
            0
        } else {
            index
        }
    }

    /// Get the virtual node key for a hash
    ///
    /// # Arguments
    ///
    /// * `hash` - The hash to search for
    pub fn search(&self, hash: u32) -> Option<u32> {
        if self.sorted.is_empty() {
            return None;
        }
        Some(self.sorted[self.successor(hash)])
    }

    /// Get the node owning the virtual node at an index in our sorted keys
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the virtual node
    pub fn owner_at(&self, index: usize) -> Option<&str> {
        // get the key at this index
        let key = self.sorted.get(index)?;
        self.circle.get(key).map(String::as_str)
    }

    /// Get the node that owns a key
    ///
    /// # Arguments
    ///
    /// * `key` - The key to route
    pub fn get(&self, key: &str) -> Result<&str, RingError> {
        // find the virtual node this key falls on
        let vnode = self
            .search(self.hash_key(key))
            .ok_or(RingError::EmptyCircle)?;
        // get the node that owns this virtual node
        self.circle
            .get(&vnode)
            .map(String::as_str)
            .ok_or(RingError::EmptyCircle)
    }

    /// Whether a node is on this ring
    pub fn contains(&self, name: &str) -> bool {
        self.placed.contains_key(name)
    }

    /// The keys a node was placed at
    pub fn placements(&self, name: &str) -> Option<&[u32]> {
        self.placed.get(name).map(Vec::as_slice)
    }

    /// The sorted keys of every virtual node
    pub fn sorted(&self) -> &[u32] {
        &self.sorted
    }

    /// The number of virtual nodes per node
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// The number of nodes on this ring
    pub fn node_count(&self) -> usize {
        self.placed.len()
    }

    /// The number of virtual nodes on this ring
    pub fn vnode_count(&self) -> usize {
        self.sorted.len()
    }

    /// Whether this ring has no virtual nodes
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Crc32;

    fn ring(replicas: usize) -> Ring {
        Ring::new(replicas, Arc::new(Crc32))
    }

    /// A hasher that puts every key on the same spot
    fn constant(key: u32) -> Arc<dyn RingHasher> {
        Arc::new(move |_: &str| key)
    }

    #[test]
    fn rebuild_keeps_keys_sorted() {
        let mut ring = ring(1);
        ring.circle.insert(1000, "1000".to_owned());
        ring.circle.insert(10000, "10000".to_owned());
        ring.rebuild();
        assert_eq!(ring.sorted(), &[1000, 10000]);
        ring.circle.insert(5000, "5000".to_owned());
        ring.rebuild();
        assert_eq!(ring.sorted(), &[1000, 5000, 10000]);
    }

    #[test]
    fn search_finds_strict_successor() {
        let mut ring = ring(1);
        ring.sorted = vec![5000, 10000, 1000000];
        assert_eq!(ring.search(6000), Some(10000));
        // an exact hit moves on to the next key
        assert_eq!(ring.search(10000), Some(1000000));
        // nothing is past this so we wrap to the start
        assert_eq!(ring.search(5000000), Some(5000));
        assert_eq!(ring.search(0), Some(5000));
        assert_eq!(ring.search(u32::MAX), Some(5000));
    }

    #[test]
    fn search_on_empty_ring() {
        assert_eq!(ring(1).search(42), None);
    }

    #[test]
    fn get_on_empty_ring_fails() {
        assert!(matches!(ring(3).get("key"), Err(RingError::EmptyCircle)));
    }

    #[test]
    fn add_places_every_replica() {
        let mut ring = ring(20);
        assert!(ring.add("node-a").unwrap());
        assert!(ring.add("node-b").unwrap());
        assert_eq!(ring.node_count(), 2);
        assert_eq!(ring.vnode_count(), 40);
        assert_eq!(ring.placements("node-a").unwrap().len(), 20);
    }

    #[test]
    fn add_is_idempotent() {
        let mut ring = ring(20);
        assert!(ring.add("node-a").unwrap());
        let sorted = ring.sorted().to_vec();
        assert!(!ring.add("node-a").unwrap());
        assert_eq!(ring.sorted(), sorted.as_slice());
        assert_eq!(ring.node_count(), 1);
    }

    #[test]
    fn add_rejects_empty_names() {
        let mut ring = ring(2);
        assert!(matches!(ring.add(""), Err(RingError::InvalidName)));
        assert!(ring.is_empty());
    }

    #[test]
    fn replica_keys_use_index_and_name() {
        let mut ring = ring(3);
        ring.add("cache").unwrap();
        let mut expected = (0..3)
            .map(|i| crc32fast::hash(format!("{i}_cache").as_bytes()))
            .collect::<Vec<u32>>();
        expected.sort_unstable();
        assert_eq!(ring.sorted(), expected.as_slice());
    }

    #[test]
    fn collisions_probe_forward() {
        let mut ring = Ring::new(3, constant(7));
        ring.add("a").unwrap();
        assert_eq!(ring.sorted(), &[7, 8, 9]);
        ring.add("b").unwrap();
        assert_eq!(ring.placements("b").unwrap(), &[10, 11, 12]);
    }

    #[test]
    fn probing_wraps_at_end_of_key_space() {
        let mut ring = Ring::new(3, constant(u32::MAX));
        ring.add("a").unwrap();
        assert_eq!(ring.placements("a").unwrap(), &[u32::MAX, 0, 1]);
    }

    #[test]
    fn remove_clears_probed_entries() {
        let mut ring = Ring::new(4, constant(100));
        ring.add("a").unwrap();
        ring.add("b").unwrap();
        assert!(ring.remove("b"));
        assert_eq!(ring.sorted(), &[100, 101, 102, 103]);
        assert!(ring.remove("a"));
        assert!(ring.is_empty());
        assert!(ring.circle.is_empty());
    }

    #[test]
    fn remove_unknown_node_is_a_noop() {
        let mut ring = ring(5);
        ring.add("a").unwrap();
        assert!(!ring.remove("b"));
        assert_eq!(ring.vnode_count(), 5);
    }

    #[test]
    fn full_circle_leaves_ring_untouched() {
        let mut ring = Ring::new(3, constant(0)).with_key_space(8);
        ring.add("a").unwrap();
        ring.add("b").unwrap();
        let before = ring.sorted().to_vec();
        // only 2 slots are left for 3 replicas
        assert!(matches!(ring.add("c"), Err(RingError::FullCircle)));
        assert_eq!(ring.sorted(), before.as_slice());
        assert!(!ring.contains("c"));
        assert_eq!(ring.circle.len(), 6);
    }

    #[test]
    fn full_circle_from_own_replicas() {
        let mut ring = Ring::new(5, constant(2)).with_key_space(4);
        assert!(matches!(ring.add("a"), Err(RingError::FullCircle)));
        assert!(ring.is_empty());
    }

    #[test]
    fn get_routes_to_successor_owner() {
        // place each node at the number in its name
        let hasher = Arc::new(|key: &str| {
            key.rsplit('_')
                .next()
                .and_then(|num| num.parse::<u32>().ok())
                .unwrap_or(0)
        });
        let mut ring = Ring::new(1, hasher);
        ring.add("100").unwrap();
        ring.add("200").unwrap();
        assert_eq!(ring.get("50").unwrap(), "100");
        assert_eq!(ring.get("100").unwrap(), "200");
        assert_eq!(ring.get("150").unwrap(), "200");
        assert_eq!(ring.get("250").unwrap(), "100");
    }
}
