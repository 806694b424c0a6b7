//! Consistent hashing with bounded loads
//!
//! Keys still walk the ring clockwise from their natural owner, but a node is
//! skipped once its load would rise past `ceil(avg * load_factor)`. The walk
//! covers at most one full revolution of the ring.

use std::collections::HashSet;

use tracing::trace;

use crate::errors::RingError;
use crate::registry::{Node, Registry};
use crate::ring::Ring;

/// How far over the average load a node may go by default
pub const DEFAULT_LOAD_FACTOR: f64 = 1.25;

/// Picks the first node on the ring that has room for more load
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedLoad {
    /// How far over the average load a node may go
    load_factor: f64,
}

impl Default for BoundedLoad {
    fn default() -> Self {
        BoundedLoad {
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl BoundedLoad {
    /// Create a new bounded load selector
    ///
    /// Factors below 1.0 (or NaN) are raised to 1.0 so that at least the
    /// average load always fits somewhere.
    ///
    /// # Arguments
    ///
    /// * `load_factor` - How far over the average load a node may go
    pub fn new(load_factor: f64) -> Self {
        let load_factor = if load_factor.is_nan() {
            1.0
        } else {
            load_factor.max(1.0)
        };
        BoundedLoad { load_factor }
    }

    /// How far over the average load a node may go
    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// The most load a node may carry after taking one more assignment
    ///
    /// This is `ceil(max(1, (total + 1) / nodes) * load_factor)` with negative
    /// totals treated as 0.
    ///
    /// # Arguments
    ///
    /// * `registry` - The nodes and their current loads
    pub fn threshold(&self, registry: &Registry) -> i64 {
        // nothing is registered so nothing can be admitted
        if registry.is_empty() {
            return 0;
        }
        // unpaired decrements can push our total under 0
        let total = registry.total_load().max(0);
        // get the average load including the assignment we are placing
        let avg = ((total as f64 + 1.0) / registry.len() as f64).max(1.0);
        (avg * self.load_factor).ceil() as i64
    }

    /// Check if a node has room for one more assignment
    ///
    /// # Arguments
    ///
    /// * `node` - The node to check
    /// * `threshold` - The threshold from [`BoundedLoad::threshold`]
    fn admits(node: &Node, threshold: i64) -> bool {
        node.load.saturating_add(1) <= threshold
    }

    /// Pick the node that should take a key
    ///
    /// Returns the first node clockwise from the keys natural owner that has
    /// room for more load. If no node has room the least loaded node seen is
    /// returned instead, preferring nodes closer to the natural owner.
    ///
    /// # Arguments
    ///
    /// * `ring` - The ring to walk
    /// * `registry` - The nodes and their current loads
    /// * `key` - The key to route
    pub fn select<'a>(
        &self,
        ring: &'a Ring,
        registry: &'a Registry,
        key: &str,
    ) -> Result<&'a str, RingError> {
        // we can't route anything without nodes
        if ring.is_empty() || registry.is_empty() {
            return Err(RingError::EmptyCircle);
        }
        // get our admission threshold once for this whole walk
        let threshold = self.threshold(registry);
        // start at this keys natural owner
        let start = ring.successor(ring.hash_key(key));
        let vnodes = ring.vnode_count();
        // track the nodes we already rejected
        let mut checked = HashSet::with_capacity(registry.len());
        let mut fallback: Option<&'a Node> = None;
        // walk the ring at most once
        for step in 0..vnodes {
            let Some(name) = ring.owner_at((start + step) % vnodes) else {
                continue;
            };
            // a rejected node stays rejected for the rest of this walk
            if !checked.insert(name) {
                continue;
            }
            let Some(node) = registry.get(name) else {
                continue;
            };
            if Self::admits(node, threshold) {
                if step > 0 {
                    trace!(key, node = name, step, threshold, "overflowed past loaded nodes");
                }
                return Ok(node.name.as_str());
            }
            // remember the least loaded node in case nothing has room
            if fallback.map_or(true, |best| node.load < best.load) {
                fallback = Some(node);
            }
            // every node has been rejected
            if checked.len() == registry.len() {
                break;
            }
        }
        let node = fallback.ok_or(RingError::EmptyCircle)?;
        trace!(key, node = %node.name, threshold, "no node under threshold");
        Ok(node.name.as_str())
    }
}
