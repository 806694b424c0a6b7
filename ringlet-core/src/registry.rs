//! The nodes on a ring and how much load each of them is carrying

use std::collections::HashMap;

use crate::errors::RingError;

/// A single node and its current load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// The name of this node
    pub name: String,
    /// The number of assignments currently checked out to this node
    pub load: i64,
}

impl Node {
    /// Create a new node with no load
    ///
    /// # Arguments
    ///
    /// * `name` - The name of this node
    pub fn new<T: Into<String>>(name: T) -> Self {
        Node {
            name: name.into(),
            load: 0,
        }
    }
}

/// Tracks every registered node and the total load across all of them
///
/// Load arithmetic wraps on overflow, so the total always equals the wrapping
/// sum of every nodes load. Decrementing is not bounded at zero: callers must
/// pair every [`Registry::decr`] with an earlier [`Registry::incr`].
#[derive(Debug, Default, Clone)]
pub struct Registry {
    /// The nodes we know about
    nodes: HashMap<String, Node>,
    /// The sum of every nodes load
    total_load: i64,
}

impl Registry {
    /// Register a new node with no load
    ///
    /// Returns false if this node was already registered.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the node to register
    pub fn insert(&mut self, name: &str) -> bool {
        if self.nodes.contains_key(name) {
            return false;
        }
        self.nodes.insert(name.to_owned(), Node::new(name));
        true
    }

    /// Remove a node and drop its load from our total
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the node to remove
    pub fn remove(&mut self, name: &str) -> Option<Node> {
        let node = self.nodes.remove(name)?;
        // this nodes load leaves with it
        self.total_load = self.total_load.wrapping_sub(node.load);
        Some(node)
    }

    /// Get a node by name
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Get a mutable node or fail with [`RingError::ItemNotFound`]
    fn get_mut(&mut self, name: &str) -> Result<&mut Node, RingError> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| RingError::ItemNotFound(name.to_owned()))
    }

    /// Add one to a nodes load, returning its new load
    ///
    /// # Arguments
    ///
    /// * `name` - The node to add load to
    pub fn incr(&mut self, name: &str) -> Result<i64, RingError> {
        self.adjust(name, 1)
    }

    /// Remove one from a nodes load, returning its new load
    ///
    /// # Arguments
    ///
    /// * `name` - The node to remove load from
    pub fn decr(&mut self, name: &str) -> Result<i64, RingError> {
        self.adjust(name, -1)
    }

    /// Shift a nodes load and our total load by the same amount
    fn adjust(&mut self, name: &str, delta: i64) -> Result<i64, RingError> {
        // get the node to adjust
        let node = self.get_mut(name)?;
        node.load = node.load.wrapping_add(delta);
        let load = node.load;
        self.total_load = self.total_load.wrapping_add(delta);
        Ok(load)
    }

    /// Overwrite a nodes load, returning its previous load
    ///
    /// # Arguments
    ///
    /// * `name` - The node to update
    /// * `load` - The new load for this node
    pub fn update(&mut self, name: &str, load: i64) -> Result<i64, RingError> {
        // get the node to update
        let node = self.get_mut(name)?;
        // swap in our new load
        let old = std::mem::replace(&mut node.load, load);
        // move our total by the difference
        self.total_load = self.total_load.wrapping_add(load.wrapping_sub(old));
        Ok(old)
    }

    /// Iterate over every registered node
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// The sum of every nodes load
    pub fn total_load(&self) -> i64 {
        self.total_load
    }

    /// The number of registered nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes are registered
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn incr_then_decr_restores_load() {
        let mut registry = Registry::default();
        registry.insert("a");
        registry.update("a", 3).unwrap();
        assert_eq!(registry.incr("a").unwrap(), 4);
        assert_eq!(registry.total_load(), 4);
        assert_eq!(registry.decr("a").unwrap(), 3);
        assert_eq!(registry.total_load(), 3);
    }

    #[test]
    fn update_moves_total_by_delta() {
        let mut registry = Registry::default();
        registry.insert("a");
        registry.insert("b");
        registry.incr("b").unwrap();
        registry.incr("a").unwrap();
        registry.incr("a").unwrap();
        assert_eq!(registry.update("a", 5).unwrap(), 2);
        assert_eq!(registry.get("a").unwrap().load, 5);
        assert_eq!(registry.total_load(), 6);
    }

    #[test]
    fn unknown_nodes_are_not_found() {
        let mut registry = Registry::default();
        assert!(matches!(registry.incr("x"), Err(RingError::ItemNotFound(name)) if name == "x"));
        assert!(matches!(registry.decr("x"), Err(RingError::ItemNotFound(_))));
        assert!(matches!(registry.update("x", 1), Err(RingError::ItemNotFound(_))));
        assert_eq!(registry.total_load(), 0);
    }

    #[test]
    fn unpaired_decr_goes_negative() {
        let mut registry = Registry::default();
        registry.insert("a");
        assert_eq!(registry.decr("a").unwrap(), -1);
        assert_eq!(registry.total_load(), -1);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut registry = Registry::default();
        assert!(registry.insert("a"));
        registry.incr("a").unwrap();
        assert!(!registry.insert("a"));
        assert_eq!(registry.get("a").unwrap().load, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_drops_load_from_total() {
        let mut registry = Registry::default();
        registry.insert("a");
        registry.insert("b");
        registry.update("a", 4).unwrap();
        registry.update("b", 2).unwrap();
        let removed = registry.remove("a").unwrap();
        assert_eq!(removed.load, 4);
        assert_eq!(registry.total_load(), 2);
        assert!(registry.remove("a").is_none());
    }

    #[test]
    fn extreme_loads_wrap_instead_of_panicking() {
        let mut registry = Registry::default();
        registry.insert("a");
        registry.insert("b");
        registry.update("a", i64::MAX).unwrap();
        assert_eq!(registry.total_load(), i64::MAX);
        // pushing the total past i64::MAX wraps it
        assert_eq!(registry.incr("b").unwrap(), 1);
        assert_eq!(registry.total_load(), i64::MIN);
        // so does a node going past i64::MAX
        assert_eq!(registry.incr("a").unwrap(), i64::MIN);
        assert_eq!(registry.total_load(), i64::MIN.wrapping_add(1));
        // removing the node takes its load back out
        registry.remove("a");
        assert_eq!(registry.total_load(), 1);
    }

    #[test]
    fn update_to_min_from_positive_load() {
        let mut registry = Registry::default();
        registry.insert("a");
        registry.incr("a").unwrap();
        assert_eq!(registry.update("a", i64::MIN).unwrap(), 1);
        assert_eq!(registry.get("a").unwrap().load, i64::MIN);
        assert_eq!(registry.total_load(), i64::MIN);
        assert_eq!(registry.update("a", 0).unwrap(), i64::MIN);
        assert_eq!(registry.total_load(), 0);
    }

    /// The load operations a property test can apply
    #[derive(Debug, Clone)]
    enum Op {
        Incr(usize),
        Decr(usize),
        Update(usize, i64),
        Remove(usize),
        Insert(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize).prop_map(Op::Incr),
            (0..4usize).prop_map(Op::Decr),
            (0..4usize, -50..50i64).prop_map(|(n, l)| Op::Update(n, l)),
            (0..4usize, prop_oneof![Just(i64::MIN), Just(i64::MAX)])
                .prop_map(|(n, l)| Op::Update(n, l)),
            (0..4usize).prop_map(Op::Remove),
            (0..4usize).prop_map(Op::Insert),
        ]
    }

    proptest! {
        /// Property: the running total always equals the sum of loads
        #[test]
        fn prop_total_matches_sum(ops in prop::collection::vec(op(), 0..200)) {
            let mut registry = Registry::default();
            for op in ops {
                let _ = match op {
                    Op::Incr(n) => registry.incr(&format!("n{n}")).map(|_| ()),
                    Op::Decr(n) => registry.decr(&format!("n{n}")).map(|_| ()),
                    Op::Update(n, l) => registry.update(&format!("n{n}"), l).map(|_| ()),
                    Op::Remove(n) => { registry.remove(&format!("n{n}")); Ok(()) }
                    Op::Insert(n) => { registry.insert(&format!("n{n}")); Ok(()) }
                };
                let sum = registry
                    .iter()
                    .fold(0i64, |sum, node| sum.wrapping_add(node.load));
                prop_assert_eq!(registry.total_load(), sum);
            }
        }
    }
}
