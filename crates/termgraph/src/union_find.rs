//! A disjoint-set forest over payload-carrying nodes, and a union-find
//! structure keying that forest by ordered values

use std::{
    fmt, mem,
    sync::atomic::{self, AtomicUsize},
};

use crate::ord_map::OrdMap;

/// Dense handle to a node in a [`Forest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeId(usize);

/// Error indicating a node ID passed to a [`Forest`] operation does not
/// exist.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("no forest node found with ID {0}")]
pub struct NoNode(pub usize);

/// Outcome of [`Forest::union`]. `unioned` holds the root that was absorbed,
/// or None if the two nodes were already equivalent.
#[derive(Debug, Clone, Copy)]
pub struct Unioned {
    pub root: NodeId,
    pub unioned: Option<NodeId>,
}

impl Unioned {
    #[inline]
    #[must_use]
    pub fn did_merge(self) -> bool { self.unioned.is_some() }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    parent: AtomicUsize,
    rank: u32,
}

impl<T: Clone> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            parent: self.parent.load(atomic::Ordering::Relaxed).into(),
            rank: self.rank,
        }
    }
}

/// An in-tree forest of disjoint sets, each node carrying an immutable
/// payload value
///
/// The parent links are atomics so that [`find`](Self::find) can compress
/// paths behind a shared reference.
#[derive(Debug, Clone, Default)]
#[repr(transparent)]
pub struct Forest<T>(Vec<Node<T>>);

impl<T> Forest<T> {
    #[must_use]
    #[inline]
    pub fn new() -> Self { Self(Vec::new()) }

    /// Gets the number of nodes in the forest
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize { self.0.len() }

    /// Returns true if the forest has no nodes
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Add a new singleton node to the forest, returning its ID
    pub fn push(&mut self, value: T) -> NodeId {
        let key = self.0.len();
        self.0.push(Node {
            value,
            parent: key.into(),
            rank: 0,
        });
        NodeId(key)
    }

    /// The payload value of the given node
    ///
    /// # Errors
    /// Returns an error if no node has the given ID.
    pub fn value(&self, id: NodeId) -> Result<&T, NoNode> {
        self.0.get(id.0).map(|n| &n.value).ok_or(NoNode(id.0))
    }

    /// Find the root ID of the given node's tree, re-parenting every node on
    /// the searched path directly to the root
    ///
    /// # Errors
    /// This method first checks if the node ID is valid, returning an error
    /// if no associated node can be found.
    pub fn find(&self, id: NodeId) -> Result<NodeId, NoNode> {
        let key = id.0;
        let node = self.0.get(key).ok_or(NoNode(key))?;
        let parent = node.parent.load(atomic::Ordering::SeqCst);

        if parent == key {
            Ok(NodeId(parent))
        } else {
            let root = self
                .find(NodeId(parent))
                .unwrap_or_else(|_| unreachable!());

            let prev = node.parent.compare_exchange(
                parent,
                root.0,
                atomic::Ordering::SeqCst,
                atomic::Ordering::SeqCst,
            );
            debug_assert!(prev == Ok(parent) || prev == Err(root.0));

            Ok(root)
        }
    }

    /// Perform the in-place union of the trees containing the two given
    /// nodes, linking the lower-rank root under the higher-rank root
    ///
    /// Ranks increment only when the two roots tie, in which case the root
    /// found for `a` survives.
    ///
    /// # Errors
    /// This method first checks if both node IDs are valid, returning an
    /// error if either cannot be found.
    pub fn union(&mut self, a: NodeId, b: NodeId) -> Result<Unioned, NoNode> {
        let mut a = self.find(a)?.0;
        let mut b = self.find(b)?.0;

        if a == b {
            return Ok(Unioned {
                root: NodeId(a),
                unioned: None,
            });
        }

        let a_rank = self.0[a].rank;
        let b_rank = self.0[b].rank;

        if a_rank < b_rank {
            mem::swap(&mut a, &mut b);
        } else if a_rank == b_rank {
            self.0[a].rank += 1;
        }

        self.0[b].parent = a.into();

        Ok(Unioned {
            root: NodeId(a),
            unioned: Some(NodeId(b)),
        })
    }
}

/// A union-find structure over comparable values, registering each value as
/// a payload-carrying [`Forest`] node
#[derive(Debug, Clone, Default)]
pub struct UnionFind<T> {
    forest: Forest<T>,
    index: OrdMap<T, NodeId>,
}

#[inline]
fn known<T>(res: Result<T, NoNode>) -> T { res.unwrap_or_else(|_| unreachable!()) }

impl<T> UnionFind<T> {
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            forest: Forest::new(),
            index: OrdMap::new(),
        }
    }

    /// Gets the number of registered values
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize { self.forest.len() }

    /// Returns true if no values have been registered
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool { self.forest.is_empty() }

    /// The payload value of the given node. IDs minted by
    /// [`add`](Self::add) are always live.
    #[must_use]
    pub fn value(&self, id: NodeId) -> &T { known(self.forest.value(id)) }

    /// Find the root of the given node's tree
    #[must_use]
    pub fn find(&self, id: NodeId) -> NodeId { known(self.forest.find(id)) }

    /// Union the trees containing the two given nodes
    pub fn union(&mut self, a: NodeId, b: NodeId) -> Unioned { known(self.forest.union(a, b)) }
}

impl<T: Ord + Clone> UnionFind<T> {
    /// Idempotently register a value, returning its node and whether it was
    /// already present
    pub fn add(&mut self, value: T) -> (NodeId, bool) {
        let forest = &mut self.forest;
        let (&id, existed) = self.index.get_or_put(value.clone(), || forest.push(value));
        (id, existed)
    }
}

impl<T: Ord> UnionFind<T> {
    /// Look up the node registered for a value
    #[must_use]
    pub fn get(&self, value: &T) -> Option<NodeId> { self.index.get(value).copied() }

    /// Look up the node registered for a value, treating absence as a usage
    /// fault
    ///
    /// # Panics
    /// Panics if the value was never registered.
    #[must_use]
    pub fn must_get(&self, value: &T) -> NodeId
    where T: fmt::Debug {
        self.get(value)
            .unwrap_or_else(|| panic!("value {value:?} not found in union-find structure"))
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::{Forest, UnionFind};

    #[test]
    fn find_returns_self_for_roots() {
        let mut forest = Forest::new();
        let a = forest.push("a");
        let b = forest.push("b");

        assert_eq!(forest.find(a).unwrap(), a);
        assert_eq!(forest.find(b).unwrap(), b);
        assert_eq!(forest.value(a).unwrap(), &"a");
    }

    #[test]
    fn union_ties_keep_the_first_root() {
        let mut forest = Forest::new();
        let a = forest.push(());
        let b = forest.push(());

        let union = forest.union(a, b).unwrap();
        assert_eq!(union.root, a);
        assert_eq!(union.unioned, Some(b));
        assert_eq!(forest.find(b).unwrap(), a);
    }

    #[test]
    fn union_by_rank_links_low_under_high() {
        let mut forest = Forest::new();
        let a = forest.push(());
        let b = forest.push(());
        let c = forest.push(());

        // {a, b} has rank 1; c has rank 0 and loses even as first argument
        forest.union(a, b).unwrap();
        let union = forest.union(c, a).unwrap();
        assert_eq!(union.root, a);
        assert_eq!(union.unioned, Some(c));
    }

    #[test]
    fn union_of_equivalent_nodes_is_a_no_op() {
        let mut forest = Forest::new();
        let a = forest.push(());
        let b = forest.push(());

        assert!(forest.union(a, b).unwrap().did_merge());
        let union = forest.union(b, a).unwrap();
        assert!(!union.did_merge());
        assert_eq!(union.root, a);
    }

    #[test]
    fn find_compresses_paths() {
        let mut forest = Forest::new();
        let ids: Vec<_> = (0..4).map(|i| forest.push(i)).collect();

        // Build a chain by always merging into the higher-rank tree
        forest.union(ids[0], ids[1]).unwrap();
        forest.union(ids[2], ids[3]).unwrap();
        forest.union(ids[0], ids[2]).unwrap();

        let root = forest.find(ids[3]).unwrap();
        for &id in &ids {
            assert_eq!(forest.find(id).unwrap(), root);
            let parent = forest.0[id.0].parent.load(std::sync::atomic::Ordering::Relaxed);
            assert_eq!(parent, root.0, "node {} left un-compressed", id.0);
        }
    }

    #[test]
    fn bad_id_is_an_error() {
        let forest = Forest::<()>::new();
        assert!(forest.find(super::NodeId(0)).is_err());
    }

    #[test]
    fn add_is_idempotent() {
        let mut uf = UnionFind::new();
        let (a, existed) = uf.add("a");
        assert!(!existed);

        let (a2, existed) = uf.add("a");
        assert!(existed);
        assert_eq!(a, a2);
        assert_eq!(uf.len(), 1);
        assert_eq!(uf.get(&"a"), Some(a));
        assert_eq!(uf.get(&"b"), None);
    }

    #[test]
    #[should_panic(expected = "not found in union-find structure")]
    fn must_get_faults_on_absent_value() {
        let uf = UnionFind::<&str>::new();
        let _ = uf.must_get(&"missing");
    }

    /// Naive model: each element stores an explicit partition label.
    struct Partitions(Vec<usize>);

    impl Partitions {
        fn union(&mut self, a: usize, b: usize) {
            let (from, to) = (self.0[a], self.0[b]);
            for label in &mut self.0 {
                if *label == from {
                    *label = to;
                }
            }
        }

        fn equiv(&self, a: usize, b: usize) -> bool { self.0[a] == self.0[b] }
    }

    proptest! {
        #[test]
        fn models_explicit_partitions(
            len in 1usize..64,
            pairs in prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 0..128),
        ) {
            let mut forest = Forest::new();
            let ids: Vec<_> = (0..len).map(|i| forest.push(i)).collect();
            let mut model = Partitions((0..len).collect());

            for &(a, b) in &pairs {
                let (a, b) = (a.index(len), b.index(len));
                let union = forest.union(ids[a], ids[b]).unwrap();
                prop_assert_eq!(union.did_merge(), !model.equiv(a, b));
                model.union(a, b);

                for i in 0..len {
                    for j in 0..len {
                        prop_assert_eq!(
                            forest.find(ids[i]).unwrap() == forest.find(ids[j]).unwrap(),
                            model.equiv(i, j),
                        );
                    }
                }
            }
        }
    }
}
