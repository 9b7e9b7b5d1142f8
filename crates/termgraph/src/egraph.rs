//! A congruence-closing e-graph over first-order terms
//!
//! The graph hashconses every distinct e-node, keeps per-class member and
//! parent sets, and repairs congruence after every merge so that equal
//! arguments under the same symbol always imply equal classes.

use std::{cell::RefCell, cmp::Ordering, fmt, rc::Rc};

use hashbrown::HashSet;

use crate::{
    ord_map::{OrdMap, OrdSet},
    term::Term,
    union_find::{UnionFind, Unioned},
};

/// Opaque handle to an equivalence class
///
/// Handles stay valid across merges: a handle whose class was absorbed keeps
/// resolving to the surviving class, but is no longer canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ClassId(usize);

impl ClassId {
    #[must_use]
    pub fn id(self) -> usize { self.0 }
}

/// A single applied-function occurrence: a symbol plus the classes of its
/// arguments
///
/// Identity is value-based, and the order is shortlex over
/// `(arity, symbol, argument IDs)`.
#[derive(PartialEq, Eq, Hash)]
pub struct ENode {
    symbol: Rc<str>,
    args: Rc<[ClassId]>,
}

impl ENode {
    pub(crate) fn new(symbol: Rc<str>, args: Rc<[ClassId]>) -> Self { Self { symbol, args } }

    #[must_use]
    pub fn symbol(&self) -> &str { &self.symbol }

    #[must_use]
    pub fn args(&self) -> &[ClassId] { &self.args }
}

impl Clone for ENode {
    fn clone(&self) -> Self {
        Self {
            symbol: Rc::clone(&self.symbol),
            args: Rc::clone(&self.args),
        }
    }
}

impl Ord for ENode {
    fn cmp(&self, other: &Self) -> Ordering {
        let Self { symbol, args } = self;
        args.len()
            .cmp(&other.args.len())
            .then_with(|| symbol.as_ref().cmp(other.symbol.as_ref()))
            .then_with(|| args.cmp(&other.args))
    }
}

impl PartialOrd for ENode {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Debug for ENode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[repr(transparent)]
        struct Args<'a>(&'a Rc<[ClassId]>);

        impl fmt::Debug for Args<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_list().entries(self.0.iter().map(|c| c.id())).finish()
            }
        }

        let Self { symbol, args } = self;
        f.debug_tuple("ENode").field(symbol).field(&Args(args)).finish()
    }
}

/// One equivalence class: its member e-nodes and the e-nodes that reference
/// it as an argument
#[derive(Debug, Default)]
struct EClass {
    nodes: OrdSet<ENode>,
    parents: OrdSet<ENode>,
}

impl EClass {
    fn singleton(node: ENode) -> Self {
        let mut nodes = OrdSet::new();
        nodes.insert(node);
        Self {
            nodes,
            parents: OrdSet::new(),
        }
    }
}

/// After merges, several IDs alias one class object; identity is pointer
/// identity.
type ClassRef = Rc<RefCell<EClass>>;

/// An e-graph
pub struct Graph {
    max_id: usize,
    class_ids: UnionFind<ClassId>,
    hashcons: OrdMap<ENode, ClassId>,
    classes: OrdMap<ClassId, ClassRef>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            max_id,
            class_ids,
            hashcons,
            classes,
        } = self;
        f.debug_struct("Graph")
            .field("max_id", max_id)
            .field("class_ids", class_ids)
            .field("hashcons", hashcons)
            .field("classes", classes)
            .finish()
    }
}

impl Default for Graph {
    #[inline]
    fn default() -> Self { Self::new() }
}

impl Graph {
    /// Construct a new, empty e-graph
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_id: 0,
            class_ids: UnionFind::new(),
            hashcons: OrdMap::new(),
            classes: OrdMap::new(),
        }
    }

    /// The number of distinct equivalence classes
    #[must_use]
    pub fn len(&self) -> usize {
        let mut seen = HashSet::new();
        self.classes.enumerate(|_, class| {
            seen.insert(Rc::as_ptr(class));
            true
        });
        seen.len()
    }

    /// Returns true if no terms have been added
    #[must_use]
    pub fn is_empty(&self) -> bool { self.classes.is_empty() }

    /// Add an n-ary term, returning true once it has been ingested
    ///
    /// Every subterm is hashconsed bottom-up; re-adding a known term leaves
    /// the graph unchanged.
    pub fn add(&mut self, term: &Term) -> bool {
        let _ = self.ingest(term);
        self.assert_invariants();
        true
    }

    /// Merge the classes of two previously added terms and repair congruence
    /// among every pair of parents affected by the cascade
    ///
    /// # Panics
    /// Panics if either term was never added.
    pub fn merge(&mut self, a: &Term, b: &Term) {
        let (_, a_id) = self
            .lookup(a)
            .unwrap_or_else(|| panic!("term '{a}' not found in e-graph"));
        let (_, b_id) = self
            .lookup(b)
            .unwrap_or_else(|| panic!("term '{b}' not found in e-graph"));

        self.merge_ids(a_id, b_id);
        self.assert_invariants();
    }

    /// Retrieve the representative of a term's class: the shortlex-minimum
    /// member e-node, rebuilt with the representative of each child class
    ///
    /// Returns None if the term was never added.
    #[must_use]
    pub fn get(&self, term: &Term) -> Option<Term> {
        let (_, id) = self.lookup(term)?;
        let class = self.classes.get(&id)?;
        let rep = class.borrow().nodes.min().cloned()?;
        Some(self.rep_term(&rep))
    }

    /// The canonical class ID of a term, or None if it was never added
    #[must_use]
    pub fn class_of(&self, term: &Term) -> Option<ClassId> { self.lookup(term).map(|(_, id)| id) }

    /// The e-node of a term as of this call, with argument classes
    /// canonicalised at lookup time
    #[must_use]
    pub fn enode_of(&self, term: &Term) -> Option<ENode> { self.lookup(term).map(|(n, _)| n) }

    /// Every equivalence class, in ID order, as the sorted list of its
    /// member terms
    #[must_use]
    pub fn classes(&self) -> Vec<Vec<Term>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.classes.enumerate(|_, class| {
            if seen.insert(Rc::as_ptr(class)) {
                let inner = class.borrow();
                let mut terms: Vec<_> = inner.nodes.iter().map(|n| self.rep_term(n)).collect();
                terms.sort_unstable();
                out.push(terms);
            }
            true
        });
        out
    }

    /// Determines whether `id` is the root of its class
    ///
    /// # Panics
    /// Panics if the ID was never allocated by this graph.
    #[must_use]
    pub fn is_canonical_id(&self, id: ClassId) -> bool {
        let node = self.class_ids.must_get(&id);
        self.class_ids.find(node) == node
    }

    /// Determines whether every argument ID of `node` is canonical
    #[must_use]
    pub fn is_canonical_enode(&self, node: &ENode) -> bool {
        node.args().iter().all(|&arg| self.is_canonical_id(arg))
    }

    /// Checks that two IDs share a class object exactly when they share a
    /// root
    #[must_use]
    pub fn check_class_map(&self) -> bool {
        let mut entries = Vec::new();
        self.classes.enumerate(|&id, class| {
            entries.push((self.canonical(id), Rc::as_ptr(class)));
            true
        });

        for (i, &(c1, p1)) in entries.iter().enumerate() {
            for &(c2, p2) in &entries[i + 1..] {
                if (c1 == c2) != std::ptr::eq(p1, p2) {
                    return false;
                }
            }
        }

        true
    }

    fn canonical(&self, id: ClassId) -> ClassId {
        let node = self.class_ids.must_get(&id);
        *self.class_ids.value(self.class_ids.find(node))
    }

    /// Locate the e-node and canonical class of a term without creating
    /// anything
    fn lookup(&self, term: &Term) -> Option<(ENode, ClassId)> {
        let mut args = Vec::with_capacity(term.args().len());
        for arg in term.args() {
            let (_, id) = self.lookup(arg)?;
            args.push(id);
        }

        let node = ENode::new(Rc::clone(term.symbol_shared()), args.into());
        let id = *self.hashcons.get(&node)?;
        Some((node, self.canonical(id)))
    }

    /// Convert a term into e-nodes bottom-up, allocating classes as needed
    fn ingest(&mut self, term: &Term) -> (ENode, ClassId) {
        let args: Rc<[ClassId]> = term.args().iter().map(|arg| self.ingest(arg).1).collect();
        let node = ENode::new(Rc::clone(term.symbol_shared()), args);
        let id = self.get_or_alloc(&node);
        (node, id)
    }

    fn get_or_alloc(&mut self, node: &ENode) -> ClassId {
        if let Some(&id) = self.hashcons.get(node) {
            return self.canonical(id);
        }

        self.max_id += 1;
        let id = ClassId(self.max_id);
        self.class_ids.add(id);
        self.hashcons.put(node.clone(), id);
        self.classes
            .put(id, Rc::new(RefCell::new(EClass::singleton(node.clone()))));

        for &arg in node.args() {
            let arg = self.canonical(arg);
            let arg_class = self.classes.get(&arg).unwrap_or_else(|| unreachable!());
            arg_class.borrow_mut().parents.insert(node.clone());
        }

        tracing::trace!(id = id.id(), node = ?node, "allocated e-class");
        id
    }

    fn merge_ids(&mut self, a: ClassId, b: ClassId) {
        let mut pending = vec![(a, b)];

        while let Some((a, b)) = pending.pop() {
            let a = self.class_ids.must_get(&a);
            let b = self.class_ids.must_get(&b);
            let Unioned { root, unioned } = self.class_ids.union(a, b);
            let Some(absorbed) = unioned else { continue };

            let root_id = *self.class_ids.value(root);
            let absorbed_id = *self.class_ids.value(absorbed);
            tracing::trace!(
                root = root_id.id(),
                absorbed = absorbed_id.id(),
                "merged e-classes"
            );

            let surviving = Rc::clone(self.classes.get(&root_id).unwrap_or_else(|| unreachable!()));
            let defunct = Rc::clone(
                self.classes
                    .get(&absorbed_id)
                    .unwrap_or_else(|| unreachable!()),
            );

            {
                let mut keep = surviving.borrow_mut();
                let gone = defunct.borrow();
                for node in gone.nodes.iter() {
                    keep.nodes.insert(node.clone());
                }
                for node in gone.parents.iter() {
                    keep.parents.insert(node.clone());
                }
            }

            // Every ID still aliasing the defunct object follows it to the
            // survivor, so stale IDs stay valid lookup keys.
            let mut stale = Vec::new();
            self.classes.enumerate(|&id, class| {
                if Rc::ptr_eq(class, &defunct) {
                    stale.push(id);
                }
                true
            });
            for id in stale {
                self.classes.put(id, Rc::clone(&surviving));
            }

            // Congruence repair over a snapshot of the merged parent set. A
            // mismatched pair moves on to the next pair; a pair whose classes
            // are already equivalent short-circuits in the union above.
            let parents: Vec<ENode> = surviving.borrow().parents.iter().cloned().collect();
            for (i, n1) in parents.iter().enumerate() {
                for n2 in &parents[i + 1..] {
                    if n1.symbol != n2.symbol || n1.args.len() != n2.args.len() {
                        continue;
                    }

                    let congruent = n1
                        .args
                        .iter()
                        .zip(n2.args.iter())
                        .all(|(&x, &y)| self.canonical(x) == self.canonical(y));
                    if !congruent {
                        continue;
                    }

                    let c1 = *self.hashcons.get(n1).unwrap_or_else(|| unreachable!());
                    let c2 = *self.hashcons.get(n2).unwrap_or_else(|| unreachable!());
                    tracing::trace!(left = ?n1, right = ?n2, "discovered congruent parents");
                    pending.push((c1, c2));
                }
            }
        }
    }

    /// Rebuild a term from an e-node, electing the shortlex-minimum member
    /// of each child class
    fn rep_term(&self, node: &ENode) -> Term {
        let args = node
            .args()
            .iter()
            .map(|arg| {
                let class = self.classes.get(arg).unwrap_or_else(|| unreachable!());
                let rep = class
                    .borrow()
                    .nodes
                    .min()
                    .cloned()
                    .unwrap_or_else(|| unreachable!());
                self.rep_term(&rep)
            })
            .collect();
        Term::new(Rc::clone(&node.symbol), args)
    }

    #[cfg(not(any(test, feature = "test")))]
    #[inline]
    fn assert_invariants(&self) { let _ = self; }

    #[cfg(any(test, feature = "test"))]
    fn assert_invariants(&self) {
        // Hashcons totality, class membership, and parent completeness
        self.hashcons.enumerate(|node, &id| {
            let canon = self.canonical(id);
            let class = self
                .classes
                .get(&canon)
                .unwrap_or_else(|| panic!("no class mapped for canonical ID {canon:?}"));
            assert!(
                class.borrow().nodes.contains(node),
                "hashconsed node {node:?} missing from its class"
            );

            for &arg in node.args() {
                let arg_class = self.classes.get(&self.canonical(arg)).unwrap();
                assert!(
                    arg_class.borrow().parents.contains(node),
                    "node {node:?} missing from the parents of {arg:?}"
                );
            }

            true
        });

        // Congruence: equal symbols and equal canonical arguments imply one
        // class
        let mut nodes = Vec::new();
        self.hashcons.enumerate(|node, &id| {
            nodes.push((node.clone(), id));
            true
        });
        for (i, (n1, c1)) in nodes.iter().enumerate() {
            for (n2, c2) in &nodes[i + 1..] {
                if n1.symbol() != n2.symbol() || n1.args().len() != n2.args().len() {
                    continue;
                }

                let congruent = n1
                    .args()
                    .iter()
                    .zip(n2.args().iter())
                    .all(|(&x, &y)| self.canonical(x) == self.canonical(y));
                if congruent {
                    assert_eq!(
                        self.canonical(*c1),
                        self.canonical(*c2),
                        "congruent nodes {n1:?} and {n2:?} sit in distinct classes"
                    );
                }
            }
        }

        // Stale IDs resolve to the same object as their roots
        self.classes.enumerate(|&id, class| {
            let canon_class = self.classes.get(&self.canonical(id)).unwrap();
            assert!(
                Rc::ptr_eq(class, canon_class),
                "ID {id:?} maps to a different object than its root"
            );
            true
        });

        assert!(self.check_class_map());
    }
}
