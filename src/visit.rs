//! Depth-first traversal and the visitor protocol.
//!
//! Traversals run on an explicit work stack, so the depth of a tree is limited
//! by the heap rather than the native call stack. A visited set makes sure no
//! node is reported twice.
use std::iter::FusedIterator;

use bitvec::vec::BitVec;
use tracing::instrument;

use crate::tree::Tree;
use crate::NodeIndex;

/// The order in which a traversal reports the nodes of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TraversalOrder {
    /// A node is visited before its children.
    #[default]
    PreOrder,
    /// A node is visited after all of its children.
    PostOrder,
}

/// Callback invoked once per node during [`Tree::walk`].
///
/// Closures of the form `FnMut(&Tree<K, V>, NodeIndex)` are visitors.
pub trait Visitor<K, V> {
    fn visit(&mut self, tree: &Tree<K, V>, node: NodeIndex);
}

impl<K, V, F> Visitor<K, V> for F
where
    F: FnMut(&Tree<K, V>, NodeIndex),
{
    #[inline]
    fn visit(&mut self, tree: &Tree<K, V>, node: NodeIndex) {
        self(tree, node)
    }
}

/// Callback invoked once per node during [`Tree::walk_mut`].
///
/// The visitor may edit the node it is handed. In pre-order the children of a
/// node are read after the node was visited, so edits to them take effect in
/// the same walk.
pub trait VisitorMut<K, V> {
    fn visit(&mut self, tree: &mut Tree<K, V>, node: NodeIndex);
}

impl<K, V, F> VisitorMut<K, V> for F
where
    F: FnMut(&mut Tree<K, V>, NodeIndex),
{
    #[inline]
    fn visit(&mut self, tree: &mut Tree<K, V>, node: NodeIndex) {
        self(tree, node)
    }
}

/// Marks `node` as visited, returning whether it was unvisited before.
fn mark(visited: &mut BitVec, node: NodeIndex) -> bool {
    let index = crate::memory::EntityIndex::index(node);
    if index >= visited.len() {
        visited.resize(index + 1, false);
    }
    !visited.replace(index, true)
}

impl<K, V> Tree<K, V> {
    /// Iterate over the subtree rooted at `node` in pre-order.
    ///
    /// # Example
    ///
    /// ```
    /// # use nodetree::Tree;
    /// let mut tree = Tree::<char, ()>::new();
    /// let [r, a, b, c] = ['r', 'a', 'b', 'c'].map(|id| tree.add_node(id, ()));
    /// tree.add_child(r, a);
    /// tree.add_child(r, b);
    /// tree.add_child(a, c);
    ///
    /// let ids: String = tree.pre_order(r).map(|n| tree[n].id()).collect();
    /// assert_eq!(ids, "racb");
    /// ```
    pub fn pre_order(&self, node: NodeIndex) -> PreOrder<'_, K, V> {
        PreOrder::new(self, node)
    }

    /// Iterate over the subtree rooted at `node` in post-order.
    pub fn post_order(&self, node: NodeIndex) -> PostOrder<'_, K, V> {
        PostOrder::new(self, node)
    }

    /// Visit every node of the subtree rooted at `node`.
    ///
    /// # Example
    ///
    /// ```
    /// # use nodetree::{NodeIndex, Tree, TraversalOrder};
    /// let mut tree = Tree::<char, u32>::new();
    /// let [r, a, b] = [('r', 1), ('a', 2), ('b', 3)].map(|(id, v)| tree.add_node(id, v));
    /// tree.add_child(r, a);
    /// tree.add_child(r, b);
    ///
    /// let mut seen = String::new();
    /// tree.walk(r, TraversalOrder::PostOrder, &mut |t: &Tree<char, u32>, n: NodeIndex| {
    ///     seen.push(*t[n].id())
    /// });
    /// assert_eq!(seen, "abr");
    /// ```
    pub fn walk<W>(&self, node: NodeIndex, order: TraversalOrder, visitor: &mut W)
    where
        W: Visitor<K, V> + ?Sized,
    {
        match order {
            TraversalOrder::PreOrder => self.pre_order(node).for_each(|n| visitor.visit(self, n)),
            TraversalOrder::PostOrder => self.post_order(node).for_each(|n| visitor.visit(self, n)),
        }
    }

    /// Visit every node of the subtree rooted at `node`, allowing the visitor
    /// to edit the tree.
    ///
    /// Nodes removed from the arena by the visitor before their turn are skipped.
    #[instrument(level = "trace", skip(self, visitor))]
    pub fn walk_mut<W>(&mut self, node: NodeIndex, order: TraversalOrder, visitor: &mut W)
    where
        W: VisitorMut<K, V> + ?Sized,
    {
        let mut visited = BitVec::new();
        let mut stack = vec![(node, false)];

        while let Some((current, expanded)) = stack.pop() {
            if !self.contains(current) {
                continue;
            }

            match (order, expanded) {
                (TraversalOrder::PreOrder, _) => {
                    if !mark(&mut visited, current) {
                        continue;
                    }
                    visitor.visit(self, current);
                    stack.extend(self.children(current).iter().rev().map(|&c| (c, false)));
                }
                (TraversalOrder::PostOrder, false) => {
                    if !mark(&mut visited, current) {
                        continue;
                    }
                    stack.push((current, true));
                    stack.extend(self.children(current).iter().rev().map(|&c| (c, false)));
                }
                (TraversalOrder::PostOrder, true) => visitor.visit(self, current),
            }
        }
    }

    /// All nodes of the subtree rooted at `node`, `node` included, in pre-order.
    ///
    /// The result never contains a node twice. It is empty for unknown nodes.
    pub fn traverse(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.pre_order(node).collect()
    }

    /// All nodes of the subtree rooted at `node` in the given order.
    pub fn traverse_with(&self, node: NodeIndex, order: TraversalOrder) -> Vec<NodeIndex> {
        let mut list = Vec::new();
        self.walk(node, order, &mut |_: &Tree<K, V>, n: NodeIndex| list.push(n));
        list
    }

    /// The nodes of [`Tree::traverse`] collected through a visitor, in pre-order.
    pub fn to_list(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.traverse_with(node, TraversalOrder::default())
    }

    /// All nodes below `node` (inclusive) whose value equals `value`, in pre-order.
    ///
    /// Passing `None` finds the nodes that carry no value.
    pub fn find_all_by_value(&self, node: NodeIndex, value: Option<&V>) -> Vec<NodeIndex>
    where
        V: PartialEq,
    {
        let mut found = Vec::new();
        self.walk(node, TraversalOrder::PreOrder, &mut |tree: &Tree<K, V>, n: NodeIndex| {
            if tree.value(n) == value {
                found.push(n);
            }
        });
        found
    }

    /// The first node in pre-order below `node` (inclusive) whose value equals `value`.
    pub fn find_by_value(&self, node: NodeIndex, value: Option<&V>) -> Option<NodeIndex>
    where
        V: PartialEq,
    {
        self.pre_order(node).find(|&n| self.value(n) == value)
    }

    /// The first node in pre-order below `node` (inclusive) with the given id.
    pub fn find_by_id(&self, node: NodeIndex, id: &K) -> Option<NodeIndex>
    where
        K: PartialEq,
    {
        self.pre_order(node).find(|&n| self[n].id == *id)
    }
}

/// Iterator created by [`Tree::pre_order`].
pub struct PreOrder<'a, K, V> {
    tree: &'a Tree<K, V>,
    stack: Vec<NodeIndex>,
    visited: BitVec,
}

impl<'a, K, V> PreOrder<'a, K, V> {
    fn new(tree: &'a Tree<K, V>, node: NodeIndex) -> Self {
        Self {
            tree,
            stack: vec![node],
            visited: BitVec::new(),
        }
    }
}

impl<'a, K, V> Iterator for PreOrder<'a, K, V> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            let Some(node) = self.tree.node(current) else {
                continue;
            };

            if mark(&mut self.visited, current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev());
                return Some(current);
            }
        }

        None
    }
}

impl<'a, K, V> FusedIterator for PreOrder<'a, K, V> {}

/// Iterator created by [`Tree::post_order`].
pub struct PostOrder<'a, K, V> {
    tree: &'a Tree<K, V>,
    stack: Vec<(NodeIndex, bool)>,
    visited: BitVec,
}

impl<'a, K, V> PostOrder<'a, K, V> {
    fn new(tree: &'a Tree<K, V>, node: NodeIndex) -> Self {
        Self {
            tree,
            stack: vec![(node, false)],
            visited: BitVec::new(),
        }
    }
}

impl<'a, K, V> Iterator for PostOrder<'a, K, V> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, expanded)) = self.stack.pop() {
            if expanded {
                return Some(current);
            }

            let Some(node) = self.tree.node(current) else {
                continue;
            };

            if mark(&mut self.visited, current) {
                self.stack.push((current, true));
                self.stack.extend(node.children.iter().rev().map(|&child| (child, false)));
            }
        }

        None
    }
}

impl<'a, K, V> FusedIterator for PostOrder<'a, K, V> {}
