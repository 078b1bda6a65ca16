//! The arena that owns every node.
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::Index;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::memory::{slab, Slab};
use crate::node::Node;
use crate::NodeIndex;

/// Map from old to new node indices, returned by [`Tree::compact`].
pub type IndexMap = BTreeMap<NodeIndex, NodeIndex>;

/// An arena of nodes forming one or more trees.
///
/// Nodes are created detached with [`Tree::add_node`] and linked with the
/// structural operations such as [`Tree::add_child`]. A node without a parent
/// is a root; a tree is everything reachable from a root through child links.
#[derive(Clone)]
pub struct Tree<K, V> {
    pub(crate) nodes: Slab<NodeIndex, Node<K, V>>,
}

impl<K: Debug, V: Debug> Debug for Tree<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.nodes.iter()).finish()
    }
}

impl<K, V> Default for Tree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Tree<K, V> {
    /// Create a new empty tree arena.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new empty tree arena with room for `nodes` nodes.
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: Slab::with_capacity(nodes),
        }
    }

    /// Add a detached node carrying `value`.
    ///
    /// # Example
    ///
    /// ```
    /// # use nodetree::Tree;
    /// let mut tree = Tree::<u32, &str>::new();
    /// let n = tree.add_node(7, "seven");
    ///
    /// assert_eq!(tree.id(n), Some(&7));
    /// assert_eq!(tree.value(n), Some(&"seven"));
    /// assert!(tree.is_root(n));
    /// ```
    pub fn add_node(&mut self, id: K, value: V) -> NodeIndex {
        self.nodes.insert(Node::new(id, Some(value)))
    }

    /// Add a detached node without a value.
    pub fn add_empty_node(&mut self, id: K) -> NodeIndex {
        self.nodes.insert(Node::new(id, None))
    }

    pub(crate) fn insert_node(&mut self, node: Node<K, V>) -> NodeIndex {
        self.nodes.insert(node)
    }

    /// Number of nodes in the arena, across all trees it holds.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check whether the arena has a node with a given index.
    #[inline]
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.nodes.contains(node)
    }

    /// Borrow a node.
    #[inline]
    pub fn node(&self, node: NodeIndex) -> Option<&Node<K, V>> {
        self.nodes.get(node)
    }

    #[inline]
    pub fn id(&self, node: NodeIndex) -> Option<&K> {
        Some(&self.nodes.get(node)?.id)
    }

    /// Replace the identifier of a node, returning the old one.
    ///
    /// Ids are meant to be unique within a tree; prefer [`Tree::reindex`] to
    /// renumber a whole tree consistently.
    pub fn set_id(&mut self, node: NodeIndex, id: K) -> Option<K> {
        let node = self.nodes.get_mut(node)?;
        Some(std::mem::replace(&mut node.id, id))
    }

    #[inline]
    pub fn value(&self, node: NodeIndex) -> Option<&V> {
        self.nodes.get(node)?.value.as_ref()
    }

    #[inline]
    pub fn value_mut(&mut self, node: NodeIndex) -> Option<&mut V> {
        self.nodes.get_mut(node)?.value.as_mut()
    }

    /// Replace the value of a node, returning the previous one.
    pub fn set_value(&mut self, node: NodeIndex, value: Option<V>) -> Option<V> {
        let node = self.nodes.get_mut(node)?;
        std::mem::replace(&mut node.value, value)
    }

    pub fn take_value(&mut self, node: NodeIndex) -> Option<V> {
        self.nodes.get_mut(node)?.value.take()
    }

    #[inline]
    pub fn display_value(&self, node: NodeIndex) -> Option<&str> {
        self.nodes.get(node)?.display_value.as_deref()
    }

    pub fn set_display_value(
        &mut self,
        node: NodeIndex,
        display_value: Option<String>,
    ) -> Option<String> {
        let node = self.nodes.get_mut(node)?;
        std::mem::replace(&mut node.display_value, display_value)
    }

    /// Whether the node carries the leaf flag. Unknown nodes are not leaves.
    #[inline]
    pub fn is_leaf(&self, node: NodeIndex) -> bool {
        self.nodes.get(node).map_or(false, |n| n.leaf)
    }

    /// Set the leaf flag. Existing children are kept; only new attachments are refused.
    pub fn set_leaf(&mut self, node: NodeIndex, leaf: bool) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.leaf = leaf;
        }
    }

    /// The parent of a node, or `None` for roots and unknown nodes.
    #[inline]
    pub fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.nodes.get(node)?.parent
    }

    /// The identifier of a node's parent.
    pub fn parent_id(&self, node: NodeIndex) -> Option<&K> {
        self.id(self.parent(node)?)
    }

    /// The children of a node in order. Empty for unknown nodes.
    #[inline]
    pub fn children(&self, node: NodeIndex) -> &[NodeIndex] {
        match self.nodes.get(node) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    #[inline]
    pub fn child_count(&self, node: NodeIndex) -> usize {
        self.children(node).len()
    }

    /// Iterator over all node indices in the arena.
    pub fn node_indices(&self) -> NodeIndices<'_, K, V> {
        NodeIndices(self.nodes.iter())
    }

    /// Iterator over every root in the arena, i.e. every node without a parent.
    ///
    /// Subtrees detached by the mutators show up here until they are deleted.
    pub fn roots(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(index, _)| index)
    }

    /// Detach a node and free it together with all its descendants.
    ///
    /// Returns the number of nodes freed. Their indices become invalid and will
    /// be reused by later insertions.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_subtree(&mut self, node: NodeIndex) -> usize {
        if !self.contains(node) {
            return 0;
        }

        self.detach(node);
        let doomed = self.traverse(node);

        for &index in &doomed {
            self.nodes.remove(index);
        }

        debug!(freed = doomed.len(), "deleted subtree");
        doomed.len()
    }

    /// Renumber the nodes to be contiguous.
    ///
    /// Returns a map from the previous node indices to their new indices.
    /// Preserves the relative order of the nodes.
    ///
    /// # Example
    ///
    /// ```
    /// # use nodetree::Tree;
    /// let mut tree = Tree::<u8, ()>::new();
    /// let a = tree.add_node(0, ());
    /// let b = tree.add_node(1, ());
    /// let c = tree.add_node(2, ());
    /// tree.add_child(a, c);
    /// tree.delete_subtree(b);
    ///
    /// let map = tree.compact();
    /// let c = map[&c];
    /// assert_eq!(c, b);
    /// assert_eq!(tree.parent(c), Some(a));
    /// ```
    #[instrument(level = "debug", skip(self))]
    pub fn compact(&mut self) -> IndexMap {
        let mut index_map = IndexMap::new();

        self.nodes.compact(|_, old_index, new_index| {
            index_map.insert(old_index, new_index);
        });

        for (_, node) in self.nodes.iter_mut() {
            node.relink(&index_map);
        }

        index_map
    }

    /// Shrinks the arena's storage as much as possible.
    ///
    /// When there are a lot of freed slots, call [`Tree::compact`] first.
    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

}

impl<K, V> Index<NodeIndex> for Tree<K, V> {
    type Output = Node<K, V>;

    fn index(&self, node: NodeIndex) -> &Self::Output {
        self.nodes.get(node).expect("invalid node")
    }
}

/// Iterator created by [`Tree::node_indices`].
pub struct NodeIndices<'a, K, V>(slab::Iter<'a, NodeIndex, Node<K, V>>);

impl<'a, K, V> Iterator for NodeIndices<'a, K, V> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.0.next()?.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for NodeIndices<'a, K, V> {}
impl<'a, K, V> std::iter::FusedIterator for NodeIndices<'a, K, V> {}

/// Error returned by the fallible structural operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("unknown node {0}")]
    UnknownNode(NodeIndex),
    #[error("child index {index} is out of range for a node with {len} children")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("malformed left-child/right-sibling encoding at position {0}")]
    MalformedEncoding(usize),
}
