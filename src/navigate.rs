//! Read-only structural queries.
use std::iter::FusedIterator;

use crate::tree::Tree;
use crate::NodeIndex;

impl<K, V> Tree<K, V> {
    /// Whether the node has no parent. Unknown nodes are not roots.
    #[inline]
    pub fn is_root(&self, node: NodeIndex) -> bool {
        self.node(node).map_or(false, |n| n.parent.is_none())
    }

    /// Iterator over the ancestors of a node, from its parent up to the root.
    pub fn ancestors(&self, node: NodeIndex) -> Ancestors<'_, K, V> {
        Ancestors {
            tree: self,
            next: self.parent(node),
        }
    }

    /// The root of the tree containing `node`, or `None` for unknown nodes.
    pub fn root_of(&self, node: NodeIndex) -> Option<NodeIndex> {
        if !self.contains(node) {
            return None;
        }
        Some(self.ancestors(node).last().unwrap_or(node))
    }

    /// Number of parent hops from `node` to its root. Roots are at level 0.
    pub fn level(&self, node: NodeIndex) -> usize {
        self.ancestors(node).count()
    }

    /// Position of a node within its parent's children.
    pub fn child_index(&self, node: NodeIndex) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    /// The other children of the node's parent, in order.
    ///
    /// A root has no siblings, so the result is empty.
    pub fn siblings(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let Some(parent) = self.parent(node) else {
            return Vec::new();
        };

        self.children(parent)
            .iter()
            .copied()
            .filter(|&c| c != node)
            .collect()
    }

    /// The sibling following `node`, if any.
    pub fn next_sibling(&self, node: NodeIndex) -> Option<NodeIndex> {
        let parent = self.parent(node)?;
        let index = self.child_index(node)?;
        self.children(parent).get(index + 1).copied()
    }

    /// The sibling preceding `node`, if any.
    pub fn previous_sibling(&self, node: NodeIndex) -> Option<NodeIndex> {
        let parent = self.parent(node)?;
        let index = self.child_index(node)?.checked_sub(1)?;
        self.children(parent).get(index).copied()
    }

    /// Whether `candidate` is a proper ancestor of `node`.
    pub fn is_ancestor(&self, candidate: NodeIndex, node: NodeIndex) -> bool {
        self.ancestors(node).any(|a| a == candidate)
    }

    /// Whether `candidate` lies in the subtree below `node`, excluding `node` itself.
    ///
    /// Walks the parent links of `candidate`, which is the same as searching
    /// the subtree of `node` but costs only the depth of `candidate`.
    pub fn is_descendant(&self, node: NodeIndex, candidate: NodeIndex) -> bool {
        self.is_ancestor(node, candidate)
    }

    /// Number of levels in the subtree rooted at `node`; a single node has height 1.
    pub fn height(&self, node: NodeIndex) -> usize {
        if !self.contains(node) {
            return 0;
        }

        let mut max_height = 0;
        let mut stack = vec![(node, 1)];

        while let Some((current, height)) = stack.pop() {
            max_height = max_height.max(height);
            stack.extend(self.children(current).iter().map(|&c| (c, height + 1)));
        }

        max_height
    }

    /// Nodes of the subtree rooted at `node` that have no children, in pre-order.
    pub fn leaves(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.pre_order(node)
            .filter(|&n| self.children(n).is_empty())
            .collect()
    }
}

/// Iterator created by [`Tree::ancestors`].
pub struct Ancestors<'a, K, V> {
    tree: &'a Tree<K, V>,
    next: Option<NodeIndex>,
}

impl<'a, K, V> Iterator for Ancestors<'a, K, V> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

impl<'a, K, V> FusedIterator for Ancestors<'a, K, V> {}

#[cfg(test)]
mod test {
    use rstest::{fixture, rstest};

    use super::*;

    struct Sample {
        tree: Tree<&'static str, ()>,
        root: NodeIndex,
        a: NodeIndex,
        b: NodeIndex,
        c: NodeIndex,
        d: NodeIndex,
    }

    /// root -> {a, b, d}, b -> {c}
    #[fixture]
    fn sample() -> Sample {
        let mut tree = Tree::new();
        let [root, a, b, c, d] = ["root", "a", "b", "c", "d"].map(|id| tree.add_node(id, ()));
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.add_child(root, d);
        tree.add_child(b, c);
        Sample { tree, root, a, b, c, d }
    }

    #[rstest]
    fn root_and_level(sample: Sample) {
        let Sample { tree, root, a, c, .. } = sample;
        assert_eq!(tree.root_of(c), Some(root));
        assert_eq!(tree.root_of(root), Some(root));
        assert_eq!(tree.level(root), 0);
        assert_eq!(tree.level(a), 1);
        assert_eq!(tree.level(c), 2);
        assert!(tree.is_root(root));
        assert!(!tree.is_root(c));
    }

    #[rstest]
    fn siblings(sample: Sample) {
        let Sample { tree, root, a, b, c, d } = sample;
        assert_eq!(tree.siblings(a), [b, d]);
        assert_eq!(tree.siblings(b), [a, d]);
        assert!(tree.siblings(c).is_empty());
        assert!(tree.siblings(root).is_empty());

        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.next_sibling(d), None);
        assert_eq!(tree.previous_sibling(d), Some(b));
        assert_eq!(tree.previous_sibling(a), None);
        assert_eq!(tree.next_sibling(root), None);
        assert_eq!(tree.previous_sibling(root), None);
        assert_eq!(tree.child_index(d), Some(2));
    }

    #[rstest]
    fn ancestry(sample: Sample) {
        let Sample { tree, root, a, b, c, .. } = sample;
        assert!(tree.is_ancestor(root, c));
        assert!(tree.is_ancestor(b, c));
        assert!(!tree.is_ancestor(a, c));
        assert!(!tree.is_ancestor(c, c));
        assert!(tree.is_descendant(root, c));
        assert!(!tree.is_descendant(c, root));
        assert!(!tree.is_descendant(b, b));
        assert!(tree.ancestors(c).eq([b, root]));
    }

    #[rstest]
    fn height_and_leaves(sample: Sample) {
        let Sample { tree, root, a, c, d, .. } = sample;
        assert_eq!(tree.height(root), 3);
        assert_eq!(tree.height(c), 1);
        assert_eq!(tree.leaves(root), [a, c, d]);
    }
}
