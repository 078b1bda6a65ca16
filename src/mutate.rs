//! Structural edits.
//!
//! Precondition violations such as attaching below a leaf-flagged node or
//! creating a cycle are not errors: the operation does nothing and reports
//! `false`. Only [`Tree::remove_child_at`] returns an error, since there is no
//! sensible fallback for removing at a missing position.
use tracing::{debug, instrument, trace};

use crate::tree::{Tree, TreeError};
use crate::NodeIndex;

impl<K, V> Tree<K, V> {
    /// Ensures that making `child` a child of `parent` would not introduce a cycle.
    fn cycle_check(&self, child: NodeIndex, parent: NodeIndex) -> bool {
        child != parent && !self.is_ancestor(child, parent)
    }

    /// Whether `child` may be attached below `parent`, ignoring the leaf flag.
    fn can_link(&self, parent: NodeIndex, child: NodeIndex) -> bool {
        if !self.contains(parent) || !self.contains(child) {
            debug!(%parent, %child, "unknown node");
            return false;
        }

        if !self.cycle_check(child, parent) {
            debug!(%parent, %child, "attaching the node would introduce a cycle");
            return false;
        }

        true
    }

    fn can_attach(&self, parent: NodeIndex, child: NodeIndex) -> bool {
        if self.is_leaf(parent) {
            debug!(%parent, %child, "parent is flagged as leaf");
            return false;
        }

        self.can_link(parent, child)
    }

    /// Links `child` below `parent` at `index`, or last when `index` is past
    /// the end. The caller has checked the preconditions.
    fn link(&mut self, parent: NodeIndex, child: NodeIndex, index: Option<usize>) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);

        let children = &mut self.nodes[parent].children;
        match index {
            Some(index) if index < children.len() => children.insert(index, child),
            _ => children.push(child),
        }
    }

    /// Links without looking at the leaf flag. Used when rebuilding trees from
    /// an encoding in which leaf-flagged nodes may still own children.
    pub(crate) fn force_link(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        if !self.can_link(parent, child) {
            return false;
        }
        self.link(parent, child, None);
        true
    }

    /// Attach `child` as the last child of `parent`.
    ///
    /// If `child` already has a parent it is moved, together with its subtree.
    /// Nothing happens and `false` is returned when `parent` is flagged as a
    /// leaf, or when the attachment would make a node its own ancestor.
    ///
    /// # Example
    ///
    /// ```
    /// # use nodetree::Tree;
    /// let mut tree = Tree::<u8, ()>::new();
    /// let root = tree.add_node(0, ());
    /// let child = tree.add_node(1, ());
    ///
    /// assert!(tree.add_child(root, child));
    /// assert_eq!(tree.parent(child), Some(root));
    ///
    /// // The reverse edge would close a cycle.
    /// assert!(!tree.add_child(child, root));
    /// ```
    #[instrument(level = "trace", skip(self))]
    pub fn add_child(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        if !self.can_attach(parent, child) {
            return false;
        }
        self.link(parent, child, None);
        true
    }

    /// Attach `child` below `parent` at position `index`.
    ///
    /// An `index` at or past the end appends, exactly like [`Tree::add_child`].
    #[instrument(level = "trace", skip(self))]
    pub fn add_child_at(&mut self, parent: NodeIndex, index: usize, child: NodeIndex) -> bool {
        if !self.can_attach(parent, child) {
            return false;
        }
        self.link(parent, child, Some(index));
        true
    }

    /// Unlink a node from its parent, keeping its own subtree intact.
    ///
    /// Returns the former parent, or `None` if the node was a root.
    #[instrument(level = "trace", skip(self))]
    pub fn detach(&mut self, node: NodeIndex) -> Option<NodeIndex> {
        let parent = self.nodes.get_mut(node)?.parent.take()?;
        self.nodes[parent].children.retain(|&c| c != node);
        Some(parent)
    }

    /// Clears every parent and child link in the subtree below `node`.
    ///
    /// Afterwards each node of the former subtree is an isolated root.
    fn dismantle(&mut self, node: NodeIndex) {
        for current in self.post_order(node).collect::<Vec<_>>() {
            let data = &mut self.nodes[current];
            if current != node {
                data.parent = None;
            }
            data.children.clear();
        }
    }

    /// Remove `child` from `parent`.
    ///
    /// Does nothing unless `child` is currently a child of `parent`. The
    /// removed node's subtree is dismantled as well: every node in it loses its
    /// parent link, leaving isolated nodes owned by the caller. Use
    /// [`Tree::detach`] to unlink a subtree as a whole.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_child(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        if self.parent(child) != Some(parent) {
            trace!("not a child of the given parent");
            return false;
        }

        self.detach(child);
        self.dismantle(child);
        true
    }

    /// Remove the child at position `index` as with [`Tree::remove_child`],
    /// returning the removed node.
    ///
    /// # Errors
    ///
    ///  - When `parent` is not in the tree.
    ///  - When `index` is not smaller than the number of children.
    pub fn remove_child_at(
        &mut self,
        parent: NodeIndex,
        index: usize,
    ) -> Result<NodeIndex, TreeError> {
        let children = &self.node(parent).ok_or(TreeError::UnknownNode(parent))?.children;
        let child = *children.get(index).ok_or(TreeError::IndexOutOfRange {
            index,
            len: children.len(),
        })?;

        self.remove_child(parent, child);
        Ok(child)
    }

    /// Remove each of the given children from `parent`, returning how many were removed.
    pub fn remove_children(
        &mut self,
        parent: NodeIndex,
        subset: impl IntoIterator<Item = NodeIndex>,
    ) -> usize {
        subset
            .into_iter()
            .filter(|&child| self.remove_child(parent, child))
            .count()
    }

    /// Remove every child of `parent` as with [`Tree::remove_child`].
    pub fn remove_all_children(&mut self, parent: NodeIndex) -> usize {
        let children = self.children(parent).to_vec();
        self.remove_children(parent, children)
    }

    /// Unlink the direct children of `parent`.
    ///
    /// Unlike [`Tree::remove_all_children`] the former children keep their own
    /// subtrees and become roots of separate trees.
    #[instrument(level = "debug", skip(self))]
    pub fn clear_children(&mut self, parent: NodeIndex) {
        let Some(node) = self.nodes.get_mut(parent) else {
            return;
        };

        for child in std::mem::take(&mut node.children) {
            self.nodes[child].parent = None;
        }
    }

    /// Dismantle the whole subtree below `parent`, level by level.
    ///
    /// Every descendant ends up as an isolated root and `parent` keeps no children.
    #[instrument(level = "debug", skip(self))]
    pub fn clear_all(&mut self, parent: NodeIndex) {
        if self.contains(parent) {
            self.dismantle(parent);
        }
    }

    /// Move `node`, together with its subtree, to the end of `new_parent`'s children.
    ///
    /// Returns `false` without touching the tree when `new_parent` is `node`
    /// itself or one of its descendants, or when `new_parent` is flagged as a leaf.
    ///
    /// # Example
    ///
    /// ```
    /// # use nodetree::Tree;
    /// let mut tree = Tree::<char, ()>::new();
    /// let [r, a, b] = ['r', 'a', 'b'].map(|id| tree.add_node(id, ()));
    /// tree.add_child(r, a);
    /// tree.add_child(a, b);
    ///
    /// assert!(!tree.move_node(a, b));
    /// assert!(tree.move_node(b, r));
    /// assert_eq!(tree.children(r), [a, b]);
    /// ```
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&mut self, node: NodeIndex, new_parent: NodeIndex) -> bool {
        if new_parent == node || self.is_descendant(node, new_parent) {
            debug!("refusing to move a node below itself");
            return false;
        }

        self.add_child(new_parent, node)
    }
}
