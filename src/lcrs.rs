//! Left-child/right-sibling encoding of a subtree.
//!
//! Every node becomes one [`LcrsEntry`] in a flat list. Instead of a child
//! list, an entry stores the position of its first child and the position of
//! its next sibling, which turns the tree into a binary tree of positions.
//! Entries are emitted in pre-order, so the subtree root is always at position
//! 0 and a node's first child, when present, directly follows it.
use std::collections::BTreeMap;

use bitvec::vec::BitVec;
use tracing::{debug, instrument};

use crate::node::Node;
use crate::tree::{Tree, TreeError};
use crate::NodeIndex;

/// One node of a left-child/right-sibling encoded subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LcrsEntry<K, V> {
    pub id: K,
    pub value: Option<V>,
    pub display_value: Option<String>,
    pub leaf: bool,
    pub first_child: Option<usize>,
    pub next_sibling: Option<usize>,
}

impl<K, V> Tree<K, V> {
    /// Encode the subtree rooted at `root`. Unknown nodes encode to an empty list.
    pub fn encode_lcrs(&self, root: NodeIndex) -> Vec<LcrsEntry<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        let order = self.traverse(root);
        let position: BTreeMap<NodeIndex, usize> =
            order.iter().enumerate().map(|(pos, &n)| (n, pos)).collect();

        order
            .iter()
            .map(|&n| {
                let node = &self[n];
                let next_sibling = if n == root {
                    None
                } else {
                    self.next_sibling(n).map(|s| position[&s])
                };

                LcrsEntry {
                    id: node.id.clone(),
                    value: node.value.clone(),
                    display_value: node.display_value.clone(),
                    leaf: node.leaf,
                    first_child: node.children.first().map(|c| position[c]),
                    next_sibling,
                }
            })
            .collect()
    }

    /// Rebuild an encoded subtree as new nodes of this arena.
    ///
    /// Returns the root of the new subtree, or `None` for an empty list.
    ///
    /// # Errors
    ///
    /// [`TreeError::MalformedEncoding`] with the offending position when a
    /// link points past the end, when a position is linked to more than once
    /// or is the root, when the root has a sibling, or when a position cannot
    /// be reached from the root.
    /// The arena is left untouched in that case.
    ///
    /// # Example
    ///
    /// ```
    /// # use nodetree::Tree;
    /// let mut tree = Tree::<u8, ()>::new();
    /// let [r, a, b] = [0, 1, 2].map(|id| tree.add_node(id, ()));
    /// tree.add_child(r, a);
    /// tree.add_child(r, b);
    ///
    /// let entries = tree.encode_lcrs(r);
    /// assert_eq!(entries[1].next_sibling, Some(2));
    ///
    /// let copy = tree.decode_lcrs(entries).unwrap().unwrap();
    /// assert_eq!(tree.child_count(copy), 2);
    /// assert_eq!(tree.node_count(), 6);
    /// ```
    #[instrument(level = "debug", skip_all, fields(entries = entries.len()))]
    pub fn decode_lcrs(
        &mut self,
        entries: Vec<LcrsEntry<K, V>>,
    ) -> Result<Option<NodeIndex>, TreeError> {
        if entries.is_empty() {
            return Ok(None);
        }
        check_links(&entries)?;

        let links: Vec<_> = entries
            .iter()
            .map(|e| (e.first_child, e.next_sibling))
            .collect();

        let nodes: Vec<NodeIndex> = entries
            .into_iter()
            .map(|e| {
                let mut node = Node::new(e.id, e.value);
                node.display_value = e.display_value;
                node.leaf = e.leaf;
                self.insert_node(node)
            })
            .collect();

        for (pos, &(first_child, _)) in links.iter().enumerate() {
            let mut child = first_child;
            while let Some(c) = child {
                self.force_link(nodes[pos], nodes[c]);
                child = links[c].1;
            }
        }

        Ok(Some(nodes[0]))
    }
}

/// Checks that the links of `entries` form a binary tree rooted at position 0.
fn check_links<K, V>(entries: &[LcrsEntry<K, V>]) -> Result<(), TreeError> {
    let len = entries.len();
    if entries[0].next_sibling.is_some() {
        debug!("root entry has a sibling");
        return Err(TreeError::MalformedEncoding(0));
    }

    let mut linked: BitVec = BitVec::repeat(false, len);

    for (pos, entry) in entries.iter().enumerate() {
        for target in [entry.first_child, entry.next_sibling].into_iter().flatten() {
            if target >= len || target == 0 || linked.replace(target, true) {
                debug!(pos, target, "invalid link");
                return Err(TreeError::MalformedEncoding(pos));
            }
        }
    }

    // Every position but the root now has exactly one incoming link, so the
    // only way to miss one from the root is a detached cycle.
    let mut reached: BitVec = BitVec::repeat(false, len);
    let mut stack = vec![0];
    while let Some(pos) = stack.pop() {
        if !reached.replace(pos, true) {
            stack.extend([entries[pos].first_child, entries[pos].next_sibling].into_iter().flatten());
        }
    }

    match reached.first_zero() {
        Some(pos) => Err(TreeError::MalformedEncoding(pos)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    fn entry(id: u8, first_child: Option<usize>, next_sibling: Option<usize>) -> LcrsEntry<u8, ()> {
        LcrsEntry {
            id,
            value: None,
            display_value: None,
            leaf: false,
            first_child,
            next_sibling,
        }
    }

    #[test]
    fn encode_positions() {
        // r -> {a, b}, a -> {c}
        let mut tree = Tree::<u8, ()>::new();
        let [r, a, b, c] = [0, 1, 2, 3].map(|id| tree.add_node(id, ()));
        tree.add_child(r, a);
        tree.add_child(r, b);
        tree.add_child(a, c);

        let entries = tree.encode_lcrs(r);
        let links: Vec<_> = entries
            .iter()
            .map(|e| (e.id, e.first_child, e.next_sibling))
            .collect();
        assert_eq!(
            links,
            [
                (0, Some(1), None),
                (1, Some(2), Some(3)),
                (3, None, None),
                (2, None, None)
            ]
        );

        // A non-root subtree does not point at its root's siblings.
        assert_eq!(tree.encode_lcrs(a)[0].next_sibling, None);
        tree.delete_subtree(c);
        assert!(tree.encode_lcrs(c).is_empty());
    }

    #[test]
    fn decode_rebuilds_structure() {
        let mut tree = Tree::<u8, ()>::new();
        let [r, a, b, c] = [0, 1, 2, 3].map(|id| tree.add_node(id, ()));
        tree.add_child(r, a);
        tree.add_child(r, b);
        tree.add_child(b, c);
        tree.set_leaf(b, true);
        tree.set_display_value(c, Some("c".to_string()));

        let copy = tree.decode_lcrs(tree.encode_lcrs(r)).unwrap().unwrap();
        assert!(tree.is_root(copy));
        assert_eq!(tree.flatten(copy), tree.flatten(r));
    }

    #[test]
    fn decode_empty() {
        let mut tree = Tree::<u8, ()>::new();
        assert_eq!(tree.decode_lcrs(Vec::new()), Ok(None));
        assert!(tree.is_empty());
    }

    #[rstest]
    #[case::past_the_end(vec![entry(0, Some(5), None)], 0)]
    #[case::root_with_sibling(vec![entry(0, None, Some(1)), entry(1, None, None)], 0)]
    #[case::links_to_root(vec![entry(0, Some(1), None), entry(1, None, Some(0))], 1)]
    #[case::two_parents(vec![entry(0, Some(1), None), entry(1, Some(2), Some(2)), entry(2, None, None)], 1)]
    #[case::detached_cycle(vec![entry(0, None, None), entry(1, None, Some(2)), entry(2, None, Some(1))], 1)]
    fn decode_rejects(#[case] entries: Vec<LcrsEntry<u8, ()>>, #[case] pos: usize) {
        let mut tree = Tree::new();
        assert_eq!(tree.decode_lcrs(entries), Err(TreeError::MalformedEncoding(pos)));
        assert!(tree.is_empty());
    }
}
