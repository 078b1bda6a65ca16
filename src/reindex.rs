//! Reassigning node ids from an injected generator.
use std::ops::AddAssign;

use tracing::instrument;

use crate::tree::Tree;
use crate::visit::TraversalOrder;
use crate::NodeIndex;

/// A source of fresh ids.
///
/// Any `FnMut() -> K` closure is a generator.
pub trait IdGenerator<K> {
    fn next_id(&mut self) -> K;
}

impl<K, F> IdGenerator<K> for F
where
    F: FnMut() -> K,
{
    #[inline]
    fn next_id(&mut self) -> K {
        self()
    }
}

/// Hands out consecutive numbers, starting at zero unless told otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialIds<K> {
    next: K,
}

impl<K: From<u8>> SequentialIds<K> {
    pub fn new() -> Self {
        Self::starting_at(K::from(0))
    }
}

impl<K> SequentialIds<K> {
    pub fn starting_at(first: K) -> Self {
        Self { next: first }
    }
}

impl<K: From<u8>> Default for SequentialIds<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> IdGenerator<K> for SequentialIds<K>
where
    K: Copy + AddAssign + From<u8>,
{
    fn next_id(&mut self) -> K {
        let id = self.next;
        self.next += K::from(1);
        id
    }
}

impl<K, V> Tree<K, V> {
    /// Give every node of the subtree rooted at `node` a fresh id, in visit
    /// order. With [`TraversalOrder::PreOrder`] the subtree root gets the
    /// first id. Returns the number of renamed nodes.
    ///
    /// # Example
    ///
    /// ```
    /// # use nodetree::{SequentialIds, TraversalOrder, Tree};
    /// let mut tree = Tree::<u32, ()>::new();
    /// let [r, a, b] = [7, 8, 9].map(|id| tree.add_node(id, ()));
    /// tree.add_child(r, a);
    /// tree.add_child(a, b);
    ///
    /// let mut ids = SequentialIds::<u32>::starting_at(100);
    /// assert_eq!(tree.reindex(r, TraversalOrder::PostOrder, &mut ids), 3);
    /// assert_eq!([r, a, b].map(|n| tree[n].id().clone()), [102, 101, 100]);
    /// ```
    #[instrument(level = "debug", skip(self, generator))]
    pub fn reindex<G>(&mut self, node: NodeIndex, order: TraversalOrder, generator: &mut G) -> usize
    where
        G: IdGenerator<K> + ?Sized,
    {
        let mut renamed = 0;
        self.walk_mut(node, order, &mut |tree: &mut Tree<K, V>, n: NodeIndex| {
            tree.nodes[n].id = generator.next_id();
            renamed += 1;
        });
        renamed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sequential_ids() {
        let mut ids = SequentialIds::<u64>::new();
        assert_eq!([ids.next_id(), ids.next_id(), ids.next_id()], [0, 1, 2]);

        let mut ids = SequentialIds::<i32>::starting_at(-1);
        assert_eq!(ids.next_id(), -1);
        assert_eq!(ids.next_id(), 0);
    }

    #[test]
    fn pre_order_gives_root_the_first_id() {
        let mut tree = Tree::<String, u8>::new();
        let [r, a, b, c] = ["r", "a", "b", "c"].map(|id| tree.add_node(id.to_string(), 0));
        tree.add_child(r, a);
        tree.add_child(r, b);
        tree.add_child(a, c);
        let outside = tree.add_node("outside".into(), 0);

        let mut counter = 0;
        let mut generator = || {
            counter += 1;
            format!("n{counter}")
        };
        assert_eq!(tree.reindex(r, TraversalOrder::PreOrder, &mut generator), 4);

        let ids: Vec<_> = [r, a, c, b].iter().map(|&n| tree[n].id().as_str()).collect();
        assert_eq!(ids, ["n1", "n2", "n3", "n4"]);
        assert_eq!(tree.id(outside).map(String::as_str), Some("outside"));
    }

    #[test]
    fn reindex_keeps_structure() {
        let mut tree = Tree::<u32, &str>::new();
        let [r, a, b] = [(1, "r"), (2, "a"), (3, "b")].map(|(id, v)| tree.add_node(id, v));
        tree.add_child(r, a);
        tree.add_child(a, b);

        let before = tree.traverse(r);
        tree.reindex(a, TraversalOrder::PreOrder, &mut SequentialIds::<u32>::starting_at(10));

        assert_eq!(tree.traverse(r), before);
        assert_eq!(tree.parent_id(b), Some(&10));
        assert_eq!(tree.id(r), Some(&1));
        assert_eq!(tree.value(a), Some(&"a"));
    }

    #[test]
    fn unknown_node_renames_nothing() {
        let mut tree = Tree::<u32, ()>::new();
        let n = tree.add_node(0, ());
        tree.delete_subtree(n);
        assert_eq!(tree.reindex(n, TraversalOrder::PreOrder, &mut SequentialIds::<u32>::new()), 0);
    }
}
