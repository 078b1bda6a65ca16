//! Arena-backed n-ary trees.
//!
//! A [`Tree`] stores nodes in an arena and hands out copyable [`NodeIndex`]
//! handles. Each node carries a user identifier `K`, an optional payload `V`,
//! an optional display label, a parent link, an ordered list of children and
//! an explicit leaf flag. Parent links do not own anything; the arena owns all
//! nodes, so a single arena can hold several disconnected trees at once.
//!
//! On top of the node model the crate provides
//!
//!  - navigation (`root_of`, `level`, siblings, ancestor tests),
//!  - structural edits that never introduce a cycle (`add_child`, `move_node`, ...),
//!  - pre- and post-order traversal through [`Visitor`]s and iterators,
//!  - conversion to and from the id-indexed [`FlatNode`] form,
//!  - merging trees by id and reassigning ids with an [`IdGenerator`],
//!  - a left-child/right-sibling encoding.
//!
//! # Example
//!
//! ```
//! use nodetree::{flat, Tree};
//!
//! let mut tree = Tree::<&str, u32>::new();
//! let root = tree.add_node("root", 0);
//! let a = tree.add_node("a", 1);
//! let b = tree.add_node("b", 2);
//! let c = tree.add_node("c", 3);
//! tree.add_child(root, a);
//! tree.add_child(root, b);
//! tree.add_child(b, c);
//!
//! assert_eq!(tree.traverse(root).len(), 4);
//! assert_eq!(tree.level(c), 2);
//! assert_eq!(tree.siblings(a), [b]);
//!
//! let map = tree.flatten(root);
//! let rebuilt = flat::reconstruct(&map).unwrap();
//! let c2 = rebuilt.get(&"c").unwrap();
//! assert_eq!(rebuilt.tree().parent_id(c2), Some(&"b"));
//! ```
use std::fmt;

pub mod flat;
pub mod lcrs;
pub mod memory;
pub mod merge;
mod mutate;
mod navigate;
pub mod node;
pub mod reindex;
pub mod tree;
pub mod visit;

pub use flat::{FlatError, FlatMap, FlatNode};
pub use lcrs::LcrsEntry;
pub use merge::{merge_into, MergeReport, MergeStrategy};
pub use navigate::Ancestors;
pub use node::Node;
pub use reindex::{IdGenerator, SequentialIds};
pub use tree::{Tree, TreeError};
pub use visit::{PostOrder, PreOrder, TraversalOrder, Visitor, VisitorMut};

/// Handle of a node inside a [`Tree`].
///
/// Indices stay valid until the node is freed with [`Tree::delete_subtree`]
/// or renumbered by [`Tree::compact`]. Freed slots are reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeIndex(u32);

entity_impl!(NodeIndex, u32);

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIndex({})", self.0)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
