//! The node type stored in a [`Tree`](crate::Tree).
use crate::tree::IndexMap;
use crate::NodeIndex;

/// A single vertex of a [`Tree`](crate::Tree).
///
/// The structural fields can only be changed through the tree, which keeps the
/// parent link and the parent's child list in agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<K, V> {
    pub(crate) id: K,
    pub(crate) value: Option<V>,
    pub(crate) display_value: Option<String>,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) children: Vec<NodeIndex>,
    pub(crate) leaf: bool,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(id: K, value: Option<V>) -> Self {
        Self {
            id,
            value,
            display_value: None,
            parent: None,
            children: Vec::new(),
            leaf: false,
        }
    }

    /// A detached copy of this node's payload: same id, value, label and leaf
    /// flag, without any links.
    pub(crate) fn detached_copy(&self) -> Self
    where
        K: Clone,
        V: Clone,
    {
        Self {
            id: self.id.clone(),
            value: self.value.clone(),
            display_value: self.display_value.clone(),
            parent: None,
            children: Vec::new(),
            leaf: self.leaf,
        }
    }

    #[inline]
    pub fn id(&self) -> &K {
        &self.id
    }

    #[inline]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    #[inline]
    pub fn display_value(&self) -> Option<&str> {
        self.display_value.as_deref()
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// The explicit leaf flag. A leaf-flagged node refuses new children but
    /// may still hold the ones it had when the flag was set.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Rewrites the structural links after the arena was renumbered.
    pub(crate) fn relink(&mut self, index_map: &IndexMap) {
        self.parent = self.parent.and_then(|p| index_map.get(&p)).copied();
        self.children.retain_mut(|child| match index_map.get(child) {
            Some(new) => {
                *child = *new;
                true
            }
            None => false,
        });
    }
}
