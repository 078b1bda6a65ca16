//! The flat, id-indexed form of a tree.
//!
//! A [`FlatMap`] describes a tree as a set of [`FlatNode`] records keyed by
//! node id. Each record names its parent and its children by id, so the form
//! has no cyclic references and can be stored or sent anywhere. An encoded
//! tree must keep ids unique, must agree on every parent/child link from both
//! ends, and must have exactly one record without a parent.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::node::Node;
use crate::tree::Tree;
use crate::NodeIndex;

/// A node in its flat form.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatNode<K, V> {
    pub id: K,
    pub parent_id: Option<K>,
    /// Ids of the children in order, without repetitions.
    pub children_ids: Vec<K>,
    pub value: Option<V>,
    pub display_value: Option<String>,
    pub leaf: bool,
}

/// Flat records keyed by their id.
pub type FlatMap<K, V> = BTreeMap<K, FlatNode<K, V>>;

/// Which end of a link a dangling id was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Parent,
    Child,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Parent => f.write_str("parent"),
            ReferenceKind::Child => f.write_str("child"),
        }
    }
}

/// Problems found in a [`FlatMap`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlatError<K: Debug> {
    #[error("record {id:?} refers to a missing {kind} {missing:?}")]
    DanglingReference {
        id: K,
        missing: K,
        kind: ReferenceKind,
    },
    #[error("records {id:?} and {other:?} disagree about their parent-child link")]
    Inconsistent { id: K, other: K },
    #[error("records {first:?} and {second:?} both lack a parent")]
    MultipleRoots { first: K, second: K },
    #[error("every record has a parent")]
    NoRoot,
    #[error("the parent chain of record {0:?} never reaches the root")]
    Cycle(K),
    #[error("record stored under {key:?} carries the id {id:?}")]
    KeyMismatch { key: K, id: K },
}

impl<K, V> Tree<K, V> {
    /// Flatten the subtree rooted at `root` into a map keyed by id.
    ///
    /// When several nodes share an id the first one in pre-order wins and the
    /// others are left out. The record of `root` names its real parent, so
    /// flattening a subtree that is not a whole tree leaves a dangling parent id.
    #[instrument(level = "debug", skip(self))]
    pub fn flatten(&self, root: NodeIndex) -> FlatMap<K, V>
    where
        K: Ord + Clone,
        V: Clone,
    {
        let mut map = FlatMap::new();

        for index in self.pre_order(root) {
            let node = &self[index];

            if map.contains_key(&node.id) {
                debug!(node = %index, "duplicate id, keeping the first record");
                continue;
            }

            let mut seen = BTreeSet::new();
            let mut children_ids: Vec<K> = Vec::with_capacity(node.children.len());
            for &child in &node.children {
                let id = &self[child].id;
                if seen.insert(id) {
                    children_ids.push(id.clone());
                }
            }

            map.insert(
                node.id.clone(),
                FlatNode {
                    id: node.id.clone(),
                    parent_id: node.parent.map(|p| self[p].id.clone()),
                    children_ids,
                    value: node.value.clone(),
                    display_value: node.display_value.clone(),
                    leaf: node.leaf,
                },
            );
        }

        map
    }
}

/// The record without a parent, if any.
///
/// When several records lack a parent the one with the smallest id is returned.
pub fn flat_root<K: Ord, V>(map: &FlatMap<K, V>) -> Option<&FlatNode<K, V>> {
    map.values().find(|record| record.parent_id.is_none())
}

/// Checks that a flat map describes exactly one tree.
///
/// An empty map is valid.
///
/// # Errors
///
///  - [`FlatError::KeyMismatch`] when a record is stored under another id.
///  - [`FlatError::DanglingReference`] when a parent or child id has no record.
///  - [`FlatError::Inconsistent`] when the two ends of a link disagree.
///  - [`FlatError::MultipleRoots`] / [`FlatError::NoRoot`] unless exactly one
///    record lacks a parent.
///  - [`FlatError::Cycle`] when a record is not connected to the root.
pub fn validate<K, V>(map: &FlatMap<K, V>) -> Result<(), FlatError<K>>
where
    K: Ord + Clone + Debug,
{
    let mut root: Option<&K> = None;

    for (key, record) in map {
        if record.id != *key {
            return Err(FlatError::KeyMismatch {
                key: key.clone(),
                id: record.id.clone(),
            });
        }

        match &record.parent_id {
            None => match root {
                None => root = Some(key),
                Some(first) => {
                    return Err(FlatError::MultipleRoots {
                        first: first.clone(),
                        second: key.clone(),
                    })
                }
            },
            Some(parent_id) => {
                let parent = map
                    .get(parent_id)
                    .ok_or_else(|| FlatError::DanglingReference {
                        id: key.clone(),
                        missing: parent_id.clone(),
                        kind: ReferenceKind::Parent,
                    })?;

                if !parent.children_ids.contains(key) {
                    return Err(FlatError::Inconsistent {
                        id: key.clone(),
                        other: parent_id.clone(),
                    });
                }
            }
        }

        for child_id in &record.children_ids {
            let child = map
                .get(child_id)
                .ok_or_else(|| FlatError::DanglingReference {
                    id: key.clone(),
                    missing: child_id.clone(),
                    kind: ReferenceKind::Child,
                })?;

            if child.parent_id.as_ref() != Some(key) {
                return Err(FlatError::Inconsistent {
                    id: child_id.clone(),
                    other: key.clone(),
                });
            }
        }
    }

    let Some(root) = root else {
        return if map.is_empty() {
            Ok(())
        } else {
            Err(FlatError::NoRoot)
        };
    };

    // With consistent links, whatever the root cannot reach hangs off a cycle.
    let mut reached = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(key) = stack.pop() {
        if reached.insert(key) {
            stack.extend(map[key].children_ids.iter());
        }
    }

    match map.keys().find(|key| !reached.contains(key)) {
        Some(stray) => Err(FlatError::Cycle(stray.clone())),
        None => Ok(()),
    }
}

/// A tree rebuilt from its flat form, together with the id lookup table.
#[derive(Debug, Clone)]
pub struct Reconstruction<K: Debug, V> {
    tree: Tree<K, V>,
    index: BTreeMap<K, NodeIndex>,
    issues: Vec<FlatError<K>>,
}

impl<K: Ord + Debug, V> Reconstruction<K, V> {
    pub fn tree(&self) -> &Tree<K, V> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree<K, V> {
        &mut self.tree
    }

    /// The node rebuilt from the record with the given id.
    pub fn get(&self, id: &K) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// The node without a parent, or `None` when nothing was rebuilt.
    ///
    /// A map with several parentless records is not supported; in that case
    /// the node of the smallest id is returned.
    pub fn root(&self) -> Option<NodeIndex> {
        self.index
            .values()
            .copied()
            .find(|&node| self.tree.is_root(node))
    }

    /// Links that could not be restored. Always empty after [`reconstruct`].
    pub fn issues(&self) -> &[FlatError<K>] {
        &self.issues
    }

    /// The ids that were referenced but had no record.
    pub fn dangling(&self) -> impl Iterator<Item = &FlatError<K>> + '_ {
        self.issues
            .iter()
            .filter(|issue| matches!(issue, FlatError::DanglingReference { .. }))
    }

    pub fn into_tree(self) -> Tree<K, V> {
        self.tree
    }

    pub fn into_parts(self) -> (Tree<K, V>, BTreeMap<K, NodeIndex>) {
        (self.tree, self.index)
    }
}

/// Rebuild a tree from its flat form.
///
/// # Errors
///
/// Fails with the first problem [`validate`] finds; in particular every id
/// referenced as a parent or child must have a record of its own.
///
/// # Example
///
/// ```
/// # use nodetree::{flat, Tree};
/// let mut tree = Tree::<u32, &str>::new();
/// let root = tree.add_node(1, "root");
/// let child = tree.add_node(2, "child");
/// tree.add_child(root, child);
///
/// let map = tree.flatten(root);
/// assert_eq!(map[&2].parent_id, Some(1));
///
/// let rebuilt = flat::reconstruct(&map).unwrap();
/// let root = rebuilt.root().unwrap();
/// assert_eq!(rebuilt.tree().id(root), Some(&1));
/// assert_eq!(rebuilt.tree().children(root), [rebuilt.get(&2).unwrap()]);
/// ```
#[instrument(level = "debug", skip_all, fields(records = map.len()))]
pub fn reconstruct<K, V>(map: &FlatMap<K, V>) -> Result<Reconstruction<K, V>, FlatError<K>>
where
    K: Ord + Clone + Debug,
    V: Clone,
{
    validate(map)?;
    let reconstruction = reconstruct_lenient(map);
    debug_assert!(reconstruction.issues.is_empty());
    Ok(reconstruction)
}

/// Rebuild a tree from its flat form, skipping the links that cannot be restored.
///
/// Works in two passes: first one node is created for every record, then the
/// links are resolved through the id table. Child order follows
/// `children_ids`. A link is only made when both records agree on it and it
/// does not close a cycle; every link left out is reported in
/// [`Reconstruction::issues`], so a root can always be told apart from a
/// node whose parent is missing.
#[instrument(level = "debug", skip_all, fields(records = map.len()))]
pub fn reconstruct_lenient<K, V>(map: &FlatMap<K, V>) -> Reconstruction<K, V>
where
    K: Ord + Clone + Debug,
    V: Clone,
{
    let mut tree = Tree::with_capacity(map.len());
    let mut index = BTreeMap::new();
    let mut issues = Vec::new();

    for (key, record) in map {
        let node = tree.insert_node(Node {
            id: record.id.clone(),
            value: record.value.clone(),
            display_value: record.display_value.clone(),
            parent: None,
            children: Vec::new(),
            leaf: record.leaf,
        });
        index.insert(key.clone(), node);
    }

    for (key, record) in map {
        let parent = index[key];

        for child_id in &record.children_ids {
            let Some(&child) = index.get(child_id) else {
                issues.push(FlatError::DanglingReference {
                    id: key.clone(),
                    missing: child_id.clone(),
                    kind: ReferenceKind::Child,
                });
                continue;
            };

            if map[child_id].parent_id.as_ref() != Some(key) {
                issues.push(FlatError::Inconsistent {
                    id: child_id.clone(),
                    other: key.clone(),
                });
            } else if tree.parent(child).is_none() && !tree.force_link(parent, child) {
                issues.push(FlatError::Cycle(child_id.clone()));
            }
        }
    }

    // Records naming a parent that does not list them.
    for (key, record) in map {
        let Some(parent_id) = &record.parent_id else {
            continue;
        };

        let child = index[key];
        match index.get(parent_id) {
            None => issues.push(FlatError::DanglingReference {
                id: key.clone(),
                missing: parent_id.clone(),
                kind: ReferenceKind::Parent,
            }),
            Some(&parent) if !map[parent_id].children_ids.contains(key) => {
                issues.push(FlatError::Inconsistent {
                    id: key.clone(),
                    other: parent_id.clone(),
                });
                if tree.parent(child).is_none() && !tree.force_link(parent, child) {
                    issues.push(FlatError::Cycle(key.clone()));
                }
            }
            Some(_) => {}
        }
    }

    if !issues.is_empty() {
        debug!(issues = issues.len(), "flat map has links that could not be restored");
    }

    Reconstruction {
        tree,
        index,
        issues,
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    type Map = FlatMap<&'static str, u32>;

    /// root -> {a, b}, b -> {c}
    fn sample() -> (Tree<&'static str, u32>, [NodeIndex; 4]) {
        let mut tree = Tree::new();
        let nodes = [("root", 0), ("a", 1), ("b", 2), ("c", 3)].map(|(id, v)| tree.add_node(id, v));
        let [root, a, b, c] = nodes;
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.add_child(b, c);
        (tree, nodes)
    }

    fn record(id: &'static str, parent_id: Option<&'static str>, children: &[&'static str]) -> FlatNode<&'static str, u32> {
        FlatNode {
            id,
            parent_id,
            children_ids: children.to_vec(),
            value: None,
            display_value: None,
            leaf: false,
        }
    }

    fn map_of(records: impl IntoIterator<Item = FlatNode<&'static str, u32>>) -> Map {
        records.into_iter().map(|r| (r.id, r)).collect()
    }

    #[test]
    fn flatten_records_links() {
        let (mut tree, [root, _, b, c]) = sample();
        tree.set_display_value(c, Some("C".into()));
        tree.set_leaf(c, true);

        let map = tree.flatten(root);
        assert_eq!(map.len(), 4);
        assert_eq!(map["root"].children_ids, ["a", "b"]);
        assert_eq!(map["root"].parent_id, None);
        assert_eq!(map["c"].parent_id, Some("b"));
        assert_eq!(map["c"].display_value.as_deref(), Some("C"));
        assert!(map["c"].leaf);
        assert_eq!(map["b"].value, Some(2));

        // A subtree keeps the id of its real parent.
        let sub = tree.flatten(b);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub["b"].parent_id, Some("root"));
    }

    #[test]
    fn flatten_keeps_first_duplicate() {
        let mut tree = Tree::<&str, u32>::new();
        let root = tree.add_node("root", 0);
        let first = tree.add_node("dup", 1);
        let second = tree.add_node("dup", 2);
        tree.add_child(root, first);
        tree.add_child(root, second);

        let map = tree.flatten(root);
        assert_eq!(map.len(), 2);
        assert_eq!(map["dup"].value, Some(1));
        assert_eq!(map["root"].children_ids, ["dup"]);
    }

    #[test]
    fn reconstruct_sample() {
        let (tree, [root, ..]) = sample();
        let map = tree.flatten(root);
        let rebuilt = reconstruct(&map).unwrap();

        let new_root = rebuilt.root().unwrap();
        let t = rebuilt.tree();
        assert_eq!(t.id(new_root), Some(&"root"));
        assert_eq!(t.node_count(), 4);

        let c = rebuilt.get(&"c").unwrap();
        assert_eq!(t.parent_id(c), Some(&"b"));
        assert_eq!(t.value(c), Some(&3));
        let ids: Vec<_> = t.children(new_root).iter().map(|&n| *t[n].id()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(rebuilt.issues().is_empty());
    }

    #[test]
    fn reconstruct_empty() {
        let rebuilt = reconstruct(&Map::new()).unwrap();
        assert_eq!(rebuilt.root(), None);
        assert!(rebuilt.tree().is_empty());
        assert!(flat_root(&Map::new()).is_none());
    }

    #[rstest]
    #[case::dangling_parent(
        map_of([record("root", None, &[]), record("a", Some("ghost"), &[])]),
        FlatError::DanglingReference { id: "a", missing: "ghost", kind: ReferenceKind::Parent }
    )]
    #[case::dangling_child(
        map_of([record("root", None, &["ghost"])]),
        FlatError::DanglingReference { id: "root", missing: "ghost", kind: ReferenceKind::Child }
    )]
    #[case::unlisted_child(
        map_of([record("root", None, &[]), record("a", Some("root"), &[])]),
        FlatError::Inconsistent { id: "a", other: "root" }
    )]
    #[case::wrong_parent(
        map_of([record("root", None, &["a", "b"]), record("a", Some("b"), &[]), record("b", Some("root"), &["a"])]),
        FlatError::Inconsistent { id: "a", other: "root" }
    )]
    #[case::two_roots(
        map_of([record("a", None, &[]), record("b", None, &[])]),
        FlatError::MultipleRoots { first: "a", second: "b" }
    )]
    #[case::no_root(
        map_of([record("a", Some("b"), &["b"]), record("b", Some("a"), &["a"])]),
        FlatError::NoRoot
    )]
    #[case::cycle(
        map_of([record("root", None, &[]), record("a", Some("b"), &["b"]), record("b", Some("a"), &["a"])]),
        FlatError::Cycle("a")
    )]
    fn validate_rejects(#[case] map: Map, #[case] expected: FlatError<&'static str>) {
        assert_eq!(validate(&map), Err(expected.clone()));
        assert_eq!(reconstruct(&map).unwrap_err(), expected);
    }

    #[test]
    fn key_mismatch() {
        let mut map = map_of([record("root", None, &[])]);
        map.insert("alias", record("other", None, &[]));
        assert_eq!(
            validate(&map),
            Err(FlatError::KeyMismatch { key: "alias", id: "other" })
        );
    }

    #[test]
    fn lenient_reports_gaps() {
        let (tree, [_, _, b, _]) = sample();
        let sub = tree.flatten(b);
        let rebuilt = reconstruct_lenient(&sub);

        // The subtree root lost its parent, which is reported rather than hidden.
        let new_b = rebuilt.get(&"b").unwrap();
        assert_eq!(rebuilt.tree().parent(new_b), None);
        assert_eq!(rebuilt.root(), Some(new_b));
        assert_eq!(
            rebuilt.dangling().collect::<Vec<_>>(),
            [&FlatError::DanglingReference {
                id: "b",
                missing: "root",
                kind: ReferenceKind::Parent
            }]
        );
        assert_eq!(rebuilt.tree().children(new_b), [rebuilt.get(&"c").unwrap()]);
    }

    #[test]
    fn lenient_breaks_cycles() {
        let map = map_of([record("a", Some("b"), &["b"]), record("b", Some("a"), &["a"])]);
        let rebuilt = reconstruct_lenient(&map);
        let [a, b] = [&"a", &"b"].map(|id| rebuilt.get(id).unwrap());

        assert_eq!(rebuilt.tree().parent(b), Some(a));
        assert_eq!(rebuilt.tree().parent(a), None);
        assert_eq!(rebuilt.issues(), [FlatError::Cycle("a")]);
    }

    #[test]
    fn lenient_links_unlisted_children() {
        let map = map_of([record("root", None, &[]), record("a", Some("root"), &[])]);
        let rebuilt = reconstruct_lenient(&map);
        let [root, a] = [&"root", &"a"].map(|id| rebuilt.get(id).unwrap());

        assert_eq!(rebuilt.issues(), [FlatError::Inconsistent { id: "a", other: "root" }]);
        assert_eq!(rebuilt.tree().parent(a), Some(root));
        assert_eq!(rebuilt.tree().children(root), [a]);
        assert_eq!(rebuilt.root(), Some(root));
    }

    #[test]
    fn lenient_refuses_unlisted_link_closing_a_cycle() {
        // "b" lists nothing, yet "a" claims it as parent while owning "b".
        let map = map_of([record("a", Some("b"), &["b"]), record("b", Some("a"), &[])]);
        let rebuilt = reconstruct_lenient(&map);
        let [a, b] = [&"a", &"b"].map(|id| rebuilt.get(id).unwrap());

        assert_eq!(
            rebuilt.issues(),
            [
                FlatError::Inconsistent { id: "a", other: "b" },
                FlatError::Cycle("a")
            ]
        );
        assert_eq!(rebuilt.tree().parent(b), Some(a));
        assert_eq!(rebuilt.tree().parent(a), None);
    }

    #[test]
    fn leaf_flag_survives_with_children() {
        let (mut tree, [root, _, b, c]) = sample();
        tree.set_leaf(b, true);

        let rebuilt = reconstruct(&tree.flatten(root)).unwrap();
        let new_b = rebuilt.get(&"b").unwrap();
        assert!(rebuilt.tree().is_leaf(new_b));
        assert_eq!(rebuilt.tree().children(new_b), [rebuilt.get(tree.id(c).unwrap()).unwrap()]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let (tree, [root, ..]) = sample();
        let map = tree.flatten(root);

        let json = serde_json::to_string(&map).unwrap();
        let decoded: FlatMap<String, u32> = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded["c"].parent_id.as_deref(), Some("b"));
        assert!(reconstruct(&decoded).is_ok());
    }
}
