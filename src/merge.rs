//! Merging one subtree into another by id.
//!
//! Nodes are matched structurally: the source root is looked up by id in the
//! target subtree, and below it every source node is matched by id among the
//! children of its parent's counterpart. Source nodes without a counterpart are
//! copied into the target. The source tree is never modified.
use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::tree::Tree;
use crate::NodeIndex;

/// What to do with a target node that has a counterpart in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergeStrategy {
    /// Replace value, display value and leaf flag with the source's.
    Overwrite,
    /// Leave the target node as it is.
    #[default]
    Keep,
}

/// Counts of what a merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MergeReport {
    /// Source nodes copied into the target.
    pub added: usize,
    /// Matched target nodes whose payload was replaced.
    pub overwritten: usize,
    /// Matched target nodes left untouched.
    pub kept: usize,
    /// Source nodes skipped together with their subtrees, because their id
    /// is already used elsewhere in the target or the target parent is
    /// flagged as a leaf.
    pub conflicts: usize,
}

impl MergeReport {
    /// Whether the merge left the target unchanged.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.overwritten == 0
    }
}

/// Merge the subtree of `source_root` into the subtree of `target_root`.
///
/// Nothing happens when no node below `target_root` carries the id of
/// `source_root`. Applying the same merge twice has the same effect as
/// applying it once.
///
/// # Example
///
/// ```
/// # use nodetree::{merge_into, MergeStrategy, Tree};
/// let mut source = Tree::<&str, u32>::new();
/// let [s_root, s_a, s_new] = [("root", 0), ("a", 10), ("new", 20)].map(|(id, v)| source.add_node(id, v));
/// source.add_child(s_root, s_a);
/// source.add_child(s_a, s_new);
///
/// let mut target = Tree::<&str, u32>::new();
/// let [t_root, t_a] = [("root", 0), ("a", 1)].map(|(id, v)| target.add_node(id, v));
/// target.add_child(t_root, t_a);
///
/// let report = merge_into(&source, s_root, &mut target, t_root, MergeStrategy::Keep);
/// assert_eq!(report.added, 1);
/// assert_eq!(target.value(t_a), Some(&1));
/// assert_eq!(target.child_count(t_a), 1);
/// ```
#[instrument(level = "debug", skip(source, target))]
pub fn merge_into<K, V>(
    source: &Tree<K, V>,
    source_root: NodeIndex,
    target: &mut Tree<K, V>,
    target_root: NodeIndex,
    strategy: MergeStrategy,
) -> MergeReport
where
    K: Ord + Clone,
    V: Clone,
{
    let mut report = MergeReport::default();

    let Some(root_id) = source.id(source_root) else {
        return report;
    };
    let Some(start) = target.find_by_id(target_root, root_id) else {
        debug!("source root has no counterpart in the target");
        return report;
    };

    let mut used: BTreeSet<K> = target
        .pre_order(target_root)
        .map(|n| target[n].id.clone())
        .collect();

    update(source, source_root, target, start, strategy, &mut report);

    // Pairs of (source node, target counterpart of its parent).
    let mut stack: Vec<(NodeIndex, NodeIndex)> = source
        .children(source_root)
        .iter()
        .rev()
        .map(|&c| (c, start))
        .collect();

    while let Some((node, parent)) = stack.pop() {
        let id = &source[node].id;
        let matched = target
            .children(parent)
            .iter()
            .copied()
            .find(|&c| target[c].id == *id);

        let counterpart = match matched {
            Some(existing) => {
                update(source, node, target, existing, strategy, &mut report);
                existing
            }
            None if used.contains(id) || target.is_leaf(parent) => {
                debug!(%node, %parent, "skipping conflicting source subtree");
                report.conflicts += 1;
                continue;
            }
            None => {
                let copy = target.insert_node(source[node].detached_copy());
                target.add_child(parent, copy);
                used.insert(id.clone());
                report.added += 1;
                copy
            }
        };

        stack.extend(
            source
                .children(node)
                .iter()
                .rev()
                .map(|&c| (c, counterpart)),
        );
    }

    debug!(?report, "merge finished");
    report
}

fn update<K, V: Clone>(
    source: &Tree<K, V>,
    node: NodeIndex,
    target: &mut Tree<K, V>,
    counterpart: NodeIndex,
    strategy: MergeStrategy,
    report: &mut MergeReport,
) {
    match strategy {
        MergeStrategy::Keep => report.kept += 1,
        MergeStrategy::Overwrite => {
            let from = &source[node];
            let to = &mut target.nodes[counterpart];
            to.value = from.value.clone();
            to.display_value = from.display_value.clone();
            to.leaf = from.leaf;
            report.overwritten += 1;
        }
    }
}
