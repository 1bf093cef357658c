use crate::model::EntityId;
use crate::tree::Forest;
use std::collections::BTreeSet;

/// Ids whose children are currently rendered. Ordered so that anything keyed
/// on it (memo tables, dumps) is deterministic.
pub type ExpandedSet = BTreeSet<EntityId>;

/// How the expanded set is seeded before the user touches anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionPolicy {
    Collapsed,
    All,
    /// Expand every node above this depth, so `Levels(2)` shows levels 0..=2.
    Levels(usize),
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        ExpansionPolicy::Levels(2)
    }
}

pub fn initial_expanded(forest: &Forest, policy: ExpansionPolicy) -> ExpandedSet {
    match policy {
        ExpansionPolicy::Collapsed => ExpandedSet::new(),
        ExpansionPolicy::All => expand_all(forest),
        ExpansionPolicy::Levels(depth) => forest
            .nodes()
            .iter()
            .filter(|node| node.level < depth && !node.is_leaf())
            .map(|node| node.id())
            .collect(),
    }
}

/// Flips one node. Returns whether it is expanded afterwards.
pub fn toggle(expanded: &mut ExpandedSet, id: EntityId) -> bool {
    if expanded.remove(&id) {
        false
    } else {
        expanded.insert(id);
        true
    }
}

pub fn expand_all(forest: &Forest) -> ExpandedSet {
    forest
        .nodes()
        .iter()
        .filter(|node| !node.is_leaf())
        .map(|node| node.id())
        .collect()
}

pub fn collapse_all() -> ExpandedSet {
    ExpandedSet::new()
}

/// Expands `id` and everything below it.
pub fn expand_subtree(forest: &Forest, expanded: &mut ExpandedSet, id: EntityId) {
    let Some(node) = forest.get(id) else {
        return;
    };
    if !node.is_leaf() {
        expanded.insert(id);
    }
    for descendant in forest.descendant_ids(id) {
        if forest.get(descendant).is_some_and(|node| !node.is_leaf()) {
            expanded.insert(descendant);
        }
    }
}

/// Collapses `id` and forgets the expansion state of everything below it,
/// so re-expanding shows one level at a time again.
pub fn collapse_subtree(forest: &Forest, expanded: &mut ExpandedSet, id: EntityId) {
    expanded.remove(&id);
    for descendant in forest.descendant_ids(id) {
        expanded.remove(&descendant);
    }
}

/// Number of nodes a layout pass would emit for this expanded set.
pub fn visible_count(forest: &Forest, expanded: &ExpandedSet) -> usize {
    let mut count = 0;
    let mut stack: Vec<_> = forest.roots().to_vec();
    while let Some(idx) = stack.pop() {
        count += 1;
        let node = forest.node(idx);
        if expanded.contains(&node.id()) {
            stack.extend(node.children.iter().copied());
        }
    }
    count
}
