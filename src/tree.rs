use crate::model::{Entity, EntityId};
use std::cmp::Ordering;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub type NodeIndex = usize;

#[derive(Debug, Clone)]
pub struct OrgNode {
    pub entity: Entity,
    pub children: Vec<NodeIndex>,
    pub parent: Option<NodeIndex>,
    pub level: usize,
    pub total_descendants: usize,
}

impl OrgNode {
    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Something the builder repaired instead of failing on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A later record reused an id; only the first record was kept.
    DuplicateId { id: EntityId },
    /// `members` formed a reports-to loop. `cut` lost its parent link
    /// (to `parent`) and became a root.
    CycleBroken {
        members: Vec<EntityId>,
        cut: EntityId,
        parent: EntityId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("entity id {id} appears more than once")]
    DuplicateId { id: EntityId },
    #[error("reporting cycle through ids {members:?}")]
    Cycle { members: Vec<EntityId> },
}

impl From<&Diagnostic> for HierarchyError {
    fn from(diagnostic: &Diagnostic) -> Self {
        match diagnostic {
            Diagnostic::DuplicateId { id } => HierarchyError::DuplicateId { id: *id },
            Diagnostic::CycleBroken { members, .. } => HierarchyError::Cycle {
                members: members.clone(),
            },
        }
    }
}

/// Arena-backed forest. Nodes are addressed by `NodeIndex`; `roots` is
/// sorted largest organization first.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: Vec<OrgNode>,
    roots: Vec<NodeIndex>,
    index: HashMap<EntityId, NodeIndex>,
    diagnostics: Vec<Diagnostic>,
}

impl Forest {
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    /// Node at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` did not come from this forest. Use [`Forest::get`] to
    /// look up by id.
    pub fn node(&self, idx: NodeIndex) -> &OrgNode {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[OrgNode] {
        &self.nodes
    }

    pub fn index_of(&self, id: EntityId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    pub fn get(&self, id: EntityId) -> Option<&OrgNode> {
        self.index_of(id).map(|idx| &self.nodes[idx])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn max_level(&self) -> usize {
        self.nodes.iter().map(|node| node.level).max().unwrap_or(0)
    }

    /// Every node in render order: roots in order, each subtree pre-order.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeIndex> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev().copied());
        }
        order
    }

    /// Ids of the subtree below `id`, excluding `id` itself.
    pub fn descendant_ids(&self, id: EntityId) -> Vec<EntityId> {
        let Some(start) = self.index_of(id) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(self.nodes[start].total_descendants);
        let mut stack: Vec<NodeIndex> = self.nodes[start].children.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            out.push(self.nodes[idx].id());
            stack.extend(self.nodes[idx].children.iter().rev().copied());
        }
        out
    }
}

/// Primary sort key: decomposed, accents stripped, lowercased, so "Émile"
/// files under "e".
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Sibling order: display name with accents and case folded, then
/// case-insensitively, then exact name, then id.
pub fn compare_entities(a: &Entity, b: &Entity) -> Ordering {
    let name_a = a.display_name();
    let name_b = b.display_name();
    collation_key(&name_a)
        .cmp(&collation_key(&name_b))
        .then_with(|| name_a.to_lowercase().cmp(&name_b.to_lowercase()))
        .then_with(|| name_a.cmp(&name_b))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn build_forest(entities: &[Entity]) -> Forest {
    let mut nodes: Vec<OrgNode> = Vec::with_capacity(entities.len());
    let mut index: HashMap<EntityId, NodeIndex> = HashMap::with_capacity(entities.len());
    let mut diagnostics = Vec::new();

    for entity in entities {
        if index.contains_key(&entity.id) {
            tracing::warn!(id = entity.id, "duplicate entity id, keeping first record");
            diagnostics.push(Diagnostic::DuplicateId { id: entity.id });
            continue;
        }
        index.insert(entity.id, nodes.len());
        nodes.push(OrgNode {
            entity: entity.clone(),
            children: Vec::new(),
            parent: None,
            level: 0,
            total_descendants: 0,
        });
    }

    let mut parents: Vec<Option<NodeIndex>> = nodes
        .iter()
        .map(|node| {
            node.entity
                .manager_id()
                .and_then(|parent_id| index.get(&parent_id).copied())
        })
        .collect();

    break_cycles(&nodes, &mut parents, &mut diagnostics);

    let mut roots = Vec::new();
    for (idx, parent) in parents.iter().enumerate() {
        nodes[idx].parent = *parent;
        match parent {
            Some(parent_idx) => nodes[*parent_idx].children.push(idx),
            None => roots.push(idx),
        }
    }

    for idx in 0..nodes.len() {
        let mut children = std::mem::take(&mut nodes[idx].children);
        children.sort_by(|a, b| compare_entities(&nodes[*a].entity, &nodes[*b].entity));
        nodes[idx].children = children;
    }

    // Levels top-down, then descendant counts bottom-up over the same order.
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack: Vec<NodeIndex> = roots.clone();
    while let Some(idx) = stack.pop() {
        order.push(idx);
        let level = nodes[idx].level;
        for child in nodes[idx].children.clone() {
            nodes[child].level = level + 1;
            stack.push(child);
        }
    }
    for &idx in order.iter().rev() {
        let total = nodes[idx]
            .children
            .iter()
            .map(|child| 1 + nodes[*child].total_descendants)
            .sum();
        nodes[idx].total_descendants = total;
    }

    roots.sort_by(|a, b| {
        nodes[*b]
            .total_descendants
            .cmp(&nodes[*a].total_descendants)
            .then_with(|| compare_entities(&nodes[*a].entity, &nodes[*b].entity))
    });

    tracing::debug!(
        nodes = nodes.len(),
        roots = roots.len(),
        repaired = diagnostics.len(),
        "built forest"
    );

    Forest {
        nodes,
        roots,
        index,
        diagnostics,
    }
}

/// Cuts every reports-to loop at its lowest id so the parent links form a
/// forest. Each node's parent chain is walked once.
fn break_cycles(
    nodes: &[OrgNode],
    parents: &mut [Option<NodeIndex>],
    diagnostics: &mut Vec<Diagnostic>,
) {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; nodes.len()];
    let mut path: Vec<NodeIndex> = Vec::new();
    for start in 0..nodes.len() {
        if state[start] != UNSEEN {
            continue;
        }
        path.clear();
        let mut cursor = Some(start);
        while let Some(idx) = cursor {
            match state[idx] {
                UNSEEN => {
                    state[idx] = ON_PATH;
                    path.push(idx);
                    cursor = parents[idx];
                }
                ON_PATH => {
                    let Some(pos) = path.iter().position(|p| *p == idx) else {
                        break;
                    };
                    let cycle = &path[pos..];
                    let Some(&cut) = cycle.iter().min_by_key(|member| nodes[**member].entity.id)
                    else {
                        break;
                    };
                    let parent_id = parents[cut]
                        .map(|parent| nodes[parent].entity.id)
                        .unwrap_or(nodes[cut].entity.id);
                    let mut members: Vec<EntityId> =
                        cycle.iter().map(|member| nodes[*member].entity.id).collect();
                    let offset = cycle.iter().position(|member| *member == cut).unwrap_or(0);
                    members.rotate_left(offset);
                    tracing::warn!(
                        cut = nodes[cut].entity.id,
                        parent = parent_id,
                        ?members,
                        "reporting cycle detected, promoting lowest id to root"
                    );
                    diagnostics.push(Diagnostic::CycleBroken {
                        members,
                        cut: nodes[cut].entity.id,
                        parent: parent_id,
                    });
                    parents[cut] = None;
                    break;
                }
                _ => break,
            }
        }
        for idx in &path {
            state[*idx] = DONE;
        }
    }
}

/// Strict check for callers that would rather reject a broken hierarchy than
/// have it repaired.
pub fn validate_hierarchy(entities: &[Entity]) -> Result<(), HierarchyError> {
    let forest = build_forest(entities);
    match forest.diagnostics().first() {
        Some(diagnostic) => Err(diagnostic.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: EntityId, parent: Option<EntityId>, name: &str) -> Entity {
        Entity::new(id, parent, name)
    }

    fn ids(forest: &Forest, indices: &[NodeIndex]) -> Vec<EntityId> {
        indices.iter().map(|idx| forest.node(*idx).id()).collect()
    }

    #[test]
    fn builds_levels_and_descendant_counts() {
        let forest = build_forest(&[
            entity(1, None, "CEO"),
            entity(2, Some(1), "CTO"),
            entity(3, Some(1), "CFO"),
            entity(4, Some(2), "Engineer"),
        ]);
        let root = forest.get(1).unwrap();
        assert_eq!(root.level, 0);
        assert_eq!(root.total_descendants, 3);
        assert_eq!(forest.get(2).unwrap().level, 1);
        assert_eq!(forest.get(3).unwrap().level, 1);
        assert_eq!(forest.get(4).unwrap().level, 2);
        assert_eq!(forest.get(2).unwrap().total_descendants, 1);
        assert_eq!(forest.max_level(), 2);
        assert!(forest.diagnostics().is_empty());
    }

    #[test]
    fn children_sorted_by_name_then_id() {
        let forest = build_forest(&[
            entity(1, None, "Root"),
            entity(5, Some(1), "zed"),
            entity(4, Some(1), "Bob"),
            entity(3, Some(1), "alice"),
            entity(2, Some(1), "Bob"),
        ]);
        let root = forest.get(1).unwrap();
        assert_eq!(ids(&forest, &root.children), vec![3, 2, 4, 5]);
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let forest = build_forest(&[
            entity(1, None, "Root"),
            entity(2, Some(1), "Zoe"),
            entity(3, Some(1), "Émile"),
            entity(4, Some(1), "Fred"),
            entity(5, Some(1), "emile"),
        ]);
        let root = forest.get(1).unwrap();
        assert_eq!(ids(&forest, &root.children), vec![5, 3, 4, 2]);
    }

    #[test]
    fn sibling_order_ignores_input_order() {
        let a = [
            entity(1, None, "Root"),
            entity(2, Some(1), "B"),
            entity(3, Some(1), "A"),
        ];
        let b = [a[2].clone(), a[0].clone(), a[1].clone()];
        let fa = build_forest(&a);
        let fb = build_forest(&b);
        assert_eq!(
            ids(&fa, &fa.get(1).unwrap().children),
            ids(&fb, &fb.get(1).unwrap().children)
        );
    }

    #[test]
    fn roots_sorted_by_size_then_name() {
        let forest = build_forest(&[
            entity(1, None, "Small"),
            entity(2, None, "Big"),
            entity(3, Some(2), "a"),
            entity(4, Some(2), "b"),
            entity(5, None, "Also small"),
        ]);
        assert_eq!(ids(&forest, forest.roots()), vec![2, 5, 1]);
    }

    #[test]
    fn unresolved_and_self_parents_become_roots() {
        let forest = build_forest(&[
            entity(1, Some(99), "Orphan"),
            entity(2, Some(2), "Self"),
            entity(3, Some(2), "Child"),
        ]);
        assert_eq!(forest.roots().len(), 2);
        assert_eq!(forest.get(1).unwrap().parent, None);
        assert_eq!(forest.get(2).unwrap().total_descendants, 1);
        assert!(forest.diagnostics().is_empty());
    }

    #[test]
    fn cycle_is_cut_at_lowest_id() {
        let forest = build_forest(&[
            entity(10, Some(30), "A"),
            entity(20, Some(10), "B"),
            entity(30, Some(20), "C"),
            entity(40, Some(30), "D"),
        ]);
        assert_eq!(ids(&forest, forest.roots()), vec![10]);
        assert_eq!(forest.get(10).unwrap().total_descendants, 3);
        assert_eq!(forest.get(40).unwrap().level, 3);
        assert_eq!(
            forest.diagnostics(),
            &[Diagnostic::CycleBroken {
                members: vec![10, 30, 20],
                cut: 10,
                parent: 30,
            }]
        );
    }

    #[test]
    fn duplicate_ids_keep_first_record() {
        let forest = build_forest(&[
            entity(1, None, "First"),
            entity(1, None, "Second"),
            entity(2, Some(1), "Child"),
        ]);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.get(1).unwrap().entity.name, "First");
        assert_eq!(forest.diagnostics(), &[Diagnostic::DuplicateId { id: 1 }]);
    }

    #[test]
    fn validate_reports_cycles() {
        let err = validate_hierarchy(&[entity(1, Some(2), "A"), entity(2, Some(1), "B")])
            .unwrap_err();
        assert_eq!(err, HierarchyError::Cycle { members: vec![1, 2] });
        assert!(validate_hierarchy(&[entity(1, None, "A")]).is_ok());
    }

    #[test]
    fn every_entity_lands_in_exactly_one_node() {
        let mut entities = vec![entity(0, None, "root")];
        for id in 1..200 {
            let parent = if id % 17 == 0 { Some(id + 1000) } else { Some(id / 3) };
            entities.push(entity(id, parent, &format!("n{id}")));
        }
        entities.push(entity(500, Some(501), "loop a"));
        entities.push(entity(501, Some(500), "loop b"));
        let forest = build_forest(&entities);
        let order = forest.preorder();
        assert_eq!(order.len(), entities.len());
        let total: usize = forest
            .roots()
            .iter()
            .map(|idx| forest.node(*idx).total_descendants)
            .sum();
        assert_eq!(total + forest.roots().len(), entities.len());
        for node in forest.nodes() {
            for child in &node.children {
                assert_eq!(forest.node(*child).level, node.level + 1);
            }
        }
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let mut entities = vec![entity(0, None, "root")];
        for id in 1..50_000 {
            entities.push(entity(id, Some(id - 1), "link"));
        }
        let forest = build_forest(&entities);
        assert_eq!(forest.get(0).unwrap().total_descendants, 49_999);
        assert_eq!(forest.get(49_999).unwrap().level, 49_999);
        assert_eq!(forest.descendant_ids(49_998), vec![49_999]);
    }
}
