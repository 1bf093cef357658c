mod connector;
pub(crate) mod types;
pub use connector::*;
pub use types::*;

use crate::config::LayoutConfig;
use crate::expansion::ExpandedSet;
use crate::model::EntityId;
use crate::tree::{Forest, NodeIndex};
use std::collections::HashMap;

fn renders_children(forest: &Forest, expanded: &ExpandedSet, idx: NodeIndex) -> bool {
    let node = forest.node(idx);
    !node.is_leaf() && expanded.contains(&node.id())
}

/// Subtree widths for one expanded set. Only visible nodes get an entry;
/// collapsed subtrees are never descended.
#[derive(Debug, Clone)]
pub struct SubtreeWidths {
    card_width: f32,
    widths: HashMap<NodeIndex, f32>,
}

impl SubtreeWidths {
    pub fn compute(forest: &Forest, expanded: &ExpandedSet, card_width: f32, h_gap: f32) -> Self {
        Self::compute_from(forest, expanded, forest.roots(), card_width, h_gap)
    }

    fn compute_from(
        forest: &Forest,
        expanded: &ExpandedSet,
        starts: &[NodeIndex],
        card_width: f32,
        h_gap: f32,
    ) -> Self {
        let mut widths: HashMap<NodeIndex, f32> = HashMap::new();
        // Post-order: a node is finished once all of its children are.
        let mut stack: Vec<(NodeIndex, bool)> = starts.iter().map(|idx| (*idx, false)).collect();
        while let Some((idx, children_done)) = stack.pop() {
            if !renders_children(forest, expanded, idx) {
                widths.insert(idx, card_width);
                continue;
            }
            let children = &forest.node(idx).children;
            if children_done {
                let sum: f32 = children
                    .iter()
                    .map(|child| widths.get(child).copied().unwrap_or(card_width))
                    .sum();
                let gaps = h_gap * (children.len() as f32 - 1.0);
                widths.insert(idx, card_width.max(sum + gaps));
            } else {
                stack.push((idx, true));
                stack.extend(children.iter().map(|child| (*child, false)));
            }
        }
        Self { card_width, widths }
    }

    pub fn get(&self, idx: NodeIndex) -> f32 {
        self.widths.get(&idx).copied().unwrap_or(self.card_width)
    }

    /// Number of visible nodes measured.
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}

/// Width of the subtree rooted at `id` under the given expanded set.
pub fn subtree_width(
    forest: &Forest,
    expanded: &ExpandedSet,
    id: EntityId,
    config: &LayoutConfig,
) -> Option<f32> {
    let idx = forest.index_of(id)?;
    let config = config.sanitized();
    let widths =
        SubtreeWidths::compute_from(forest, expanded, &[idx], config.card_width, config.h_gap);
    Some(widths.get(idx))
}

/// Places every visible node. Roots run left to right from the origin; each
/// card is centered over the span its visible subtree needs.
pub fn compute_positions(
    forest: &Forest,
    expanded: &ExpandedSet,
    config: &LayoutConfig,
) -> Vec<NodePosition> {
    let config = config.sanitized();
    let widths = SubtreeWidths::compute(forest, expanded, config.card_width, config.h_gap);
    let mut positions = Vec::with_capacity(widths.len());
    let mut cursor_x = config.origin_x;
    for &root in forest.roots() {
        place_subtree(
            forest,
            expanded,
            root,
            (cursor_x, config.origin_y),
            &widths,
            &config,
            &mut positions,
        );
        cursor_x += widths.get(root) + config.root_gap;
    }
    tracing::debug!(
        visible = positions.len(),
        total = forest.len(),
        expanded = expanded.len(),
        "computed positions"
    );
    positions
}

fn place_subtree(
    forest: &Forest,
    expanded: &ExpandedSet,
    root: NodeIndex,
    origin: (f32, f32),
    widths: &SubtreeWidths,
    config: &LayoutConfig,
    positions: &mut Vec<NodePosition>,
) {
    let mut stack: Vec<(NodeIndex, f32, f32)> = vec![(root, origin.0, origin.1)];
    while let Some((idx, span_start, y)) = stack.pop() {
        let node = forest.node(idx);
        let width = widths.get(idx);
        let open = renders_children(forest, expanded, idx);
        positions.push(NodePosition {
            id: node.id(),
            x: span_start + width / 2.0 - config.card_width / 2.0,
            y,
            width: config.card_width,
            height: config.card_height,
            parent_id: node.parent.map(|parent| forest.node(parent).id()),
            level: node.level,
            subtree_width: width,
            child_count: node.children.len(),
            total_descendants: node.total_descendants,
            expanded: open,
        });
        if !open {
            continue;
        }
        let child_y = y + config.card_height + config.v_gap;
        let mut child_start = span_start;
        let mut spans = Vec::with_capacity(node.children.len());
        for &child in &node.children {
            spans.push((child, child_start, child_y));
            child_start += widths.get(child) + config.h_gap;
        }
        // Reversed so the leftmost child is popped (and emitted) first.
        stack.extend(spans.into_iter().rev());
    }
}

/// Full pass: positions plus one connector per visible parent/child pair.
pub fn compute_layout(forest: &Forest, expanded: &ExpandedSet, config: &LayoutConfig) -> OrgLayout {
    let positions = compute_positions(forest, expanded, config);
    let slots: HashMap<EntityId, usize> = positions
        .iter()
        .enumerate()
        .map(|(slot, pos)| (pos.id, slot))
        .collect();

    let mut edges = Vec::new();
    for child in &positions {
        let Some(parent_id) = child.parent_id else {
            continue;
        };
        if !expanded.contains(&parent_id) {
            continue;
        }
        let Some(parent) = slots.get(&parent_id).map(|slot| &positions[*slot]) else {
            continue;
        };
        let start = parent.bottom_center();
        let end = child.top_center();
        edges.push(ConnectorEdge {
            from: parent_id,
            to: child.id,
            start,
            end,
            path: connector_path(start.0, start.1, end.0, end.1, config.connector_style),
        });
    }

    OrgLayout::new(positions, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::{ExpansionPolicy, expand_all, initial_expanded};
    use crate::model::Entity;
    use crate::tree::build_forest;

    fn config() -> LayoutConfig {
        LayoutConfig {
            card_width: 240.0,
            card_height: 100.0,
            h_gap: 40.0,
            v_gap: 90.0,
            root_gap: 80.0,
            ..LayoutConfig::default()
        }
    }

    fn sample_forest() -> Forest {
        build_forest(&[
            Entity::new(1, None, "Root"),
            Entity::new(2, Some(1), "B"),
            Entity::new(3, Some(1), "C"),
            Entity::new(4, Some(2), "D"),
        ])
    }

    fn wide_forest() -> Forest {
        let mut entities = vec![Entity::new(0, None, "root")];
        for id in 1..120 {
            entities.push(Entity::new(id, Some((id - 1) / 4), format!("n{id:03}")));
        }
        entities.push(Entity::new(500, None, "second"));
        entities.push(Entity::new(501, Some(500), "second child"));
        build_forest(&entities)
    }

    #[test]
    fn reference_scenario() {
        let forest = sample_forest();
        let expanded = ExpandedSet::from([1, 2]);
        let positions = compute_positions(&forest, &expanded, &config());
        assert_eq!(positions.len(), 4);

        let by_id = |id| positions.iter().find(|p| p.id == id).unwrap();
        assert_eq!(by_id(1).level, 0);
        assert_eq!(by_id(1).total_descendants, 3);
        assert_eq!(by_id(1).subtree_width, 520.0);
        assert_eq!(by_id(1).x, 140.0);
        assert_eq!(by_id(2).x, 0.0);
        assert_eq!(by_id(2).y, 190.0);
        assert_eq!(by_id(2).subtree_width, 240.0);
        assert_eq!(by_id(3).x, 280.0);
        assert_eq!(by_id(4).level, 2);
        assert_eq!(by_id(4).y, 380.0);
        assert_eq!(by_id(4).parent_id, Some(2));
    }

    #[test]
    fn subtree_width_matches_positions() {
        let forest = sample_forest();
        let expanded = ExpandedSet::from([1, 2]);
        assert_eq!(subtree_width(&forest, &expanded, 1, &config()), Some(520.0));
        assert_eq!(subtree_width(&forest, &ExpandedSet::new(), 1, &config()), Some(240.0));
        assert_eq!(subtree_width(&forest, &expanded, 99, &config()), None);
    }

    #[test]
    fn collapsed_nodes_hide_their_descendants() {
        let forest = wide_forest();
        let mut expanded = expand_all(&forest);
        expanded.remove(&1);
        let positions = compute_positions(&forest, &expanded, &config());
        let hidden = forest.descendant_ids(1);
        assert!(!hidden.is_empty());
        for pos in &positions {
            assert!(!hidden.contains(&pos.id), "{} should be hidden", pos.id);
        }
        assert!(positions.iter().any(|pos| pos.id == 1 && !pos.expanded));
    }

    #[test]
    fn siblings_never_overlap() {
        let forest = wide_forest();
        let expanded = expand_all(&forest);
        let layout = compute_layout(&forest, &expanded, &config());
        for node in forest.nodes() {
            let xs: Vec<&NodePosition> = node
                .children
                .iter()
                .filter_map(|child| layout.position(forest.node(*child).id()))
                .collect();
            for pair in xs.windows(2) {
                assert!(
                    pair[0].right() <= pair[1].x,
                    "{} overlaps {}",
                    pair[0].id,
                    pair[1].id
                );
            }
        }
    }

    #[test]
    fn widths_never_below_card_width() {
        let forest = wide_forest();
        for policy in [
            ExpansionPolicy::Collapsed,
            ExpansionPolicy::Levels(1),
            ExpansionPolicy::Levels(3),
            ExpansionPolicy::All,
        ] {
            let expanded = initial_expanded(&forest, policy);
            let widths = SubtreeWidths::compute(&forest, &expanded, 240.0, 40.0);
            for pos in compute_positions(&forest, &expanded, &config()) {
                let idx = forest.index_of(pos.id).unwrap();
                assert!(widths.get(idx) >= 240.0);
            }
        }
    }

    #[test]
    fn output_is_deterministic() {
        let forest = wide_forest();
        let expanded = initial_expanded(&forest, ExpansionPolicy::Levels(2));
        let first = compute_positions(&forest, &expanded, &config());
        let second = compute_positions(&forest, &expanded, &config());
        assert_eq!(first, second);
    }

    #[test]
    fn roots_advance_by_width_and_gap() {
        let forest = wide_forest();
        let expanded = ExpandedSet::new();
        let positions = compute_positions(&forest, &expanded, &config());
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].id, 0);
        assert_eq!(positions[0].x, 0.0);
        assert_eq!(positions[1].x, 240.0 + 80.0);
    }

    #[test]
    fn children_follow_sorted_order() {
        let forest = sample_forest();
        let expanded = ExpandedSet::from([1]);
        let positions = compute_positions(&forest, &expanded, &config());
        let ids: Vec<EntityId> = positions.iter().map(|pos| pos.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(positions[1].x < positions[2].x);
    }

    #[test]
    fn edges_connect_bottom_to_top() {
        let forest = sample_forest();
        let expanded = ExpandedSet::from([1]);
        let layout = compute_layout(&forest, &expanded, &config());
        assert_eq!(layout.edges.len(), 2);
        let edge = &layout.edges[0];
        assert_eq!(edge.from, 1);
        assert_eq!(edge.start, (260.0, 100.0));
        assert_eq!(edge.end, (120.0, 190.0));
        assert_eq!(edge.path.style, ConnectorStyle::Curve);
        assert_eq!(layout.bounds.width(), 520.0);
        assert_eq!(layout.bounds.height(), 290.0);
    }

    #[test]
    fn origin_offsets_everything() {
        let forest = sample_forest();
        let expanded = ExpandedSet::from([1, 2]);
        let shifted = LayoutConfig {
            origin_x: 50.0,
            origin_y: 20.0,
            ..config()
        };
        let layout = compute_layout(&forest, &expanded, &shifted);
        let root = layout.position(1).unwrap();
        assert_eq!((root.x, root.y), (190.0, 20.0));
        assert_eq!(layout.bounds.min_x, 50.0);
    }

    #[test]
    fn empty_forest_yields_empty_layout() {
        let forest = build_forest(&[]);
        let layout = compute_layout(&forest, &ExpandedSet::new(), &config());
        assert!(layout.positions.is_empty());
        assert!(layout.edges.is_empty());
        assert_eq!(layout.width(), 0.0);
    }
}
