use std::collections::HashMap;

use serde::Serialize;

use super::ConnectorPath;
use crate::model::EntityId;

/// Placement of one visible card. `x`/`y` is the card's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePosition {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub parent_id: Option<EntityId>,
    pub level: usize,
    /// Horizontal span reserved for this card and its visible descendants.
    pub subtree_width: f32,
    pub child_count: usize,
    pub total_descendants: usize,
    pub expanded: bool,
}

impl NodePosition {
    pub fn top_center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y)
    }

    pub fn bottom_center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorEdge {
    pub from: EntityId,
    pub to: EntityId,
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub path: ConnectorPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn of(positions: &[NodePosition]) -> Self {
        let Some(first) = positions.first() else {
            return Self::default();
        };
        let mut bounds = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.right(),
            max_y: first.y + first.height,
        };
        for pos in &positions[1..] {
            bounds.min_x = bounds.min_x.min(pos.x);
            bounds.min_y = bounds.min_y.min(pos.y);
            bounds.max_x = bounds.max_x.max(pos.right());
            bounds.max_y = bounds.max_y.max(pos.y + pos.height);
        }
        bounds
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Result of one full layout pass: cards, connectors and extent.
#[derive(Debug, Clone, Default)]
pub struct OrgLayout {
    pub positions: Vec<NodePosition>,
    pub edges: Vec<ConnectorEdge>,
    pub bounds: Bounds,
    index: HashMap<EntityId, usize>,
}

impl OrgLayout {
    pub(super) fn new(positions: Vec<NodePosition>, edges: Vec<ConnectorEdge>) -> Self {
        let index = positions
            .iter()
            .enumerate()
            .map(|(slot, pos)| (pos.id, slot))
            .collect();
        let bounds = Bounds::of(&positions);
        Self {
            positions,
            edges,
            bounds,
            index,
        }
    }

    pub fn position(&self, id: EntityId) -> Option<&NodePosition> {
        self.index.get(&id).map(|slot| &self.positions[*slot])
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn width(&self) -> f32 {
        self.bounds.width()
    }

    pub fn height(&self) -> f32 {
        self.bounds.height()
    }
}
