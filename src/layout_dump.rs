use crate::expansion::ExpandedSet;
use crate::layout::{Bounds, ConnectorStyle, NodePosition, OrgLayout};
use crate::model::EntityId;
use crate::tree::{Diagnostic, Forest};
use crate::viewport::Viewport;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// JSON snapshot of one layout pass, for downstream renderers and for
/// diffing passes against each other.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub bounds: Bounds,
    pub viewport: Viewport,
    pub expanded: Vec<EntityId>,
    pub highlighted: Vec<EntityId>,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub highlighted: bool,
    #[serde(flatten)]
    pub position: NodePosition,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: EntityId,
    pub to: EntityId,
    pub style: ConnectorStyle,
    pub d: String,
}

fn describe(diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::DuplicateId { id } => format!("duplicate id {id} dropped"),
        Diagnostic::CycleBroken {
            members,
            cut,
            parent,
        } => format!("cycle {members:?} broken: {cut} no longer reports to {parent}"),
    }
}

impl LayoutDump {
    pub fn from_layout(
        layout: &OrgLayout,
        forest: &Forest,
        expanded: &ExpandedSet,
        highlighted: &BTreeSet<EntityId>,
        viewport: Viewport,
    ) -> Self {
        let nodes = layout
            .positions
            .iter()
            .map(|pos| {
                let entity = forest.get(pos.id).map(|node| &node.entity);
                NodeDump {
                    name: entity.map(|e| e.display_name()).unwrap_or_default(),
                    title: entity.and_then(|e| e.title.clone()),
                    highlighted: highlighted.contains(&pos.id),
                    position: pos.clone(),
                }
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from,
                to: edge.to,
                style: edge.path.style,
                d: edge.path.to_svg(),
            })
            .collect();

        LayoutDump {
            width: layout.width(),
            height: layout.height(),
            bounds: layout.bounds,
            viewport,
            expanded: expanded.iter().copied().collect(),
            highlighted: highlighted.iter().copied().collect(),
            nodes,
            edges,
            diagnostics: forest.diagnostics().iter().map(describe).collect(),
        }
    }
}

pub fn write_layout_dump(path: Option<&Path>, dump: &LayoutDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, dump)?;
        }
        None => {
            println!("{}", serde_json::to_string_pretty(dump)?);
        }
    }
    Ok(())
}
