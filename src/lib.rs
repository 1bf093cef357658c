#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod expansion;
pub mod highlight;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod render;
pub mod tree;
pub mod viewport;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, ViewportConfig, load_config};
pub use expansion::{ExpandedSet, ExpansionPolicy, initial_expanded, toggle};
pub use highlight::{ensure_visible, highlight_path, reveal_matches, search};
pub use layout::{
    ConnectorPath, ConnectorStyle, NodePosition, OrgLayout, compute_layout, compute_positions,
    connector_path,
};
pub use model::{Entity, EntityId, load_entities, parse_entities};
pub use render::{Scene, render_svg};
pub use tree::{Forest, HierarchyError, OrgNode, build_forest, validate_hierarchy};
pub use viewport::{Viewport, ViewportController};
