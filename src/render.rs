use crate::config::RenderConfig;
use crate::layout::{NodePosition, OrgLayout};
use crate::model::EntityId;
use crate::tree::Forest;
use crate::viewport::Viewport;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;

const FONT_FAMILY: &str = "Inter, Segoe UI, system-ui, -apple-system, sans-serif";
const NAME_FONT_SIZE: f32 = 15.0;
const TITLE_FONT_SIZE: f32 = 12.0;
const CARD_FILL: &str = "#F8FAFF";
const CARD_STROKE: &str = "#C7D2E5";
const LINE_COLOR: &str = "#7A8AA6";
const TEXT_COLOR: &str = "#1C2430";
const MUTED_TEXT_COLOR: &str = "#5B6577";
const HIGHLIGHT_COLOR: &str = "#2563EB";
const HIGHLIGHT_FILL: &str = "#E8F0FF";
// Rough average glyph width as a fraction of font size, for truncation only.
const GLYPH_WIDTH_RATIO: f32 = 0.58;

/// Everything one frame needs: the laid-out cards, the records behind them,
/// what to emphasize, and where the camera is.
pub struct Scene<'a> {
    pub forest: &'a Forest,
    pub layout: &'a OrgLayout,
    pub highlighted: &'a BTreeSet<EntityId>,
    pub viewport: Viewport,
}

pub fn render_svg(scene: &Scene<'_>, config: &RenderConfig) -> String {
    let width = config.width.max(1.0);
    let height = config.height.max(1.0);
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&config.background)
    ));
    svg.push_str(&format!(
        "<g class=\"scene\" transform=\"{}\">",
        scene.viewport.svg_transform()
    ));

    for edge in &scene.layout.edges {
        let on_path = scene.highlighted.contains(&edge.from) && scene.highlighted.contains(&edge.to);
        let (stroke, stroke_width) = if on_path {
            (HIGHLIGHT_COLOR, 2.4)
        } else {
            (LINE_COLOR, 1.4)
        };
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\" data-from=\"{}\" data-to=\"{}\"/>",
            edge.path.to_svg(),
            edge.from,
            edge.to
        ));
    }

    for pos in &scene.layout.positions {
        svg.push_str(&card_svg(pos, scene));
    }

    svg.push_str("</g></svg>");
    svg
}

fn card_svg(pos: &NodePosition, scene: &Scene<'_>) -> String {
    let highlighted = scene.highlighted.contains(&pos.id);
    let (fill, stroke, stroke_width) = if highlighted {
        (HIGHLIGHT_FILL, HIGHLIGHT_COLOR, 2.0)
    } else {
        (CARD_FILL, CARD_STROKE, 1.2)
    };
    let mut out = format!(
        "<g class=\"card\" data-id=\"{}\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"10\" ry=\"10\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>",
        pos.id, pos.x, pos.y, pos.width, pos.height
    );

    let center_x = pos.x + pos.width / 2.0;
    let text_room = pos.width - 24.0;
    if let Some(node) = scene.forest.get(pos.id) {
        let name = truncate_to_width(&node.entity.display_name(), text_room, NAME_FONT_SIZE);
        let name_y = pos.y + pos.height * 0.4;
        out.push_str(&format!(
            "<text x=\"{center_x:.2}\" y=\"{name_y:.2}\" text-anchor=\"middle\" font-family=\"{FONT_FAMILY}\" font-size=\"{NAME_FONT_SIZE}\" font-weight=\"600\" fill=\"{TEXT_COLOR}\">{}</text>",
            escape_xml(&name)
        ));
        if let Some(title) = node.entity.title.as_deref() {
            let title = truncate_to_width(title, text_room, TITLE_FONT_SIZE);
            let title_y = name_y + NAME_FONT_SIZE * 1.4;
            out.push_str(&format!(
                "<text x=\"{center_x:.2}\" y=\"{title_y:.2}\" text-anchor=\"middle\" font-family=\"{FONT_FAMILY}\" font-size=\"{TITLE_FONT_SIZE}\" fill=\"{MUTED_TEXT_COLOR}\">{}</text>",
                escape_xml(&title)
            ));
        }
    }

    if pos.child_count > 0 {
        // Expander badge on the bottom edge: "-" when open, "+N" when closed.
        let badge = if pos.expanded {
            "\u{2212}".to_string()
        } else {
            format!("+{}", pos.total_descendants)
        };
        let (badge_x, badge_y) = pos.bottom_center();
        out.push_str(&format!(
            "<g class=\"expander\"><circle cx=\"{badge_x:.2}\" cy=\"{badge_y:.2}\" r=\"11\" fill=\"#FFFFFF\" stroke=\"{stroke}\" stroke-width=\"1\"/><text x=\"{badge_x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{FONT_FAMILY}\" font-size=\"{TITLE_FONT_SIZE}\" fill=\"{TEXT_COLOR}\">{}</text></g>",
            badge_y + TITLE_FONT_SIZE * 0.35,
            escape_xml(&badge)
        ));
    }

    out.push_str("</g>");
    out
}

fn truncate_to_width(text: &str, max_width: f32, font_size: f32) -> String {
    let max_chars = (max_width / (font_size * GLYPH_WIDTH_RATIO)).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('\u{2026}');
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::expansion::ExpandedSet;
    use crate::layout::compute_layout;
    use crate::model::Entity;
    use crate::tree::build_forest;

    fn render(expanded: ExpandedSet, highlighted: BTreeSet<EntityId>) -> String {
        let forest = build_forest(&[
            Entity::new(1, None, "Ada <Lovelace>").with_title("Founder"),
            Entity::new(2, Some(1), "Grace"),
            Entity::new(3, Some(2), "Linus"),
        ]);
        let layout = compute_layout(&forest, &expanded, &LayoutConfig::default());
        let scene = Scene {
            forest: &forest,
            layout: &layout,
            highlighted: &highlighted,
            viewport: Viewport::default(),
        };
        render_svg(&scene, &RenderConfig::default())
    }

    #[test]
    fn render_svg_basic() {
        let svg = render(ExpandedSet::from([1]), BTreeSet::new());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Ada &lt;Lovelace&gt;"));
        assert!(svg.contains("Founder"));
        assert!(svg.contains("data-from=\"1\" data-to=\"2\""));
        assert!(!svg.contains("Linus"));
        assert!(svg.contains(">+1<"));
    }

    #[test]
    fn highlighted_path_uses_accent() {
        let svg = render(ExpandedSet::from([1, 2]), BTreeSet::from([1, 2]));
        assert!(svg.contains(&format!("stroke=\"{HIGHLIGHT_COLOR}\" stroke-width=\"2.4\" data-from=\"1\"")));
        assert!(svg.contains(&format!("stroke=\"{LINE_COLOR}\" stroke-width=\"1.4\" data-from=\"2\"")));
    }

    #[test]
    fn truncates_long_names() {
        let name = truncate_to_width("An extremely long name that will not fit", 60.0, 10.0);
        assert_eq!(name.chars().count(), 10);
        assert!(name.ends_with('\u{2026}'));
        assert_eq!(truncate_to_width("Bo", 60.0, 10.0), "Bo");
    }
}
