use crate::expansion::ExpansionPolicy;
use crate::layout::ConnectorStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub card_width: f32,
    pub card_height: f32,
    /// Gap between sibling subtrees.
    pub h_gap: f32,
    /// Gap between a card's bottom edge and its children's top edge.
    pub v_gap: f32,
    /// Gap between top-level organizations.
    pub root_gap: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    pub connector_style: ConnectorStyle,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            card_width: 240.0,
            card_height: 100.0,
            h_gap: 40.0,
            v_gap: 90.0,
            root_gap: 80.0,
            origin_x: 0.0,
            origin_y: 0.0,
            connector_style: ConnectorStyle::Curve,
        }
    }
}

impl LayoutConfig {
    /// Copy with non-finite or negative sizes replaced by safe values.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let positive = |value: f32, fallback: f32| {
            if value.is_finite() && value > 0.0 { value } else { fallback }
        };
        let non_negative = |value: f32| if value.is_finite() { value.max(0.0) } else { 0.0 };
        let finite = |value: f32| if value.is_finite() { value } else { 0.0 };
        Self {
            card_width: positive(self.card_width, defaults.card_width),
            card_height: positive(self.card_height, defaults.card_height),
            h_gap: non_negative(self.h_gap),
            v_gap: non_negative(self.v_gap),
            root_gap: non_negative(self.root_gap),
            origin_x: finite(self.origin_x),
            origin_y: finite(self.origin_y),
            connector_style: self.connector_style,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Pan offset kept between the viewport edge and content that does not fit.
    pub margin: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.2,
            max_scale: 2.0,
            margin: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub expansion: ExpansionPolicy,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    card_width: Option<f32>,
    card_height: Option<f32>,
    horizontal_gap: Option<f32>,
    vertical_gap: Option<f32>,
    root_gap: Option<f32>,
    origin_x: Option<f32>,
    origin_y: Option<f32>,
    connector_style: Option<ConnectorStyle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewportConfigFile {
    min_scale: Option<f32>,
    max_scale: Option<f32>,
    margin: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpansionConfigFile {
    expand_all: Option<bool>,
    levels: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    viewport: Option<ViewportConfigFile>,
    expansion: Option<ExpansionConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.card_width {
            config.layout.card_width = v;
        }
        if let Some(v) = layout.card_height {
            config.layout.card_height = v;
        }
        if let Some(v) = layout.horizontal_gap {
            config.layout.h_gap = v;
        }
        if let Some(v) = layout.vertical_gap {
            config.layout.v_gap = v;
        }
        if let Some(v) = layout.root_gap {
            config.layout.root_gap = v;
        }
        if let Some(v) = layout.origin_x {
            config.layout.origin_x = v;
        }
        if let Some(v) = layout.origin_y {
            config.layout.origin_y = v;
        }
        if let Some(v) = layout.connector_style {
            config.layout.connector_style = v;
        }
    }

    if let Some(viewport) = parsed.viewport {
        if let Some(v) = viewport.min_scale {
            config.viewport.min_scale = v;
        }
        if let Some(v) = viewport.max_scale {
            config.viewport.max_scale = v;
        }
        if let Some(v) = viewport.margin {
            config.viewport.margin = v;
        }
        if config.viewport.min_scale > config.viewport.max_scale {
            anyhow::bail!(
                "viewport minScale {} exceeds maxScale {}",
                config.viewport.min_scale,
                config.viewport.max_scale
            );
        }
    }

    if let Some(expansion) = parsed.expansion {
        if expansion.expand_all == Some(true) {
            config.expansion = ExpansionPolicy::All;
        } else if let Some(levels) = expansion.levels {
            config.expansion = ExpansionPolicy::Levels(levels);
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }

    Ok(config)
}
