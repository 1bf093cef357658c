use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Share of the horizontal distance used to pull curve control points
/// toward each endpoint.
const CURVE_TENSION: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ConnectorStyle {
    #[default]
    Curve,
    Step,
    Arc,
}

impl ConnectorStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorStyle::Curve => "curve",
            ConnectorStyle::Step => "step",
            ConnectorStyle::Arc => "arc",
        }
    }
}

impl fmt::Display for ConnectorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown connector style {0:?}, expected curve, step or arc")]
pub struct UnknownConnectorStyle(pub String);

impl FromStr for ConnectorStyle {
    type Err = UnknownConnectorStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curve" => Ok(ConnectorStyle::Curve),
            "step" => Ok(ConnectorStyle::Step),
            "arc" => Ok(ConnectorStyle::Arc),
            _ => Err(UnknownConnectorStyle(s.to_string())),
        }
    }
}

/// Absolute path commands, mirroring the SVG path grammar subset we emit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum PathCommand {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    VerticalTo { y: f32 },
    HorizontalTo { x: f32 },
    CubicTo {
        c1: (f32, f32),
        c2: (f32, f32),
        to: (f32, f32),
    },
    ArcTo {
        radius: f32,
        large_arc: bool,
        sweep: bool,
        to: (f32, f32),
    },
}

impl PathCommand {
    fn write_svg(&self, out: &mut String) {
        match *self {
            PathCommand::MoveTo { x, y } => out.push_str(&format!("M {x:.2} {y:.2}")),
            PathCommand::LineTo { x, y } => out.push_str(&format!("L {x:.2} {y:.2}")),
            PathCommand::VerticalTo { y } => out.push_str(&format!("V {y:.2}")),
            PathCommand::HorizontalTo { x } => out.push_str(&format!("H {x:.2}")),
            PathCommand::CubicTo { c1, c2, to } => out.push_str(&format!(
                "C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
                c1.0, c1.1, c2.0, c2.1, to.0, to.1
            )),
            PathCommand::ArcTo {
                radius,
                large_arc,
                sweep,
                to,
            } => out.push_str(&format!(
                "A {radius:.2} {radius:.2} 0 {} {} {:.2} {:.2}",
                u8::from(large_arc),
                u8::from(sweep),
                to.0,
                to.1
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorPath {
    pub style: ConnectorStyle,
    pub commands: Vec<PathCommand>,
}

impl ConnectorPath {
    /// SVG `d` attribute value.
    pub fn to_svg(&self) -> String {
        let mut d = String::new();
        for (idx, command) in self.commands.iter().enumerate() {
            if idx > 0 {
                d.push(' ');
            }
            command.write_svg(&mut d);
        }
        d
    }
}

/// Path from a parent's bottom-center `(x1, y1)` to a child's top-center
/// `(x2, y2)`.
pub fn connector_path(x1: f32, y1: f32, x2: f32, y2: f32, style: ConnectorStyle) -> ConnectorPath {
    let mid_y = (y1 + y2) / 2.0;
    let commands = match style {
        ConnectorStyle::Step => vec![
            PathCommand::MoveTo { x: x1, y: y1 },
            PathCommand::VerticalTo { y: mid_y },
            PathCommand::HorizontalTo { x: x2 },
            PathCommand::VerticalTo { y: y2 },
        ],
        ConnectorStyle::Arc => {
            let radius = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
            vec![
                PathCommand::MoveTo { x: x1, y: y1 },
                PathCommand::ArcTo {
                    radius,
                    large_arc: false,
                    sweep: x2 >= x1,
                    to: (x2, y2),
                },
            ]
        }
        ConnectorStyle::Curve => {
            let pull = (x2 - x1) * CURVE_TENSION;
            vec![
                PathCommand::MoveTo { x: x1, y: y1 },
                PathCommand::CubicTo {
                    c1: (x1 + pull, mid_y),
                    c2: (x2 - pull, mid_y),
                    to: (x2, y2),
                },
            ]
        }
    };
    ConnectorPath { style, commands }
}
