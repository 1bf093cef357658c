use crate::config::{Config, load_config};
use crate::expansion::{ExpandedSet, ExpansionPolicy, initial_expanded};
use crate::highlight::{ensure_visible, highlight_path, reveal_matches};
use crate::layout::{ConnectorStyle, OrgLayout, compute_layout};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::model::{Entity, EntityId, load_entities, parse_entities};
use crate::render::{Scene, render_svg, write_output_svg};
use crate::tree::{Forest, build_forest, validate_hierarchy};
use crate::viewport::{Viewport, ViewportController};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "orgchart", version, about = "Lay out a reports-to hierarchy as an org chart")]
pub struct Args {
    /// Entity list (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Expand this many levels below the roots
    #[arg(long = "expandLevels", conflicts_with = "expand_all")]
    pub expand_levels: Option<usize>,

    /// Expand every node
    #[arg(long = "expandAll")]
    pub expand_all: bool,

    /// Highlight the chain from this id up to its root, revealing it if hidden
    #[arg(long = "highlight")]
    pub highlight: Option<EntityId>,

    /// Highlight and reveal every record whose name, title or text fields match
    #[arg(long = "search")]
    pub search: Option<String>,

    /// Connector style
    #[arg(long = "connector", value_enum)]
    pub connector: Option<ConnectorStyle>,

    /// Zoom so the whole chart fits the canvas
    #[arg(long = "fit")]
    pub fit: bool,

    /// Reject duplicate ids and reporting cycles instead of repairing them
    #[arg(long = "strict")]
    pub strict: bool,

    /// Canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Log more (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

/// Everything derived from one invocation, before anything is written.
pub struct PreparedChart {
    pub forest: Forest,
    pub expanded: ExpandedSet,
    pub highlighted: BTreeSet<EntityId>,
    pub layout: OrgLayout,
    pub viewport: Viewport,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref()).context("failed to load config file")?;
    apply_overrides(&mut config, &args);

    let entities = read_entities(args.input.as_deref())?;
    if args.strict {
        validate_hierarchy(&entities)?;
    }
    let chart = prepare_chart(&entities, &args, &config);

    match args.output_format {
        OutputFormat::Json => {
            let dump = LayoutDump::from_layout(
                &chart.layout,
                &chart.forest,
                &chart.expanded,
                &chart.highlighted,
                chart.viewport,
            );
            write_layout_dump(args.output.as_deref(), &dump)?;
        }
        OutputFormat::Svg => {
            let svg = render_chart(&chart, &config);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_chart(&chart, &config);
            write_png(&svg, &output, &config)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Fails only when a global subscriber is already installed; keep that one.
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if let Some(style) = args.connector {
        config.layout.connector_style = style;
    }
    if args.expand_all {
        config.expansion = ExpansionPolicy::All;
    } else if let Some(levels) = args.expand_levels {
        config.expansion = ExpansionPolicy::Levels(levels);
    }
}

pub fn prepare_chart(entities: &[Entity], args: &Args, config: &Config) -> PreparedChart {
    let forest = build_forest(entities);
    let mut expanded = initial_expanded(&forest, config.expansion);
    let mut highlighted = BTreeSet::new();

    if let Some(target) = args.highlight {
        let path = highlight_path(entities, target);
        if path.is_empty() {
            tracing::warn!(id = target, "highlight target not found");
        }
        expanded = ensure_visible(entities, &expanded, target);
        highlighted.extend(path);
    }
    if let Some(query) = args.search.as_deref() {
        let reveal = reveal_matches(entities, &expanded, query);
        if reveal.matches.is_empty() {
            tracing::warn!(query, "search matched nothing");
        }
        expanded = reveal.expanded;
        highlighted.extend(reveal.highlighted);
    }

    let layout = compute_layout(&forest, &expanded, &config.layout);

    let mut controller = ViewportController::new(&config.viewport);
    let content = (layout.width(), layout.height());
    let canvas = (config.render.width, config.render.height);
    if args.fit {
        controller.fit(content, canvas);
    } else {
        controller.center_on(content, canvas);
    }
    // Layout coordinates may not start at zero; shift so the bounds do.
    let scale = controller.scale();
    controller.pan(-layout.bounds.min_x * scale, -layout.bounds.min_y * scale);

    PreparedChart {
        forest,
        expanded,
        highlighted,
        layout,
        viewport: controller.transform(),
    }
}

fn render_chart(chart: &PreparedChart, config: &Config) -> String {
    let scene = Scene {
        forest: &chart.forest,
        layout: &chart.layout,
        highlighted: &chart.highlighted,
        viewport: chart.viewport,
    };
    render_svg(&scene, &config.render)
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_entities(path: Option<&Path>) -> Result<Vec<Entity>> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(load_entities(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(parse_entities(&buf)?)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
