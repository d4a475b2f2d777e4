//! `schemaviz`: lays out a KDL schema model headlessly and writes SVG or JSON.

mod schema;
mod svg;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use graphview::{
    AutoLayout, CacheConfig, FileStore, Frame, GraphConfig, GraphEngine, KeyValueStore,
    LayoutPositionCache, MemoryStore, Node, Viewport,
};
use schemaviz_layout::Transform;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::schema::{BoxMeasure, SchemaModel};

#[derive(Parser)]
#[command(name = "schemaviz", version)]
#[command(about = "Lay out a schema model as a force-directed graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write an SVG of the visible nodes and links
    Render {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print node positions as JSON
    Layout {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Schema model in KDL, `-` reads stdin
    input: PathBuf,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = 1200.0)]
    width: f64,

    #[arg(long, default_value_t = 800.0)]
    height: f64,

    /// Draw links as curves
    #[arg(long)]
    curve: bool,

    /// Free force simulation instead of the layered auto-layout
    #[arg(long)]
    free: bool,

    /// Position cache file
    #[arg(long, default_value = ".schemaviz-cache.json")]
    cache: PathBuf,

    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,

    /// GraphConfig as JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upper bound on simulated frames
    #[arg(long, default_value_t = 600)]
    frames: usize,
}

struct Outcome {
    model: SchemaModel,
    engine: GraphEngine,
    frame: Frame,
    viewport: Viewport,
}

#[derive(Serialize)]
struct LayoutReport<'a> {
    transform: Transform,
    nodes: Vec<NodePosition<'a>>,
}

#[derive(Serialize)]
struct NodePosition<'a> {
    id: &'a str,
    x: f64,
    y: f64,
    fixed: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Render { run } => {
            let outcome = run_pipeline(&run)?;
            let svg = svg::generate_svg(&outcome.frame, outcome.viewport, &outcome.model);
            write_output(run.out.as_deref(), &svg)
        }
        Command::Layout { run } => {
            let outcome = run_pipeline(&run)?;
            let report = LayoutReport {
                transform: outcome.engine.transform(),
                nodes: outcome
                    .engine
                    .nodes()
                    .iter()
                    .map(|n| NodePosition {
                        id: &n.id,
                        x: n.x,
                        y: n.y,
                        fixed: n.is_fixed(),
                    })
                    .collect(),
            };
            let json = serde_json::to_string_pretty(&report)?;
            write_output(run.out.as_deref(), &(json + "\n"))
        }
    }
}

fn run_pipeline(args: &RunArgs) -> Result<Outcome> {
    let source = read_input(&args.input)?;
    let model = schema::parse_schema(&source)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    if model.types.is_empty() {
        bail!("{} declares no types", args.input.display());
    }

    let config = load_config(args)?;
    let store: Box<dyn KeyValueStore> = if args.no_cache {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::new(&args.cache))
    };
    let cache = LayoutPositionCache::new(store, CacheConfig::default());

    let sizes = model.sizes();
    let mut engine = GraphEngine::new(config, cache)?;
    if !args.free {
        let boxes = sizes.clone();
        engine = engine.with_auto_layout(AutoLayout::sizing(move |node: &Node| {
            boxes.get(&node.id).copied().unwrap_or_default()
        }));
    }
    let viewport = Viewport::new(args.width, args.height);
    engine.attach_viewport(viewport)?;
    engine.set_graph(model.nodes(), model.links())?;

    let measure = BoxMeasure::new(sizes);
    let mut frame = engine.frame(&measure)?;
    let mut frames = 1;
    while frames < args.frames && (engine.is_loading() || engine.simulation().is_running()) {
        frame = engine.frame(&measure)?;
        frames += 1;
    }
    if args.free {
        engine.request_fit()?;
        frame = engine.frame(&measure)?;
    }
    info!(
        frames,
        nodes = frame.nodes.len(),
        links = frame.links.len(),
        "layout finished"
    );

    Ok(Outcome {
        model,
        engine,
        frame,
        viewport,
    })
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_config(args: &RunArgs) -> Result<GraphConfig> {
    let mut config: GraphConfig = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => GraphConfig::default(),
    };
    if args.curve {
        config.use_curve = true;
    }
    if args.no_cache {
        config.use_cache = false;
    }
    config.validate()?;
    Ok(config)
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
