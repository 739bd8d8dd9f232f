//! graph-render
//!
//! Reads a render request (or synthesizes one), runs the line graph
//! pipeline and prints the render output as JSON on stdout.

mod demo;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{FixedOffset, Local, Utc};
use clap::Parser;
use graph_core::{EngineConfig, UtcOffsetSource};
use graph_draw::{render, RenderRequest};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

/// Line graph renderer
///
/// Turns sample rows into scales, time grid, drawable primitives and legend.
#[derive(Parser, Debug, Clone)]
#[command(name = "graph-render")]
#[command(about = "Render a line graph description from sample rows")]
struct Args {
    /// Render request (JSON)
    #[arg(long, conflicts_with = "demo", required_unless_present = "demo")]
    request: Option<PathBuf>,

    /// Render a synthesized one-day demo graph
    #[arg(long)]
    demo: bool,

    /// Seed for demo data
    #[arg(long)]
    seed: Option<u64>,

    /// Plot width of the demo graph, px
    #[arg(long, default_value = "900")]
    width: usize,

    /// Plot height of the demo graph, px
    #[arg(long, default_value = "200")]
    height: usize,

    /// Engine tuning file (TOML, YAML or JSON)
    #[arg(long, env = "GRAPH_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Fixed UTC offset in seconds; the host time zone when omitted
    #[arg(long, allow_hyphen_values = true)]
    tz_offset: Option<i32>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    debug!(?args, "starting graph-render");

    run(args)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let offsets = offsets(args.tz_offset)?;

    let request = match &args.request {
        Some(path) => load_request(path)?,
        None => {
            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            demo::demo_request(&mut rng, Utc::now().timestamp(), args.width, args.height)
        }
    };

    info!(
        series = request.series.len(),
        from = request.from,
        to = request.to,
        width = request.width,
        height = request.height,
        "rendering graph"
    );

    let output = render(&request, &config, offsets.as_ref())
        .inspect_err(|err| {
            if err.is_configuration() {
                warn!(error = %err, "graph configuration rejected");
            }
        })
        .context("failed to render graph")?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{json}");

    Ok(())
}

/// Engine tuning: defaults, then the optional file, then `GRAPH_*` variables
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(config::Environment::with_prefix("GRAPH").try_parsing(true))
        .build()
        .context("failed to load engine configuration")?;

    let config: EngineConfig = settings
        .try_deserialize()
        .context("invalid engine configuration")?;
    debug!(?config, "engine configuration");

    Ok(config)
}

fn load_request(path: &Path) -> Result<RenderRequest> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid render request in {}", path.display()))
}

fn offsets(tz_offset: Option<i32>) -> Result<Box<dyn UtcOffsetSource>> {
    match tz_offset {
        Some(seconds) => {
            let offset = FixedOffset::east_opt(seconds)
                .with_context(|| format!("UTC offset out of range: {seconds}"))?;
            Ok(Box::new(offset))
        }
        None => Ok(Box::new(Local)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_request_or_demo_required() {
        assert!(Args::try_parse_from(["graph-render"]).is_err());
        assert!(Args::try_parse_from(["graph-render", "--demo", "--request", "r.json"]).is_err());

        let args = Args::try_parse_from(["graph-render", "--demo", "--tz-offset", "-3600"]).unwrap();
        assert!(args.demo);
        assert_eq!(args.tz_offset, Some(-3600));
    }

    #[test]
    fn test_offsets_reject_out_of_range() {
        assert!(offsets(Some(90_000)).is_err());
        assert!(offsets(Some(3600)).is_ok());
    }

    #[test]
    fn test_demo_renders() {
        let mut rng = StdRng::seed_from_u64(3);
        let request = demo::demo_request(&mut rng, 1_704_067_200, 300, 150);
        let utc = FixedOffset::east_opt(0).unwrap();

        let output = render(&request, &EngineConfig::default(), &utc).unwrap();
        assert_eq!(output.axes.len(), 2);
        assert_eq!(output.columns.len(), 3);
        assert!(serde_json::to_string(&output).is_ok());
    }
}
