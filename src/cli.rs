use crate::config::{Config, load_config};
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_network;
use crate::pipeline::{effective_config, lay_out};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "grnl",
    version,
    about = "Lay out and color gene-regulatory-network diagrams"
)]
pub struct Args {
    /// Input network file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output JSON file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file (layout options and palette)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Override the layering method from the config
    #[arg(short = 'l', long = "layering", value_enum)]
    pub layering: Option<Layering>,

    /// Override the maximum nodes per column
    #[arg(short = 'm', long = "maxPerLayer")]
    pub max_per_layer: Option<usize>,

    /// Re-apply the input colors verbatim instead of computing new ones
    #[arg(short = 'k', long = "keepColors")]
    pub keep_colors: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Layering {
    CoffmanGraham,
    ModCoffmanGraham,
    AdHoc,
}

impl From<Layering> for crate::config::LayeringMethod {
    fn from(value: Layering) -> Self {
        match value {
            Layering::CoffmanGraham => Self::CoffmanGraham,
            Layering::ModCoffmanGraham => Self::ModCoffmanGraham,
            Layering::AdHoc => Self::AdHoc,
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let base_config = apply_overrides(load_config(args.config.as_deref())?, &args);

    let input = read_input(args.input.as_deref())?;
    let parsed = parse_network(&input)?;
    if parsed.network.nodes.is_empty() {
        return Err(anyhow::anyhow!("No nodes found in input"));
    }
    let config = effective_config(base_config, &parsed)?;
    let run = lay_out(&parsed, &config)?;
    write_layout_dump(args.output.as_deref(), &run.dump(&parsed))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second install (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(layering) = args.layering {
        config.layout.layering = layering.into();
    }
    if let Some(max) = args.max_per_layer {
        config.layout.max_per_layer = max;
    }
    if args.keep_colors {
        config.color.keep_colors = true;
    }
    config
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
