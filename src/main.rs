//! busflow - boarding/alighting heatmap overlay builder
//!
//! Reads a transactions table, aggregates counts per section, groups stops
//! and writes the overlay document a map renderer consumes.
//!
//! Module structure:
//! - `domain/` - Core value types (records, stops, clusters) and geometry
//! - `io/` - Transaction ingest and overlay egress
//! - `services/` - Aggregation, clustering, grouping, overlay, pipeline
//! - `infra/` - Configuration and metrics

use busflow::infra::Config;
use busflow::io::{write_overlay, InputFormat, OutputFormat};
use busflow::services::{DisplayMode, GroupingKind, Pipeline};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// busflow - passenger heatmap overlay builder
#[derive(Parser, Debug)]
#[command(name = "busflow", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $BUSFLOW_CONFIG, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Transactions table (overrides [input] path)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Input decoding: auto, csv or workbook
    #[arg(long, value_parser = parse_input_format)]
    input_format: Option<InputFormat>,

    /// Overlay output file (overrides [output] path)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop grouping: per_section, proximity or demo
    #[arg(short, long, value_parser = parse_grouping)]
    grouping: Option<GroupingKind>,

    /// Merge radius in kilometers for proximity grouping
    #[arg(short, long)]
    radius_km: Option<f64>,

    /// Heatmap weight: boarding or alighting
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<DisplayMode>,

    /// Output format: geojson or json
    #[arg(short, long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Read latitude from the longitude column and vice versa
    #[arg(long)]
    swap_coordinates: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn parse_grouping(s: &str) -> Result<GroupingKind, String> {
    GroupingKind::parse(s).ok_or_else(|| format!("unknown grouping {:?}", s))
}

fn parse_input_format(s: &str) -> Result<InputFormat, String> {
    InputFormat::parse(s).ok_or_else(|| format!("unknown input format {:?}", s))
}

fn parse_mode(s: &str) -> Result<DisplayMode, String> {
    DisplayMode::parse(s).ok_or_else(|| format!("unknown display mode {:?}", s))
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::parse(s).ok_or_else(|| format!("unknown output format {:?}", s))
}

fn init_logging(json: bool) {
    // RUST_LOG overrides; default INFO
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(path) = &args.input {
        config = config.with_input_path(path.clone());
    }
    if let Some(format) = args.input_format {
        config = config.with_input_format(format);
    }
    if let Some(path) = &args.output {
        config = config.with_output_path(path.clone());
    }
    if let Some(kind) = args.grouping {
        config = config.with_grouping_kind(kind);
    }
    if let Some(radius) = args.radius_km {
        config = config.with_radius_km(radius);
    }
    if let Some(mode) = args.mode {
        config = config.with_display_mode(mode);
    }
    if let Some(format) = args.format {
        config = config.with_output_format(format);
    }
    if args.swap_coordinates {
        config = config.with_swap_coordinates(true);
    }
    config
}

fn run(args: Args) -> anyhow::Result<()> {
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = apply_overrides(Config::load_from_path(&config_path), &args);
    config.validate()?;

    info!(
        config_file = %config.config_file(),
        input = %config.input_path().display(),
        input_format = %config.input_settings().format.as_str(),
        output = %config.output_path().display(),
        grouping = %config.grouping_kind().as_str(),
        radius_km = %config.radius_km(),
        display_mode = %config.display_mode().as_str(),
        format = %config.output_format().as_str(),
        "config_loaded"
    );

    let pipeline = Pipeline::new(config);
    let output = pipeline.run()?;

    let config = pipeline.config();
    write_overlay(config.output_path(), &output.document, config.output_format())?;

    pipeline.metrics().report().log();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), git = env!("BUSFLOW_GIT_HASH"), "busflow_starting");

    match run(args) {
        Ok(()) => {
            info!("busflow_finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "busflow_failed");
            ExitCode::FAILURE
        }
    }
}
