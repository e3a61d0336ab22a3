#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for green space accessibility scoring.
//!
//! Loads `GeoJSON` inputs and an optional TOML configuration, runs the
//! M2SFCA pipeline and writes per-unit scores plus optional diagnostics.
//!
//! Uses `indicatif-log-bridge` (via [`green_access_cli_utils::init_logger`])
//! so that log lines and the routing progress bar never fight for the
//! terminal.

mod io;
mod output;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use green_access_accessibility::{
    AccessConfig, AccessPointMode, AccessibilityInputs, CatchmentBoundary,
};
use green_access_cli_utils::{IndicatifProgress, MultiProgress};
use green_access_network::RoadNetwork;

#[derive(Parser)]
#[command(name = "green_access", about = "Green space accessibility scoring (M2SFCA)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every population unit against the green space it can walk to
    Score(ScoreArgs),
    /// Print the default configuration as TOML
    Defaults,
}

#[derive(Args)]
struct ScoreArgs {
    /// Population units (`FeatureCollection` of polygons)
    #[arg(long)]
    population: PathBuf,
    /// Green space parcels (`FeatureCollection` of polygons)
    #[arg(long)]
    parcels: PathBuf,
    /// Administrative boundary (geometry, feature or collection)
    #[arg(long)]
    boundary: PathBuf,
    /// Road line-work (`FeatureCollection` of line strings). Lines meet only
    /// at shared coordinates: endpoints, or interior vertices that both
    /// lines carry. Crossings without a common vertex are not junctions.
    #[arg(long)]
    roads: PathBuf,
    /// TOML configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Property holding the resident count of each population unit
    #[arg(long, default_value = "population")]
    population_property: String,

    /// Access point mode: `centroid` or `entrance`
    #[arg(long)]
    mode: Option<String>,
    /// Catchment radius in map units
    #[arg(long)]
    distance_threshold: Option<f64>,
    /// Minimum supply site area
    #[arg(long)]
    min_site_area: Option<f64>,
    /// Gate deduplication radius
    #[arg(long)]
    gate_dedup_radius: Option<f64>,
    /// Decay constant `v` in `exp(-d^2 / v)`
    #[arg(long, conflicts_with = "half_weight_distance")]
    decay_constant: Option<f64>,
    /// Derive the decay constant so the weight is 0.5 at this distance
    #[arg(long)]
    half_weight_distance: Option<f64>,
    /// Exclude pairs farther than this along the network
    #[arg(long)]
    max_network_distance: Option<f64>,
    /// Catchment edge rule: `inclusive` or `exclusive`
    #[arg(long)]
    catchment_boundary: Option<String>,

    /// Score table (CSV)
    #[arg(long, default_value = "scores.csv")]
    output: PathBuf,
    /// Score summary (JSON)
    #[arg(long)]
    summary: Option<PathBuf>,
    /// Merged supply sites (`GeoJSON`)
    #[arg(long)]
    sites: Option<PathBuf>,
    /// Access points (`GeoJSON`)
    #[arg(long)]
    gates: Option<PathBuf>,
    /// Demand unit catchment buffers (`GeoJSON`)
    #[arg(long)]
    catchments: Option<PathBuf>,
    /// Candidate pairs with routed distances (CSV)
    #[arg(long)]
    pairs: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<AccessConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(AccessConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: AccessConfig = toml::from_str(&text)
        .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn resolve_config(args: &ScoreArgs) -> Result<AccessConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(mode) = &args.mode {
        config.mode = AccessPointMode::parse(mode)?;
    }
    if let Some(boundary) = &args.catchment_boundary {
        config.catchment_boundary = CatchmentBoundary::try_from(boundary.clone())?;
    }
    if let Some(threshold) = args.distance_threshold {
        config.distance_threshold = threshold;
    }
    if let Some(area) = args.min_site_area {
        config.min_site_area = area;
    }
    if let Some(radius) = args.gate_dedup_radius {
        config.gate_dedup_radius = radius;
    }
    if let Some(decay) = args.decay_constant {
        config.decay_constant = decay;
    }
    if let Some(distance) = args.half_weight_distance {
        config.decay_constant = AccessConfig::decay_for_half_weight(distance);
    }
    if let Some(cutoff) = args.max_network_distance {
        config.max_network_distance = Some(cutoff);
    }

    config.validate()?;
    Ok(config)
}

fn score(args: &ScoreArgs, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let config = resolve_config(args)?;

    let inputs = AccessibilityInputs {
        population: io::load_population(&args.population, &args.population_property)?,
        parcels: io::load_polygons(&args.parcels)?,
        boundary: io::load_boundary(&args.boundary)?,
    };
    let network = RoadNetwork::from_linestrings(io::load_roads(&args.roads)?)?;

    let progress = IndicatifProgress::routing_bar(multi, "Routing");
    let run = green_access_accessibility::run(&inputs, Some(&network), &config, Some(progress))?;

    output::write_scores(&args.output, &run.scores, &run.demand_units)?;
    if let Some(path) = &args.summary {
        output::write_summary(path, &run.summary)?;
    }
    if let Some(path) = &args.sites {
        output::write_sites(path, &run.supply_sites)?;
    }
    if let Some(path) = &args.gates {
        output::write_access_points(path, &run.access_points)?;
    }
    if let Some(path) = &args.catchments {
        output::write_catchments(path, &run.demand_units)?;
    }
    if let Some(path) = &args.pairs {
        output::write_pairs(path, &run.candidate_pairs)?;
    }

    let summary = &run.summary;
    log::info!(
        "Done in {:.1}s: {} units scored, {} without reachable green space",
        start.elapsed().as_secs_f64(),
        summary.scored_units,
        summary.unscored_units
    );
    if let (Some(min), Some(median), Some(max)) = (summary.min, summary.median, summary.max) {
        println!("Scores: min {min:.3}, median {median:.3}, max {max:.3}");
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = green_access_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Score(args) => score(&args, &multi)?,
        Commands::Defaults => {
            print!("{}", toml::to_string_pretty(&AccessConfig::default())?);
        }
    }

    Ok(())
}
