//! End-to-end accessibility run.
//!
//! Validates configuration and required inputs up front, then runs every
//! stage in order. Nothing past validation fails: empty intermediate
//! tables simply flow through to an empty score table.

use std::sync::Arc;
use std::time::Instant;

use geo::MultiPolygon;
use green_access_accessibility_models::{
    AccessConfig, AccessPoint, AccessibilityScore, CandidatePair, DemandUnit,
    NearestEntranceRecord, PopulationCell, ScoreSummary, SupplySite,
};
use green_access_network::RoadNetwork;

use crate::AnalysisError;
use crate::demand::prepare_demand;
use crate::entrance::nearest_entrances;
use crate::gates::generate_access_points;
use crate::m2sfca::{score, summarize};
use crate::pairs::candidate_pairs;
use crate::progress::{ProgressCallback, null_progress};
use crate::routing::NetworkDistanceSolver;
use crate::supply::merge_supply_sites;

/// Geometry inputs, all in one planar metric coordinate system.
#[derive(Debug, Clone)]
pub struct AccessibilityInputs {
    /// Population grid or census cells.
    pub population: Vec<PopulationCell>,
    /// Raw green space parcels.
    pub parcels: Vec<MultiPolygon<f64>>,
    /// Administrative boundary of the study area.
    pub boundary: MultiPolygon<f64>,
}

/// Every table produced by a run, for scoring output and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct AccessibilityRun {
    pub supply_sites: Vec<SupplySite>,
    pub access_points: Vec<AccessPoint>,
    pub demand_units: Vec<DemandUnit>,
    /// Candidate pairs with their routed distances, unreachable ones
    /// included.
    pub candidate_pairs: Vec<CandidatePair>,
    pub nearest_entrances: Vec<NearestEntranceRecord>,
    pub scores: Vec<AccessibilityScore>,
    pub summary: ScoreSummary,
}

/// Runs all stages over `inputs`.
///
/// # Errors
///
/// * [`AnalysisError::Config`] if `config` fails validation
/// * [`AnalysisError::MissingInput`] if `network` is absent or the
///   boundary is empty
pub fn run(
    inputs: &AccessibilityInputs,
    network: Option<&RoadNetwork>,
    config: &AccessConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<AccessibilityRun, AnalysisError> {
    config.validate()?;
    let network = network.ok_or(AnalysisError::MissingInput {
        name: "road network",
    })?;
    if inputs.boundary.0.is_empty() {
        return Err(AnalysisError::MissingInput { name: "boundary" });
    }

    let progress = progress.unwrap_or_else(null_progress);
    let start = Instant::now();

    log::info!(
        "Starting accessibility run: {} cells, {} parcels, mode={}, threshold={}",
        inputs.population.len(),
        inputs.parcels.len(),
        config.mode,
        config.distance_threshold
    );

    progress.set_message("Merging supply sites".to_string());
    let supply_sites = merge_supply_sites(&inputs.parcels, &inputs.boundary, config);
    progress.set_message("Generating access points".to_string());
    let access_points = generate_access_points(&supply_sites, network, config);
    progress.set_message("Preparing demand".to_string());
    let demand_units = prepare_demand(&inputs.population, &inputs.boundary, config);

    progress.set_message("Pruning pairs".to_string());
    let pairs = candidate_pairs(&demand_units, &access_points, config);
    let candidate_pairs = NetworkDistanceSolver::new(network).solve(
        pairs,
        &demand_units,
        &access_points,
        progress.as_ref(),
    );

    let nearest_entrances = nearest_entrances(&candidate_pairs, config.max_network_distance);
    let scores = score(&nearest_entrances, config.decay_constant);
    let summary = summarize(&scores, demand_units.len());

    log::info!(
        "Accessibility run complete in {:.1}s: {} of {} demand units scored",
        start.elapsed().as_secs_f64(),
        summary.scored_units,
        demand_units.len()
    );

    Ok(AccessibilityRun {
        supply_sites,
        access_points,
        demand_units,
        candidate_pairs,
        nearest_entrances,
        scores,
        summary,
    })
}
