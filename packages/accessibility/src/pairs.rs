//! Candidate pair pruning.
//!
//! Only access points inside a demand unit's catchment are worth routing
//! to. An R-tree over the access points narrows each unit's candidates to
//! its bounding box grown by the catchment radius, then the exact
//! containment test runs on the survivors.

use geo::{Distance, Euclidean, MultiPolygon, Point};
use green_access_accessibility_models::{
    AccessConfig, AccessPoint, CandidatePair, CatchmentBoundary, DemandUnit,
};
use green_access_spatial::{PointIndex, compute_envelope};

/// Enumerates the `(demand unit, access point)` pairs whose access point
/// lies within the unit's catchment.
///
/// Pairs are ordered by demand id, then access point id.
#[must_use]
pub fn candidate_pairs(
    demand: &[DemandUnit],
    access_points: &[AccessPoint],
    config: &AccessConfig,
) -> Vec<CandidatePair> {
    let index = PointIndex::new(access_points.iter().map(|p| (p.id, p.geometry)));
    let radius = config.distance_threshold;
    let mut pairs = Vec::new();

    for unit in demand {
        let envelope = compute_envelope(&unit.geometry);
        for access_point_id in index.candidates_near(&envelope, radius) {
            let Some(access_point) = access_points.get(access_point_id) else {
                continue;
            };
            if !within_catchment(
                &unit.geometry,
                access_point.geometry,
                radius,
                config.catchment_boundary,
            ) {
                continue;
            }
            pairs.push(CandidatePair {
                demand_id: unit.id,
                access_point_id,
                park_id: access_point.park_id,
                population: unit.population,
                park_area: access_point.park_area,
                distance: None,
            });
        }
    }

    log::info!(
        "Pruned {} x {} demand/access combinations to {} candidate pairs",
        demand.len(),
        access_points.len(),
        pairs.len()
    );

    pairs
}

/// Whether `point` lies in `area` grown by `radius`.
///
/// Evaluated as a distance test against the exact buffer, so a point on
/// the catchment edge is decided by `boundary` rather than by how the
/// buffer polygon approximates its rounded corners.
#[must_use]
pub fn within_catchment(
    area: &MultiPolygon<f64>,
    point: Point<f64>,
    radius: f64,
    boundary: CatchmentBoundary,
) -> bool {
    let distance = area
        .iter()
        .map(|polygon| Euclidean.distance(&point, polygon))
        .fold(f64::INFINITY, f64::min);
    boundary.admits(distance, radius)
}
