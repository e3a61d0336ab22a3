//! Access point ("fake gate") generation.
//!
//! A park is routed to through one or more representative points: its
//! centroid, or every place where its slightly grown boundary crosses a
//! road. Gates closer than the deduplication radius are then collapsed to
//! the first one enumerated, so two roads meeting the park side by side do
//! not count as two entrances.

use geo::{Buffer, Point};
use green_access_accessibility_models::{
    AccessConfig, AccessPoint, AccessPointKind, AccessPointMode, SupplySite,
};
use green_access_network::RoadNetwork;
use green_access_spatial::proximity_components;

/// Derives and deduplicates access points for `sites` according to
/// `config.mode`.
#[must_use]
pub fn generate_access_points(
    sites: &[SupplySite],
    network: &RoadNetwork,
    config: &AccessConfig,
) -> Vec<AccessPoint> {
    let raw = match config.mode {
        AccessPointMode::Centroid => centroid_gates(sites),
        AccessPointMode::Entrance => entrance_gates(sites, network, config.entrance_buffer),
    };
    let raw_count = raw.len();

    let gates = deduplicate_access_points(raw, config.gate_dedup_radius);

    log::info!(
        "Generated {} {} access points for {} sites ({} before deduplication)",
        gates.len(),
        config.mode,
        sites.len(),
        raw_count
    );

    gates
}

/// One gate per site at its centroid.
#[must_use]
pub fn centroid_gates(sites: &[SupplySite]) -> Vec<AccessPoint> {
    sites
        .iter()
        .enumerate()
        .map(|(id, site)| AccessPoint {
            id,
            park_id: site.id,
            park_area: site.area,
            geometry: site.centroid,
            kind: AccessPointKind::Centroid,
        })
        .collect()
}

/// Gates where each site's boundary, grown by `buffer`, crosses the road
/// line-work.
///
/// A site enclosed away from every road contributes no gates; this is
/// logged and otherwise ignored.
#[must_use]
pub fn entrance_gates(
    sites: &[SupplySite],
    network: &RoadNetwork,
    buffer: f64,
) -> Vec<AccessPoint> {
    let mut gates = Vec::new();
    let mut enclosed = 0_usize;

    for site in sites {
        let grown = site.geometry.buffer(buffer);
        let crossings = network.boundary_crossings(&grown);

        if crossings.is_empty() {
            log::debug!("Park {} does not touch the road network; no entrances", site.id);
            enclosed += 1;
            continue;
        }

        gates.extend(crossings.into_iter().map(|geometry| AccessPoint {
            id: 0,
            park_id: site.id,
            park_area: site.area,
            geometry,
            kind: AccessPointKind::Entrance,
        }));
    }

    if enclosed > 0 {
        log::warn!("{enclosed} of {} parks have no road crossing and no entrances", sites.len());
    }

    for (id, gate) in gates.iter_mut().enumerate() {
        gate.id = id;
    }
    gates
}

/// Collapses gates into proximity components (gap at most `radius`) and
/// keeps the first enumerated gate of each component.
///
/// Survivors are renumbered `0..n` in input order.
#[must_use]
pub fn deduplicate_access_points(points: Vec<AccessPoint>, radius: f64) -> Vec<AccessPoint> {
    let geometries: Vec<Point<f64>> = points.iter().map(|p| p.geometry).collect();
    let labels = proximity_components(&geometries, radius);

    let mut seen = vec![false; labels.iter().max().map_or(0, |max| max + 1)];
    points
        .into_iter()
        .zip(labels)
        .filter_map(|(point, label)| {
            if seen[label] {
                None
            } else {
                seen[label] = true;
                Some(point)
            }
        })
        .enumerate()
        .map(|(id, point)| AccessPoint { id, ..point })
        .collect()
}
