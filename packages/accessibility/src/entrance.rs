//! Entrance reducer: one record per (demand unit, park).

use std::collections::BTreeMap;

use green_access_accessibility_models::{
    CandidatePair, DemandId, NearestEntranceRecord, NetworkDistance, ParkId,
};

/// Keeps the closest reachable access point of every park for every demand
/// unit.
///
/// Unrouted and unreachable pairs are skipped, as are pairs farther than
/// `max_distance` when a cutoff is given. On equal distances the pair
/// listed first wins. Records are ordered by demand id, then park id.
#[must_use]
pub fn nearest_entrances(
    pairs: &[CandidatePair],
    max_distance: Option<f64>,
) -> Vec<NearestEntranceRecord> {
    let mut nearest: BTreeMap<(DemandId, ParkId), NearestEntranceRecord> = BTreeMap::new();
    let mut skipped = 0_usize;

    for pair in pairs {
        let Some(NetworkDistance::Reachable(distance)) = pair.distance else {
            skipped += 1;
            continue;
        };
        if max_distance.is_some_and(|max| distance > max) {
            skipped += 1;
            continue;
        }

        let record = NearestEntranceRecord {
            demand_id: pair.demand_id,
            park_id: pair.park_id,
            access_point_id: pair.access_point_id,
            distance,
            population: pair.population,
            park_area: pair.park_area,
        };

        nearest
            .entry((pair.demand_id, pair.park_id))
            .and_modify(|current| {
                if distance < current.distance {
                    *current = record.clone();
                }
            })
            .or_insert(record);
    }

    log::info!(
        "Reduced {} pairs to {} nearest-entrance records ({} unreachable or beyond cutoff)",
        pairs.len(),
        nearest.len(),
        skipped
    );

    nearest.into_values().collect()
}
