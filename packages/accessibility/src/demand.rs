//! Demand preprocessing: cleans population cells into demand units.

use geo::{Area, BooleanOps, Buffer, Centroid, MultiPolygon};
use green_access_accessibility_models::{AccessConfig, DemandUnit, PopulationCell};

/// Clips population cells to the boundary and keeps the ones that are
/// populated enough and not sliced by the boundary.
///
/// A cell survives when its population is at least
/// `config.min_population` and its clipped area exceeds
/// `config.min_area_fraction` times the largest clipped area among the
/// populated cells. Survivors get a centroid and a catchment buffer of
/// `config.distance_threshold`, and are numbered `0..n` in input order.
#[must_use]
pub fn prepare_demand(
    cells: &[PopulationCell],
    boundary: &MultiPolygon<f64>,
    config: &AccessConfig,
) -> Vec<DemandUnit> {
    let populated: Vec<(usize, MultiPolygon<f64>, f64, f64)> = cells
        .iter()
        .filter(|cell| cell.population >= config.min_population)
        .map(|cell| {
            let clipped = cell.geometry.intersection(boundary);
            let area = clipped.unsigned_area();
            (cell.source_index, clipped, cell.population, area)
        })
        .collect();

    let max_area = populated
        .iter()
        .map(|(_, _, _, area)| *area)
        .fold(0.0_f64, f64::max);
    let min_area = max_area * config.min_area_fraction;

    let units: Vec<DemandUnit> = populated
        .into_iter()
        .filter(|(_, _, _, area)| *area > min_area)
        .filter_map(|(source_index, geometry, population, area)| {
            let centroid = geometry.centroid()?;
            let catchment = geometry.buffer(config.distance_threshold);
            Some((source_index, geometry, population, area, centroid, catchment))
        })
        .enumerate()
        .map(
            |(id, (source_index, geometry, population, area, centroid, catchment))| DemandUnit {
                id,
                source_index,
                geometry,
                population,
                area,
                centroid,
                catchment,
            },
        )
        .collect();

    if units.is_empty() {
        log::warn!("No population cells survived preprocessing");
    }

    log::info!(
        "Prepared {} demand units from {} cells (population >= {}, area > {:.1})",
        units.len(),
        cells.len(),
        config.min_population,
        min_area
    );

    units
}

#[cfg(test)]
mod tests {
    use geo::{Contains, Point};

    use crate::test_support::rect_mp;

    use super::*;

    fn cells(specs: &[(f64, f64, f64)]) -> Vec<PopulationCell> {
        specs
            .iter()
            .enumerate()
            .map(|(source_index, &(x, y, population))| cell(source_index, x, y, population))
            .collect()
    }

    fn cell(source_index: usize, x: f64, y: f64, population: f64) -> PopulationCell {
        PopulationCell {
            source_index,
            geometry: rect_mp(x, y, x + 100.0, y + 100.0),
            population,
        }
    }

    #[test]
    fn drops_sparse_cells() {
        let cells = cells(&[(0.0, 0.0, 50.0), (100.0, 0.0, 9.0), (200.0, 0.0, 10.0)]);
        let boundary = rect_mp(0.0, 0.0, 1000.0, 1000.0);
        let units = prepare_demand(&cells, &boundary, &AccessConfig::default());
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].source_index, 0);
        assert_eq!(units[1].source_index, 2);
        assert_eq!(units[1].id, 1);
    }

    #[test]
    fn drops_boundary_sliced_cells() {
        let cells = cells(&[(0.0, 0.0, 50.0), (960.0, 0.0, 50.0), (940.0, 200.0, 50.0)]);
        let boundary = rect_mp(0.0, 0.0, 1000.0, 1000.0);
        let units = prepare_demand(&cells, &boundary, &AccessConfig::default());
        // 40% and 60% of a full cell remain inside; only the latter passes.
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].source_index, 2);
        assert!((units[1].area - 6_000.0).abs() < 1e-3);
    }

    #[test]
    fn derives_centroid_and_catchment() {
        let cells = vec![cell(0, 0.0, 0.0, 50.0)];
        let boundary = rect_mp(-5000.0, -5000.0, 5000.0, 5000.0);
        let units = prepare_demand(&cells, &boundary, &AccessConfig::default());
        let unit = &units[0];
        assert!((unit.centroid.x() - 50.0).abs() < 1e-6);
        assert!((unit.centroid.y() - 50.0).abs() < 1e-6);
        assert!(unit.catchment.contains(&Point::new(850.0, 50.0)));
        assert!(!unit.catchment.contains(&Point::new(950.0, 50.0)));
    }

    #[test]
    fn empty_input_yields_no_units() {
        let boundary = rect_mp(0.0, 0.0, 1000.0, 1000.0);
        assert!(prepare_demand(&[], &boundary, &AccessConfig::default()).is_empty());
    }

    #[test]
    fn cells_outside_boundary_are_dropped() {
        let cells = cells(&[(0.0, 0.0, 50.0), (5000.0, 5000.0, 500.0)]);
        let boundary = rect_mp(0.0, 0.0, 1000.0, 1000.0);
        let units = prepare_demand(&cells, &boundary, &AccessConfig::default());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].source_index, 0);
    }

    #[test]
    fn keeps_source_index_of_cells_after_gaps() {
        // Features 0 and 2 never reached the demand table.
        let cells = vec![cell(1, 0.0, 0.0, 50.0), cell(3, 100.0, 0.0, 50.0)];
        let boundary = rect_mp(0.0, 0.0, 1000.0, 1000.0);
        let units = prepare_demand(&cells, &boundary, &AccessConfig::default());
        assert_eq!(units.len(), 2);
        assert_eq!((units[0].id, units[0].source_index), (0, 1));
        assert_eq!((units[1].id, units[1].source_index), (1, 3));
    }
}
