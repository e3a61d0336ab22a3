//! Supply merger: dissolves green parcels into parks.
//!
//! Parcels are clipped to the administrative boundary grown by the
//! catchment radius, so green space just outside the city that residents
//! near the edge can still walk to is kept. The clipped parcels are
//! unioned and split into disjoint pieces; pieces whose merge buffers
//! touch are joined into one site.

use geo::{Area, BooleanOps, Buffer, Centroid, MultiPolygon, Polygon};
use green_access_accessibility_models::{AccessConfig, SupplySite};
use green_access_spatial::{group_by_label, proximity_components};

/// Builds supply sites from raw parcels.
///
/// Sites with area at or below `config.min_site_area` are discarded and
/// the survivors are numbered `0..k` in discovery order. No parcels (or
/// none inside the clip area) yields no sites.
#[must_use]
pub fn merge_supply_sites(
    parcels: &[MultiPolygon<f64>],
    boundary: &MultiPolygon<f64>,
    config: &AccessConfig,
) -> Vec<SupplySite> {
    let clip_area = boundary.buffer(config.distance_threshold);

    let clipped: Vec<MultiPolygon<f64>> = parcels
        .iter()
        .map(|parcel| parcel.intersection(&clip_area))
        .filter(|parcel| !parcel.0.is_empty())
        .collect();

    log::debug!(
        "Clipped {} parcels to boundary + {}: {} remain",
        parcels.len(),
        config.distance_threshold,
        clipped.len()
    );

    let components = dissolve(&clipped, config.merge_buffer);
    let component_count = components.len();

    let sites: Vec<SupplySite> = components
        .into_iter()
        .filter_map(|geometry| {
            let area = geometry.unsigned_area();
            if area <= config.min_site_area {
                return None;
            }
            let centroid = geometry.centroid()?;
            Some((geometry, area, centroid))
        })
        .enumerate()
        .map(|(id, (geometry, area, centroid))| SupplySite {
            id,
            geometry,
            area,
            centroid,
        })
        .collect();

    if sites.is_empty() {
        log::warn!("No supply sites survived the {} area threshold", config.min_site_area);
    }

    log::info!(
        "Merged {} parcels into {} components, kept {} supply sites (area > {})",
        parcels.len(),
        component_count,
        sites.len(),
        config.min_site_area
    );

    sites
}

/// Unions `parcels`, explodes the union into disjoint pieces and joins the
/// pieces whose `merge_buffer` buffers intersect.
///
/// Returns one geometry per component, in discovery order.
#[must_use]
pub fn dissolve(parcels: &[MultiPolygon<f64>], merge_buffer: f64) -> Vec<MultiPolygon<f64>> {
    let union = parcels
        .iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, parcel| acc.union(parcel));
    let pieces: Vec<Polygon<f64>> = union.0;

    let labels = proximity_components(&pieces, 2.0 * merge_buffer);

    group_by_label(&labels)
        .into_iter()
        .map(|members| MultiPolygon(members.into_iter().map(|i| pieces[i].clone()).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::test_support::rect_mp;

    use super::*;

    fn city() -> MultiPolygon<f64> {
        rect_mp(0.0, 0.0, 1000.0, 1000.0)
    }

    fn total_area(sites: &[SupplySite]) -> f64 {
        sites.iter().map(|s| s.area).sum()
    }

    #[test]
    fn merges_parcels_with_small_gap() {
        let parcels = vec![
            rect_mp(100.0, 100.0, 200.0, 200.0),
            rect_mp(215.0, 100.0, 315.0, 200.0),
        ];
        let sites = merge_supply_sites(&parcels, &city(), &AccessConfig::default());
        assert_eq!(sites.len(), 1);
        assert!((sites[0].area - 20_000.0).abs() < 1e-3);
        assert_eq!(sites[0].geometry.0.len(), 2);
    }

    #[test]
    fn keeps_parcels_with_large_gap_apart() {
        let parcels = vec![
            rect_mp(100.0, 100.0, 200.0, 200.0),
            rect_mp(245.0, 100.0, 345.0, 200.0),
        ];
        let sites = merge_supply_sites(&parcels, &city(), &AccessConfig::default());
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].id, 0);
        assert_eq!(sites[1].id, 1);
    }

    #[test]
    fn overlapping_parcels_become_one_piece() {
        let parcels = vec![
            rect_mp(100.0, 100.0, 200.0, 200.0),
            rect_mp(150.0, 100.0, 250.0, 200.0),
        ];
        let sites = merge_supply_sites(&parcels, &city(), &AccessConfig::default());
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].geometry.0.len(), 1);
        assert!((sites[0].area - 15_000.0).abs() < 1e-3);
    }

    #[test]
    fn discards_small_sites() {
        let parcels = vec![
            rect_mp(100.0, 100.0, 110.0, 110.0),
            rect_mp(500.0, 500.0, 519.0, 519.0),
            rect_mp(700.0, 700.0, 730.0, 730.0),
        ];
        let sites = merge_supply_sites(&parcels, &city(), &AccessConfig::default());
        assert_eq!(sites.len(), 1);
        assert!(sites.iter().all(|s| s.area > 400.0));
        assert_eq!(sites[0].id, 0);
    }

    #[test]
    fn clips_to_expanded_boundary() {
        let parcels = vec![
            rect_mp(1750.0, 400.0, 1850.0, 500.0),
            rect_mp(5000.0, 5000.0, 5100.0, 5100.0),
        ];
        let sites = merge_supply_sites(&parcels, &city(), &AccessConfig::default());
        assert_eq!(sites.len(), 1);
        assert!((sites[0].area - 5_000.0).abs() < 1.0);
    }

    #[test]
    fn empty_input_yields_no_sites() {
        assert!(merge_supply_sites(&[], &city(), &AccessConfig::default()).is_empty());
    }

    #[test]
    fn merging_is_a_fixed_point() {
        let parcels = vec![
            rect_mp(100.0, 100.0, 200.0, 200.0),
            rect_mp(215.0, 100.0, 315.0, 200.0),
            rect_mp(150.0, 150.0, 260.0, 260.0),
            rect_mp(600.0, 600.0, 700.0, 700.0),
        ];
        let config = AccessConfig::default();
        let first = merge_supply_sites(&parcels, &city(), &config);
        let again: Vec<MultiPolygon<f64>> = first.iter().map(|s| s.geometry.clone()).collect();
        let second = merge_supply_sites(&again, &city(), &config);

        assert_eq!(first.len(), second.len());
        assert!((total_area(&first) - total_area(&second)).abs() < 1e-3);
        let mut first_areas: Vec<f64> = first.iter().map(|s| s.area).collect();
        let mut second_areas: Vec<f64> = second.iter().map(|s| s.area).collect();
        first_areas.sort_by(f64::total_cmp);
        second_areas.sort_by(f64::total_cmp);
        for (a, b) in first_areas.iter().zip(&second_areas) {
            assert!((a - b).abs() < 1e-3);
        }
    }
}
