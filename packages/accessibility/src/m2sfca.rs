//! Modified two-step floating catchment area (M2SFCA) scoring.
//!
//! Step one spreads each park's area over the distance-decayed population
//! that reaches it, giving a supply-to-weighted-demand ratio per park. Step
//! two credits every demand unit with the decayed ratio of each park it
//! reaches. Decaying in both steps is what separates M2SFCA from plain
//! 2SFCA: a distant park is both less attractive and less contested.

use std::collections::BTreeMap;

use green_access_accessibility_models::{
    AccessibilityScore, DemandId, NearestEntranceRecord, ParkId, ScoreSummary,
};

/// Gaussian distance decay `exp(-d² / v)`.
#[must_use]
pub fn decay_weight(distance: f64, decay_constant: f64) -> f64 {
    (-(distance * distance) / decay_constant).exp()
}

#[derive(Default)]
struct Accumulator {
    score: f64,
    distance: f64,
    area: f64,
    supply: f64,
    parks: usize,
}

/// Scores every demand unit that has at least one nearest-entrance record.
///
/// Units without records get no score at all, which keeps "no reachable
/// park" distinct from a score of zero. A park whose weighted demand sums
/// to zero (every visitor decayed to nothing) contributes a ratio of zero.
/// Scores are ordered by demand id.
#[must_use]
pub fn score(records: &[NearestEntranceRecord], decay_constant: f64) -> Vec<AccessibilityScore> {
    let weights: Vec<f64> = records
        .iter()
        .map(|record| decay_weight(record.distance, decay_constant))
        .collect();

    let mut weighted_demand: BTreeMap<ParkId, f64> = BTreeMap::new();
    for (record, weight) in records.iter().zip(&weights) {
        *weighted_demand.entry(record.park_id).or_default() += weight * record.population;
    }

    let saturated = weighted_demand.values().filter(|sum| **sum <= 0.0).count();
    if saturated > 0 {
        log::debug!("{saturated} parks have zero weighted demand; their supply ratio is 0");
    }

    let mut units: BTreeMap<DemandId, Accumulator> = BTreeMap::new();
    for (record, weight) in records.iter().zip(&weights) {
        let demand = weighted_demand.get(&record.park_id).copied().unwrap_or(0.0);
        let supply_ratio = if demand > 0.0 {
            record.park_area / demand
        } else {
            0.0
        };

        let unit = units.entry(record.demand_id).or_default();
        unit.score += weight * supply_ratio;
        unit.distance += record.distance;
        unit.area += record.park_area;
        unit.supply += supply_ratio;
        unit.parks += 1;
    }

    log::info!(
        "Scored {} demand units against {} parks",
        units.len(),
        weighted_demand.len()
    );

    units
        .into_iter()
        .map(|(demand_id, unit)| {
            #[allow(clippy::cast_precision_loss)]
            let count = unit.parks as f64;
            AccessibilityScore {
                demand_id,
                score: unit.score,
                mean_distance: unit.distance / count,
                mean_area: unit.area / count,
                mean_supply: unit.supply / count,
                park_count: unit.parks,
            }
        })
        .collect()
}

/// Descriptive statistics of `scores` over `demand_count` demand units.
#[must_use]
pub fn summarize(scores: &[AccessibilityScore], demand_count: usize) -> ScoreSummary {
    let mut values: Vec<f64> = scores.iter().map(|s| s.score).collect();
    values.sort_by(f64::total_cmp);

    let scored_units = values.len();
    let unscored_units = demand_count.saturating_sub(scored_units);

    if values.is_empty() {
        return ScoreSummary {
            unscored_units,
            ..ScoreSummary::default()
        };
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = values.iter().sum::<f64>() / scored_units as f64;
    let middle = scored_units / 2;
    let median = if scored_units % 2 == 0 {
        (values[middle - 1] + values[middle]) / 2.0
    } else {
        values[middle]
    };

    ScoreSummary {
        scored_units,
        unscored_units,
        min: values.first().copied(),
        max: values.last().copied(),
        mean: Some(mean),
        median: Some(median),
    }
}

#[cfg(test)]
mod tests {
    use green_access_accessibility_models::{AccessConfig, DEFAULT_DECAY_CONSTANT};

    use super::*;

    fn record(
        demand_id: usize,
        park_id: usize,
        distance: f64,
        population: f64,
    ) -> NearestEntranceRecord {
        NearestEntranceRecord {
            demand_id,
            park_id,
            access_point_id: park_id,
            distance,
            population,
            park_area: 1000.0,
        }
    }

    /// Distance at which the default decay gives `weight`.
    fn distance_for(weight: f64) -> f64 {
        (-DEFAULT_DECAY_CONSTANT * weight.ln()).sqrt()
    }

    #[test]
    fn half_weight_at_800() {
        let weight = decay_weight(800.0, DEFAULT_DECAY_CONSTANT);
        assert!((weight - 0.5).abs() < 1e-3);
        assert!((decay_weight(0.0, DEFAULT_DECAY_CONSTANT) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn supply_ratio_spreads_area_over_weighted_demand() {
        // Weighted populations 0.8 * 2.5 = 2 and 1.0 * 3 = 3.
        let records = vec![record(0, 0, distance_for(0.8), 2.5), record(1, 0, 0.0, 3.0)];
        let scores = score(&records, DEFAULT_DECAY_CONSTANT);
        assert_eq!(scores.len(), 2);
        assert!((scores[0].mean_supply - 200.0).abs() < 1e-6);
        assert!((scores[1].mean_supply - 200.0).abs() < 1e-6);
        assert!((scores[0].score - 160.0).abs() < 1e-6);
        assert!((scores[1].score - 200.0).abs() < 1e-6);
    }

    #[test]
    fn sums_contributions_across_parks() {
        let records = vec![record(0, 0, 0.0, 10.0), record(0, 1, 800.0, 10.0)];
        let scores = score(&records, DEFAULT_DECAY_CONSTANT);
        assert_eq!(scores.len(), 1);
        let unit = &scores[0];
        assert_eq!(unit.park_count, 2);
        // Park 0: ratio 1000 / 10, weight 1. Park 1: ratio 1000 / (10 w), weight w.
        assert!((unit.score - 200.0).abs() < 1e-6);
        assert!((unit.mean_distance - 400.0).abs() < 1e-9);
        assert!((unit.mean_area - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn units_without_records_are_absent() {
        let records = vec![record(2, 0, 100.0, 10.0)];
        let scores = score(&records, DEFAULT_DECAY_CONSTANT);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].demand_id, 2);
    }

    #[test]
    fn zero_weighted_demand_gives_zero_ratio() {
        let records = vec![record(0, 0, 1.0e6, 10.0)];
        let scores = score(&records, DEFAULT_DECAY_CONSTANT);
        assert_eq!(scores.len(), 1);
        assert!(scores[0].score.abs() < f64::EPSILON);
        assert!(scores[0].mean_supply.abs() < f64::EPSILON);
    }

    #[test]
    fn decay_constant_is_configurable() {
        let v = AccessConfig::decay_for_half_weight(400.0);
        let weight = decay_weight(400.0, v);
        assert!((weight - 0.5).abs() < 1e-9);
    }

    #[test]
    fn summary_statistics() {
        let records = vec![
            record(0, 0, 0.0, 10.0),
            record(1, 1, 0.0, 20.0),
            record(2, 2, 0.0, 40.0),
            record(3, 3, 0.0, 50.0),
        ];
        let scores = score(&records, DEFAULT_DECAY_CONSTANT);
        let summary = summarize(&scores, 6);
        assert_eq!(summary.scored_units, 4);
        assert_eq!(summary.unscored_units, 2);
        assert_eq!(summary.min, Some(20.0));
        assert_eq!(summary.max, Some(100.0));
        assert!((summary.median.unwrap() - 37.5).abs() < 1e-9);
        assert!((summary.mean.unwrap() - 48.75).abs() < 1e-9);
    }

    #[test]
    fn empty_summary() {
        let summary = summarize(&[], 3);
        assert_eq!(summary.scored_units, 0);
        assert_eq!(summary.unscored_units, 3);
        assert!(summary.median.is_none());
    }
}
