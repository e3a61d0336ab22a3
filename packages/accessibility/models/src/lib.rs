#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types for the green space accessibility pipeline.
//!
//! Each pipeline stage produces one of these record sets and hands it to the
//! next stage unchanged. Geometry-bearing records (demand units, supply
//! sites, access points) hold planar `geo` types in a shared metric
//! coordinate system; tabular records (candidate pairs, nearest-entrance
//! records, scores) are `serde`-serializable so they can be written out as
//! diagnostics.

pub mod config;

use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};

pub use config::{
    AccessConfig, AccessPointMode, CatchmentBoundary, ConfigError, DEFAULT_DECAY_CONSTANT,
};

/// Index of a [`DemandUnit`] in the preprocessed demand table.
pub type DemandId = usize;

/// Component id of a [`SupplySite`], assigned `0..k` in discovery order.
pub type ParkId = usize;

/// Index of an [`AccessPoint`] in the deduplicated access point table.
pub type AccessPointId = usize;

/// A raw population cell before preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationCell {
    /// Position of the feature this cell was read from, counting features
    /// the reader skipped.
    pub source_index: usize,
    /// Cell geometry.
    pub geometry: MultiPolygon<f64>,
    /// Resident count. Negative values are treated as zero.
    pub population: f64,
}

/// A population unit that survived preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandUnit {
    /// Position in the preprocessed demand table.
    pub id: DemandId,
    /// [`PopulationCell::source_index`] of the originating cell.
    pub source_index: usize,
    /// Cell geometry clipped to the administrative boundary.
    pub geometry: MultiPolygon<f64>,
    /// Resident count.
    pub population: f64,
    /// Area of the clipped geometry.
    pub area: f64,
    /// Centroid of the clipped geometry, used as the routing origin.
    pub centroid: Point<f64>,
    /// Clipped geometry buffered by the distance threshold.
    pub catchment: MultiPolygon<f64>,
}

/// A merged green space ("park").
#[derive(Debug, Clone, PartialEq)]
pub struct SupplySite {
    /// Component id.
    pub id: ParkId,
    /// Union of all parcels in the component.
    pub geometry: MultiPolygon<f64>,
    /// Area of `geometry`.
    pub area: f64,
    /// Centroid of `geometry`.
    pub centroid: Point<f64>,
}

/// Which rule produced an [`AccessPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPointKind {
    /// The park centroid.
    Centroid,
    /// A crossing of the buffered park boundary with the road network.
    Entrance,
}

/// A routable proxy location for a park ("fake gate").
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPoint {
    /// Position in the deduplicated access point table.
    pub id: AccessPointId,
    /// Owning park.
    pub park_id: ParkId,
    /// Area of the owning park.
    pub park_area: f64,
    /// Gate location.
    pub geometry: Point<f64>,
    /// How the gate was derived.
    pub kind: AccessPointKind,
}

/// Network distance between a demand unit and an access point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkDistance {
    /// Shortest path length along the road network.
    Reachable(f64),
    /// No path connects the two resolved road nodes.
    Unreachable,
}

impl NetworkDistance {
    /// Returns the path length, or `None` when unreachable.
    #[must_use]
    pub const fn meters(self) -> Option<f64> {
        match self {
            Self::Reachable(d) => Some(d),
            Self::Unreachable => None,
        }
    }

    /// Whether a path exists.
    #[must_use]
    pub const fn is_reachable(self) -> bool {
        matches!(self, Self::Reachable(_))
    }
}

/// A (demand unit, access point) pair that passed the catchment pre-filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePair {
    /// Demand side.
    pub demand_id: DemandId,
    /// Supply side.
    pub access_point_id: AccessPointId,
    /// Park owning the access point.
    pub park_id: ParkId,
    /// Population of the demand unit.
    pub population: f64,
    /// Area of the park.
    pub park_area: f64,
    /// Filled in by the network distance solver; `None` before routing.
    pub distance: Option<NetworkDistance>,
}

/// The closest reachable access point of one park for one demand unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestEntranceRecord {
    /// Demand side.
    pub demand_id: DemandId,
    /// Park reached.
    pub park_id: ParkId,
    /// The access point that achieved `distance`.
    pub access_point_id: AccessPointId,
    /// Minimum network distance among the park's reachable access points.
    pub distance: f64,
    /// Population of the demand unit.
    pub population: f64,
    /// Area of the park.
    pub park_area: f64,
}

/// Final M2SFCA score for one demand unit with at least one reachable park.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityScore {
    /// Demand unit scored.
    pub demand_id: DemandId,
    /// Sum of access contributions over all reachable parks.
    pub score: f64,
    /// Mean network distance to the reachable parks.
    pub mean_distance: f64,
    /// Mean area of the reachable parks.
    pub mean_area: f64,
    /// Mean supply-to-weighted-demand ratio of the reachable parks.
    pub mean_supply: f64,
    /// Number of reachable parks.
    pub park_count: usize,
}

/// Descriptive statistics over a score table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Demand units with a score record.
    pub scored_units: usize,
    /// Demand units without any reachable park.
    pub unscored_units: usize,
    /// Smallest score, if any.
    pub min: Option<f64>,
    /// Largest score, if any.
    pub max: Option<f64>,
    /// Mean score, if any.
    pub mean: Option<f64>,
    /// Median score, if any.
    pub median: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_has_no_meters() {
        assert_eq!(NetworkDistance::Unreachable.meters(), None);
        assert!(!NetworkDistance::Unreachable.is_reachable());
        assert_eq!(NetworkDistance::Reachable(0.0).meters(), Some(0.0));
        assert!(NetworkDistance::Reachable(0.0).is_reachable());
    }
}
