#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Green space accessibility scoring (M2SFCA).
//!
//! The pipeline runs as a sequence of batch stages, each consuming the
//! previous stage's output and producing a new table:
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Supply merger | [`supply`] | [`SupplySite`]s |
//! | Access point generator | [`gates`] | [`AccessPoint`]s |
//! | Demand preprocessor | [`demand`] | [`DemandUnit`]s |
//! | Pair pruner | [`pairs`] | [`CandidatePair`]s |
//! | Network distance solver | [`routing`] | [`CandidatePair`]s with distances |
//! | Entrance reducer | [`entrance`] | [`NearestEntranceRecord`]s |
//! | M2SFCA scorer | [`m2sfca`] | [`AccessibilityScore`]s |
//!
//! [`pipeline::run`] chains them. Degenerate conditions inside a stage
//! (no sites, parks without entrances, unreachable pairs) are represented
//! as empty tables or marker values; only configuration problems and
//! missing required inputs are errors.

pub mod demand;
pub mod entrance;
pub mod gates;
pub mod m2sfca;
pub mod pairs;
pub mod pipeline;
pub mod progress;
pub mod routing;
pub mod supply;

use green_access_accessibility_models::ConfigError;
use green_access_network::NetworkError;
use thiserror::Error;

pub use green_access_accessibility_models::{
    AccessConfig, AccessPoint, AccessPointKind, AccessPointMode, AccessibilityScore,
    CandidatePair, CatchmentBoundary, DemandUnit, NearestEntranceRecord, NetworkDistance,
    PopulationCell, ScoreSummary, SupplySite,
};
pub use pipeline::{AccessibilityInputs, AccessibilityRun, run};

/// Errors that abort an accessibility run before any stage executes.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The configuration failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The road network could not be built.
    #[error("Road network error: {0}")]
    Network(#[from] NetworkError),

    /// A required input is absent.
    #[error("Missing required input: {name}")]
    MissingInput {
        /// Which input.
        name: &'static str,
    },
}

#[cfg(test)]
pub(crate) mod test_support {
    use geo::{LineString, MultiPolygon, Polygon, Rect, coord};
    use green_access_network::{RoadLine, RoadNetwork};

    /// Two-way straight roads between coordinate pairs, measured by planar
    /// length.
    pub fn roads(segments: &[((f64, f64), (f64, f64))]) -> RoadNetwork {
        RoadNetwork::from_linestrings(
            segments
                .iter()
                .map(|(from, to)| RoadLine {
                    geometry: LineString::from(vec![*from, *to]),
                    length: None,
                    oneway: false,
                })
                .collect(),
        )
        .unwrap()
    }

    /// Axis-aligned rectangle from `(x0, y0)` to `(x1, y1)`.
    pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()
    }

    /// Single-polygon [`MultiPolygon`] rectangle.
    pub fn rect_mp(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![rect(x0, y0, x1, y1)])
    }
}
