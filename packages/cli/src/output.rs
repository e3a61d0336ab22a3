//! Result and diagnostics writers.

use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use green_access_accessibility::{
    AccessPoint, AccessibilityScore, CandidatePair, DemandUnit, NetworkDistance, ScoreSummary,
    SupplySite,
};
use serde::Serialize;
use serde_json::Value;

/// Errors from writing outputs.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// CSV serialization or write error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Destination path.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// JSON serialization error.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// Destination path.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// I/O error writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[derive(Serialize)]
struct ScoreRow {
    demand_id: usize,
    score: f64,
    mean_distance: f64,
    mean_area: f64,
    mean_supply: f64,
    park_count: usize,
    /// Index of the population feature the unit came from.
    feature_index: Option<usize>,
}

#[derive(Serialize)]
struct PairRow {
    demand_id: usize,
    access_point_id: usize,
    park_id: usize,
    population: f64,
    park_area: f64,
    distance: Option<f64>,
    reachable: bool,
}

fn write_csv<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), OutputError> {
    let csv_error = |source| OutputError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn write_text(path: &Path, contents: &str) -> Result<(), OutputError> {
    std::fs::write(path, contents).map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Writes one row per scored demand unit.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_scores(
    path: &Path,
    scores: &[AccessibilityScore],
    demand: &[DemandUnit],
) -> Result<(), OutputError> {
    write_csv(
        path,
        scores.iter().map(|score| ScoreRow {
            demand_id: score.demand_id,
            score: score.score,
            mean_distance: score.mean_distance,
            mean_area: score.mean_area,
            mean_supply: score.mean_supply,
            park_count: score.park_count,
            feature_index: demand.get(score.demand_id).map(|unit| unit.source_index),
        }),
    )?;
    log::info!("Wrote {} scores to {}", scores.len(), path.display());
    Ok(())
}

/// Writes every candidate pair with its routed distance.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_pairs(path: &Path, pairs: &[CandidatePair]) -> Result<(), OutputError> {
    write_csv(
        path,
        pairs.iter().map(|pair| PairRow {
            demand_id: pair.demand_id,
            access_point_id: pair.access_point_id,
            park_id: pair.park_id,
            population: pair.population,
            park_area: pair.park_area,
            distance: pair.distance.and_then(NetworkDistance::meters),
            reachable: pair.distance.is_some_and(NetworkDistance::is_reachable),
        }),
    )?;
    log::info!("Wrote {} candidate pairs to {}", pairs.len(), path.display());
    Ok(())
}

/// Writes the score summary as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_summary(path: &Path, summary: &ScoreSummary) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(summary).map_err(|source| OutputError::Json {
        path: path.display().to_string(),
        source,
    })?;
    write_text(path, &json)
}

fn feature(geometry: Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes merged supply sites as a `GeoJSON` `FeatureCollection`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_sites(path: &Path, sites: &[SupplySite]) -> Result<(), OutputError> {
    let features = sites
        .iter()
        .map(|site| {
            let mut properties = JsonObject::new();
            properties.insert("park_id".to_string(), Value::from(site.id));
            properties.insert("area".to_string(), Value::from(site.area));
            feature(Geometry::new(geojson::Value::from(&site.geometry)), properties)
        })
        .collect();
    write_text(path, &collection(features).to_string())?;
    log::info!("Wrote {} supply sites to {}", sites.len(), path.display());
    Ok(())
}

/// Writes each demand unit's catchment buffer as a `GeoJSON`
/// `FeatureCollection`, for checking the pair pre-filter on a map.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_catchments(path: &Path, units: &[DemandUnit]) -> Result<(), OutputError> {
    let features = units
        .iter()
        .map(|unit| {
            let mut properties = JsonObject::new();
            properties.insert("demand_id".to_string(), Value::from(unit.id));
            properties.insert("feature_index".to_string(), Value::from(unit.source_index));
            properties.insert("population".to_string(), Value::from(unit.population));
            feature(Geometry::new(geojson::Value::from(&unit.catchment)), properties)
        })
        .collect();
    write_text(path, &collection(features).to_string())?;
    log::info!("Wrote {} catchments to {}", units.len(), path.display());
    Ok(())
}

/// Writes access points as a `GeoJSON` `FeatureCollection`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_access_points(path: &Path, points: &[AccessPoint]) -> Result<(), OutputError> {
    let features = points
        .iter()
        .map(|point| {
            let mut properties = JsonObject::new();
            properties.insert("access_point_id".to_string(), Value::from(point.id));
            properties.insert("park_id".to_string(), Value::from(point.park_id));
            properties.insert("park_area".to_string(), Value::from(point.park_area));
            properties.insert(
                "kind".to_string(),
                serde_json::to_value(point.kind).unwrap_or(Value::Null),
            );
            feature(Geometry::new(geojson::Value::from(&point.geometry)), properties)
        })
        .collect();
    write_text(path, &collection(features).to_string())?;
    log::info!("Wrote {} access points to {}", points.len(), path.display());
    Ok(())
}
