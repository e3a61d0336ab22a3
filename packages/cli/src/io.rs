//! `GeoJSON` input loading.
//!
//! Every input is a `FeatureCollection` in the projected, metric coordinate
//! system the analysis runs in. Features whose geometry does not fit the
//! expected type are skipped with a warning rather than failing the run.

use std::path::Path;

use geo::{BooleanOps, LineString, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use green_access_accessibility::PopulationCell;
use green_access_network::RoadLine;
use green_access_spatial::{parse_geojson_to_multipolygon, to_multipolygon};
use serde_json::Value;

/// Errors from reading `GeoJSON` inputs.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// I/O error reading an input file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid `GeoJSON`.
    #[error("GeoJSON error in {path}: {source}")]
    GeoJson {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        source: Box<geojson::Error>,
    },

    /// A collection was required but the file holds a single object.
    #[error("Expected a FeatureCollection in {0}")]
    NotFeatureCollection(String),

    /// The boundary file holds no polygon.
    #[error("No boundary polygon in {0}")]
    NoBoundary(String),
}

fn read_geojson(path: &Path) -> Result<GeoJson, InputError> {
    let text = std::fs::read_to_string(path).map_err(|e| InputError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    text.parse::<GeoJson>().map_err(|e| InputError::GeoJson {
        path: path.display().to_string(),
        source: Box::new(e),
    })
}

fn read_collection(path: &Path) -> Result<FeatureCollection, InputError> {
    match read_geojson(path)? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(InputError::NotFeatureCollection(path.display().to_string())),
    }
}

fn feature_geometry(feature: Feature) -> Option<geo::Geometry<f64>> {
    feature.geometry.and_then(|geometry| geometry.try_into().ok())
}

fn feature_polygons(feature: Feature) -> Option<MultiPolygon<f64>> {
    feature_geometry(feature).and_then(to_multipolygon)
}

/// Reads population cells, taking the resident count from `property`.
///
/// A missing, non-numeric or negative count reads as zero, which the
/// demand preprocessor then drops.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a
/// `FeatureCollection`.
pub fn load_population(path: &Path, property: &str) -> Result<Vec<PopulationCell>, InputError> {
    let collection = read_collection(path)?;
    let total = collection.features.len();
    let mut missing = 0_usize;

    let cells: Vec<PopulationCell> = collection
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(source_index, feature)| {
            let population = feature.property(property).and_then(Value::as_f64);
            if population.is_none() {
                missing += 1;
            }
            let geometry = feature_polygons(feature)?;
            Some(PopulationCell {
                source_index,
                geometry,
                population: population.unwrap_or(0.0).max(0.0),
            })
        })
        .collect();

    if missing > 0 {
        log::warn!("{missing} population features lack a numeric '{property}' property");
    }
    log::info!(
        "Loaded {} population cells from {} ({} features)",
        cells.len(),
        path.display(),
        total
    );

    Ok(cells)
}

/// Reads polygon features (green parcels).
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a
/// `FeatureCollection`.
pub fn load_polygons(path: &Path) -> Result<Vec<MultiPolygon<f64>>, InputError> {
    let collection = read_collection(path)?;
    let total = collection.features.len();
    let polygons: Vec<MultiPolygon<f64>> = collection
        .features
        .into_iter()
        .filter_map(feature_polygons)
        .collect();

    if polygons.len() < total {
        log::warn!(
            "Skipped {} non-polygon features in {}",
            total - polygons.len(),
            path.display()
        );
    }
    log::info!("Loaded {} polygons from {}", polygons.len(), path.display());

    Ok(polygons)
}

/// Reads the administrative boundary.
///
/// Accepts a bare geometry, a single feature, or a collection whose
/// polygons are unioned into one boundary.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no polygon.
pub fn load_boundary(path: &Path) -> Result<MultiPolygon<f64>, InputError> {
    let boundary = match read_geojson(path)? {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .filter_map(feature_polygons)
            .fold(MultiPolygon::new(Vec::new()), |acc, polygon| acc.union(&polygon)),
        single => parse_geojson_to_multipolygon(&single.to_string())
            .unwrap_or_else(|| MultiPolygon::new(Vec::new())),
    };

    if boundary.0.is_empty() {
        return Err(InputError::NoBoundary(path.display().to_string()));
    }
    Ok(boundary)
}

/// Reads road line-work.
///
/// `LineString` features become one road each and every part of a
/// `MultiLineString` becomes its own road. An optional numeric `length`
/// property overrides the planar length, and a truthy `oneway` property
/// (`true`, `"yes"`, `"true"`, `"1"` or `1`) restricts travel to the
/// digitized direction.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a
/// `FeatureCollection`.
pub fn load_roads(path: &Path) -> Result<Vec<RoadLine>, InputError> {
    let collection = read_collection(path)?;
    let mut roads = Vec::with_capacity(collection.features.len());
    let mut skipped = 0_usize;

    for feature in collection.features {
        let length = feature.property("length").and_then(Value::as_f64);
        let oneway = feature.property("oneway").is_some_and(is_truthy);

        let lines: Vec<LineString<f64>> = match feature_geometry(feature) {
            Some(geo::Geometry::LineString(line)) => vec![line],
            Some(geo::Geometry::MultiLineString(lines)) => lines.0,
            _ => {
                skipped += 1;
                continue;
            }
        };

        // A stated length belongs to the whole feature, not to each part.
        let length = if lines.len() == 1 { length } else { None };
        roads.extend(lines.into_iter().map(|geometry| RoadLine {
            geometry,
            length,
            oneway,
        }));
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} non-line road features in {}", path.display());
    }
    log::info!("Loaded {} road lines from {}", roads.len(), path.display());

    Ok(roads)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "yes" | "true" | "1"),
        _ => false,
    }
}
