#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial indexes for the accessibility pipeline.
//!
//! Builds R-tree indexes over planar shapes and answers the two proximity
//! questions the pipeline asks repeatedly: "which shapes lie within a gap
//! of each other" (connected components for merging parks and collapsing
//! duplicate gates) and "which points fall near this polygon" (the
//! catchment pre-filter).

use std::collections::BTreeMap;

use geo::{BoundingRect, Distance, Euclidean, MultiPolygon, Point, Polygon};
use geojson::GeoJson;
use petgraph::unionfind::UnionFind;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree, RTreeObject};

/// A shape that can take part in a proximity relation.
pub trait ProximityShape {
    /// Axis-aligned bounding box of the shape.
    fn envelope(&self) -> AABB<[f64; 2]>;

    /// Planar distance to `other`; zero when they touch or overlap.
    fn gap(&self, other: &Self) -> f64;
}

impl ProximityShape for Polygon<f64> {
    fn envelope(&self) -> AABB<[f64; 2]> {
        rect_envelope(self.bounding_rect())
    }

    fn gap(&self, other: &Self) -> f64 {
        Euclidean.distance(self, other)
    }
}

impl ProximityShape for Point<f64> {
    fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_point([self.x(), self.y()])
    }

    fn gap(&self, other: &Self) -> f64 {
        Euclidean.distance(*self, *other)
    }
}

/// A shape's envelope stored in the R-tree along with its input position.
struct ShapeEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ShapeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Labels every shape with a connected-component id under the relation
/// "gap between the two shapes is at most `max_gap`".
///
/// Two shapes each buffered by `r` intersect exactly when their gap is at
/// most `2r`, so buffering-then-intersecting is expressed here as a single
/// distance test. Candidate neighbours come from an R-tree query with the
/// envelope grown by `max_gap`; components are joined with a union-find.
///
/// Labels are dense (`0..k`) and assigned in order of each component's
/// first member, so the first shape always gets label `0`.
#[must_use]
pub fn proximity_components<S: ProximityShape>(shapes: &[S], max_gap: f64) -> Vec<usize> {
    let entries: Vec<ShapeEntry> = shapes
        .iter()
        .enumerate()
        .map(|(index, shape)| ShapeEntry {
            index,
            envelope: shape.envelope(),
        })
        .collect();
    let tree = RTree::bulk_load(entries);

    let mut union_find = UnionFind::<usize>::new(shapes.len());
    let mut joined = 0_usize;

    for (i, shape) in shapes.iter().enumerate() {
        let query = expand_envelope(&shape.envelope(), max_gap);
        for entry in tree.locate_in_envelope_intersecting(&query) {
            let j = entry.index;
            if j <= i {
                continue;
            }
            if shape.gap(&shapes[j]) <= max_gap && union_find.union(i, j) {
                joined += 1;
            }
        }
    }

    log::debug!(
        "Proximity components: {} shapes, {} joins, gap <= {max_gap}",
        shapes.len(),
        joined
    );

    let mut labels_by_root: BTreeMap<usize, usize> = BTreeMap::new();
    (0..shapes.len())
        .map(|i| {
            let root = union_find.find_mut(i);
            let next = labels_by_root.len();
            *labels_by_root.entry(root).or_insert(next)
        })
        .collect()
}

/// Groups input positions by component label, preserving input order
/// inside each group.
#[must_use]
pub fn group_by_label(labels: &[usize]) -> Vec<Vec<usize>> {
    let count = labels.iter().max().map_or(0, |max| max + 1);
    let mut groups = vec![Vec::new(); count];
    for (index, label) in labels.iter().enumerate() {
        groups[*label].push(index);
    }
    groups
}

/// R-tree over identified points.
pub struct PointIndex {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl PointIndex {
    /// Bulk-loads `(id, point)` pairs.
    #[must_use]
    pub fn new(points: impl IntoIterator<Item = (usize, Point<f64>)>) -> Self {
        let entries: Vec<GeomWithData<[f64; 2], usize>> = points
            .into_iter()
            .map(|(id, point)| GeomWithData::new([point.x(), point.y()], id))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Ids of the points inside `envelope` grown by `margin` on every side.
    ///
    /// This is a coarse filter; callers apply the exact predicate.
    #[must_use]
    pub fn candidates_near(&self, envelope: &AABB<[f64; 2]>, margin: f64) -> Vec<usize> {
        let query = expand_envelope(envelope, margin);
        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope(&query)
            .map(|entry| entry.data)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Grows an envelope by `margin` on every side.
#[must_use]
pub fn expand_envelope(envelope: &AABB<[f64; 2]>, margin: f64) -> AABB<[f64; 2]> {
    let lower = envelope.lower();
    let upper = envelope.upper();
    AABB::from_corners(
        [lower[0] - margin, lower[1] - margin],
        [upper[0] + margin, upper[1] + margin],
    )
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
#[must_use]
pub fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    rect_envelope(mp.bounding_rect())
}

fn rect_envelope(rect: Option<geo::Rect<f64>>) -> AABB<[f64; 2]> {
    rect.map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

/// Parse a `GeoJSON` string into a [`MultiPolygon`].
/// Handles `Geometry` and `Feature` objects with `Polygon` or `MultiPolygon`
/// geometry.
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    let geometry = match geojson {
        GeoJson::Geometry(geom) => geom,
        GeoJson::Feature(feature) => feature.geometry?,
        GeoJson::FeatureCollection(_) => return None,
    };
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    to_multipolygon(geo_geom)
}

/// Narrows a [`geo::Geometry`] to a [`MultiPolygon`].
#[must_use]
pub fn to_multipolygon(geometry: geo::Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        geo::Geometry::Rect(r) => Some(MultiPolygon(vec![r.to_polygon()])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use geo::{Rect, coord};

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size }).to_polygon()
    }

    #[test]
    fn joins_polygons_within_gap() {
        let shapes = vec![square(0.0, 0.0, 30.0), square(45.0, 0.0, 30.0)];
        assert_eq!(proximity_components(&shapes, 40.0), vec![0, 0]);
    }

    #[test]
    fn separates_polygons_beyond_gap() {
        let shapes = vec![square(0.0, 0.0, 30.0), square(75.0, 0.0, 30.0)];
        assert_eq!(proximity_components(&shapes, 40.0), vec![0, 1]);
    }

    #[test]
    fn chains_are_transitive() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(500.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(80.0, 0.0),
        ];
        let labels = proximity_components(&points, 50.0);
        assert_eq!(labels, vec![0, 1, 0, 0]);
        assert_eq!(group_by_label(&labels), vec![vec![0, 2, 3], vec![1]]);
    }

    #[test]
    fn empty_input_has_no_components() {
        let shapes: Vec<Point<f64>> = Vec::new();
        assert!(proximity_components(&shapes, 10.0).is_empty());
        assert!(group_by_label(&[]).is_empty());
    }

    #[test]
    fn point_index_filters_by_envelope() {
        let index = PointIndex::new(vec![
            (0, Point::new(0.0, 0.0)),
            (1, Point::new(100.0, 100.0)),
            (2, Point::new(1000.0, 0.0)),
        ]);
        assert_eq!(index.len(), 3);
        let envelope = AABB::from_corners([-10.0, -10.0], [10.0, 10.0]);
        assert_eq!(index.candidates_near(&envelope, 95.0), vec![0, 1]);
        assert_eq!(index.candidates_near(&envelope, 0.0), vec![0]);
    }

    #[test]
    fn parses_polygon_feature() {
        let json = r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}"#;
        let mp = parse_geojson_to_multipolygon(json).unwrap();
        assert_eq!(mp.0.len(), 1);
        let envelope = compute_envelope(&mp);
        assert_eq!(envelope.upper(), [1.0, 1.0]);
    }

    #[test]
    fn rejects_point_geometry() {
        let json = r#"{"type":"Point","coordinates":[0,0]}"#;
        assert!(parse_geojson_to_multipolygon(json).is_none());
    }
}
