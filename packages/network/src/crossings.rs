//! Points where polygon boundaries cross the road line-work.

use std::collections::HashSet;

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, LineString, MultiPolygon, Point, coord};
use rstar::AABB;

use crate::RoadNetwork;

impl RoadNetwork {
    /// Crossing points of every ring of `area` (exteriors first, then
    /// holes) with the road line-work.
    ///
    /// Points are returned in ring order, and along each ring segment in
    /// order of distance from the segment start. Exact duplicates (a
    /// crossing at a shared vertex) are reported once. An empty result means
    /// the boundary never meets a road.
    #[must_use]
    pub fn boundary_crossings(&self, area: &MultiPolygon<f64>) -> Vec<Point<f64>> {
        let mut seen = HashSet::new();
        let mut points = Vec::new();

        for polygon in area {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                for crossing in self.ring_crossings(ring) {
                    if seen.insert((crossing.x.to_bits(), crossing.y.to_bits())) {
                        points.push(Point::from(crossing));
                    }
                }
            }
        }

        points
    }

    /// Crossing coordinates of a single ring, unsorted across segments.
    fn ring_crossings(&self, ring: &LineString<f64>) -> Vec<Coord<f64>> {
        let mut crossings = Vec::new();

        for ring_segment in ring.lines() {
            let envelope = AABB::from_corners(
                [
                    ring_segment.start.x.min(ring_segment.end.x),
                    ring_segment.start.y.min(ring_segment.end.y),
                ],
                [
                    ring_segment.start.x.max(ring_segment.end.x),
                    ring_segment.start.y.max(ring_segment.end.y),
                ],
            );

            let mut hits: Vec<Coord<f64>> = Vec::new();
            for entry in self.segments.locate_in_envelope_intersecting(&envelope) {
                let road = entry.geom();
                let road_segment = geo::Line::new(
                    coord! { x: road.from[0], y: road.from[1] },
                    coord! { x: road.to[0], y: road.to[1] },
                );
                match line_intersection(ring_segment, road_segment) {
                    Some(LineIntersection::SinglePoint { intersection, .. }) => {
                        hits.push(intersection);
                    }
                    Some(LineIntersection::Collinear { intersection }) => {
                        // A road running along the boundary counts once, at
                        // the middle of the shared stretch.
                        hits.push(coord! {
                            x: (intersection.start.x + intersection.end.x) / 2.0,
                            y: (intersection.start.y + intersection.end.y) / 2.0,
                        });
                    }
                    None => {}
                }
            }

            let start = ring_segment.start;
            hits.sort_by(|a, b| {
                squared_distance(start, *a).total_cmp(&squared_distance(start, *b))
            });
            crossings.extend(hits);
        }

        crossings
    }
}

fn squared_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx.mul_add(dx, dy * dy)
}

#[cfg(test)]
mod tests {
    use geo::{Polygon, Rect};

    use crate::test_support::network;

    use super::*;

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![
            Rect::new(coord! { x: min, y: min }, coord! { x: max, y: max }).to_polygon(),
        ])
    }

    #[test]
    fn road_through_square_crosses_twice() {
        let net = network(&[(1, -50.0, 50.0), (2, 150.0, 50.0)], &[(1, 2, 200.0)]);
        let crossings = net.boundary_crossings(&square(0.0, 100.0));
        assert_eq!(crossings.len(), 2);
        let mut xs: Vec<f64> = crossings.iter().map(|p| p.x()).collect();
        xs.sort_by(f64::total_cmp);
        assert!((xs[0] - 0.0).abs() < 1e-9);
        assert!((xs[1] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn enclosed_site_has_no_crossings() {
        let net = network(&[(1, 500.0, 500.0), (2, 600.0, 500.0)], &[(1, 2, 100.0)]);
        assert!(net.boundary_crossings(&square(0.0, 100.0)).is_empty());
    }

    #[test]
    fn crossing_at_vertex_is_reported_once() {
        let net = network(&[(1, -50.0, -50.0), (2, 50.0, 50.0)], &[(1, 2, 141.0)]);
        let triangle = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (100.0, 0.0), (0.0, 100.0), (0.0, 0.0)]),
            vec![],
        )]);
        let crossings = net.boundary_crossings(&triangle);
        assert_eq!(crossings.len(), 2);
        assert_eq!(crossings[0], Point::new(0.0, 0.0));
    }

    #[test]
    fn holes_are_crossed_after_exterior() {
        let net = network(&[(1, -10.0, 50.0), (2, 110.0, 50.0)], &[(1, 2, 120.0)]);
        let ring = Polygon::new(
            square(0.0, 100.0).0[0].exterior().clone(),
            vec![square(40.0, 60.0).0[0].exterior().clone()],
        );
        let crossings = net.boundary_crossings(&MultiPolygon(vec![ring]));
        assert_eq!(crossings.len(), 4);
    }
}
