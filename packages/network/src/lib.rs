#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road network routing graph.
//!
//! Holds a projected road network as a directed `petgraph` graph weighted
//! by edge length, an R-tree over node coordinates for nearest-node
//! resolution, and an R-tree over the road line-work for finding where a
//! polygon boundary crosses the roads. The network is built once and then
//! only read, so a single instance can be shared across routing threads.

pub mod crossings;

use std::collections::HashMap;

use geo::{Coord, LineString, Point};
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use rstar::RTree;
use rstar::primitives::{GeomWithData, Line};
use thiserror::Error;

/// Errors raised while building a [`RoadNetwork`].
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The network has no nodes.
    #[error("Road network is empty")]
    Empty,

    /// An edge references a node id that was never declared.
    #[error("Edge references unknown node {id}")]
    UnknownNode {
        /// The missing node id.
        id: u64,
    },

    /// Two nodes share an id.
    #[error("Duplicate node id {id}")]
    DuplicateNode {
        /// The repeated id.
        id: u64,
    },

    /// An edge length is negative or not a number.
    #[error("Edge {from} -> {to} has invalid length {length}")]
    InvalidLength {
        /// Edge source id.
        from: u64,
        /// Edge target id.
        to: u64,
        /// The rejected length.
        length: f64,
    },
}

/// A road network node with its projected position.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadNode {
    /// Caller-assigned node id.
    pub id: u64,
    /// Planar position.
    pub point: Point<f64>,
}

/// A road segment between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadEdge {
    /// Source node id.
    pub from: u64,
    /// Target node id.
    pub to: u64,
    /// Routing weight.
    pub length: f64,
    /// Line-work for boundary crossings; a straight segment between the two
    /// nodes when absent.
    pub geometry: Option<LineString<f64>>,
    /// Only routable from `from` to `to`.
    pub oneway: bool,
}

/// A line-work input for [`RoadNetwork::from_linestrings`].
#[derive(Debug, Clone, PartialEq)]
pub struct RoadLine {
    /// Road geometry; its endpoints and any vertex shared with other lines
    /// become nodes.
    pub geometry: LineString<f64>,
    /// Routing weight; the planar length of `geometry` when absent.
    pub length: Option<f64>,
    /// Only routable in digitized direction.
    pub oneway: bool,
}

/// Read-only routing graph.
pub struct RoadNetwork {
    graph: DiGraph<RoadNode, f64>,
    nodes: RTree<GeomWithData<[f64; 2], NodeIndex>>,
    segments: RTree<GeomWithData<Line<[f64; 2]>, usize>>,
}

impl RoadNetwork {
    /// Builds the network from explicit nodes and edges.
    ///
    /// Two-way edges are inserted in both directions.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Empty`] when there are no nodes, and an error
    /// for duplicate node ids, dangling edges or invalid lengths.
    pub fn new(nodes: Vec<RoadNode>, edges: Vec<RoadEdge>) -> Result<Self, NetworkError> {
        if nodes.is_empty() {
            return Err(NetworkError::Empty);
        }

        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len() * 2);
        let mut by_id: HashMap<u64, NodeIndex> = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let id = node.id;
            let index = graph.add_node(node);
            if by_id.insert(id, index).is_some() {
                return Err(NetworkError::DuplicateNode { id });
            }
        }

        let mut segments = Vec::new();

        for (edge_index, edge) in edges.into_iter().enumerate() {
            let from = *by_id
                .get(&edge.from)
                .ok_or(NetworkError::UnknownNode { id: edge.from })?;
            let to = *by_id
                .get(&edge.to)
                .ok_or(NetworkError::UnknownNode { id: edge.to })?;

            if !edge.length.is_finite() || edge.length < 0.0 {
                return Err(NetworkError::InvalidLength {
                    from: edge.from,
                    to: edge.to,
                    length: edge.length,
                });
            }

            graph.add_edge(from, to, edge.length);
            if !edge.oneway {
                graph.add_edge(to, from, edge.length);
            }

            let line = edge.geometry.unwrap_or_else(|| {
                LineString::from(vec![graph[from].point.0, graph[to].point.0])
            });
            for segment in line.lines() {
                segments.push(GeomWithData::new(
                    Line::new(
                        [segment.start.x, segment.start.y],
                        [segment.end.x, segment.end.y],
                    ),
                    edge_index,
                ));
            }
        }

        let node_entries = graph
            .node_indices()
            .map(|index| {
                let point = graph[index].point;
                GeomWithData::new([point.x(), point.y()], index)
            })
            .collect();

        log::info!(
            "Built road network: {} nodes, {} directed edges, {} line segments",
            graph.node_count(),
            graph.edge_count(),
            segments.len()
        );

        Ok(Self {
            graph,
            nodes: RTree::bulk_load(node_entries),
            segments: RTree::bulk_load(segments),
        })
    }

    /// Builds the network from road line-work.
    ///
    /// Line endpoints become nodes, and so does every interior vertex that
    /// another line (or the same line elsewhere) also passes through, so
    /// ways that cross at a shared vertex are connected there. Lines are
    /// split at those nodes. A stated length is shared among the pieces in
    /// proportion to their planar length.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Empty`] when no line has at least two
    /// distinct coordinates, or [`NetworkError::InvalidLength`] for a bad
    /// length.
    pub fn from_linestrings(lines: Vec<RoadLine>) -> Result<Self, NetworkError> {
        let lines: Vec<RoadLine> = lines
            .into_iter()
            .filter_map(|mut line| {
                line.geometry.0.dedup();
                (line.geometry.0.len() >= 2).then_some(line)
            })
            .collect();

        let mut uses: HashMap<(u64, u64), usize> = HashMap::new();
        for coord in lines.iter().flat_map(|line| line.geometry.0.iter()) {
            *uses.entry(coord_key(*coord)).or_default() += 1;
        }

        let mut ids: HashMap<(u64, u64), u64> = HashMap::new();
        let mut nodes = Vec::new();
        let mut edges = Vec::with_capacity(lines.len());

        let mut node_id = |coord: Coord<f64>, nodes: &mut Vec<RoadNode>| -> u64 {
            *ids.entry(coord_key(coord)).or_insert_with(|| {
                let id = nodes.len() as u64;
                nodes.push(RoadNode {
                    id,
                    point: Point::from(coord),
                });
                id
            })
        };

        let mut split = 0_usize;
        for line in lines {
            let pieces = split_at_junctions(&line.geometry, &uses);
            if pieces.len() > 1 {
                split += 1;
            }
            let total = planar_length(&line.geometry);

            for piece in pieces {
                let planar = planar_length(&piece);
                let length = match line.length {
                    Some(stated) if total > 0.0 => stated * planar / total,
                    Some(stated) => stated,
                    None => planar,
                };
                let from = node_id(piece.0[0], &mut nodes);
                let to = node_id(piece.0[piece.0.len() - 1], &mut nodes);
                edges.push(RoadEdge {
                    from,
                    to,
                    length,
                    geometry: Some(piece),
                    oneway: line.oneway,
                });
            }
        }

        if split > 0 {
            log::debug!("Split {split} road lines at shared interior vertices");
        }

        Self::new(nodes, edges)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The node stored at `index`.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &RoadNode {
        &self.graph[index]
    }

    /// The node closest to `point` by planar distance.
    #[must_use]
    pub fn nearest_node(&self, point: Point<f64>) -> Option<NodeIndex> {
        self.nodes
            .nearest_neighbor(&[point.x(), point.y()])
            .map(|entry| entry.data)
    }

    /// Length of the shortest path from `from` to `to`, or `None` when the
    /// target cannot be reached.
    #[must_use]
    pub fn shortest_path_length(&self, from: NodeIndex, to: NodeIndex) -> Option<f64> {
        if from == to {
            return Some(0.0);
        }
        dijkstra(&self.graph, from, Some(to), |edge| *edge.weight())
            .get(&to)
            .copied()
    }

    /// Shortest path lengths from `from` to each of `targets`, in order.
    ///
    /// Runs a single search from `from` and reads every target off the
    /// resulting distance map.
    #[must_use]
    pub fn shortest_path_lengths(&self, from: NodeIndex, targets: &[NodeIndex]) -> Vec<Option<f64>> {
        let costs = dijkstra(&self.graph, from, None, |edge| *edge.weight());
        targets
            .iter()
            .map(|target| costs.get(target).copied())
            .collect()
    }
}

fn coord_key(coord: Coord<f64>) -> (u64, u64) {
    (coord.x.to_bits(), coord.y.to_bits())
}

/// Cuts `line` at every interior vertex used more than once across the
/// input. Endpoints always bound a piece.
fn split_at_junctions(
    line: &LineString<f64>,
    uses: &HashMap<(u64, u64), usize>,
) -> Vec<LineString<f64>> {
    let coords = &line.0;
    let last = coords.len() - 1;
    let mut pieces = Vec::new();
    let mut start = 0;

    for i in 1..=last {
        let junction = uses.get(&coord_key(coords[i])).is_some_and(|&n| n > 1);
        if i == last || junction {
            pieces.push(LineString::from(coords[start..=i].to_vec()));
            start = i;
        }
    }

    pieces
}

/// Sum of segment lengths.
fn planar_length(line: &LineString<f64>) -> f64 {
    line.lines().map(|segment| segment.dx().hypot(segment.dy())).sum()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Builds a network from `(id, x, y)` nodes and `(from, to, length)`
    /// two-way edges.
    pub fn network(nodes: &[(u64, f64, f64)], edges: &[(u64, u64, f64)]) -> RoadNetwork {
        RoadNetwork::new(
            nodes
                .iter()
                .map(|(id, x, y)| RoadNode {
                    id: *id,
                    point: Point::new(*x, *y),
                })
                .collect(),
            edges
                .iter()
                .map(|(from, to, length)| RoadEdge {
                    from: *from,
                    to: *to,
                    length: *length,
                    geometry: None,
                    oneway: false,
                })
                .collect(),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::network;
    use super::*;

    #[test]
    fn rejects_empty_network() {
        assert!(matches!(
            RoadNetwork::new(Vec::new(), Vec::new()),
            Err(NetworkError::Empty)
        ));
    }

    #[test]
    fn rejects_dangling_edge() {
        let result = RoadNetwork::new(
            vec![RoadNode {
                id: 1,
                point: Point::new(0.0, 0.0),
            }],
            vec![RoadEdge {
                from: 1,
                to: 2,
                length: 10.0,
                geometry: None,
                oneway: false,
            }],
        );
        assert!(matches!(result, Err(NetworkError::UnknownNode { id: 2 })));
    }

    #[test]
    fn resolves_nearest_node() {
        let net = network(&[(1, 0.0, 0.0), (2, 100.0, 0.0)], &[(1, 2, 100.0)]);
        let near = net.nearest_node(Point::new(80.0, 5.0)).unwrap();
        assert_eq!(net.node(near).id, 2);
    }

    #[test]
    fn routes_along_shortest_edges() {
        let net = network(
            &[(1, 0.0, 0.0), (2, 100.0, 0.0), (3, 200.0, 0.0)],
            &[(1, 2, 100.0), (2, 3, 100.0), (1, 3, 500.0)],
        );
        let a = net.nearest_node(Point::new(0.0, 0.0)).unwrap();
        let c = net.nearest_node(Point::new(200.0, 0.0)).unwrap();
        assert_eq!(net.shortest_path_length(a, c), Some(200.0));
        assert_eq!(net.shortest_path_length(c, a), Some(200.0));
        assert_eq!(net.shortest_path_length(a, a), Some(0.0));
    }

    #[test]
    fn disconnected_nodes_are_unreachable() {
        let net = network(
            &[(1, 0.0, 0.0), (2, 100.0, 0.0), (3, 5000.0, 0.0)],
            &[(1, 2, 100.0)],
        );
        let a = net.nearest_node(Point::new(0.0, 0.0)).unwrap();
        let b = net.nearest_node(Point::new(100.0, 0.0)).unwrap();
        let far = net.nearest_node(Point::new(5000.0, 0.0)).unwrap();
        assert_eq!(net.shortest_path_length(a, far), None);
        assert_eq!(
            net.shortest_path_lengths(a, &[b, far, a]),
            vec![Some(100.0), None, Some(0.0)]
        );
    }

    #[test]
    fn oneway_edges_route_in_one_direction() {
        let net = RoadNetwork::from_linestrings(vec![RoadLine {
            geometry: LineString::from(vec![(0.0, 0.0), (30.0, 40.0)]),
            length: None,
            oneway: true,
        }])
        .unwrap();
        let a = net.nearest_node(Point::new(0.0, 0.0)).unwrap();
        let b = net.nearest_node(Point::new(30.0, 40.0)).unwrap();
        assert_eq!(net.shortest_path_length(a, b), Some(50.0));
        assert_eq!(net.shortest_path_length(b, a), None);
    }

    #[test]
    fn linestrings_share_endpoint_nodes() {
        let net = RoadNetwork::from_linestrings(vec![
            RoadLine {
                geometry: LineString::from(vec![(0.0, 0.0), (100.0, 0.0)]),
                length: None,
                oneway: false,
            },
            RoadLine {
                geometry: LineString::from(vec![(100.0, 0.0), (100.0, 100.0)]),
                length: Some(120.0),
                oneway: false,
            },
        ])
        .unwrap();
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.edge_count(), 4);
        let a = net.nearest_node(Point::new(0.0, 0.0)).unwrap();
        let c = net.nearest_node(Point::new(100.0, 100.0)).unwrap();
        assert_eq!(net.shortest_path_length(a, c), Some(220.0));
    }

    #[test]
    fn lines_crossing_at_shared_vertex_are_connected() {
        let net = RoadNetwork::from_linestrings(vec![
            RoadLine {
                geometry: LineString::from(vec![(0.0, 50.0), (50.0, 50.0), (100.0, 50.0)]),
                length: None,
                oneway: false,
            },
            RoadLine {
                geometry: LineString::from(vec![(50.0, 0.0), (50.0, 50.0), (50.0, 100.0)]),
                length: None,
                oneway: false,
            },
        ])
        .unwrap();
        assert_eq!(net.node_count(), 5);
        assert_eq!(net.edge_count(), 8);
        let west = net.nearest_node(Point::new(0.0, 50.0)).unwrap();
        let north = net.nearest_node(Point::new(50.0, 100.0)).unwrap();
        assert_eq!(net.shortest_path_length(west, north), Some(100.0));
        let junction = net.nearest_node(Point::new(48.0, 52.0)).unwrap();
        assert_eq!(net.node(junction).point, Point::new(50.0, 50.0));
    }

    #[test]
    fn unshared_interior_vertices_stay_inside_edges() {
        let net = RoadNetwork::from_linestrings(vec![RoadLine {
            geometry: LineString::from(vec![(0.0, 0.0), (30.0, 40.0), (30.0, 140.0)]),
            length: None,
            oneway: false,
        }])
        .unwrap();
        assert_eq!(net.node_count(), 2);
        let a = net.nearest_node(Point::new(0.0, 0.0)).unwrap();
        let b = net.nearest_node(Point::new(30.0, 140.0)).unwrap();
        assert_eq!(net.shortest_path_length(a, b), Some(150.0));
    }

    #[test]
    fn stated_length_is_shared_between_split_pieces() {
        let net = RoadNetwork::from_linestrings(vec![
            RoadLine {
                geometry: LineString::from(vec![(0.0, 0.0), (100.0, 0.0), (400.0, 0.0)]),
                length: Some(800.0),
                oneway: false,
            },
            RoadLine {
                geometry: LineString::from(vec![(100.0, 0.0), (100.0, 50.0)]),
                length: None,
                oneway: false,
            },
        ])
        .unwrap();
        let start = net.nearest_node(Point::new(0.0, 0.0)).unwrap();
        let junction = net.nearest_node(Point::new(100.0, 0.0)).unwrap();
        let end = net.nearest_node(Point::new(400.0, 0.0)).unwrap();
        assert_eq!(net.shortest_path_length(start, junction), Some(200.0));
        assert_eq!(net.shortest_path_length(start, end), Some(800.0));
    }
}
