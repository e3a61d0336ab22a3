//! Network distance solver.
//!
//! Demand centroids and access points are snapped to their nearest road
//! node once per distinct geometry. Pairs are then grouped by origin node
//! so that every origin needs a single shortest-path search regardless of
//! how many access points it is paired with. Searches for different origins
//! are independent and run on the `rayon` pool against the shared,
//! read-only [`RoadNetwork`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use green_access_accessibility_models::{
    AccessPoint, AccessPointId, CandidatePair, DemandId, DemandUnit, NetworkDistance,
};
use green_access_network::RoadNetwork;
use petgraph::graph::NodeIndex;
use rayon::prelude::*;

use crate::progress::ProgressCallback;

/// Shortest-path lengths for candidate pairs over an injected road network.
pub struct NetworkDistanceSolver<'a> {
    network: &'a RoadNetwork,
}

impl<'a> NetworkDistanceSolver<'a> {
    #[must_use]
    pub const fn new(network: &'a RoadNetwork) -> Self {
        Self { network }
    }

    /// Fills in [`CandidatePair::distance`] for every pair.
    ///
    /// Pairs keep their order. A pair whose endpoints cannot be resolved or
    /// connected is marked [`NetworkDistance::Unreachable`]; it is never
    /// dropped and never given a zero distance. `progress` advances once per
    /// distinct origin node.
    #[must_use]
    pub fn solve(
        &self,
        pairs: Vec<CandidatePair>,
        demand: &[DemandUnit],
        access_points: &[AccessPoint],
        progress: &dyn ProgressCallback,
    ) -> Vec<CandidatePair> {
        let demand_nodes = self.demand_nodes(&pairs, demand);
        let access_nodes = self.access_nodes(&pairs, access_points);

        let mut targets_by_origin: BTreeMap<NodeIndex, BTreeSet<NodeIndex>> = BTreeMap::new();
        for pair in &pairs {
            if let (Some(origin), Some(target)) = (
                demand_nodes.get(&pair.demand_id),
                access_nodes.get(&pair.access_point_id),
            ) {
                targets_by_origin.entry(*origin).or_default().insert(*target);
            }
        }

        log::info!(
            "Routing {} pairs: {} demand nodes, {} access nodes, {} searches",
            pairs.len(),
            demand_nodes.len(),
            access_nodes.len(),
            targets_by_origin.len()
        );

        progress.set_total(targets_by_origin.len() as u64);
        progress.set_message("Routing".to_string());

        let batches: Vec<(NodeIndex, Vec<NodeIndex>)> = targets_by_origin
            .into_iter()
            .map(|(origin, targets)| (origin, targets.into_iter().collect()))
            .collect();

        let lengths: HashMap<(NodeIndex, NodeIndex), Option<f64>> = batches
            .par_iter()
            .flat_map_iter(|(origin, targets)| {
                let costs = self.network.shortest_path_lengths(*origin, targets);
                progress.inc(1);
                targets
                    .iter()
                    .zip(costs)
                    .map(|(target, cost)| ((*origin, *target), cost))
                    .collect::<Vec<_>>()
            })
            .collect();

        progress.finish_and_clear();

        let routed: Vec<CandidatePair> = pairs
            .into_iter()
            .map(|pair| {
                let length = demand_nodes
                    .get(&pair.demand_id)
                    .zip(access_nodes.get(&pair.access_point_id))
                    .and_then(|(origin, target)| lengths.get(&(*origin, *target)).copied())
                    .flatten();
                let distance =
                    length.map_or(NetworkDistance::Unreachable, NetworkDistance::Reachable);
                CandidatePair {
                    distance: Some(distance),
                    ..pair
                }
            })
            .collect();

        let unreachable = routed
            .iter()
            .filter(|pair| pair.distance == Some(NetworkDistance::Unreachable))
            .count();
        if unreachable > 0 {
            log::warn!(
                "{unreachable} of {} candidate pairs are unreachable on the road network",
                routed.len()
            );
        }

        routed
    }

    /// Nearest road node of each demand unit that appears in `pairs`.
    fn demand_nodes(
        &self,
        pairs: &[CandidatePair],
        demand: &[DemandUnit],
    ) -> HashMap<DemandId, NodeIndex> {
        let ids: Vec<DemandId> = pairs
            .iter()
            .map(|pair| pair.demand_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        ids.par_iter()
            .filter_map(|id| {
                let unit = demand.get(*id)?;
                self.network.nearest_node(unit.centroid).map(|node| (*id, node))
            })
            .collect()
    }

    /// Nearest road node of each access point that appears in `pairs`.
    fn access_nodes(
        &self,
        pairs: &[CandidatePair],
        access_points: &[AccessPoint],
    ) -> HashMap<AccessPointId, NodeIndex> {
        let ids: Vec<AccessPointId> = pairs
            .iter()
            .map(|pair| pair.access_point_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        ids.par_iter()
            .filter_map(|id| {
                let point = access_points.get(*id)?;
                self.network.nearest_node(point.geometry).map(|node| (*id, node))
            })
            .collect()
    }
}
