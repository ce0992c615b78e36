//! Shortest path data: for every node, the lanes leaving it that lie on a
//! (near-)shortest path to each special node, per road user class.

use std::collections::BTreeMap;

use log::{debug, warn};
use pathfinding::directed::dijkstra::dijkstra_all;
use slotmap::SecondaryMap;

use crate::network::Network;
use crate::roaduser::RoaduserKind;
use crate::{LaneId, NodeId};

/// A lane on a path towards a destination, tagged with the path's length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PathEntry {
    /// The lane leaving the node.
    pub lane: LaneId,
    /// The length of the path from the node to the destination through `lane`.
    pub length: u32,
}

/// The per-node shortest path cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpData {
    paths: BTreeMap<(NodeId, RoaduserKind), Vec<PathEntry>>,
}

impl SpData {
    /// The lanes leaving the node on a shortest path to `dest`, shortest first.
    pub fn lanes(&self, dest: NodeId, kind: RoaduserKind) -> &[PathEntry] {
        self.paths
            .get(&(dest, kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The length of the shortest path to `dest`.
    pub fn min_length(&self, dest: NodeId, kind: RoaduserKind) -> Option<u32> {
        self.lanes(dest, kind).iter().map(|p| p.length).min()
    }

    /// Whether the given lane lies on a shortest path to `dest`.
    pub fn contains(&self, dest: NodeId, kind: RoaduserKind, lane: LaneId) -> bool {
        self.lanes(dest, kind).iter().any(|p| p.lane == lane)
    }

    /// Iterates over every destination and class that has a path.
    pub fn destinations(&self) -> impl Iterator<Item = (NodeId, RoaduserKind)> + '_ {
        self.paths.keys().copied()
    }
}

/// A vertex of the reversed lane graph searched from a destination.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Hop {
    Dest,
    Lane(LaneId),
}

/// Recomputes the shortest path data of every node.
///
/// A lane leaving a node is kept if its path is at most `derivation_factor`
/// times as long as the shortest path from that node.
pub(crate) fn compute(network: &mut Network, derivation_factor: f64) {
    let factor = if derivation_factor < 1.0 {
        warn!("Derivation factor {derivation_factor} is below 1, using 1");
        1.0
    } else {
        derivation_factor
    };

    // Reverse lane adjacency: which lanes feed into each lane.
    let mut feeders: SecondaryMap<LaneId, Vec<LaneId>> = SecondaryMap::new();
    for lane in network.lanes.keys() {
        feeders.insert(lane, vec![]);
    }
    for lane in network.lanes.keys() {
        for out in network.outgoing_lanes(lane) {
            if let Some(list) = feeders.get_mut(out) {
                list.push(lane);
            }
        }
    }

    let dests = network
        .nodes
        .values()
        .filter(|node| node.is_special())
        .map(|node| node.id())
        .collect::<Vec<_>>();

    let mut tables: SecondaryMap<NodeId, BTreeMap<_, _>> = network
        .nodes
        .keys()
        .map(|id| (id, BTreeMap::new()))
        .collect();

    for dest in dests.iter().copied() {
        for kind in RoaduserKind::ALL {
            let dists = dijkstra_all(&Hop::Dest, |hop| {
                predecessors(network, &feeders, dest, kind, *hop)
            });
            let dist = |lane: LaneId| dists.get(&Hop::Lane(lane)).map(|(_, cost)| *cost);

            for node in network.nodes.values() {
                if node.id() == dest {
                    continue;
                }
                let entries = network
                    .leaving_lanes(node.id())
                    .filter(|id| network.lanes[*id].allows(kind))
                    .filter_map(|id| {
                        Some(PathEntry {
                            lane: id,
                            length: network.lanes[id].length() + dist(id)?,
                        })
                    })
                    .collect::<Vec<_>>();
                let Some(min) = entries.iter().map(|p| p.length).min() else {
                    continue;
                };
                let bound = f64::from(min) * factor;
                let mut entries = entries
                    .into_iter()
                    .filter(|p| f64::from(p.length) <= bound)
                    .collect::<Vec<_>>();
                entries.sort_by_key(|p| p.length);
                tables[node.id()].insert((dest, kind), entries);
            }
        }
    }

    for (id, paths) in tables {
        network.nodes[id].sp.paths = paths;
    }
    debug!("Recomputed shortest paths to {} special nodes", dests.len());
}

/// The reversed edges of the lane graph: lanes from which `hop` is reachable,
/// with the length added by moving through `hop`.
fn predecessors(
    network: &Network,
    feeders: &SecondaryMap<LaneId, Vec<LaneId>>,
    dest: NodeId,
    kind: RoaduserKind,
    hop: Hop,
) -> Vec<(Hop, u32)> {
    match hop {
        Hop::Dest => network
            .incoming_lanes(dest)
            .filter(|id| network.lanes[*id].allows(kind))
            .map(|id| (Hop::Lane(id), 0))
            .collect(),
        Hop::Lane(lane) => {
            let lane = &network.lanes[lane];
            if !lane.is_enabled() || !lane.allows(kind) {
                return vec![];
            }
            feeders
                .get(lane.id())
                .into_iter()
                .flatten()
                .filter(|id| network.lanes[**id].allows(kind))
                .map(|id| (Hop::Lane(*id), lane.length()))
                .collect()
        }
    }
}

/// Checks that every destination a special node sends road users to is reachable.
pub(crate) fn check_routes(network: &Network) -> Result<(), crate::TopologyError> {
    for node in network.nodes.values() {
        let Some(special) = node.special() else {
            continue;
        };
        for spawn in special.spawn_frequencies().iter().filter(|s| s.rate > 0.0) {
            let dests = special
                .dest_frequencies()
                .iter()
                .filter(|d| d.kind == spawn.kind && d.weight > 0.0 && d.dest != node.id());
            for dest in dests {
                if node.sp.lanes(dest.dest, dest.kind).is_empty() {
                    return Err(crate::TopologyError::NoPath {
                        from: node.id(),
                        to: dest.dest,
                        kind: dest.kind,
                    });
                }
            }
        }
    }
    Ok(())
}
