//! Network builders shared by the integration tests.
#![allow(dead_code)]

use junction_sim::{
    LaneAttributes, LaneId, Network, NodeId, Point2d, RoadAttributes, RoaduserKind, Slot,
};

/// Two edge nodes joined by a single road with one lane each way.
pub struct SingleRoad {
    pub network: Network,
    pub from: NodeId,
    pub to: NodeId,
    /// The lane from `from` to `to`.
    pub lane: LaneId,
}

pub fn single_road(length: u32) -> SingleRoad {
    let mut network = Network::new();
    let from = network.add_edge_node(Point2d::new(0.0, 0.0));
    let to = network.add_edge_node(Point2d::new(length as f64, 0.0));
    let lanes = [LaneAttributes::default()];
    network
        .add_road(&RoadAttributes {
            alpha: (from, Slot::EAST),
            beta: (to, Slot::WEST),
            length: Some(length),
            to_alpha: &lanes,
            to_beta: &lanes,
        })
        .unwrap();
    let lane = lane_between(&network, from, to);
    SingleRoad {
        network,
        from,
        to,
        lane,
    }
}

/// A junction with an edge node on each side, `length` units away.
pub struct Cross {
    pub network: Network,
    pub junction: NodeId,
    /// The edge nodes, indexed by the slot they attach to the junction at.
    pub edges: [NodeId; 4],
}

pub fn cross(length: u32, traffic_light: bool) -> Cross {
    let mut network = Network::new();
    let junction = network.add_junction(Point2d::new(0.0, 0.0));
    let lanes = [LaneAttributes {
        traffic_light,
        ..Default::default()
    }];
    let edges = Slot::ALL.map(|slot| {
        let edge = network.add_edge_node(Point2d::new(slot.index() as f64, 1.0));
        network
            .add_road(&RoadAttributes {
                alpha: (junction, slot),
                beta: (edge, slot.opposite()),
                length: Some(length),
                to_alpha: &lanes,
                to_beta: &lanes,
            })
            .unwrap();
        edge
    });
    Cross {
        network,
        junction,
        edges,
    }
}

/// Makes every edge of a cross spawn cars towards every other edge.
pub fn add_traffic(cross: &mut Cross, rate: f64) {
    for from in cross.edges {
        cross
            .network
            .add_spawn_frequency(from, RoaduserKind::Car, rate)
            .unwrap();
        cross
            .network
            .add_spawn_frequency(from, RoaduserKind::Bus, rate / 10.0)
            .unwrap();
        for to in cross.edges.into_iter().filter(|to| *to != from) {
            for kind in [RoaduserKind::Car, RoaduserKind::Bus] {
                cross
                    .network
                    .add_dest_frequency(from, to, kind, 1.0)
                    .unwrap();
            }
        }
    }
}

/// The lane running from `from` to `to`.
pub fn lane_between(network: &Network, from: NodeId, to: NodeId) -> LaneId {
    network
        .leaving_lanes(from)
        .find(|lane| network.lane(*lane).to() == to)
        .unwrap()
}
