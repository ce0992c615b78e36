//! An index-based description of a road network, as produced by an external loader.

use crate::error::TopologyError;
use crate::lane::{LaneAttributes, Targets};
use crate::network::Network;
use crate::road::{RoadAttributes, Slot};
use crate::roaduser::{RoaduserKind, TypeMask};
use crate::{NodeId, Point2d};

/// The kind of a described node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeType {
    Junction,
    Edge,
    NetTunnel,
}

/// A described node. Spawn and destination tables are only honoured on special nodes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeDescription {
    pub kind: NodeType,
    pub x: f64,
    pub y: f64,
    /// Road users of each class spawned per cycle.
    #[cfg_attr(feature = "serde", serde(default))]
    pub spawn: Vec<(RoaduserKind, f64)>,
    /// Destination weights: node index, class, weight.
    #[cfg_attr(feature = "serde", serde(default))]
    pub dests: Vec<(usize, RoaduserKind, f64)>,
}

/// A described lane.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneDescription {
    /// The classes allowed on the lane; every class if empty.
    #[cfg_attr(feature = "serde", serde(default))]
    pub kinds: Vec<RoaduserKind>,
    pub left: bool,
    pub straight: bool,
    pub right: bool,
    pub traffic_light: bool,
}

impl From<&LaneDescription> for LaneAttributes {
    fn from(desc: &LaneDescription) -> Self {
        let mask = if desc.kinds.is_empty() {
            TypeMask::ALL
        } else {
            desc.kinds.iter().copied().collect()
        };
        Self {
            mask,
            targets: Targets::new(desc.left, desc.straight, desc.right),
            traffic_light: desc.traffic_light,
        }
    }
}

/// A described road between two nodes, given by index.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadDescription {
    pub alpha: usize,
    pub alpha_slot: u8,
    pub beta: usize,
    pub beta_slot: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub length: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub to_alpha: Vec<LaneDescription>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub to_beta: Vec<LaneDescription>,
}

/// A complete infrastructure.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InfraDescription {
    pub nodes: Vec<NodeDescription>,
    pub roads: Vec<RoadDescription>,
}

impl Network {
    /// Builds a network from a description. Also returns the ID given to each
    /// described node, in description order.
    pub fn from_description(
        desc: &InfraDescription,
    ) -> Result<(Network, Vec<NodeId>), TopologyError> {
        let mut network = Network::new();
        let ids = desc
            .nodes
            .iter()
            .map(|node| {
                let pos = Point2d::new(node.x, node.y);
                match node.kind {
                    NodeType::Junction => network.add_junction(pos),
                    NodeType::Edge => network.add_edge_node(pos),
                    NodeType::NetTunnel => network.add_net_tunnel(pos),
                }
            })
            .collect::<Vec<_>>();
        let node_id = |idx: usize| ids.get(idx).copied().ok_or(TopologyError::BadNodeIndex(idx));
        let slot = |idx: u8| Slot::new(idx).ok_or(TopologyError::BadSlot(idx));

        for road in &desc.roads {
            let to_alpha = road.to_alpha.iter().map(LaneAttributes::from).collect::<Vec<_>>();
            let to_beta = road.to_beta.iter().map(LaneAttributes::from).collect::<Vec<_>>();
            network.add_road(&RoadAttributes {
                alpha: (node_id(road.alpha)?, slot(road.alpha_slot)?),
                beta: (node_id(road.beta)?, slot(road.beta_slot)?),
                length: road.length,
                to_alpha: &to_alpha,
                to_beta: &to_beta,
            })?;
        }

        for (node, id) in desc.nodes.iter().zip(ids.iter().copied()) {
            if node.kind == NodeType::Junction {
                continue;
            }
            for (kind, rate) in &node.spawn {
                network.add_spawn_frequency(id, *kind, *rate)?;
            }
            for (dest, kind, weight) in &node.dests {
                network.add_dest_frequency(id, node_id(*dest)?, *kind, *weight)?;
            }
        }

        Ok((network, ids))
    }
}
