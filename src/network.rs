use cgmath::MetricSpace;
use smallvec::SmallVec;

use crate::error::TopologyError;
use crate::lane::{Lane, LaneAttributes};
use crate::node::{DestFrequency, Junction, Node, NodeKind, SpawnFrequency, SpecialNode};
use crate::road::{Road, RoadAttributes};
use crate::roaduser::{Roaduser, RoaduserKind};
use crate::sign::{legal_configs, Approach, Sign, SignConfig, SignKind};
use crate::{
    LaneId, LaneSet, NodeId, NodeSet, Point2d, RoadId, RoadSet, RoaduserId, RoaduserSet, SignId,
    SignSet,
};

/// The road network: the exclusive owner of every node, road, lane, sign and road user.
#[derive(Clone, Debug, Default)]
pub struct Network {
    /// The nodes.
    pub(crate) nodes: NodeSet,
    /// The roads.
    pub(crate) roads: RoadSet,
    /// The lanes.
    pub(crate) lanes: LaneSet,
    /// The signs, one per lane.
    pub(crate) signs: SignSet,
    /// The road users, both on lanes and queued at entry nodes.
    pub(crate) roadusers: RoaduserSet,
}

impl Network {
    /// Creates an empty network.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a junction to the network.
    pub fn add_junction(&mut self, pos: Point2d) -> NodeId {
        self.nodes
            .insert_with_key(|id| Node::new(id, pos, NodeKind::Junction(Junction::default())))
    }

    /// Adds an edge node, where road users enter and leave the network.
    pub fn add_edge_node(&mut self, pos: Point2d) -> NodeId {
        self.nodes
            .insert_with_key(|id| Node::new(id, pos, NodeKind::Edge(SpecialNode::default())))
    }

    /// Adds a net tunnel, which hands road users over to another network.
    pub fn add_net_tunnel(&mut self, pos: Point2d) -> NodeId {
        self.nodes
            .insert_with_key(|id| Node::new(id, pos, NodeKind::NetTunnel(SpecialNode::default())))
    }

    /// Adds a road between two nodes, together with its lanes and their signs.
    pub fn add_road(&mut self, attribs: &RoadAttributes) -> Result<RoadId, TopologyError> {
        let (alpha, alpha_slot) = attribs.alpha;
        let (beta, beta_slot) = attribs.beta;
        for (node, slot) in [attribs.alpha, attribs.beta] {
            let node = self.nodes.get(node).ok_or(TopologyError::UnknownNode(node))?;
            if node.road_at(slot).is_some() {
                return Err(TopologyError::SlotOccupied { node: node.id(), slot });
            }
        }
        let length = attribs.length.unwrap_or_else(|| {
            let dist = self.nodes[alpha].position().distance(self.nodes[beta].position());
            dist.ceil().max(1.0) as u32
        });

        let road_id = self
            .roads
            .insert_with_key(|id| Road::new(id, attribs.alpha, attribs.beta, length));
        self.nodes[alpha].attach_road(alpha_slot, road_id);
        self.nodes[beta].attach_road(beta_slot, road_id);

        for lane in attribs.to_beta {
            self.add_lane(road_id, (alpha, beta), length, lane);
        }
        for lane in attribs.to_alpha {
            self.add_lane(road_id, (beta, alpha), length, lane);
        }
        Ok(road_id)
    }

    fn add_lane(
        &mut self,
        road: RoadId,
        (from, to): (NodeId, NodeId),
        length: u32,
        attribs: &LaneAttributes,
    ) -> LaneId {
        let kind = if attribs.traffic_light && self.nodes[to].is_junction() {
            SignKind::TrafficLight
        } else {
            SignKind::NoSign
        };
        let signs = &mut self.signs;
        let lane_id = self.lanes.insert_with_key(|lane_id| {
            let sign = signs.insert_with_key(|id| Sign::new(id, lane_id, to, kind));
            Lane::new(lane_id, road, (from, to), sign, length, attribs)
        });
        self.roads[road].add_lane(lane_id);
        lane_id
    }

    /// Sets the expected number of road users of a class spawned at a special node per cycle.
    pub fn add_spawn_frequency(
        &mut self,
        node: NodeId,
        kind: RoaduserKind,
        rate: f64,
    ) -> Result<(), TopologyError> {
        self.special_mut(node)?
            .set_spawn_frequency(SpawnFrequency { kind, rate });
        Ok(())
    }

    /// Sets how likely road users of a class spawned at `node` are to head for `dest`.
    pub fn add_dest_frequency(
        &mut self,
        node: NodeId,
        dest: NodeId,
        kind: RoaduserKind,
        weight: f64,
    ) -> Result<(), TopologyError> {
        self.special(dest)?;
        self.special_mut(node)?
            .set_dest_frequency(DestFrequency { dest, kind, weight });
        Ok(())
    }

    /// Overrides the computed legal sign configurations of a junction.
    pub fn set_sign_configs(
        &mut self,
        node: NodeId,
        configs: Vec<SignConfig>,
    ) -> Result<(), TopologyError> {
        let junction = self
            .nodes
            .get_mut(node)
            .ok_or(TopologyError::UnknownNode(node))?
            .junction_mut()
            .ok_or(TopologyError::NoSignConfig(node))?;
        junction.configs = configs;
        junction.fixed_configs = true;
        junction.active = None;
        Ok(())
    }

    fn special(&self, node: NodeId) -> Result<&SpecialNode, TopologyError> {
        self.nodes
            .get(node)
            .ok_or(TopologyError::UnknownNode(node))?
            .special()
            .ok_or(TopologyError::NotSpecial(node))
    }

    fn special_mut(&mut self, node: NodeId) -> Result<&mut SpecialNode, TopologyError> {
        self.nodes
            .get_mut(node)
            .ok_or(TopologyError::UnknownNode(node))?
            .special_mut()
            .ok_or(TopologyError::NotSpecial(node))
    }

    /// Gets a reference to the node with the given ID.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Gets a reference to the road with the given ID.
    pub fn road(&self, id: RoadId) -> &Road {
        &self.roads[id]
    }

    /// Gets a reference to the lane with the given ID.
    pub fn lane(&self, id: LaneId) -> &Lane {
        &self.lanes[id]
    }

    /// Gets a reference to the sign with the given ID.
    pub fn sign(&self, id: SignId) -> &Sign {
        &self.signs[id]
    }

    /// Gets a reference to the road user with the given ID, if it is still simulated.
    pub fn roaduser(&self, id: RoaduserId) -> Option<&Roaduser> {
        self.roadusers.get(id)
    }

    pub(crate) fn roadusers(&self) -> &RoaduserSet {
        &self.roadusers
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn iter_roads(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    pub fn iter_lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    pub fn iter_signs(&self) -> impl Iterator<Item = &Sign> {
        self.signs.values()
    }

    pub fn iter_roadusers(&self) -> impl Iterator<Item = &Roaduser> {
        self.roadusers.values()
    }

    /// The lanes whose sign stands at the given node.
    pub fn incoming_lanes(&self, node: NodeId) -> impl Iterator<Item = LaneId> + '_ {
        self.lanes_at(node).filter(move |id| self.lanes[*id].to() == node)
    }

    /// The enabled lanes starting at the given node.
    pub fn leaving_lanes(&self, node: NodeId) -> impl Iterator<Item = LaneId> + '_ {
        self.lanes_at(node).filter(move |id| {
            let lane = &self.lanes[*id];
            lane.from() == node && lane.is_enabled()
        })
    }

    fn lanes_at(&self, node: NodeId) -> impl Iterator<Item = LaneId> + '_ {
        self.nodes[node]
            .roads()
            .into_iter()
            .flat_map(move |(_, road)| self.roads[road].lanes().iter().copied())
    }

    /// The enabled lanes a road user may take after reaching the end of the given lane.
    pub fn outgoing_lanes(&self, lane_id: LaneId) -> SmallVec<[LaneId; 8]> {
        let lane = &self.lanes[lane_id];
        let node = &self.nodes[lane.to()];
        let Some(from) = node.slot_of(lane.road()) else {
            return SmallVec::new();
        };
        if !node.is_junction() {
            return SmallVec::new();
        }
        lane.targets()
            .iter()
            .filter_map(|turn| node.road_at(turn.target_slot(from)))
            .flat_map(|road| self.roads[road].lanes().iter().copied())
            .filter(|id| {
                let out = &self.lanes[*id];
                out.from() == node.id() && out.is_enabled()
            })
            .collect()
    }

    /// The green traffic lights at a node.
    pub fn green_signs(&self, node: NodeId) -> SmallVec<[SignId; 8]> {
        self.incoming_lanes(node)
            .map(|lane| self.lanes[lane].sign())
            .filter(|sign| self.signs[*sign].is_green())
            .collect()
    }

    /// Computes the legal sign configurations of every junction that wasn't given any.
    pub(crate) fn prepare_sign_configs(&mut self) {
        let junctions = self
            .nodes
            .values()
            .filter(|node| node.is_junction())
            .map(|node| node.id())
            .collect::<Vec<_>>();

        for node_id in junctions {
            let approaches = self
                .incoming_lanes(node_id)
                .filter(|lane| self.signs[self.lanes[*lane].sign()].is_traffic_light())
                .filter_map(|lane| {
                    let lane = &self.lanes[lane];
                    Some(Approach {
                        sign: lane.sign(),
                        slot: self.nodes[node_id].slot_of(lane.road())?,
                        targets: lane.original_targets(),
                    })
                })
                .collect::<Vec<_>>();
            let lights = approaches.iter().map(|a| a.sign).collect();

            if let Some(junction) = self.nodes[node_id].junction_mut() {
                junction.lights = lights;
                if !junction.fixed_configs {
                    junction.configs = legal_configs(&approaches);
                }
            }
        }
    }
}
