use std::collections::VecDeque;

use arrayvec::ArrayVec;

use crate::road::Slot;
use crate::roaduser::{Roaduser, RoaduserKind};
use crate::shortest_path::SpData;
use crate::sign::SignConfig;
use crate::{NodeId, Point2d, RoadId, RoaduserId, SignId};

/// A node of the road network.
#[derive(Clone, Debug)]
pub struct Node {
    /// The node ID.
    id: NodeId,
    /// The position of the node.
    pos: Point2d,
    /// The roads attached to the node, indexed by [Slot].
    roads: [Option<RoadId>; 4],
    /// What kind of node this is.
    kind: NodeKind,
    /// Shortest path data towards every special node.
    pub(crate) sp: SpData,
}

/// The kind of a node, with its associated data.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A junction where road users change roads.
    Junction(Junction),
    /// An entry and exit point of the network.
    Edge(SpecialNode),
    /// A connection to another simulated network.
    NetTunnel(SpecialNode),
}

/// Junction state: the legal sign configurations and the active one.
#[derive(Clone, Debug, Default)]
pub struct Junction {
    /// The traffic lights of the junction.
    pub(crate) lights: Vec<SignId>,
    /// The legal sign configurations.
    pub(crate) configs: Vec<SignConfig>,
    /// Whether `configs` were supplied rather than computed.
    pub(crate) fixed_configs: bool,
    /// The index of the configuration that is currently green.
    pub(crate) active: Option<usize>,
    /// The number of cycles since the active configuration was switched on.
    pub(crate) since: usize,
}

impl Junction {
    /// The traffic lights of the junction.
    pub fn lights(&self) -> &[SignId] {
        &self.lights
    }

    /// The legal sign configurations.
    pub fn sign_configs(&self) -> &[SignConfig] {
        &self.configs
    }

    /// The configuration that is currently green.
    pub fn active_config(&self) -> Option<&SignConfig> {
        self.active.and_then(|idx| self.configs.get(idx))
    }

    /// The number of cycles since the active configuration was switched on.
    pub fn cycles_since_switch(&self) -> usize {
        self.since
    }
}

/// The expected number of road users of a class spawned per cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnFrequency {
    pub kind: RoaduserKind,
    pub rate: f64,
}

/// The relative likelihood that a spawned road user of a class heads to `dest`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DestFrequency {
    pub dest: NodeId,
    pub kind: RoaduserKind,
    pub weight: f64,
}

/// Statistics about the road users that left the network at a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrivalStats {
    /// The number of road users that arrived.
    pub arrived: usize,
    /// The number of arrivals for which this node was not the destination.
    pub misrouted: usize,
    /// The sum of the trip times of arrivals, in cycles.
    pub total_trip_time: usize,
    /// The sum of the delays of arrivals, in cycles.
    pub total_delay: usize,
    /// The number of road users handed over through a net tunnel.
    pub sent: usize,
}

impl ArrivalStats {
    /// The mean trip time in cycles.
    pub fn average_trip_time(&self) -> f64 {
        if self.arrived == 0 {
            0.0
        } else {
            self.total_trip_time as f64 / self.arrived as f64
        }
    }

    /// The mean delay in cycles.
    pub fn average_delay(&self) -> f64 {
        if self.arrived == 0 {
            0.0
        } else {
            self.total_delay as f64 / self.arrived as f64
        }
    }
}

/// The data of an edge node or net tunnel.
#[derive(Clone, Debug, Default)]
pub struct SpecialNode {
    /// The spawn frequencies per road user class.
    spawn: Vec<SpawnFrequency>,
    /// The destination frequencies per road user class.
    dests: Vec<DestFrequency>,
    /// Road users waiting to enter the network here.
    pub(crate) waiting: VecDeque<RoaduserId>,
    /// Statistics about arrivals.
    pub(crate) stats: ArrivalStats,
}

impl SpecialNode {
    pub fn spawn_frequencies(&self) -> &[SpawnFrequency] {
        &self.spawn
    }

    pub fn dest_frequencies(&self) -> &[DestFrequency] {
        &self.dests
    }

    /// The road users waiting to enter the network here.
    pub fn waiting(&self) -> impl Iterator<Item = RoaduserId> + '_ {
        self.waiting.iter().copied()
    }

    pub fn num_waiting(&self) -> usize {
        self.waiting.len()
    }

    pub fn stats(&self) -> &ArrivalStats {
        &self.stats
    }

    pub(crate) fn set_spawn_frequency(&mut self, freq: SpawnFrequency) {
        match self.spawn.iter_mut().find(|f| f.kind == freq.kind) {
            Some(existing) => *existing = freq,
            None => self.spawn.push(freq),
        }
    }

    pub(crate) fn set_dest_frequency(&mut self, freq: DestFrequency) {
        match self
            .dests
            .iter_mut()
            .find(|f| f.kind == freq.kind && f.dest == freq.dest)
        {
            Some(existing) => *existing = freq,
            None => self.dests.push(freq),
        }
    }

    /// Accepts a road user leaving the network at this node.
    pub(crate) fn enter(&mut self, node: NodeId, roaduser: &Roaduser, cycle: usize, tunnel: bool) {
        let entry = roaduser.entry_cycle().unwrap_or(roaduser.spawn_cycle());
        self.stats.arrived += 1;
        self.stats.total_trip_time += cycle.saturating_sub(entry);
        self.stats.total_delay += roaduser.delay();
        if roaduser.destination() != node {
            self.stats.misrouted += 1;
        }
        if tunnel {
            self.stats.sent += 1;
        }
    }
}

impl Node {
    /// Creates a new node.
    pub(crate) fn new(id: NodeId, pos: Point2d, kind: NodeKind) -> Self {
        Self {
            id,
            pos,
            roads: [None; 4],
            kind,
            sp: SpData::default(),
        }
    }

    /// Gets the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The position of the node.
    pub fn position(&self) -> Point2d {
        self.pos
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The road attached at the given slot.
    pub fn road_at(&self, slot: Slot) -> Option<RoadId> {
        self.roads[slot.index()]
    }

    /// The roads attached to the node with their slots.
    pub fn roads(&self) -> ArrayVec<(Slot, RoadId), 4> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.road_at(slot).map(|road| (slot, road)))
            .collect()
    }

    /// The slot the given road is attached at.
    pub fn slot_of(&self, road: RoadId) -> Option<Slot> {
        Slot::ALL
            .into_iter()
            .find(|slot| self.road_at(*slot) == Some(road))
    }

    pub(crate) fn attach_road(&mut self, slot: Slot, road: RoadId) -> bool {
        let entry = &mut self.roads[slot.index()];
        if entry.is_some() {
            return false;
        }
        *entry = Some(road);
        true
    }

    pub fn is_junction(&self) -> bool {
        matches!(self.kind, NodeKind::Junction(_))
    }

    /// Whether the node is an edge node or net tunnel.
    pub fn is_special(&self) -> bool {
        !self.is_junction()
    }

    pub fn junction(&self) -> Option<&Junction> {
        match &self.kind {
            NodeKind::Junction(junction) => Some(junction),
            _ => None,
        }
    }

    pub(crate) fn junction_mut(&mut self) -> Option<&mut Junction> {
        match &mut self.kind {
            NodeKind::Junction(junction) => Some(junction),
            _ => None,
        }
    }

    pub fn special(&self) -> Option<&SpecialNode> {
        match &self.kind {
            NodeKind::Edge(special) | NodeKind::NetTunnel(special) => Some(special),
            NodeKind::Junction(_) => None,
        }
    }

    pub(crate) fn special_mut(&mut self) -> Option<&mut SpecialNode> {
        match &mut self.kind {
            NodeKind::Edge(special) | NodeKind::NetTunnel(special) => Some(special),
            NodeKind::Junction(_) => None,
        }
    }

    /// Delivers a road user leaving the network to this node's `enter` hook.
    pub(crate) fn enter(&mut self, roaduser: &Roaduser, cycle: usize) {
        let id = self.id;
        match &mut self.kind {
            NodeKind::Edge(special) => special.enter(id, roaduser, cycle, false),
            NodeKind::NetTunnel(special) => special.enter(id, roaduser, cycle, true),
            NodeKind::Junction(_) => {}
        }
    }

    /// Shortest path data towards every special node.
    pub fn shortest_paths(&self) -> &SpData {
        &self.sp
    }
}
