//! Traffic light controllers assign every traffic light a gain each cycle.

use std::ops::Index;

use crate::network::Network;
use crate::roaduser::RoaduserKind;
use crate::{LaneId, NodeId, RoaduserId, SignId, SimRng};

pub use queue::{QueueMeasure, QueueTlc};
pub use random::RandomTlc;
pub use tc1::{Light, StateKey, StateValues, Tc1, Tc1Params};

mod queue;
mod random;
mod tc1;

/// The gain of one sign for the coming cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TlDecision {
    /// The sign being decided on.
    pub sign: SignId,
    /// The lane the sign terminates.
    pub lane: LaneId,
    /// The benefit of making the sign green.
    pub gain: f64,
}

/// The decisions for the signs of one junction.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDecisions {
    pub node: NodeId,
    pub decisions: Vec<TlDecision>,
}

/// The decisions for every junction, indexed by junction then by sign within the junction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TlDecisions(Vec<NodeDecisions>);

impl TlDecisions {
    /// Creates zero-gain decisions for every sign at every junction.
    pub fn new(network: &Network) -> Self {
        let nodes = network
            .iter_nodes()
            .filter(|node| node.is_junction())
            .map(|node| NodeDecisions {
                node: node.id(),
                decisions: network
                    .incoming_lanes(node.id())
                    .map(|lane| TlDecision {
                        sign: network.lane(lane).sign(),
                        lane,
                        gain: 0.0,
                    })
                    .collect(),
            })
            .collect();
        Self(nodes)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeDecisions> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NodeDecisions> {
        self.0.iter_mut()
    }

    /// Iterates over every sign decision.
    pub fn decisions(&self) -> impl Iterator<Item = &TlDecision> {
        self.0.iter().flat_map(|n| n.decisions.iter())
    }

    /// Iterates mutably over every sign decision.
    pub fn decisions_mut(&mut self) -> impl Iterator<Item = &mut TlDecision> {
        self.0.iter_mut().flat_map(|n| n.decisions.iter_mut())
    }

    /// The gain assigned to a sign.
    pub fn gain_of(&self, sign: SignId) -> Option<f64> {
        self.decisions().find(|d| d.sign == sign).map(|d| d.gain)
    }

    /// The decisions of a junction.
    pub fn node(&self, node: NodeId) -> Option<&NodeDecisions> {
        self.0.iter().find(|n| n.node == node)
    }

    pub(crate) fn reset_gains(&mut self) {
        for decision in self.decisions_mut() {
            decision.gain = 0.0;
        }
    }
}

impl Index<usize> for TlDecisions {
    type Output = NodeDecisions;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// A position a road user could reach this cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PosMov {
    pub sign: SignId,
    pub pos: u32,
}

/// Where a road user ended up after being moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NextState {
    /// On a lane, at a position relative to the lane's sign.
    At { sign: SignId, pos: u32 },
    /// Left the network at a special node.
    Arrived,
    /// Removed from the network for being stuck.
    Removed,
}

/// A road user transition reported to the controller once per road user per cycle.
#[derive(Clone, Copy, Debug)]
pub struct RoaduserMove<'a> {
    pub roaduser: RoaduserId,
    pub kind: RoaduserKind,
    pub passengers: u32,
    pub dest: NodeId,
    /// The lane the road user was on at the start of the cycle.
    pub prev_lane: LaneId,
    /// The sign at the end of that lane.
    pub prev_sign: SignId,
    /// The position on that lane at the start of the cycle.
    pub prev_pos: u32,
    /// Whether the sign permitted passage.
    pub green: bool,
    /// Where the road user ended up.
    pub next: NextState,
    /// The lane the road user ended up on.
    pub next_lane: Option<LaneId>,
    /// The lane the road user wanted to cross into, if it reached the sign.
    pub desired: Option<LaneId>,
    /// Whether `desired` had no room.
    pub blocked: bool,
    /// The positions the road user could have reached.
    pub pos_movs: &'a [PosMov],
    /// The penalty applied for a forced removal.
    pub penalty: f64,
}

/// Learned value estimates a driving policy may consult.
pub trait Colearning {
    /// The estimated cost for a road user heading to `dest` of leaving the lane
    /// behind `from` into the lane behind `to`, entering it at `pos`.
    fn colearn_value(&self, from: SignId, to: SignId, dest: NodeId, pos: u32) -> f64;
}

/// A traffic light control algorithm.
pub trait TlController: Send {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    /// Assigns a gain to every sign in `decisions`.
    fn decide_tls(&mut self, network: &Network, decisions: &mut TlDecisions, rng: &mut SimRng);

    /// Observes a road user transition. Stateless controllers ignore this.
    fn update_roaduser_move(&mut self, _network: &Network, _mv: &RoaduserMove) {}

    /// The learned estimates offered to driving policies, if any.
    fn colearning(&self) -> Option<&dyn Colearning> {
        None
    }

    /// The learned values of a state, if the controller keeps any.
    fn inspect(&self, _key: &StateKey) -> Option<StateValues> {
        None
    }

    /// Every learned value as JSON.
    fn export_tables(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Forgets everything learned.
    fn reset(&mut self) {}
}
