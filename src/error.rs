use thiserror::Error;

use crate::road::Slot;
use crate::roaduser::RoaduserKind;
use crate::{LaneId, NodeId, RoaduserId};

/// An invalid or unusable network topology.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("lane {0:?} does not exist")]
    UnknownLane(LaneId),
    #[error("slot {slot:?} of node {node:?} is already connected")]
    SlotOccupied { node: NodeId, slot: Slot },
    #[error("node {0:?} is not an edge node or net tunnel")]
    NotSpecial(NodeId),
    #[error("lane {0:?} leads to a dead end")]
    DeadEnd(LaneId),
    #[error("node {0:?} spawns road users but has no lane to put them on")]
    NoEntryLane(NodeId),
    #[error("no path from {from:?} to {to:?} for {kind:?}")]
    NoPath {
        from: NodeId,
        to: NodeId,
        kind: RoaduserKind,
    },
    #[error("junction {0:?} has no legal sign configuration")]
    NoSignConfig(NodeId),
    #[error("lane {0:?} is already disabled")]
    AlreadyDisabled(LaneId),
    #[error("lane {0:?} is not disabled")]
    NotDisabled(LaneId),
    #[error("description refers to node index {0} which does not exist")]
    BadNodeIndex(usize),
    #[error("description uses slot {0}, slots are numbered 0 to 3")]
    BadSlot(u8),
}

/// An error raised while driving a simulation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("the simulation is running; pause it first")]
    Running,
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("road user {0:?} is missing")]
    MissingRoaduser(RoaduserId),
    #[error("road users on lane {0:?} are out of order or overlap")]
    LaneOrder(LaneId),
    #[error("no room on lane {lane:?} at position {pos}")]
    NoRoom { lane: LaneId, pos: u32 },
    #[error("{entered} road users entered but {left} left and {present} are present")]
    Conservation {
        entered: usize,
        left: usize,
        present: usize,
    },
    #[error("junction {0:?} shows a green set outside its legal configurations")]
    IllegalLights(NodeId),
}
