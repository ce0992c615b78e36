use crate::lane::LaneAttributes;
use crate::{LaneId, NodeId, RoadId};

/// One of the four compass-like connection points of a node,
/// numbered clockwise starting at north.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot(u8);

impl Slot {
    pub const NORTH: Slot = Slot(0);
    pub const EAST: Slot = Slot(1);
    pub const SOUTH: Slot = Slot(2);
    pub const WEST: Slot = Slot(3);
    pub const ALL: [Slot; 4] = [Self::NORTH, Self::EAST, Self::SOUTH, Self::WEST];

    /// Creates a slot from its index, if it is valid.
    pub const fn new(index: u8) -> Option<Slot> {
        if index < 4 {
            Some(Slot(index))
        } else {
            None
        }
    }

    /// The index of the slot.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The slot `steps` positions further clockwise.
    pub const fn rotate(self, steps: u8) -> Slot {
        Slot((self.0 + steps) % 4)
    }

    /// The slot on the opposite side of the node.
    pub const fn opposite(self) -> Slot {
        self.rotate(2)
    }
}

/// A road connects two nodes and carries lanes in either direction.
#[derive(Clone, Debug)]
pub struct Road {
    /// The road ID.
    id: RoadId,
    /// The first end of the road.
    alpha: NodeId,
    /// The slot of the road at the first end.
    alpha_slot: Slot,
    /// The second end of the road.
    beta: NodeId,
    /// The slot of the road at the second end.
    beta_slot: Slot,
    /// The length in length units.
    length: u32,
    /// The lanes of the road, in both directions.
    lanes: Vec<LaneId>,
}

/// The attributes of a road.
pub struct RoadAttributes<'a> {
    /// The first end of the road and the slot it attaches to.
    pub alpha: (NodeId, Slot),
    /// The second end of the road and the slot it attaches to.
    pub beta: (NodeId, Slot),
    /// The length in length units; derived from the node positions if `None`.
    pub length: Option<u32>,
    /// The lanes running from `beta` towards `alpha`.
    pub to_alpha: &'a [LaneAttributes],
    /// The lanes running from `alpha` towards `beta`.
    pub to_beta: &'a [LaneAttributes],
}

impl Road {
    /// Creates a new road.
    pub(crate) fn new(
        id: RoadId,
        alpha: (NodeId, Slot),
        beta: (NodeId, Slot),
        length: u32,
    ) -> Self {
        Self {
            id,
            alpha: alpha.0,
            alpha_slot: alpha.1,
            beta: beta.0,
            beta_slot: beta.1,
            length,
            lanes: vec![],
        }
    }

    pub fn id(&self) -> RoadId {
        self.id
    }

    pub fn alpha(&self) -> NodeId {
        self.alpha
    }

    pub fn beta(&self) -> NodeId {
        self.beta
    }

    /// Gets the length of the road in length units.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// The lanes of the road, in both directions.
    pub fn lanes(&self) -> &[LaneId] {
        &self.lanes
    }

    /// The node at the other end of the road.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if node == self.alpha {
            Some(self.beta)
        } else if node == self.beta {
            Some(self.alpha)
        } else {
            None
        }
    }

    /// The slot at which the road attaches to the given node.
    pub fn slot_at(&self, node: NodeId) -> Option<Slot> {
        if node == self.alpha {
            Some(self.alpha_slot)
        } else if node == self.beta {
            Some(self.beta_slot)
        } else {
            None
        }
    }

    pub(crate) fn add_lane(&mut self, lane: LaneId) {
        self.lanes.push(lane);
    }
}
