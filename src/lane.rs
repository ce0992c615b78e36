use smallvec::SmallVec;

use crate::road::Slot;
use crate::roaduser::{RoaduserKind, TypeMask};
use crate::{LaneId, NodeId, RoadId, RoaduserId, RoaduserSet, SignId};

/// A direction a road user can take when crossing a junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Turn {
    Left,
    Straight,
    Right,
}

impl Turn {
    pub const ALL: [Turn; 3] = [Turn::Left, Turn::Straight, Turn::Right];

    /// The slot a road user arriving from `from` leaves the junction by.
    pub const fn target_slot(self, from: Slot) -> Slot {
        match self {
            Turn::Left => from.rotate(1),
            Turn::Straight => from.rotate(2),
            Turn::Right => from.rotate(3),
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Which turns are allowed at the end of a lane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Targets([bool; 3]);

impl Targets {
    pub const NONE: Targets = Targets([false; 3]);
    pub const ALL: Targets = Targets([true; 3]);

    pub const fn new(left: bool, straight: bool, right: bool) -> Self {
        Self([left, straight, right])
    }

    pub const fn get(&self, turn: Turn) -> bool {
        self.0[turn.index()]
    }

    pub fn set(&mut self, turn: Turn, allowed: bool) {
        self.0[turn.index()] = allowed;
    }

    /// Whether any turn is allowed.
    pub fn any(&self) -> bool {
        self.0.iter().any(|t| *t)
    }

    /// Iterates over the allowed turns.
    pub fn iter(&self) -> impl Iterator<Item = Turn> + '_ {
        Turn::ALL.into_iter().filter(|turn| self.get(*turn))
    }
}

/// The attributes of a lane.
#[derive(Clone, Copy, Debug)]
pub struct LaneAttributes {
    /// The road user classes allowed on the lane.
    pub mask: TypeMask,
    /// The turns allowed at the end of the lane.
    pub targets: Targets,
    /// Whether the lane ends at a traffic light (only honoured at junctions).
    pub traffic_light: bool,
}

impl Default for LaneAttributes {
    fn default() -> Self {
        Self {
            mask: TypeMask::ALL,
            targets: Targets::ALL,
            traffic_light: true,
        }
    }
}

/// A lane is a single-file queue of road users heading towards a sign.
#[derive(Clone, Debug)]
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// The road the lane belongs to.
    road: RoadId,
    /// The node the lane starts at.
    from: NodeId,
    /// The node the lane leads to, where its sign stands.
    to: NodeId,
    /// The sign at the end of the lane.
    sign: SignId,
    /// The length in length units.
    length: u32,
    /// The road user classes allowed on the lane.
    mask: TypeMask,
    /// The turns currently allowed at the end of the lane.
    targets: Targets,
    /// The turns allowed before any accident.
    original_targets: Targets,
    /// Whether road users may enter the lane.
    enabled: bool,
    /// The road users on the lane, nearest the sign first.
    queue: SmallVec<[RoaduserId; 8]>,
    /// The last cycle in which the lane was asked to move.
    pub(crate) cycle_asked: usize,
    /// The last cycle in which every road user on the lane was processed.
    pub(crate) cycle_moved: usize,
}

impl Lane {
    /// Creates a new lane.
    pub(crate) fn new(
        id: LaneId,
        road: RoadId,
        (from, to): (NodeId, NodeId),
        sign: SignId,
        length: u32,
        attribs: &LaneAttributes,
    ) -> Self {
        Self {
            id,
            road,
            from,
            to,
            sign,
            length,
            mask: attribs.mask,
            targets: attribs.targets,
            original_targets: attribs.targets,
            enabled: true,
            queue: SmallVec::new(),
            cycle_asked: 0,
            cycle_moved: 0,
        }
    }

    pub fn id(&self) -> LaneId {
        self.id
    }

    pub fn road(&self) -> RoadId {
        self.road
    }

    /// The node the lane starts at.
    pub fn from(&self) -> NodeId {
        self.from
    }

    /// The node the lane leads to.
    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn sign(&self) -> SignId {
        self.sign
    }

    /// Gets the length of the lane in length units.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn mask(&self) -> TypeMask {
        self.mask
    }

    /// Whether road users of the given class may use the lane.
    pub fn allows(&self, kind: RoaduserKind) -> bool {
        self.mask.contains(kind)
    }

    /// The turns currently allowed at the end of the lane.
    pub fn targets(&self) -> Targets {
        self.targets
    }

    /// The turns allowed at the end of the lane before any accident.
    pub fn original_targets(&self) -> Targets {
        self.original_targets
    }

    pub(crate) fn set_target(&mut self, turn: Turn, allowed: bool) {
        self.targets.set(turn, allowed && self.original_targets.get(turn));
    }

    /// Whether road users may enter the lane.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The road users on the lane, nearest the sign first.
    pub fn queue(&self) -> &[RoaduserId] {
        &self.queue
    }

    /// Inserts the road user with the given ID, keeping the queue ordered by position.
    pub(crate) fn insert_roaduser(&mut self, roadusers: &RoaduserSet, id: RoaduserId) {
        let pos = roadusers[id].pos;
        let idx = self
            .queue
            .iter()
            .position(|other| roadusers[*other].pos > pos)
            .unwrap_or(self.queue.len());
        self.queue.insert(idx, id);
    }

    /// Appends a road user at the tail of the queue.
    pub(crate) fn push_tail(&mut self, id: RoaduserId) {
        self.queue.push(id);
    }

    /// Removes the road user with the given ID from the lane.
    pub(crate) fn remove_roaduser(&mut self, id: RoaduserId) {
        if let Some(idx) = self.queue.iter().position(|r| *r == id) {
            self.queue.remove(idx);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }

    /// The position nearest to the sign that the road user at `idx` may occupy.
    pub(crate) fn limit(&self, roadusers: &RoaduserSet, idx: usize) -> u32 {
        match idx.checked_sub(1).and_then(|i| self.queue.get(i)) {
            Some(ahead) => roadusers[*ahead].extent().max,
            None => 0,
        }
    }

    /// The position a road user of the given length would take when entering at the
    /// tail of the lane, if there is room for it.
    pub fn tail_position(&self, roadusers: &RoaduserSet, length: u32) -> Option<u32> {
        let pos = self.length.checked_sub(length)?;
        match self.queue.last() {
            Some(last) if roadusers[*last].extent().max > pos => None,
            _ => Some(pos),
        }
    }

    /// Whether a road user could occupy `[pos, pos + length)` without overlapping another.
    pub(crate) fn is_free(&self, roadusers: &RoaduserSet, pos: u32, length: u32) -> bool {
        let extent = crate::util::Interval::new(pos, pos + length);
        extent.max <= self.length
            && self
                .queue
                .iter()
                .all(|id| !roadusers[*id].extent().overlaps(&extent))
    }

    /// The road users packed bumper to bumper against the sign.
    pub(crate) fn waiting<'a>(
        &'a self,
        roadusers: &'a RoaduserSet,
    ) -> impl Iterator<Item = RoaduserId> + 'a {
        let mut front = 0;
        self.queue.iter().copied().take_while(move |id| {
            let extent = roadusers[*id].extent();
            let packed = extent.min == front;
            front = extent.max;
            packed
        })
    }

    /// The number of road users waiting at the sign.
    pub fn num_waiting(&self, roadusers: &RoaduserSet) -> usize {
        self.waiting(roadusers).count()
    }

    /// The length units taken up by road users waiting at the sign.
    pub fn blocked_space(&self, roadusers: &RoaduserSet) -> u32 {
        self.waiting(roadusers).map(|id| roadusers[id].length()).sum()
    }

    /// The length units taken up by all road users on the lane.
    pub fn occupied_space(&self, roadusers: &RoaduserSet) -> u32 {
        self.queue.iter().map(|id| roadusers[*id].length()).sum()
    }

    /// The fraction of the lane taken up by road users.
    pub fn occupancy(&self, roadusers: &RoaduserSet) -> f64 {
        if self.length == 0 {
            return 1.0;
        }
        self.occupied_space(roadusers) as f64 / self.length as f64
    }

    /// Whether the queue is ordered by position and no two road users overlap.
    pub fn is_consistent(&self, roadusers: &RoaduserSet) -> bool {
        let in_bounds = self
            .queue
            .iter()
            .all(|id| roadusers[*id].extent().max <= self.length);
        let ordered = self.queue.windows(2).all(|pair| {
            let (a, b) = (roadusers[pair[0]].extent(), roadusers[pair[1]].extent());
            a.min < b.min && !a.overlaps(&b)
        });
        in_bounds && ordered
    }
}
