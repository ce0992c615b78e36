use crate::util::Interval;
use crate::{LaneId, NodeId, RoaduserId, SignId};

/// The class of a road user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoaduserKind {
    Car,
    Bus,
    Bicycle,
}

impl RoaduserKind {
    /// Every road user class.
    pub const ALL: [RoaduserKind; 3] = [Self::Car, Self::Bus, Self::Bicycle];

    /// The default length of this class in length units.
    pub const fn length(self) -> u32 {
        match self {
            Self::Car => 2,
            Self::Bus => 3,
            Self::Bicycle => 1,
        }
    }

    /// The default speed of this class in length units per cycle.
    pub const fn speed(self) -> u32 {
        match self {
            Self::Car => 2,
            Self::Bus => 2,
            Self::Bicycle => 1,
        }
    }

    /// The default number of passengers carried.
    pub const fn passengers(self) -> u32 {
        match self {
            Self::Car => 1,
            Self::Bus => 10,
            Self::Bicycle => 1,
        }
    }

    /// The mask containing only this class.
    pub const fn mask(self) -> TypeMask {
        TypeMask(1 << self as u8)
    }
}

/// A set of road user classes, used to restrict which classes may use a lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeMask(u8);

impl TypeMask {
    pub const NONE: TypeMask = TypeMask(0);
    pub const ALL: TypeMask = TypeMask(0b111);

    /// Whether the mask contains the given class.
    pub const fn contains(self, kind: RoaduserKind) -> bool {
        self.0 & kind.mask().0 != 0
    }

    /// The union of two masks.
    pub const fn union(self, other: TypeMask) -> TypeMask {
        TypeMask(self.0 | other.0)
    }

    /// Iterates over the classes in the mask.
    pub fn kinds(self) -> impl Iterator<Item = RoaduserKind> {
        RoaduserKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl Default for TypeMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<RoaduserKind> for TypeMask {
    fn from_iter<I: IntoIterator<Item = RoaduserKind>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TypeMask::NONE, |mask, kind| mask.union(kind.mask()))
    }
}

/// The attributes of a road user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoaduserAttributes {
    /// The class of the road user.
    pub kind: RoaduserKind,
    /// The length in length units.
    pub length: u32,
    /// The speed in length units per cycle.
    pub speed: u32,
    /// The number of passengers carried.
    pub passengers: u32,
}

impl From<RoaduserKind> for RoaduserAttributes {
    fn from(kind: RoaduserKind) -> Self {
        Self {
            kind,
            length: kind.length(),
            speed: kind.speed(),
            passengers: kind.passengers(),
        }
    }
}

/// A simulated road user.
#[derive(Clone, Debug)]
pub struct Roaduser {
    /// The road user's ID.
    pub(crate) id: RoaduserId,
    /// The road user's class.
    kind: RoaduserKind,
    /// The length in length units.
    length: u32,
    /// The speed in length units per cycle.
    speed: u32,
    /// The number of passengers.
    passengers: u32,
    /// The node the road user was spawned at.
    origin: NodeId,
    /// The node the road user would like to reach.
    dest: NodeId,
    /// The lane the road user is on, or `None` while queued at its entry node.
    pub(crate) lane: Option<LaneId>,
    /// Distance of the front of the road user from the lane's sign.
    pub(crate) pos: u32,
    /// The cycle in which the road user was created.
    spawn_cycle: usize,
    /// The cycle in which the road user entered the network.
    pub(crate) entry_cycle: Option<usize>,
    /// The last cycle in which the road user was processed.
    pub(crate) cycle_moved: usize,
    /// The last cycle in which the road user changed position.
    pub(crate) cycle_advanced: usize,
    /// The number of cycles spent without advancing.
    pub(crate) delay: usize,
    /// The sign and position at which the road user last had to wait.
    pub(crate) wait: Option<(SignId, u32)>,
    /// The lane the road user committed to but could not yet enter.
    pub(crate) desired: Option<LaneId>,
}

impl Roaduser {
    /// Creates a new road user.
    pub(crate) fn new(
        id: RoaduserId,
        attributes: &RoaduserAttributes,
        origin: NodeId,
        dest: NodeId,
        cycle: usize,
    ) -> Self {
        Self {
            id,
            kind: attributes.kind,
            length: attributes.length,
            speed: attributes.speed,
            passengers: attributes.passengers,
            origin,
            dest,
            lane: None,
            pos: 0,
            spawn_cycle: cycle,
            entry_cycle: None,
            cycle_moved: cycle,
            cycle_advanced: cycle,
            delay: 0,
            wait: None,
            desired: None,
        }
    }

    /// Gets the road user's ID.
    pub fn id(&self) -> RoaduserId {
        self.id
    }

    pub fn kind(&self) -> RoaduserKind {
        self.kind
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn passengers(&self) -> u32 {
        self.passengers
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn destination(&self) -> NodeId {
        self.dest
    }

    /// The ID of the lane the road user is currently on.
    pub fn lane_id(&self) -> Option<LaneId> {
        self.lane
    }

    /// The distance of the front of the road user from the sign at the end of its lane.
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// The part of the lane occupied by the road user.
    pub fn extent(&self) -> Interval<u32> {
        Interval::new(self.pos, self.pos + self.length)
    }

    /// The cycle in which the road user was created.
    pub fn spawn_cycle(&self) -> usize {
        self.spawn_cycle
    }

    /// The cycle in which the road user left its entry queue, if it has.
    pub fn entry_cycle(&self) -> Option<usize> {
        self.entry_cycle
    }

    /// The number of cycles the road user has spent without advancing.
    pub fn delay(&self) -> usize {
        self.delay
    }

    /// The sign and position at which the road user last had to wait.
    pub fn last_wait(&self) -> Option<(SignId, u32)> {
        self.wait
    }

    /// Places the road user at a position on a lane.
    pub(crate) fn set_location(&mut self, lane: LaneId, pos: u32, cycle: usize) {
        self.lane = Some(lane);
        self.pos = pos;
        self.desired = None;
        self.cycle_moved = cycle;
        self.cycle_advanced = cycle;
        self.entry_cycle.get_or_insert(cycle);
    }

    /// Moves the road user forward along its lane, never closer to the sign than `limit`.
    /// Returns the new position.
    pub(crate) fn advance(&mut self, limit: u32, sign: SignId, cycle: usize) -> u32 {
        let new_pos = self.pos.saturating_sub(self.speed).max(limit);
        if new_pos < self.pos {
            self.cycle_advanced = cycle;
        } else {
            self.delay += 1;
            self.wait = Some((sign, self.pos));
        }
        self.pos = new_pos;
        new_pos
    }
}
