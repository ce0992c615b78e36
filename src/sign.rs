use itertools::Itertools;
use smallvec::SmallVec;

use crate::lane::{Targets, Turn};
use crate::road::Slot;
use crate::{LaneId, NodeId, SignId};

/// A set of traffic lights at one junction that may be green at the same time.
pub type SignConfig = SmallVec<[SignId; 8]>;

/// The kind of a sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignKind {
    /// Always permits passage.
    NoSign,
    /// Permits passage only while green.
    TrafficLight,
}

/// A sign governs whether road users may leave a lane into the node it stands at.
#[derive(Clone, Debug)]
pub struct Sign {
    /// The sign ID.
    id: SignId,
    /// The lane the sign terminates.
    lane: LaneId,
    /// The node the sign stands at.
    node: NodeId,
    /// The kind of sign.
    kind: SignKind,
    /// Whether a traffic light is currently green.
    green: bool,
}

impl Sign {
    /// Creates a new sign.
    pub(crate) fn new(id: SignId, lane: LaneId, node: NodeId, kind: SignKind) -> Self {
        Self {
            id,
            lane,
            node,
            kind,
            green: false,
        }
    }

    pub fn id(&self) -> SignId {
        self.id
    }

    pub fn lane(&self) -> LaneId {
        self.lane
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> SignKind {
        self.kind
    }

    pub fn is_traffic_light(&self) -> bool {
        self.kind == SignKind::TrafficLight
    }

    /// Whether the sign is a green traffic light.
    pub fn is_green(&self) -> bool {
        self.green
    }

    /// Whether road users may pass the sign.
    pub fn may_drive(&self) -> bool {
        self.kind == SignKind::NoSign || self.green
    }

    pub(crate) fn set_green(&mut self, green: bool) {
        self.green = green && self.is_traffic_light();
    }
}

/// A traffic light approaching a junction, as seen by the configuration search.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Approach {
    pub sign: SignId,
    pub slot: Slot,
    pub targets: Targets,
}

impl Approach {
    /// Whether two approaches may be green simultaneously.
    fn compatible_with(&self, other: &Approach) -> bool {
        if self.slot == other.slot {
            return true;
        }
        self.slot.opposite() == other.slot
            && !self.targets.get(Turn::Left)
            && !other.targets.get(Turn::Left)
    }
}

/// Computes the maximal sets of mutually compatible approaches.
pub(crate) fn legal_configs(approaches: &[Approach]) -> Vec<SignConfig> {
    let n = approaches.len();
    let adjacent = (0..n)
        .map(|i| {
            (0..n)
                .filter(|j| *j != i && approaches[i].compatible_with(&approaches[*j]))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut cliques = vec![];
    bron_kerbosch(&adjacent, vec![], (0..n).collect(), vec![], &mut cliques);

    cliques
        .into_iter()
        .map(|clique| {
            clique
                .into_iter()
                .sorted()
                .map(|i| approaches[i].sign)
                .collect::<SignConfig>()
        })
        .sorted()
        .collect()
}

fn bron_kerbosch(
    adjacent: &[Vec<usize>],
    current: Vec<usize>,
    mut candidates: Vec<usize>,
    mut excluded: Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if candidates.is_empty() {
        if excluded.is_empty() && !current.is_empty() {
            out.push(current);
        }
        return;
    }
    while let Some(v) = candidates.pop() {
        let keep = |set: &[usize]| {
            set.iter()
                .copied()
                .filter(|u| adjacent[v].contains(u))
                .collect::<Vec<_>>()
        };
        let mut next = current.clone();
        next.push(v);
        bron_kerbosch(adjacent, next, keep(&candidates), keep(&excluded), out);
        excluded.push(v);
    }
}
