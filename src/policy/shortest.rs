use rand::seq::SliceRandom;

use super::{candidates, DrivingPolicy, PolicyContext};
use crate::roaduser::Roaduser;
use crate::shortest_path::PathEntry;
use crate::{LaneId, SimRng};

/// Picks uniformly among the legal lanes on a shortest path.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShortestPathPolicy;

impl ShortestPathPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl DrivingPolicy for ShortestPathPolicy {
    fn name(&self) -> &'static str {
        "shortest-path"
    }

    fn choose_lane(
        &mut self,
        _ctx: &PolicyContext,
        _roaduser: &Roaduser,
        _current: Option<LaneId>,
        outgoing: &[LaneId],
        shortest: &[PathEntry],
        rng: &mut SimRng,
    ) -> Option<LaneId> {
        candidates(outgoing, shortest).choose(rng).map(|p| p.lane)
    }
}
