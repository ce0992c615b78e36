use super::{candidates, queue_length, DrivingPolicy, PolicyContext};
use crate::roaduser::Roaduser;
use crate::shortest_path::PathEntry;
use crate::{LaneId, SimRng};

/// Picks the legal shortest path lane with the fewest road users on it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LeastBusyPolicy;

impl LeastBusyPolicy {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn pick(ctx: &PolicyContext, candidates: &[PathEntry]) -> Option<LaneId> {
        candidates
            .iter()
            .min_by_key(|p| (queue_length(ctx.network, p.lane), p.length))
            .map(|p| p.lane)
    }
}

impl DrivingPolicy for LeastBusyPolicy {
    fn name(&self) -> &'static str {
        "least-busy"
    }

    fn choose_lane(
        &mut self,
        ctx: &PolicyContext,
        _roaduser: &Roaduser,
        _current: Option<LaneId>,
        outgoing: &[LaneId],
        shortest: &[PathEntry],
        _rng: &mut SimRng,
    ) -> Option<LaneId> {
        Self::pick(ctx, &candidates(outgoing, shortest))
    }
}
