use super::{candidates, DrivingPolicy, LeastBusyPolicy, PolicyContext};
use crate::roaduser::Roaduser;
use crate::shortest_path::PathEntry;
use crate::{LaneId, SimRng};

/// Picks the shortest path lane ending at the traffic light with the lowest
/// learned cost, as estimated by the traffic light controller.
///
/// Falls back to [LeastBusyPolicy] when the controller offers no estimates,
/// when the road user is entering the network, or when no candidate ends at a
/// traffic light.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColearnPolicy;

impl ColearnPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl DrivingPolicy for ColearnPolicy {
    fn name(&self) -> &'static str {
        "colearn"
    }

    fn choose_lane(
        &mut self,
        ctx: &PolicyContext,
        roaduser: &Roaduser,
        current: Option<LaneId>,
        outgoing: &[LaneId],
        shortest: &[PathEntry],
        _rng: &mut SimRng,
    ) -> Option<LaneId> {
        let candidates = candidates(outgoing, shortest);
        let (Some(colearn), Some(current)) = (ctx.colearn, current) else {
            return LeastBusyPolicy::pick(ctx, &candidates);
        };
        let from = ctx.network.lane(current).sign();

        candidates
            .iter()
            .filter_map(|p| {
                let lane = ctx.network.lane(p.lane);
                let sign = ctx.network.sign(lane.sign());
                if !sign.is_traffic_light() {
                    return None;
                }
                let pos = lane.length().saturating_sub(roaduser.length());
                let value = colearn.colearn_value(from, sign.id(), roaduser.destination(), pos);
                Some((p.lane, value))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(lane, _)| lane)
            .or_else(|| LeastBusyPolicy::pick(ctx, &candidates))
    }
}
