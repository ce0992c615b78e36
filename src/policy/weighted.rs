use rand_distr::{Distribution, WeightedIndex};
use smallvec::SmallVec;

use super::{candidates, queue_length, DrivingPolicy, PolicyContext};
use crate::roaduser::Roaduser;
use crate::shortest_path::PathEntry;
use crate::util::MovingAverage;
use crate::{LaneId, SimRng};

/// The smoothing factor of the signal scale averages.
const SMOOTHING: f64 = 0.05;

/// Draws a lane at random, favouring short paths and lanes with few road users.
///
/// The two signals live on very different scales, so each is divided by its
/// exponential moving average before they are added into a weight.
#[derive(Clone, Debug)]
pub struct WeightedPolicy {
    /// Average of the inverse path length.
    inv_length: MovingAverage,
    /// Average of the inverse queue length.
    inv_queue: MovingAverage,
}

impl WeightedPolicy {
    pub fn new() -> Self {
        Self {
            inv_length: MovingAverage::new(SMOOTHING),
            inv_queue: MovingAverage::new(SMOOTHING),
        }
    }
}

impl Default for WeightedPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl DrivingPolicy for WeightedPolicy {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn choose_lane(
        &mut self,
        ctx: &PolicyContext,
        _roaduser: &Roaduser,
        _current: Option<LaneId>,
        outgoing: &[LaneId],
        shortest: &[PathEntry],
        rng: &mut SimRng,
    ) -> Option<LaneId> {
        let candidates = candidates(outgoing, shortest);
        if candidates.is_empty() {
            return None;
        }
        let signals = candidates
            .iter()
            .map(|p| {
                let inv_length = 1.0 / f64::from(p.length.max(1));
                let inv_queue = 1.0 / (1.0 + queue_length(ctx.network, p.lane) as f64);
                (inv_length, inv_queue)
            })
            .collect::<SmallVec<[_; 8]>>();

        let n = signals.len() as f64;
        let avg_length = self
            .inv_length
            .update(signals.iter().map(|s| s.0).sum::<f64>() / n);
        let avg_queue = self
            .inv_queue
            .update(signals.iter().map(|s| s.1).sum::<f64>() / n);

        let weights = signals
            .iter()
            .map(|(l, q)| l / avg_length + q / avg_queue);
        let dist = WeightedIndex::new(weights).ok()?;
        Some(candidates[dist.sample(rng)].lane)
    }
}
