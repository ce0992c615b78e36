//! Driving policies decide which lane a road user takes next.

use rand::seq::SliceRandom;
use smallvec::SmallVec;

use crate::controller::Colearning;
use crate::network::Network;
use crate::roaduser::Roaduser;
use crate::shortest_path::PathEntry;
use crate::{LaneId, SimRng};

pub use colearn::ColearnPolicy;
pub use least_busy::LeastBusyPolicy;
pub use shortest::ShortestPathPolicy;
pub use weighted::WeightedPolicy;

mod colearn;
mod least_busy;
mod shortest;
mod weighted;

/// Read-only view of the simulation handed to a driving policy.
pub struct PolicyContext<'a> {
    /// The road network.
    pub network: &'a Network,
    /// The learned value estimates of the traffic light controller, if it provides any.
    pub colearn: Option<&'a dyn Colearning>,
}

/// A routing strategy.
pub trait DrivingPolicy: Send {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    /// Chooses the lane the road user takes next.
    ///
    /// # Parameters
    /// * `current` - The lane the road user is on, or `None` when entering the network
    /// * `outgoing` - Every lane the road user may legally take next
    /// * `shortest` - The lanes at the node that lie on a shortest path to the destination
    fn choose_lane(
        &mut self,
        ctx: &PolicyContext,
        roaduser: &Roaduser,
        current: Option<LaneId>,
        outgoing: &[LaneId],
        shortest: &[PathEntry],
        rng: &mut SimRng,
    ) -> Option<LaneId>;
}

/// The shortest path entries that are also legal next lanes.
pub(crate) fn candidates(outgoing: &[LaneId], shortest: &[PathEntry]) -> SmallVec<[PathEntry; 8]> {
    shortest
        .iter()
        .filter(|p| outgoing.contains(&p.lane))
        .copied()
        .collect()
}

/// Asks the policy for a lane, falling back to a rerouting search when no
/// shortest path candidate is available.
#[allow(clippy::too_many_arguments)]
pub(crate) fn route(
    policy: &mut dyn DrivingPolicy,
    ctx: &PolicyContext,
    roaduser: &Roaduser,
    current: Option<LaneId>,
    outgoing: &[LaneId],
    shortest: &[PathEntry],
    rerouting: bool,
    rng: &mut SimRng,
) -> Option<LaneId> {
    if let Some(lane) = policy.choose_lane(ctx, roaduser, current, outgoing, shortest, rng) {
        return Some(lane);
    }
    if !rerouting || outgoing.is_empty() {
        return None;
    }
    let near = outgoing
        .iter()
        .copied()
        .filter(|lane| reaches_junction(ctx.network, *lane, 2))
        .collect::<SmallVec<[LaneId; 8]>>();
    near.choose(rng).or_else(|| outgoing.first()).copied()
}

/// Whether a junction can be reached within `hops` lanes, starting with `lane`.
fn reaches_junction(network: &Network, lane: LaneId, hops: usize) -> bool {
    if hops == 0 {
        return false;
    }
    network.node(network.lane(lane).to()).is_junction()
        || network
            .outgoing_lanes(lane)
            .iter()
            .any(|next| reaches_junction(network, *next, hops - 1))
}

/// The number of road users on a lane.
pub(crate) fn queue_length(network: &Network, lane: LaneId) -> usize {
    network.lane(lane).queue().len()
}
