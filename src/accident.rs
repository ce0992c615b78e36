//! Accidents randomly close lanes and reopen them later.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};

use crate::error::TopologyError;
use crate::lane::Turn;
use crate::network::Network;
use crate::{LaneId, SimRng};

/// The number of lanes tried before giving up on an accident this cycle.
const MAX_ATTEMPTS: usize = 5;

/// The accident subsystem and the single owner of the set of disabled lanes.
#[derive(Clone, Debug, Default)]
pub struct Accidents {
    /// One accident is attempted per this many cycles on average; zero disables accidents.
    rate: u32,
    /// The lanes currently closed, in the order they were closed.
    disabled: Vec<LaneId>,
    /// The number of accidents so far.
    count: usize,
}

impl Accidents {
    pub fn new(rate: u32) -> Self {
        Self {
            rate,
            ..Default::default()
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: u32) {
        self.rate = rate;
    }

    /// The lanes currently closed.
    pub fn disabled(&self) -> &[LaneId] {
        &self.disabled
    }

    /// The number of accidents so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Possibly closes one lane and possibly reopens another.
    /// Returns whether the topology changed.
    pub(crate) fn step(&mut self, network: &mut Network, rng: &mut SimRng) -> bool {
        if self.rate == 0 {
            return false;
        }
        let mut changed = false;

        if rng.gen_range(0..self.rate) == 0 {
            for _ in 0..MAX_ATTEMPTS {
                let Some(lane) = self.pick_lane(network, rng) else {
                    break;
                };
                match self.disable_lane(network, lane) {
                    Ok(()) => {
                        changed = true;
                        break;
                    }
                    Err(err) => debug!("Accident on {lane:?} rolled back: {err}"),
                }
            }
        }

        if !self.disabled.is_empty() && rng.gen_range(0..self.rate) == 0 {
            if let Some(lane) = self.disabled.choose(rng).copied() {
                changed |= self.enable_lane(network, lane).is_ok();
            }
        }

        changed
    }

    /// Picks an open lane, favouring lanes with more road users on them.
    fn pick_lane(&self, network: &Network, rng: &mut SimRng) -> Option<LaneId> {
        let lanes = network
            .iter_lanes()
            .filter(|lane| lane.is_enabled())
            .map(|lane| (lane.id(), 1 + lane.queue().len()))
            .collect::<Vec<_>>();
        let dist = WeightedIndex::new(lanes.iter().map(|(_, w)| *w)).ok()?;
        Some(lanes[dist.sample(rng)].0)
    }

    /// Closes a lane. Fails, leaving the lane open, if that would leave a dead end.
    pub fn disable_lane(
        &mut self,
        network: &mut Network,
        lane: LaneId,
    ) -> Result<(), TopologyError> {
        let current = network.lanes.get(lane).ok_or(TopologyError::UnknownLane(lane))?;
        if !current.is_enabled() {
            return Err(TopologyError::AlreadyDisabled(lane));
        }
        set_lane_open(network, lane, false);
        if let Err(err) = check_dead_ends(network) {
            set_lane_open(network, lane, true);
            return Err(err);
        }
        self.disabled.push(lane);
        self.count += 1;
        debug!("Lane {lane:?} closed by an accident");
        Ok(())
    }

    /// Reopens a lane closed by an accident.
    pub fn enable_lane(
        &mut self,
        network: &mut Network,
        lane: LaneId,
    ) -> Result<(), TopologyError> {
        let idx = self
            .disabled
            .iter()
            .position(|l| *l == lane)
            .ok_or(TopologyError::NotDisabled(lane))?;
        self.disabled.remove(idx);
        set_lane_open(network, lane, true);
        debug!("Lane {lane:?} reopened");
        Ok(())
    }

    /// Reopens every closed lane.
    pub(crate) fn clear(&mut self, network: &mut Network) {
        for lane in self.disabled.drain(..) {
            set_lane_open(network, lane, true);
        }
        self.count = 0;
    }
}

/// Opens or closes a lane, updating the targets of the lanes that feed into its road.
fn set_lane_open(network: &mut Network, lane_id: LaneId, open: bool) {
    network.lanes[lane_id].set_enabled(open);

    let lane = &network.lanes[lane_id];
    let (node_id, road_id) = (lane.from(), lane.road());
    let node = &network.nodes[node_id];
    let Some(slot) = node.slot_of(road_id) else {
        return;
    };
    let road_open = network
        .leaving_lanes(node_id)
        .any(|id| network.lanes[id].road() == road_id);

    let feeders = network
        .incoming_lanes(node_id)
        .filter_map(|id| {
            let from = node.slot_of(network.lanes[id].road())?;
            let turn = Turn::ALL.into_iter().find(|t| t.target_slot(from) == slot)?;
            Some((id, turn))
        })
        .collect::<Vec<_>>();
    for (id, turn) in feeders {
        network.lanes[id].set_target(turn, road_open);
    }
}

/// Checks that every open lane into a junction leads somewhere and every
/// spawning special node has a lane to spawn on.
pub(crate) fn check_dead_ends(network: &Network) -> Result<(), TopologyError> {
    for lane in network.iter_lanes() {
        let to = network.node(lane.to());
        if to.is_junction() && lane.is_enabled() && network.outgoing_lanes(lane.id()).is_empty() {
            return Err(TopologyError::DeadEnd(lane.id()));
        }
    }
    for node in network.iter_nodes() {
        let spawns = node
            .special()
            .is_some_and(|s| s.spawn_frequencies().iter().any(|f| f.rate > 0.0));
        if spawns && network.leaving_lanes(node.id()).next().is_none() {
            return Err(TopologyError::NoEntryLane(node.id()));
        }
    }
    Ok(())
}
