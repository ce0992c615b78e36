//! Road users arriving at entry nodes and entering the network.

use log::{debug, info, warn};
use rand_distr::{Distribution, Poisson, WeightedIndex};
use smallvec::SmallVec;

use super::Simulation;
use crate::policy::{self, PolicyContext};
use crate::roaduser::{Roaduser, RoaduserAttributes};
use crate::{LaneId, NodeId};

impl Simulation {
    /// Generates new road users at every special node, then lets queued road
    /// users enter the network where there is room.
    pub(super) fn spawn_all(&mut self) {
        let specials = self
            .network
            .iter_nodes()
            .filter(|node| node.is_special())
            .map(|node| node.id())
            .collect::<Vec<_>>();

        if !self.locked {
            for node in specials.iter().copied() {
                self.generate(node);
            }
        }
        for node in specials.iter().copied() {
            self.enter_network(node);
        }
        self.update_lock(&specials);
    }

    /// Queues the road users arriving at a special node this cycle.
    fn generate(&mut self, node_id: NodeId) {
        let Some(special) = self.network.node(node_id).special() else {
            return;
        };
        let spawns = special.spawn_frequencies().to_vec();
        let dests = special.dest_frequencies().to_vec();

        for spawn in spawns.iter().filter(|s| s.rate > 0.0) {
            let arrivals = match Poisson::new(spawn.rate) {
                Ok(poisson) => poisson.sample(&mut self.rng) as usize,
                Err(err) => {
                    warn!("Spawn rate {} at {node_id:?} is unusable: {err}", spawn.rate);
                    continue;
                }
            };
            if arrivals == 0 {
                continue;
            }
            let candidates = dests
                .iter()
                .filter(|d| d.kind == spawn.kind && d.weight > 0.0 && d.dest != node_id)
                .collect::<Vec<_>>();
            let Ok(dist) = WeightedIndex::new(candidates.iter().map(|d| d.weight)) else {
                debug!("No destination for {:?} spawned at {node_id:?}", spawn.kind);
                continue;
            };

            for _ in 0..arrivals {
                let dest = candidates[dist.sample(&mut self.rng)].dest;
                let attributes = RoaduserAttributes::from(spawn.kind);
                let cycle = self.cycle;
                let id = self.network.roadusers.insert_with_key(|id| {
                    Roaduser::new(id, &attributes, node_id, dest, cycle)
                });
                if let Some(special) = self.network.nodes[node_id].special_mut() {
                    special.waiting.push_back(id);
                }
            }
        }
    }

    /// Lets road users queued at a special node enter the network, in order,
    /// until one finds no room.
    fn enter_network(&mut self, node_id: NodeId) {
        loop {
            let node = self.network.node(node_id);
            let Some(id) = node.special().and_then(|s| s.waiting.front().copied()) else {
                return;
            };
            let Some(roaduser) = self.network.roadusers.get(id) else {
                if let Some(special) = self.network.nodes[node_id].special_mut() {
                    special.waiting.pop_front();
                }
                continue;
            };

            let outgoing = self
                .network
                .leaving_lanes(node_id)
                .filter(|lane| self.network.lanes[*lane].allows(roaduser.kind()))
                .collect::<SmallVec<[LaneId; 8]>>();
            let shortest = node
                .shortest_paths()
                .lanes(roaduser.destination(), roaduser.kind());
            let ctx = PolicyContext {
                network: &self.network,
                colearn: self.controller.colearning(),
            };
            let Some(lane) = policy::route(
                self.policy.as_mut(),
                &ctx,
                roaduser,
                None,
                &outgoing,
                shortest,
                self.config.rerouting,
                &mut self.rng,
            ) else {
                return;
            };
            let lanes = &self.network.lanes;
            let Some(pos) = lanes[lane].tail_position(&self.network.roadusers, roaduser.length())
            else {
                return;
            };

            if let Some(special) = self.network.nodes[node_id].special_mut() {
                special.waiting.pop_front();
            }
            self.network.roadusers[id].set_location(lane, pos, self.cycle);
            self.network.lanes[lane].push_tail(id);
            self.entered += 1;
        }
    }

    /// Suspends spawning when an entry queue reaches its cap and resumes it
    /// once the queues have drained below it.
    fn update_lock(&mut self, specials: &[NodeId]) {
        let max = self.config.max_waiting_queue;
        let queues = specials
            .iter()
            .filter_map(|node| self.network.node(*node).special())
            .map(|special| special.num_waiting());
        let (longest, total) = queues.fold((0, 0), |(longest, total), n| {
            (longest.max(n), total + n)
        });

        if !self.locked && longest >= max {
            warn!("Entry queue reached {longest} road users, spawning suspended");
            self.locked = true;
        } else if self.locked && total < max {
            info!("Entry queues drained to {total} road users, spawning resumed");
            self.locked = false;
        }
    }
}
