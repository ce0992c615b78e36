//! The per-cycle movement of road users along lanes and across junctions.

use log::debug;
use smallvec::SmallVec;

use super::Simulation;
use crate::controller::{NextState, PosMov, RoaduserMove};
use crate::debug::{debug_exit, debug_pos_movs};
use crate::error::SimError;
use crate::policy::{self, PolicyContext};
use crate::{LaneId, RoaduserId};

/// How deep lanes may ask the lanes they feed into to move first.
const MAX_LANE_DEPTH: usize = 64;

/// What became of a road user this cycle.
struct Outcome {
    next: NextState,
    next_lane: Option<LaneId>,
    desired: Option<LaneId>,
    blocked: bool,
    penalty: f64,
}

impl Simulation {
    /// Moves every road user once.
    pub(super) fn move_all(&mut self) -> Result<(), SimError> {
        for lane in self.lane_order() {
            self.move_lane(lane, 0)?;
        }
        Ok(())
    }

    /// Every lane, grouped by the node it leads to. At each node lanes with a
    /// higher gain in the previous cycle go first.
    fn lane_order(&self) -> Vec<LaneId> {
        let mut order = Vec::with_capacity(self.network.lanes.len());
        for node in self.network.iter_nodes() {
            let gains = self.decisions.node(node.id());
            let mut lanes = self
                .network
                .incoming_lanes(node.id())
                .map(|lane| {
                    let sign = self.network.lane(lane).sign();
                    let gain = gains
                        .and_then(|n| n.decisions.iter().find(|d| d.sign == sign))
                        .map_or(0.0, |d| d.gain);
                    (lane, gain)
                })
                .collect::<Vec<_>>();
            lanes.sort_by(|a, b| b.1.total_cmp(&a.1));
            order.extend(lanes.into_iter().map(|(lane, _)| lane));
        }
        order
    }

    /// Moves the road users on a lane that haven't moved yet this cycle,
    /// nearest the sign first.
    fn move_lane(&mut self, lane_id: LaneId, depth: usize) -> Result<(), SimError> {
        let cycle = self.cycle;
        let lane = &mut self.network.lanes[lane_id];
        if lane.cycle_asked == cycle {
            return Ok(());
        }
        lane.cycle_asked = cycle;

        let mut idx = 0;
        while let Some(id) = self.network.lanes[lane_id].queue().get(idx).copied() {
            let roaduser = self
                .network
                .roadusers
                .get(id)
                .ok_or(SimError::MissingRoaduser(id))?;
            if roaduser.cycle_moved == cycle {
                idx += 1;
                continue;
            }
            if !self.move_roaduser(lane_id, idx, id, depth)? {
                idx += 1;
            }
        }
        self.network.lanes[lane_id].cycle_moved = cycle;
        Ok(())
    }

    /// Moves one road user. Returns whether it left the lane.
    fn move_roaduser(
        &mut self,
        lane_id: LaneId,
        idx: usize,
        id: RoaduserId,
        depth: usize,
    ) -> Result<bool, SimError> {
        let cycle = self.cycle;
        let lane = &self.network.lanes[lane_id];
        let (sign, node) = (lane.sign(), lane.to());
        let roaduser = &self.network.roadusers[id];
        let (kind, passengers) = (roaduser.kind(), roaduser.passengers());
        let dest = roaduser.destination();
        let prev_pos = roaduser.position();
        let reaches_sign = idx == 0 && prev_pos < roaduser.speed();
        let green = self.network.sign(sign).may_drive();
        let special = self.network.node(node).is_special();

        let pos_movs = self.pos_movs(lane_id, idx, id, reaches_sign && !special);
        debug_pos_movs(roaduser, &pos_movs);

        let mut outcome = Outcome {
            next: NextState::At { sign, pos: prev_pos },
            next_lane: Some(lane_id),
            desired: None,
            blocked: false,
            penalty: 0.0,
        };

        if reaches_sign && special {
            self.network.lanes[lane_id].remove_roaduser(id);
            let roaduser = self
                .network
                .roadusers
                .remove(id)
                .ok_or(SimError::MissingRoaduser(id))?;
            self.network.nodes[node].enter(&roaduser, cycle);
            self.arrived += 1;
            debug_exit(&roaduser, "arrived");
            outcome.next = NextState::Arrived;
            outcome.next_lane = None;
        } else {
            if reaches_sign && green {
                outcome.desired = self.choose_next_lane(lane_id, id);
            }
            let crossed = match outcome.desired {
                Some(target) => self.try_cross(lane_id, id, target, depth)?,
                None => None,
            };
            match crossed {
                Some(pos) => {
                    outcome.next = NextState::At {
                        sign: self.network.lane(outcome.desired.unwrap_or(lane_id)).sign(),
                        pos,
                    };
                    outcome.next_lane = outcome.desired;
                }
                None => {
                    outcome.blocked = outcome.desired.is_some();
                    let limit = self.network.lanes[lane_id].limit(&self.network.roadusers, idx);
                    let roaduser = &mut self.network.roadusers[id];
                    roaduser.desired = outcome.desired;
                    roaduser.cycle_moved = cycle;
                    let pos = roaduser.advance(limit, sign, cycle);
                    outcome.next = NextState::At { sign, pos };
                    if self.remove_if_stuck(lane_id, id) {
                        outcome.next = NextState::Removed;
                        outcome.next_lane = None;
                        outcome.penalty = self.config.stuck_cars.map_or(0.0, |p| p.penalty);
                    }
                }
            }
        }

        let mv = RoaduserMove {
            roaduser: id,
            kind,
            passengers,
            dest,
            prev_lane: lane_id,
            prev_sign: sign,
            prev_pos,
            green,
            next: outcome.next,
            next_lane: outcome.next_lane,
            desired: outcome.desired,
            blocked: outcome.blocked,
            pos_movs: &pos_movs,
            penalty: outcome.penalty,
        };
        self.controller.update_roaduser_move(&self.network, &mv);

        Ok(outcome.next_lane != Some(lane_id))
    }

    /// The positions a road user could reach this cycle: its furthest position
    /// on the current lane and, if it can cross, the tail of every lane it may enter.
    fn pos_movs(
        &self,
        lane_id: LaneId,
        idx: usize,
        id: RoaduserId,
        may_cross: bool,
    ) -> SmallVec<[PosMov; 4]> {
        let lane = &self.network.lanes[lane_id];
        let roaduser = &self.network.roadusers[id];
        let limit = lane.limit(&self.network.roadusers, idx);
        let mut pos_movs = SmallVec::new();
        pos_movs.push(PosMov {
            sign: lane.sign(),
            pos: roaduser.position().saturating_sub(roaduser.speed()).max(limit),
        });
        if may_cross {
            for out in self.network.outgoing_lanes(lane_id) {
                let out = &self.network.lanes[out];
                if let (true, Some(pos)) = (
                    out.allows(roaduser.kind()),
                    out.length().checked_sub(roaduser.length()),
                ) {
                    pos_movs.push(PosMov {
                        sign: out.sign(),
                        pos,
                    });
                }
            }
        }
        pos_movs
    }

    /// The lane a road user at the sign heads for: the one it committed to
    /// earlier if that is still open, otherwise the driving policy's choice.
    fn choose_next_lane(&mut self, lane_id: LaneId, id: RoaduserId) -> Option<LaneId> {
        let roaduser = &self.network.roadusers[id];
        let outgoing = self
            .network
            .outgoing_lanes(lane_id)
            .into_iter()
            .filter(|lane| self.network.lanes[*lane].allows(roaduser.kind()))
            .collect::<SmallVec<[LaneId; 8]>>();
        if let Some(desired) = roaduser.desired.filter(|lane| outgoing.contains(lane)) {
            return Some(desired);
        }

        let node = self.network.node(self.network.lane(lane_id).to());
        let shortest = node
            .shortest_paths()
            .lanes(roaduser.destination(), roaduser.kind());
        let ctx = PolicyContext {
            network: &self.network,
            colearn: self.controller.colearning(),
        };
        policy::route(
            self.policy.as_mut(),
            &ctx,
            roaduser,
            Some(lane_id),
            &outgoing,
            shortest,
            self.config.rerouting,
            &mut self.rng,
        )
    }

    /// Moves a road user at the sign onto the tail of `target` if there is room,
    /// first letting `target` move if it hasn't yet. Returns the new position.
    fn try_cross(
        &mut self,
        lane_id: LaneId,
        id: RoaduserId,
        target: LaneId,
        depth: usize,
    ) -> Result<Option<u32>, SimError> {
        let length = self.network.roadusers[id].length();
        let mut room = self.network.lanes[target].tail_position(&self.network.roadusers, length);
        if room.is_none()
            && self.network.lanes[target].cycle_asked != self.cycle
            && depth < MAX_LANE_DEPTH
        {
            self.move_lane(target, depth + 1)?;
            room = self.network.lanes[target].tail_position(&self.network.roadusers, length);
        }
        let Some(pos) = room else {
            return Ok(None);
        };

        self.network.lanes[lane_id].remove_roaduser(id);
        self.network.roadusers[id].set_location(target, pos, self.cycle);
        self.network.lanes[target].push_tail(id);
        Ok(Some(pos))
    }

    /// Removes a road user that has not advanced for too long. Returns whether it was removed.
    fn remove_if_stuck(&mut self, lane_id: LaneId, id: RoaduserId) -> bool {
        let Some(policy) = self.config.stuck_cars else {
            return false;
        };
        let roaduser = &self.network.roadusers[id];
        if self.cycle - roaduser.cycle_advanced <= policy.max_waiting_time {
            return false;
        }
        self.network.lanes[lane_id].remove_roaduser(id);
        if let Some(roaduser) = self.network.roadusers.remove(id) {
            debug!(
                "Road user {id:?} removed after {} cycles without advancing",
                self.cycle - roaduser.cycle_advanced
            );
            debug_exit(&roaduser, "stuck");
        }
        self.removed += 1;
        true
    }
}
