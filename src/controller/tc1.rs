//! A model-based reinforcement learning controller.
//!
//! The state of a road user is the sign it is queued at, its position on the
//! lane and its destination. For every state the controller counts how often
//! each light colour was seen and which state followed, turns the counts into
//! transition probabilities, and keeps
//!
//! * `Q(s, L) = Σ P(s' | s, L) · (R(s, s') + γ · V(s'))`, and
//! * `V(s) = P(green | s) · Q(s, green) + P(red | s) · Q(s, red)`,
//!
//! where the cost `R` is 1 when the road user did not advance. The gain of a
//! light is the passenger-weighted sum of `Q(s, red) - Q(s, green)` over the
//! road users waiting at it: the waiting a green light is expected to save.
//! Every position a road user could have reached is entered as a possible
//! outcome, so the tables grow along the reachable states.

use std::collections::BTreeMap;

use log::debug;
use rand::Rng;
use serde_json::json;

use super::{Colearning, NextState, PosMov, RoaduserMove, TlController, TlDecisions};
use crate::network::Network;
use crate::{NodeId, SignId, SimRng};

/// The colour of a traffic light as seen by a road user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Light {
    Red = 0,
    Green = 1,
}

impl Light {
    fn index(self) -> usize {
        self as usize
    }
}

impl From<bool> for Light {
    fn from(green: bool) -> Self {
        if green {
            Light::Green
        } else {
            Light::Red
        }
    }
}

/// Identifies a learning state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey {
    pub sign: SignId,
    pub pos: u32,
    pub dest: NodeId,
}

/// The learned values of a state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StateValues {
    /// The expected cost under a red and a green light.
    pub q: [f64; 2],
    /// The expected cost under the observed mix of lights.
    pub v: f64,
}

impl StateValues {
    /// The expected cost saved by a green rather than a red light.
    pub fn green_benefit(&self) -> f64 {
        self.q[Light::Red.index()] - self.q[Light::Green.index()]
    }
}

/// The tunable parameters of [Tc1].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tc1Params {
    /// The discount factor.
    pub gamma: f64,
    /// The chance that a light's computed gain is replaced by noise.
    pub random_chance: f64,
}

impl Default for Tc1Params {
    fn default() -> Self {
        Self {
            gamma: 0.95,
            random_chance: 0.01,
        }
    }
}

/// An observed outcome from a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct CountKey {
    light: Light,
    next: NextState,
}

/// The tables kept for one state.
#[derive(Clone, Debug, Default)]
struct StateEntry {
    values: StateValues,
    /// Occurrences of each light colour.
    light_counts: [u64; 2],
    /// Occurrences of each outcome.
    counts: BTreeMap<CountKey, u64>,
    /// The penalty of the most recent forced removal from this state.
    penalty: f64,
}

/// The reinforcement learning traffic light controller.
#[derive(Clone, Debug, Default)]
pub struct Tc1 {
    params: Tc1Params,
    states: BTreeMap<StateKey, StateEntry>,
    /// Per pair of consecutive signs, how often the next lane had room and how often not.
    flows: BTreeMap<(SignId, SignId), [u64; 2]>,
}

impl Tc1 {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_params(params: Tc1Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn params(&self) -> Tc1Params {
        self.params
    }

    /// Sets the discount factor.
    pub fn set_gamma(&mut self, gamma: f64) {
        self.params.gamma = gamma;
    }

    /// Sets the chance of replacing a computed gain by noise.
    pub fn set_random_chance(&mut self, chance: f64) {
        self.params.random_chance = chance.clamp(0.0, 1.0);
    }

    /// The learned values of a state.
    pub fn values(&self, key: &StateKey) -> Option<StateValues> {
        self.states.get(key).map(|entry| entry.values)
    }

    /// The number of states in the tables, observed or reachable.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Records one transition from `key` under `light` and updates the values of `key`.
    pub fn observe(&mut self, key: StateKey, light: Light, next: NextState, penalty: f64) {
        let entry = self.states.entry(key).or_default();
        entry.light_counts[light.index()] += 1;
        *entry.counts.entry(CountKey { light, next }).or_default() += 1;
        if next == NextState::Removed {
            entry.penalty = penalty;
        }
        self.recompute(&key);
    }

    /// Adds the states a road user in `key` could have reached under `light` as
    /// outcomes that have not occurred yet, creating their table entries.
    pub fn register_reachable(&mut self, key: StateKey, light: Light, reachable: &[PosMov]) {
        for pos_mov in reachable {
            let next = NextState::At {
                sign: pos_mov.sign,
                pos: pos_mov.pos,
            };
            self.states
                .entry(key)
                .or_default()
                .counts
                .entry(CountKey { light, next })
                .or_insert(0);
            self.states
                .entry(StateKey {
                    sign: pos_mov.sign,
                    pos: pos_mov.pos,
                    dest: key.dest,
                })
                .or_default();
        }
    }

    /// The number of outcomes known for a state, observed or merely reachable.
    pub fn num_outcomes(&self, key: &StateKey) -> usize {
        self.states.get(key).map_or(0, |entry| entry.counts.len())
    }

    /// Recomputes `Q` and `V` of a state from its counts.
    fn recompute(&mut self, key: &StateKey) {
        let Some(entry) = self.states.get(key) else {
            return;
        };
        let mut q = entry.values.q;
        for light in [Light::Red, Light::Green] {
            let total = entry.light_counts[light.index()];
            if total == 0 {
                continue;
            }
            q[light.index()] = entry
                .counts
                .iter()
                .filter(|(k, _)| k.light == light)
                .map(|(k, n)| {
                    let p = *n as f64 / total as f64;
                    p * (self.cost(key, k.next, entry.penalty)
                        + self.params.gamma * self.next_value(key, k.next))
                })
                .sum();
        }
        let seen = entry.light_counts.iter().sum::<u64>() as f64;
        let v: f64 = [Light::Red, Light::Green]
            .into_iter()
            .map(|light| entry.light_counts[light.index()] as f64 / seen * q[light.index()])
            .sum();

        if let Some(entry) = self.states.get_mut(key) {
            entry.values = StateValues { q, v };
        }
    }

    /// The immediate cost of moving from `key` to `next`.
    fn cost(&self, key: &StateKey, next: NextState, penalty: f64) -> f64 {
        match next {
            NextState::At { sign, pos } if sign == key.sign && pos == key.pos => 1.0,
            NextState::At { .. } | NextState::Arrived => 0.0,
            NextState::Removed => penalty,
        }
    }

    /// The value of the state a road user heading to `key.dest` reaches.
    fn next_value(&self, key: &StateKey, next: NextState) -> f64 {
        match next {
            NextState::At { sign, pos } => self
                .states
                .get(&StateKey {
                    sign,
                    pos,
                    dest: key.dest,
                })
                .map(|entry| entry.values.v)
                .unwrap_or(0.0),
            NextState::Arrived | NextState::Removed => 0.0,
        }
    }

    /// The fraction of road users from `from` towards `to` that found no room.
    fn blocked_fraction(&self, from: SignId, to: SignId) -> f64 {
        match self.flows.get(&(from, to)) {
            Some([free, blocked]) if free + blocked > 0 => {
                *blocked as f64 / (free + blocked) as f64
            }
            _ => 0.0,
        }
    }
}

impl Colearning for Tc1 {
    fn colearn_value(&self, from: SignId, to: SignId, dest: NodeId, pos: u32) -> f64 {
        let value = self
            .values(&StateKey {
                sign: to,
                pos,
                dest,
            })
            .map(|v| v.v)
            .unwrap_or(0.0);
        value + self.blocked_fraction(from, to)
    }
}

impl TlController for Tc1 {
    fn name(&self) -> &'static str {
        "tc1"
    }

    fn decide_tls(&mut self, network: &Network, decisions: &mut TlDecisions, rng: &mut SimRng) {
        let chance = self.params.random_chance.clamp(0.0, 1.0);
        for decision in decisions.decisions_mut() {
            if rng.gen_bool(chance) {
                decision.gain = rng.gen();
                continue;
            }
            let lane = network.lane(decision.lane);
            decision.gain = lane
                .waiting(network.roadusers())
                .filter_map(|id| network.roaduser(id))
                .map(|ru| {
                    let key = StateKey {
                        sign: decision.sign,
                        pos: ru.position(),
                        dest: ru.destination(),
                    };
                    let benefit = self.values(&key).map(|v| v.green_benefit()).unwrap_or(0.0);
                    f64::from(ru.passengers()) * benefit
                })
                .sum();
        }
    }

    fn update_roaduser_move(&mut self, network: &Network, mv: &RoaduserMove) {
        let key = StateKey {
            sign: mv.prev_sign,
            pos: mv.prev_pos,
            dest: mv.dest,
        };
        let light = Light::from(mv.green);
        self.register_reachable(key, light, mv.pos_movs);
        self.observe(key, light, mv.next, mv.penalty);

        if let Some(desired) = mv.desired {
            let to = network.lane(desired).sign();
            self.flows.entry((mv.prev_sign, to)).or_default()[usize::from(mv.blocked)] += 1;
        }
    }

    fn colearning(&self) -> Option<&dyn Colearning> {
        Some(self)
    }

    fn inspect(&self, key: &StateKey) -> Option<StateValues> {
        self.values(key)
    }

    fn export_tables(&self) -> serde_json::Value {
        let states = self
            .states
            .iter()
            .map(|(key, entry)| {
                json!({
                    "sign": format!("{:?}", key.sign),
                    "pos": key.pos,
                    "dest": format!("{:?}", key.dest),
                    "q_red": entry.values.q[Light::Red.index()],
                    "q_green": entry.values.q[Light::Green.index()],
                    "v": entry.values.v,
                    "seen": entry.light_counts,
                })
            })
            .collect::<Vec<_>>();
        json!({ "controller": self.name(), "states": states })
    }

    fn reset(&mut self) {
        debug!("Forgetting {} learned states", self.states.len());
        self.states.clear();
        self.flows.clear();
    }
}
