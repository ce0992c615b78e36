use log::debug;

use crate::controller::TlDecisions;
use crate::network::Network;
use crate::sign::SignConfig;
use crate::{LaneId, NodeId, SignId};

/// Turns controller gains into legal green configurations at every junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignController {
    /// Keep a light green while the road user at its sign has chosen its next lane
    /// and is waiting for room on it.
    pub cross_nodes_safely: bool,
    /// The minimum number of cycles a configuration stays green.
    pub min_green: usize,
    /// After this many cycles a configuration may be switched even if it strands a road user.
    pub max_green: usize,
}

impl Default for SignController {
    fn default() -> Self {
        Self {
            cross_nodes_safely: true,
            min_green: 1,
            max_green: 20,
        }
    }
}

impl SignController {
    /// Switches on the first legal configuration of every junction that has none active.
    pub(crate) fn initialize(&self, network: &mut Network) {
        let junctions = network
            .iter_nodes()
            .filter(|node| node.junction().is_some_and(|j| j.active.is_none()))
            .map(|node| node.id())
            .collect::<Vec<_>>();
        for node in junctions {
            self.activate(network, node, 0);
        }
    }

    /// Chooses, for each junction, the legal configuration with the highest summed gain.
    pub fn switch_signs(&self, network: &mut Network, decisions: &TlDecisions) {
        for node_decisions in decisions.iter() {
            let node = node_decisions.node;
            let Some(junction) = network.node(node).junction() else {
                continue;
            };
            let gain = |config: &SignConfig| -> f64 {
                node_decisions
                    .decisions
                    .iter()
                    .filter(|d| config.contains(&d.sign))
                    .map(|d| d.gain)
                    .sum()
            };
            let best = junction
                .configs
                .iter()
                .enumerate()
                .map(|(idx, config)| (idx, gain(config)))
                .fold(None, |best: Option<(usize, f64)>, (idx, gain)| match best {
                    Some((_, best_gain)) if best_gain >= gain => best,
                    _ => Some((idx, gain)),
                });
            let Some((best, _)) = best else {
                continue;
            };

            let keep = match junction.active {
                Some(active) if active == best => true,
                Some(_) if junction.since < self.min_green => true,
                Some(active) => {
                    let (current, next) = (&junction.configs[active], &junction.configs[best]);
                    self.cross_nodes_safely
                        && junction.since < self.max_green
                        && self.strands_roaduser(network, current, next)
                }
                None => false,
            };

            if keep {
                if let Some(junction) = network.nodes[node].junction_mut() {
                    junction.since += 1;
                }
            } else {
                self.activate(network, node, best);
            }
        }
    }

    /// Whether switching from `active` to `next` would turn red a light that a
    /// road user is committed to crossing.
    fn strands_roaduser(&self, network: &Network, active: &SignConfig, next: &SignConfig) -> bool {
        active
            .iter()
            .filter(|sign| !next.contains(sign))
            .map(|sign| network.sign(*sign).lane())
            .any(|lane| is_crossing(network, lane))
    }

    /// Makes the given configuration the only green one at the junction.
    fn activate(&self, network: &mut Network, node: NodeId, config: usize) {
        let Some(junction) = network.nodes[node].junction_mut() else {
            return;
        };
        let green = junction.configs.get(config).cloned().unwrap_or_default();
        let lights: Vec<SignId> = junction.lights.clone();
        junction.active = junction.configs.get(config).map(|_| config);
        junction.since = 0;

        for sign in lights {
            network.signs[sign].set_green(green.contains(&sign));
        }
        debug!("Junction {node:?} switched to configuration {config}");
    }
}

/// Whether the road user at the head of the lane is waiting at the sign with a lane chosen.
///
/// A road user only keeps a chosen lane while that lane has no room for it, so
/// this holds the light for a blocked road user until it can cross or
/// `max_green` runs out.
fn is_crossing(network: &Network, lane: LaneId) -> bool {
    network
        .lane(lane)
        .queue()
        .first()
        .and_then(|id| network.roaduser(*id))
        .is_some_and(|ru| ru.position() == 0 && ru.desired.is_some())
}
