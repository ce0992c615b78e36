use rand::Rng;

use super::{TlController, TlDecisions};
use crate::network::Network;
use crate::SimRng;

/// Assigns uniformly random gains, as a baseline.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTlc;

impl RandomTlc {
    pub fn new() -> Self {
        Self
    }
}

impl TlController for RandomTlc {
    fn name(&self) -> &'static str {
        "random"
    }

    fn decide_tls(&mut self, _network: &Network, decisions: &mut TlDecisions, rng: &mut SimRng) {
        for decision in decisions.decisions_mut() {
            decision.gain = rng.gen();
        }
    }
}
