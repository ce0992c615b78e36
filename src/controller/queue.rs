use super::{TlController, TlDecisions};
use crate::network::Network;
use crate::SimRng;

/// What a [QueueTlc] measures on each lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueMeasure {
    /// The number of road users waiting at the sign.
    Waiting,
    /// The length units taken up by road users waiting at the sign.
    BlockedSpace,
    /// The fraction of the lane taken up by road users.
    Relative,
}

/// Gives each light a gain equal to the size of the queue behind it.
#[derive(Clone, Copy, Debug)]
pub struct QueueTlc {
    measure: QueueMeasure,
}

impl QueueTlc {
    pub fn new(measure: QueueMeasure) -> Self {
        Self { measure }
    }

    pub fn measure(&self) -> QueueMeasure {
        self.measure
    }
}

impl Default for QueueTlc {
    fn default() -> Self {
        Self::new(QueueMeasure::Waiting)
    }
}

impl TlController for QueueTlc {
    fn name(&self) -> &'static str {
        match self.measure {
            QueueMeasure::Waiting => "longest-queue",
            QueueMeasure::BlockedSpace => "most-blocked-space",
            QueueMeasure::Relative => "relative-queue",
        }
    }

    fn decide_tls(&mut self, network: &Network, decisions: &mut TlDecisions, _rng: &mut SimRng) {
        let roadusers = network.roadusers();
        for decision in decisions.decisions_mut() {
            let lane = network.lane(decision.lane);
            decision.gain = match self.measure {
                QueueMeasure::Waiting => lane.num_waiting(roadusers) as f64,
                QueueMeasure::BlockedSpace => f64::from(lane.blocked_space(roadusers)),
                QueueMeasure::Relative => lane.occupancy(roadusers),
            };
        }
    }
}
