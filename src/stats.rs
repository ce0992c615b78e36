//! Per-cycle statistics handed to an external collector.

use crate::LaneId;

/// The occupancy of one lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LaneStats {
    pub lane: LaneId,
    /// The number of road users on the lane.
    pub roadusers: usize,
    /// The number of road users waiting at the sign.
    pub waiting: usize,
}

/// A snapshot of the simulation taken at the end of a cycle.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CycleStats {
    pub cycle: usize,
    /// Road users that entered the network so far.
    pub entered: usize,
    /// Road users that reached a special node so far.
    pub arrived: usize,
    /// Road users removed for being stuck so far.
    pub removed: usize,
    /// Road users currently on a lane.
    pub in_network: usize,
    /// Road users queued at entry nodes.
    pub waiting_at_entry: usize,
    /// Accidents so far.
    pub accidents: usize,
    /// Lanes currently closed.
    pub disabled_lanes: usize,
    /// Whether spawning is suspended because an entry queue overflowed.
    pub locked: bool,
    pub lanes: Vec<LaneStats>,
}

/// Receives a snapshot after every cycle.
pub trait StatsSink {
    fn record_cycle(&mut self, stats: &CycleStats);
}

/// Discards every snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl StatsSink for NullSink {
    fn record_cycle(&mut self, _stats: &CycleStats) {}
}

impl StatsSink for Vec<CycleStats> {
    fn record_cycle(&mut self, stats: &CycleStats) {
        self.push(stats.clone());
    }
}
