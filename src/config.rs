/// Forced removal of road users that stop advancing.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StuckPolicy {
    /// A road user that has not advanced for more than this many cycles is removed.
    pub max_waiting_time: usize,
    /// The cost reported to the traffic light controller for a removal.
    pub penalty: f64,
}

impl Default for StuckPolicy {
    fn default() -> Self {
        Self {
            max_waiting_time: 100,
            penalty: 100.0,
        }
    }
}

/// The scalar settings of a simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Mixed into the seed of every series.
    pub seed: u64,
    /// One accident is attempted per this many cycles on average; zero disables accidents.
    pub accident_rate: u32,
    /// Paths up to this many times the shortest length count as shortest.
    pub derivation_factor: f64,
    /// Road users queued at one entry node before the simulation locks.
    pub max_waiting_queue: usize,
    /// Whether road users without a shortest path candidate search for another lane.
    pub rerouting: bool,
    /// Removal of stuck road users, if enabled.
    pub stuck_cars: Option<StuckPolicy>,
    /// Keep a light green while a road user is committed to crossing.
    pub cross_nodes_safely: bool,
    /// The minimum number of cycles a light configuration stays green.
    pub min_green: usize,
    /// The number of cycles after which a configuration may strand a road user.
    pub max_green: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            accident_rate: 0,
            derivation_factor: 1.0,
            max_waiting_queue: 200,
            rerouting: true,
            stuck_cars: None,
            cross_nodes_safely: true,
            min_green: 1,
            max_green: 20,
        }
    }
}
