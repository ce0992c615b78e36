use log::{debug, error, info};
use once_cell::sync::Lazy;
use rand::distributions::Standard;
use rand::{Rng, SeedableRng};

use crate::accident::{check_dead_ends, Accidents};
use crate::config::{SimConfig, StuckPolicy};
use crate::controller::{QueueTlc, StateKey, StateValues, TlController, TlDecisions};
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::error::{SimError, TopologyError};
use crate::network::Network;
use crate::policy::{DrivingPolicy, ShortestPathPolicy};
use crate::roaduser::{Roaduser, RoaduserAttributes};
use crate::shortest_path;
use crate::sign_controller::SignController;
use crate::stats::{CycleStats, LaneStats, NullSink, StatsSink};
use crate::{LaneId, NodeId, RoaduserId, SimRng};

mod movement;
mod spawn;

/// The base seeds of consecutive series, mixed with [SimConfig::seed].
static SERIES_SEEDS: Lazy<Vec<u64>> = Lazy::new(|| {
    SimRng::seed_from_u64(0x7fa1_5eed)
        .sample_iter(Standard)
        .take(64)
        .collect()
});

/// The seed of the given series.
fn series_seed(series: usize, seed: u64) -> u64 {
    let table = &*SERIES_SEEDS;
    table[series % table.len()] ^ seed ^ (series / table.len()) as u64
}

/// The outcome of one series of a [Simulation::run_series] batch.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesSummary {
    /// The index of the series.
    pub series: usize,
    /// The seed the series was run with.
    pub seed: u64,
    /// The number of cycles simulated.
    pub cycles: usize,
    /// The statistics after the last simulated cycle.
    pub stats: CycleStats,
    /// The fault that abandoned the series, if any.
    pub error: Option<SimError>,
}

impl SeriesSummary {
    /// Whether every requested cycle was simulated.
    pub fn completed(&self) -> bool {
        self.error.is_none()
    }
}

/// A traffic simulation session: the network together with the controllers,
/// the policy, the random generator and the counters driving it.
pub struct Simulation {
    /// The road network.
    network: Network,
    /// The scalar settings.
    config: SimConfig,
    /// Assigns gains to traffic lights.
    controller: Box<dyn TlController>,
    /// Routes road users.
    policy: Box<dyn DrivingPolicy>,
    /// Turns gains into light configurations.
    sign_controller: SignController,
    /// The accident subsystem, owner of the disabled lanes.
    accidents: Accidents,
    /// The gains of the current cycle.
    decisions: TlDecisions,
    /// The only source of randomness.
    rng: SimRng,
    /// The current cycle.
    cycle: usize,
    /// The current series.
    series: usize,
    /// Road users that entered the network.
    entered: usize,
    /// Road users that reached a special node.
    arrived: usize,
    /// Road users removed for being stuck.
    removed: usize,
    /// Whether spawning is suspended because an entry queue overflowed.
    locked: bool,
    /// Whether a driver is stepping the simulation.
    running: bool,
    /// Debugging information from the previously simulated cycle.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Simulation {
    /// Creates a simulation of the given network, routing road users along
    /// shortest paths and switching lights by queue length.
    pub fn new(mut network: Network, config: SimConfig) -> Result<Self, SimError> {
        network.prepare_sign_configs();
        shortest_path::compute(&mut network, config.derivation_factor);
        validate(&network)?;

        let sign_controller = SignController {
            cross_nodes_safely: config.cross_nodes_safely,
            min_green: config.min_green,
            max_green: config.max_green,
        };
        sign_controller.initialize(&mut network);
        let decisions = TlDecisions::new(&network);

        Ok(Self {
            network,
            config,
            controller: Box::new(QueueTlc::default()),
            policy: Box::new(ShortestPathPolicy),
            sign_controller,
            accidents: Accidents::new(config.accident_rate),
            decisions,
            rng: SimRng::seed_from_u64(series_seed(0, config.seed)),
            cycle: 0,
            series: 0,
            entered: 0,
            arrived: 0,
            removed: 0,
            locked: false,
            running: false,
            #[cfg(feature = "debug")]
            debug: serde_json::Value::Null,
        })
    }

    /// Replaces the traffic light controller.
    pub fn with_controller(mut self, controller: impl TlController + 'static) -> Self {
        self.set_controller(Box::new(controller));
        self
    }

    /// Replaces the driving policy.
    pub fn with_policy(mut self, policy: impl DrivingPolicy + 'static) -> Self {
        self.set_policy(Box::new(policy));
        self
    }

    pub fn set_controller(&mut self, controller: Box<dyn TlController>) {
        debug!("Traffic light controller set to {}", controller.name());
        self.controller = controller;
    }

    pub fn set_policy(&mut self, policy: Box<dyn DrivingPolicy>) {
        debug!("Driving policy set to {}", policy.name());
        self.policy = policy;
    }

    /// Advances the simulation by one cycle.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.step_with(&mut NullSink)
    }

    /// Advances the simulation by one cycle and reports the resulting statistics to `sink`.
    pub fn step_with(&mut self, sink: &mut dyn StatsSink) -> Result<(), SimError> {
        self.cycle += 1;
        self.move_all()?;
        if self.accidents.step(&mut self.network, &mut self.rng) {
            self.recompute_shortest_paths();
        }
        self.spawn_all();
        self.decide_tls();
        self.sign_controller
            .switch_signs(&mut self.network, &self.decisions);

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }

        sink.record_cycle(&self.snapshot());
        Ok(())
    }

    /// Recomputes the gain of every traffic light and returns the decisions.
    pub fn decide_tls(&mut self) -> &TlDecisions {
        self.decisions.reset_gains();
        self.controller
            .decide_tls(&self.network, &mut self.decisions, &mut self.rng);
        &self.decisions
    }

    /// Places a road user directly on a lane. It counts as having entered the network.
    pub fn add_roaduser(
        &mut self,
        attributes: &RoaduserAttributes,
        lane: LaneId,
        pos: u32,
        dest: NodeId,
    ) -> Result<RoaduserId, SimError> {
        let lane_ref = self
            .network
            .lanes
            .get(lane)
            .ok_or(TopologyError::UnknownLane(lane))?;
        if !self.network.nodes.contains_key(dest) {
            return Err(TopologyError::UnknownNode(dest).into());
        }
        if !lane_ref.is_free(&self.network.roadusers, pos, attributes.length) {
            return Err(SimError::NoRoom { lane, pos });
        }
        let origin = lane_ref.from();
        let cycle = self.cycle;
        let id = self.network.roadusers.insert_with_key(|id| {
            let mut roaduser = Roaduser::new(id, attributes, origin, dest, cycle);
            roaduser.set_location(lane, pos, cycle);
            roaduser
        });
        self.network.lanes[lane].insert_roaduser(&self.network.roadusers, id);
        self.entered += 1;
        Ok(id)
    }

    /// Closes a lane as an accident would.
    pub fn disable_lane(&mut self, lane: LaneId) -> Result<(), SimError> {
        self.accidents.disable_lane(&mut self.network, lane)?;
        self.recompute_shortest_paths();
        Ok(())
    }

    /// Reopens a lane closed by an accident.
    pub fn enable_lane(&mut self, lane: LaneId) -> Result<(), SimError> {
        self.accidents.enable_lane(&mut self.network, lane)?;
        self.recompute_shortest_paths();
        Ok(())
    }

    /// Recomputes the shortest path data of every node.
    pub fn recompute_shortest_paths(&mut self) {
        shortest_path::compute(&mut self.network, self.config.derivation_factor);
    }

    /// Verifies lane ordering, conservation of road users and the legality of every green set.
    pub fn check_invariants(&self) -> Result<(), SimError> {
        let roadusers = self.network.roadusers();
        for lane in self.network.iter_lanes() {
            if let Some(id) = lane.queue().iter().find(|id| !roadusers.contains_key(**id)) {
                return Err(SimError::MissingRoaduser(*id));
            }
            if !lane.is_consistent(roadusers) {
                return Err(SimError::LaneOrder(lane.id()));
            }
        }

        let present = self.num_in_network();
        let left = self.arrived + self.removed;
        if self.entered != left + present {
            return Err(SimError::Conservation {
                entered: self.entered,
                left,
                present,
            });
        }

        for node in self.network.iter_nodes() {
            let Some(junction) = node.junction() else {
                continue;
            };
            let green = self.network.green_signs(node.id());
            if green.is_empty() {
                continue;
            }
            let legal = junction
                .active_config()
                .is_some_and(|config| green.iter().all(|sign| config.contains(sign)));
            if !legal {
                return Err(SimError::IllegalLights(node.id()));
            }
        }
        Ok(())
    }

    /// The statistics of the current cycle.
    pub fn snapshot(&self) -> CycleStats {
        let roadusers = self.network.roadusers();
        CycleStats {
            cycle: self.cycle,
            entered: self.entered,
            arrived: self.arrived,
            removed: self.removed,
            in_network: self.num_in_network(),
            waiting_at_entry: self
                .network
                .iter_nodes()
                .filter_map(|node| node.special())
                .map(|special| special.num_waiting())
                .sum(),
            accidents: self.accidents.count(),
            disabled_lanes: self.accidents.disabled().len(),
            locked: self.locked,
            lanes: self
                .network
                .iter_lanes()
                .map(|lane| LaneStats {
                    lane: lane.id(),
                    roadusers: lane.queue().len(),
                    waiting: lane.num_waiting(roadusers),
                })
                .collect(),
        }
    }

    fn num_in_network(&self) -> usize {
        self.network
            .iter_roadusers()
            .filter(|ru| ru.lane_id().is_some())
            .count()
    }

    /// The learned values of a state, without disturbing the simulation.
    pub fn inspect(&self, key: &StateKey) -> Option<StateValues> {
        self.controller.inspect(key)
    }

    /// Every value learned by the traffic light controller as JSON.
    pub fn export_tables(&self) -> serde_json::Value {
        self.controller.export_tables()
    }

    /// Clears every road user, reopens every lane, forgets what the controller
    /// learned and reseeds for the current series.
    ///
    /// Fails with [SimError::Running] while a driver is stepping the simulation.
    pub fn reset(&mut self) -> Result<(), SimError> {
        if self.running {
            return Err(SimError::Running);
        }
        for lane in self.network.lanes.values_mut() {
            lane.clear();
        }
        self.network.roadusers.clear();
        for node in self.network.nodes.values_mut() {
            if let Some(special) = node.special_mut() {
                special.waiting.clear();
                special.stats = Default::default();
            }
            if let Some(junction) = node.junction_mut() {
                junction.active = None;
            }
        }
        self.accidents.clear(&mut self.network);
        self.recompute_shortest_paths();
        self.sign_controller.initialize(&mut self.network);
        self.decisions.reset_gains();
        self.controller.reset();

        self.cycle = 0;
        self.entered = 0;
        self.arrived = 0;
        self.removed = 0;
        self.locked = false;
        self.rng = SimRng::seed_from_u64(self.seed());
        Ok(())
    }

    /// Moves on to the next series.
    pub fn next_series(&mut self) -> Result<(), SimError> {
        if self.running {
            return Err(SimError::Running);
        }
        self.series += 1;
        self.reset()
    }

    /// Runs `count` independent series of `cycles` cycles each, starting from
    /// the current series. A series hit by a fault is abandoned and the batch
    /// continues with the next one.
    pub fn run_series(
        &mut self,
        count: usize,
        cycles: usize,
        sink: &mut dyn StatsSink,
    ) -> Result<Vec<SeriesSummary>, SimError> {
        let mut summaries = Vec::with_capacity(count);
        for i in 0..count {
            if i == 0 {
                self.reset()?;
            } else {
                self.next_series()?;
            }
            info!("Series {} started with seed {}", self.series, self.seed());

            let mut fault = None;
            for _ in 0..cycles {
                if let Err(err) = self.step_with(sink) {
                    error!("Series {} abandoned at cycle {}: {err}", self.series, self.cycle);
                    fault = Some(err);
                    break;
                }
            }
            let summary = SeriesSummary {
                series: self.series,
                seed: self.seed(),
                cycles: self.cycle,
                stats: self.snapshot(),
                error: fault,
            };
            info!(
                "Series {} finished: {} entered, {} arrived, {} removed",
                summary.series, summary.stats.entered, summary.stats.arrived, summary.stats.removed
            );
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// The seed of the current series.
    pub fn seed(&self) -> u64 {
        series_seed(self.series, self.config.seed)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The current cycle.
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// The current series.
    pub fn series(&self) -> usize {
        self.series
    }

    /// The number of road users that entered the network.
    pub fn entered(&self) -> usize {
        self.entered
    }

    /// The number of road users that reached a special node.
    pub fn arrived(&self) -> usize {
        self.arrived
    }

    /// The number of road users removed for being stuck.
    pub fn removed(&self) -> usize {
        self.removed
    }

    /// Whether spawning is suspended because an entry queue overflowed.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn controller(&self) -> &dyn TlController {
        self.controller.as_ref()
    }

    pub fn policy(&self) -> &dyn DrivingPolicy {
        self.policy.as_ref()
    }

    /// The gains computed at the end of the last cycle.
    pub fn decisions(&self) -> &TlDecisions {
        &self.decisions
    }

    pub fn accidents(&self) -> &Accidents {
        &self.accidents
    }

    pub fn sign_controller(&self) -> &SignController {
        &self.sign_controller
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.config.seed = seed;
    }

    pub fn set_accident_rate(&mut self, rate: u32) {
        self.config.accident_rate = rate;
        self.accidents.set_rate(rate);
    }

    /// Sets the derivation factor and recomputes the shortest paths.
    pub fn set_derivation_factor(&mut self, factor: f64) {
        self.config.derivation_factor = factor;
        self.recompute_shortest_paths();
    }

    pub fn set_max_waiting_queue(&mut self, max: usize) {
        self.config.max_waiting_queue = max;
    }

    pub fn set_rerouting(&mut self, rerouting: bool) {
        self.config.rerouting = rerouting;
    }

    pub fn set_stuck_policy(&mut self, policy: Option<StuckPolicy>) {
        self.config.stuck_cars = policy;
    }

    pub fn set_cross_nodes_safely(&mut self, safely: bool) {
        self.config.cross_nodes_safely = safely;
        self.sign_controller.cross_nodes_safely = safely;
    }

    pub fn set_green_limits(&mut self, min_green: usize, max_green: usize) {
        self.config.min_green = min_green;
        self.config.max_green = max_green;
        self.sign_controller.min_green = min_green;
        self.sign_controller.max_green = max_green;
    }

    /// Gets the debugging information for the previously simulated cycle as a JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        self.debug.clone()
    }
}

/// Checks that a freshly built network can be simulated.
fn validate(network: &Network) -> Result<(), TopologyError> {
    check_dead_ends(network)?;
    for node in network.iter_nodes() {
        if let Some(junction) = node.junction() {
            if !junction.lights().is_empty() && junction.sign_configs().is_empty() {
                return Err(TopologyError::NoSignConfig(node.id()));
            }
        }
    }
    shortest_path::check_routes(network)
}
