//! A discrete-time traffic simulation.
//!
//! Road users travel through a network of junctions, roads and lanes towards
//! their destinations. A pluggable [TlController] decides which traffic lights
//! should turn green, the [SignController] turns those decisions into legal
//! light configurations, and a pluggable [DrivingPolicy] routes each road user
//! at every junction it crosses.

pub use accident::Accidents;
pub use config::{SimConfig, StuckPolicy};
pub use controller::{
    Colearning, Light, NextState, NodeDecisions, PosMov, QueueMeasure, QueueTlc, RandomTlc,
    RoaduserMove, StateKey, StateValues, Tc1, Tc1Params, TlController, TlDecision, TlDecisions,
};
pub use description::{
    InfraDescription, LaneDescription, NodeDescription, NodeType, RoadDescription,
};
pub use driver::SimDriver;
pub use error::{SimError, TopologyError};
pub use lane::{Lane, LaneAttributes, Targets, Turn};
pub use network::Network;
pub use node::{
    ArrivalStats, DestFrequency, Junction, Node, NodeKind, SpawnFrequency, SpecialNode,
};
pub use policy::{
    ColearnPolicy, DrivingPolicy, LeastBusyPolicy, PolicyContext, ShortestPathPolicy,
    WeightedPolicy,
};
pub use road::{Road, RoadAttributes, Slot};
pub use roaduser::{Roaduser, RoaduserAttributes, RoaduserKind, TypeMask};
pub use shortest_path::{PathEntry, SpData};
pub use sign::{Sign, SignConfig, SignKind};
pub use sign_controller::SignController;
pub use simulation::{SeriesSummary, Simulation};
pub use slotmap::{Key, KeyData};
pub use stats::{CycleStats, LaneStats, NullSink, StatsSink};
pub use util::Interval;

mod accident;
mod config;
mod controller;
mod debug;
mod description;
mod driver;
mod error;
mod lane;
mod network;
mod node;
mod policy;
mod road;
mod roaduser;
mod shortest_path;
mod sign;
mod sign_controller;
mod simulation;
mod stats;
mod util;

/// A 2D point
pub type Point2d = cgmath::Point2<f64>;

/// The random number generator driving every random draw of a simulation.
pub type SimRng = rand_chacha::ChaCha8Rng;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Unique ID of a [Node].
    pub struct NodeId;
    /// Unique ID of a [Road].
    pub struct RoadId;
    /// Unique ID of a [Lane].
    pub struct LaneId;
    /// Unique ID of a [Sign].
    pub struct SignId;
    /// Unique ID of a [Roaduser].
    pub struct RoaduserId;
}

type NodeSet = SlotMap<NodeId, Node>;
type RoadSet = SlotMap<RoadId, Road>;
type LaneSet = SlotMap<LaneId, Lane>;
type SignSet = SlotMap<SignId, Sign>;
type RoaduserSet = SlotMap<RoaduserId, Roaduser>;
