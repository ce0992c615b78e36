//! Tests of the shortest path data and the driving policies.

mod common;

use junction_sim::{
    ColearnPolicy, Colearning, DrivingPolicy, LaneAttributes, LeastBusyPolicy, Network, NodeId,
    PathEntry, Point2d, PolicyContext, RoadAttributes, RoaduserKind, SignId, SimConfig, SimError,
    SimRng, Simulation, Slot, TopologyError, WeightedPolicy,
};
use rand::SeedableRng;

#[test]
fn path_lengths_through_a_junction() {
    let cross = common::cross(30, false);
    let [north, east, south, _] = cross.edges;
    let sim = Simulation::new(cross.network, SimConfig::default()).unwrap();
    let network = sim.network();

    let from_north = network.node(north).shortest_paths();
    assert_eq!(from_north.min_length(south, RoaduserKind::Car), Some(60));
    assert_eq!(from_north.lanes(south, RoaduserKind::Car).len(), 1);
    assert!(from_north.min_length(north, RoaduserKind::Car).is_none());

    let at_junction = network.node(cross.junction).shortest_paths();
    let exit = common::lane_between(network, cross.junction, east);
    assert_eq!(at_junction.lanes(east, RoaduserKind::Bus)[0].lane, exit);
    assert_eq!(at_junction.min_length(east, RoaduserKind::Bus), Some(30));
}

#[test]
fn recomputing_shortest_paths_is_idempotent() {
    let (network, _) = detour(false);
    let mut sim = Simulation::new(network, SimConfig::default()).unwrap();
    let before = sim
        .network()
        .iter_nodes()
        .map(|node| node.shortest_paths().clone())
        .collect::<Vec<_>>();
    sim.recompute_shortest_paths();
    sim.recompute_shortest_paths();
    let after = sim
        .network()
        .iter_nodes()
        .map(|node| node.shortest_paths().clone())
        .collect::<Vec<_>>();
    assert_eq!(before, after);
}

/// A network where the way from `j1` to `b` is either direct (length 20) or a
/// detour through `j3` (length 25).
fn detour(traffic_light: bool) -> (Network, [NodeId; 5]) {
    let mut network = Network::new();
    let a = network.add_edge_node(Point2d::new(-10.0, 0.0));
    let b = network.add_edge_node(Point2d::new(0.0, 20.0));
    let j1 = network.add_junction(Point2d::new(0.0, 0.0));
    let j2 = network.add_junction(Point2d::new(0.0, 10.0));
    let j3 = network.add_junction(Point2d::new(5.0, 0.0));
    let lanes = [LaneAttributes {
        traffic_light,
        ..Default::default()
    }];
    let roads = [
        ((a, Slot::EAST), (j1, Slot::WEST), 10),
        ((j1, Slot::NORTH), (j2, Slot::SOUTH), 10),
        ((j2, Slot::NORTH), (b, Slot::SOUTH), 10),
        ((j1, Slot::EAST), (j3, Slot::WEST), 5),
        ((j3, Slot::NORTH), (j2, Slot::EAST), 10),
    ];
    for (alpha, beta, length) in roads {
        network
            .add_road(&RoadAttributes {
                alpha,
                beta,
                length: Some(length),
                to_alpha: &lanes,
                to_beta: &lanes,
            })
            .unwrap();
    }
    (network, [a, b, j1, j2, j3])
}

#[test]
fn derivation_factor_admits_near_shortest_paths() {
    let (network, [_, b, j1, j2, j3]) = detour(false);
    let direct = common::lane_between(&network, j1, j2);
    let around = common::lane_between(&network, j1, j3);
    let mut sim = Simulation::new(network, SimConfig::default()).unwrap();

    let lanes = sim.network().node(j1).shortest_paths().lanes(b, RoaduserKind::Car);
    assert_eq!(lanes.len(), 1);
    assert_eq!((lanes[0].lane, lanes[0].length), (direct, 20));

    sim.set_derivation_factor(1.3);
    let lanes = sim.network().node(j1).shortest_paths().lanes(b, RoaduserKind::Car);
    assert_eq!(lanes.len(), 2);
    assert_eq!((lanes[0].lane, lanes[0].length), (direct, 20));
    assert_eq!((lanes[1].lane, lanes[1].length), (around, 25));

    // Below one is treated as one.
    sim.set_derivation_factor(0.5);
    assert_eq!(
        sim.network().node(j1).shortest_paths().lanes(b, RoaduserKind::Car).len(),
        1
    );
}

#[test]
fn lanes_restricted_to_other_classes_are_avoided() {
    let mut network = Network::new();
    let a = network.add_edge_node(Point2d::new(0.0, 0.0));
    let b = network.add_edge_node(Point2d::new(10.0, 0.0));
    let bus_only = [LaneAttributes {
        mask: RoaduserKind::Bus.mask(),
        ..Default::default()
    }];
    network
        .add_road(&RoadAttributes {
            alpha: (a, Slot::EAST),
            beta: (b, Slot::WEST),
            length: Some(10),
            to_alpha: &bus_only,
            to_beta: &bus_only,
        })
        .unwrap();
    let sim = Simulation::new(network, SimConfig::default()).unwrap();
    let paths = sim.network().node(a).shortest_paths();
    assert_eq!(paths.min_length(b, RoaduserKind::Bus), Some(10));
    assert!(paths.min_length(b, RoaduserKind::Car).is_none());
}

#[test]
fn unreachable_destination_fails_validation() {
    let mut network = Network::new();
    let a = network.add_edge_node(Point2d::new(0.0, 0.0));
    let b = network.add_edge_node(Point2d::new(10.0, 0.0));
    let bus_only = [LaneAttributes {
        mask: RoaduserKind::Bus.mask(),
        ..Default::default()
    }];
    network
        .add_road(&RoadAttributes {
            alpha: (a, Slot::EAST),
            beta: (b, Slot::WEST),
            length: Some(10),
            to_alpha: &bus_only,
            to_beta: &bus_only,
        })
        .unwrap();
    network.add_spawn_frequency(a, RoaduserKind::Bus, 0.1).unwrap();
    network
        .add_dest_frequency(a, b, RoaduserKind::Bus, 1.0)
        .unwrap();
    assert!(Simulation::new(network.clone(), SimConfig::default()).is_ok());

    network.add_spawn_frequency(a, RoaduserKind::Car, 0.1).unwrap();
    network
        .add_dest_frequency(a, b, RoaduserKind::Car, 1.0)
        .unwrap();
    let err = Simulation::new(network, SimConfig::default()).err().unwrap();
    assert_eq!(
        err,
        SimError::Topology(TopologyError::NoPath {
            from: a,
            to: b,
            kind: RoaduserKind::Car,
        })
    );
}

/// Road users headed for a node without shortest path data are rerouted onto
/// any lane, and counted as misrouted where they leave.
#[test]
fn rerouting_moves_roadusers_without_a_path() {
    for rerouting in [true, false] {
        let cross = common::cross(10, false);
        let [north, ..] = cross.edges;
        let junction = cross.junction;
        let edges = cross.edges;
        let lane = common::lane_between(&cross.network, north, junction);
        let config = SimConfig {
            rerouting,
            ..Default::default()
        };
        let mut sim = Simulation::new(cross.network, config).unwrap();
        let car = sim
            .add_roaduser(&RoaduserKind::Car.into(), lane, 0, junction)
            .unwrap();

        for _ in 0..20 {
            sim.step().unwrap();
        }
        let misrouted = edges
            .iter()
            .map(|edge| sim.network().node(*edge).special().unwrap().stats().misrouted)
            .sum::<usize>();
        if rerouting {
            assert_eq!(sim.arrived(), 1);
            assert_eq!(misrouted, 1);
        } else {
            assert_eq!(sim.arrived(), 0);
            assert_eq!(sim.network().roaduser(car).unwrap().lane_id(), Some(lane));
        }
    }
}

/// Whatever the policy, spawned traffic reaches its destinations.
#[test]
fn policies_deliver_traffic() {
    for policy in 0..3 {
        let mut cross = common::cross(12, true);
        common::add_traffic(&mut cross, 0.1);
        let config = SimConfig {
            seed: 5,
            ..Default::default()
        };
        let mut sim = Simulation::new(cross.network, config).unwrap();
        sim = match policy {
            0 => sim,
            1 => sim.with_policy(LeastBusyPolicy::new()),
            _ => sim.with_policy(WeightedPolicy::new()),
        };
        for _ in 0..300 {
            sim.step().unwrap();
        }
        sim.check_invariants().unwrap();
        assert!(sim.arrived() > 0, "{} delivered nothing", sim.policy().name());
        let misrouted = sim
            .network()
            .iter_nodes()
            .filter_map(|node| node.special())
            .map(|special| special.stats().misrouted)
            .sum::<usize>();
        assert_eq!(misrouted, 0);
    }
}

/// Colearn values looked up by the sign a lane ends at.
struct SignCosts(Vec<(SignId, f64)>);

impl Colearning for SignCosts {
    fn colearn_value(&self, _from: SignId, to: SignId, _dest: NodeId, _pos: u32) -> f64 {
        self.0
            .iter()
            .find(|(sign, _)| *sign == to)
            .map_or(0.0, |(_, cost)| *cost)
    }
}

#[test]
fn colearn_policy_picks_the_cheapest_light() {
    let (network, [a, b, j1, j2, j3]) = detour(true);
    let current = common::lane_between(&network, a, j1);
    let direct = common::lane_between(&network, j1, j2);
    let around = common::lane_between(&network, j1, j3);
    let mut sim = Simulation::new(network, SimConfig::default()).unwrap();
    let car = sim
        .add_roaduser(&RoaduserKind::Car.into(), current, 0, b)
        .unwrap();

    let network = sim.network();
    let roaduser = network.roaduser(car).unwrap();
    let outgoing = network.outgoing_lanes(current);
    let shortest = [
        PathEntry {
            lane: direct,
            length: 20,
        },
        PathEntry {
            lane: around,
            length: 25,
        },
    ];
    let (direct_sign, around_sign) = (network.lane(direct).sign(), network.lane(around).sign());
    assert!(network.sign(direct_sign).is_traffic_light());
    let mut rng = SimRng::seed_from_u64(0);
    let mut policy = ColearnPolicy::new();
    let mut choose = |colearn: Option<&dyn Colearning>, current| {
        let ctx = PolicyContext { network, colearn };
        policy.choose_lane(&ctx, roaduser, current, &outgoing, &shortest, &mut rng)
    };

    let costs: &dyn Colearning = &SignCosts(vec![(direct_sign, 3.0), (around_sign, 1.0)]);
    assert_eq!(choose(Some(costs), Some(current)), Some(around));
    let costs: &dyn Colearning = &SignCosts(vec![(direct_sign, 1.0), (around_sign, 3.0)]);
    assert_eq!(choose(Some(costs), Some(current)), Some(direct));

    // Without estimates, or on entry, the emptier lane wins and ties go to the shorter path.
    assert_eq!(choose(None, Some(current)), Some(direct));
    assert_eq!(choose(Some(costs), None), Some(direct));
}

#[test]
fn colearn_policy_falls_back_to_the_least_busy_lane() {
    let (network, [a, b, j1, j2, j3]) = detour(true);
    let current = common::lane_between(&network, a, j1);
    let direct = common::lane_between(&network, j1, j2);
    let around = common::lane_between(&network, j1, j3);
    let mut sim = Simulation::new(network, SimConfig::default()).unwrap();
    let car = sim
        .add_roaduser(&RoaduserKind::Car.into(), current, 0, b)
        .unwrap();
    sim.add_roaduser(&RoaduserKind::Car.into(), direct, 4, b)
        .unwrap();

    let network = sim.network();
    let shortest = [
        PathEntry {
            lane: direct,
            length: 20,
        },
        PathEntry {
            lane: around,
            length: 25,
        },
    ];
    let ctx = PolicyContext {
        network,
        colearn: None,
    };
    let chosen = ColearnPolicy::new().choose_lane(
        &ctx,
        network.roaduser(car).unwrap(),
        Some(current),
        &network.outgoing_lanes(current),
        &shortest,
        &mut SimRng::seed_from_u64(0),
    );
    assert_eq!(chosen, Some(around));
}
