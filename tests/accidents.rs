//! Tests of lanes closed and reopened by accidents.

mod common;

use junction_sim::{
    LaneAttributes, Network, Point2d, RoadAttributes, SimConfig, SimError, Simulation, Slot,
    TopologyError, Turn,
};

/// A junction with only two roads: closing either outgoing lane strands the other side.
#[test]
fn closing_the_only_way_on_is_rejected() {
    let mut network = Network::new();
    let junction = network.add_junction(Point2d::new(0.0, 0.0));
    let north = network.add_edge_node(Point2d::new(0.0, 10.0));
    let south = network.add_edge_node(Point2d::new(0.0, -10.0));
    let lanes = [LaneAttributes::default()];
    for (edge, slot) in [(north, Slot::NORTH), (south, Slot::SOUTH)] {
        network
            .add_road(&RoadAttributes {
                alpha: (junction, slot),
                beta: (edge, slot.opposite()),
                length: Some(10),
                to_alpha: &lanes,
                to_beta: &lanes,
            })
            .unwrap();
    }
    let exit = common::lane_between(&network, junction, south);
    let feeder = common::lane_between(&network, north, junction);
    let mut sim = Simulation::new(network, SimConfig::default()).unwrap();

    let err = sim.disable_lane(exit).unwrap_err();
    assert_eq!(err, SimError::Topology(TopologyError::DeadEnd(feeder)));
    assert!(sim.network().lane(exit).is_enabled());
    assert!(sim.network().lane(feeder).targets().get(Turn::Straight));
    assert!(sim.accidents().disabled().is_empty());
    assert_eq!(sim.accidents().count(), 0);
}

#[test]
fn closing_and_reopening_a_lane() {
    let cross = common::cross(20, true);
    let [north, east, south, west] = cross.edges;
    let exit = common::lane_between(&cross.network, cross.junction, north);
    let from_south = common::lane_between(&cross.network, south, cross.junction);
    let from_east = common::lane_between(&cross.network, east, cross.junction);
    let from_west = common::lane_between(&cross.network, west, cross.junction);
    let mut sim = Simulation::new(cross.network, SimConfig::default()).unwrap();
    assert!(sim
        .network()
        .node(south)
        .shortest_paths()
        .min_length(north, junction_sim::RoaduserKind::Car)
        .is_some());

    sim.disable_lane(exit).unwrap();
    let network = sim.network();
    assert!(!network.lane(exit).is_enabled());
    assert!(!network.lane(from_south).targets().get(Turn::Straight));
    assert!(!network.lane(from_east).targets().get(Turn::Right));
    assert!(!network.lane(from_west).targets().get(Turn::Left));
    assert!(!network.outgoing_lanes(from_south).contains(&exit));
    assert!(network
        .node(south)
        .shortest_paths()
        .min_length(north, junction_sim::RoaduserKind::Car)
        .is_none());
    assert_eq!(sim.accidents().disabled(), &[exit]);

    assert_eq!(
        sim.disable_lane(exit).unwrap_err(),
        SimError::Topology(TopologyError::AlreadyDisabled(exit))
    );

    sim.enable_lane(exit).unwrap();
    let network = sim.network();
    assert!(network.lane(exit).is_enabled());
    assert!(network.lane(from_south).targets().get(Turn::Straight));
    assert!(network.outgoing_lanes(from_south).contains(&exit));
    assert!(sim.accidents().disabled().is_empty());

    assert_eq!(
        sim.enable_lane(exit).unwrap_err(),
        SimError::Topology(TopologyError::NotDisabled(exit))
    );
}

#[test]
fn entry_lanes_of_spawning_nodes_stay_open() {
    let mut cross = common::cross(20, true);
    common::add_traffic(&mut cross, 0.1);
    let north = cross.edges[0];
    let entry = common::lane_between(&cross.network, north, cross.junction);
    let mut sim = Simulation::new(cross.network, SimConfig::default()).unwrap();

    let err = sim.disable_lane(entry).unwrap_err();
    assert_eq!(err, SimError::Topology(TopologyError::NoEntryLane(north)));
    assert!(sim.network().lane(entry).is_enabled());
}

/// Random accidents never leave a dead end behind, and traffic keeps flowing.
#[test]
fn random_accidents_keep_the_network_valid() {
    let mut cross = common::cross(15, true);
    common::add_traffic(&mut cross, 0.2);
    let config = SimConfig {
        seed: 11,
        accident_rate: 5,
        stuck_cars: Some(Default::default()),
        ..Default::default()
    };
    let mut sim = Simulation::new(cross.network, config).unwrap();

    for _ in 0..400 {
        sim.step().unwrap();
        sim.check_invariants().unwrap();
        for lane in sim.accidents().disabled() {
            assert!(!sim.network().lane(*lane).is_enabled());
        }
        for lane in sim.network().iter_lanes() {
            let into_junction = sim.network().node(lane.to()).is_junction();
            if lane.is_enabled() && into_junction {
                assert!(!sim.network().outgoing_lanes(lane.id()).is_empty());
            }
        }
    }
    assert!(sim.accidents().count() > 0);
    assert!(sim.arrived() > 0);
}
