//! Tests of road users crossing junctions and of light switching.

mod common;

use junction_sim::{
    LaneAttributes, LaneId, Network, NodeId, Point2d, RoadAttributes, RoaduserAttributes,
    RoaduserKind, SimConfig, Simulation, Slot,
};

/// Edge `a`, a junction without signs, then edge `b`. The road into the
/// junction is 10 long, the road out of it 4.
fn short_exit() -> (Network, LaneId, LaneId, NodeId) {
    let mut network = Network::new();
    let junction = network.add_junction(Point2d::new(0.0, 0.0));
    let a = network.add_edge_node(Point2d::new(-10.0, 0.0));
    let b = network.add_edge_node(Point2d::new(4.0, 0.0));
    let lanes = [LaneAttributes::default()];
    for (edge, slot, length) in [(a, Slot::WEST, 10), (b, Slot::EAST, 4)] {
        network
            .add_road(&RoadAttributes {
                alpha: (junction, slot),
                beta: (edge, slot.opposite()),
                length: Some(length),
                to_alpha: &lanes,
                to_beta: &lanes,
            })
            .unwrap();
    }
    let entry = common::lane_between(&network, a, junction);
    let exit = common::lane_between(&network, junction, b);
    (network, entry, exit, b)
}

/// A full exit lane whose head leaves this cycle makes room for a road user
/// crossing into it in the same cycle.
#[test]
fn full_lane_moves_before_it_is_entered() {
    let (network, entry, exit, b) = short_exit();
    let mut sim = Simulation::new(network, SimConfig::default()).unwrap();
    let car = RoaduserAttributes::from(RoaduserKind::Car);
    let crossing = sim.add_roaduser(&car, entry, 0, b).unwrap();
    let leaving = sim.add_roaduser(&car, exit, 0, b).unwrap();
    let behind = sim.add_roaduser(&car, exit, 2, b).unwrap();

    sim.step().unwrap();

    let network = sim.network();
    assert!(network.roaduser(leaving).is_none());
    assert_eq!(network.roaduser(behind).unwrap().position(), 0);
    let crossing = network.roaduser(crossing).unwrap();
    assert_eq!(crossing.lane_id(), Some(exit));
    assert_eq!(crossing.position(), 2);
    assert_eq!(network.lane(exit).queue().len(), 2);
    assert!(network.lane(entry).queue().is_empty());
    assert_eq!(sim.arrived(), 1);
    sim.check_invariants().unwrap();
}

/// The cycle at which the west light of a cross first turns green, when the
/// north light is green and its head road user is blocked by parked cars.
fn cycles_until_switch(cross_nodes_safely: bool, min_green: usize, max_green: usize) -> usize {
    let cross = common::cross(10, true);
    let [north, east, south, west] = cross.edges;
    let junction = cross.junction;
    let blocked = common::lane_between(&cross.network, north, junction);
    let competing = common::lane_between(&cross.network, west, junction);
    let exit = common::lane_between(&cross.network, junction, south);
    let mut sim = Simulation::new(cross.network, SimConfig::default()).unwrap();
    sim.set_cross_nodes_safely(cross_nodes_safely);
    sim.set_green_limits(min_green, max_green);

    let parked = RoaduserAttributes {
        speed: 0,
        ..RoaduserKind::Car.into()
    };
    for pos in [0, 2, 4, 6, 8] {
        sim.add_roaduser(&parked, exit, pos, south).unwrap();
    }
    sim.add_roaduser(&RoaduserKind::Car.into(), blocked, 0, south)
        .unwrap();

    let blocked_sign = sim.network().lane(blocked).sign();
    let competing_sign = sim.network().lane(competing).sign();
    while !sim.network().green_signs(junction).contains(&blocked_sign) {
        sim.step().unwrap();
        assert!(sim.cycle() < 50, "the only queue never got a green light");
    }
    let start = sim.cycle();

    for pos in [0, 2] {
        sim.add_roaduser(&RoaduserKind::Car.into(), competing, pos, east)
            .unwrap();
    }
    while !sim.network().green_signs(junction).contains(&competing_sign) {
        sim.step().unwrap();
        sim.check_invariants().unwrap();
        assert!(sim.cycle() < start + 50, "the longer queue never got a green light");
    }
    sim.cycle() - start
}

#[test]
fn blocked_crossing_holds_the_light_until_max_green() {
    assert_eq!(cycles_until_switch(true, 1, 10), 11);
    assert_eq!(cycles_until_switch(true, 1, 20), 21);
}

#[test]
fn unsafe_switching_only_waits_for_min_green() {
    assert_eq!(cycles_until_switch(false, 1, 10), 2);
    assert_eq!(cycles_until_switch(false, 4, 10), 5);
}

#[test]
fn min_green_applies_before_the_crossing_check() {
    assert_eq!(cycles_until_switch(true, 15, 10), 16);
}
