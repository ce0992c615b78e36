//! Tests of building networks from descriptions.

use junction_sim::{
    InfraDescription, LaneDescription, Network, NodeDescription, NodeType, RoadDescription,
    RoaduserKind, SimConfig, Simulation, Slot, TopologyError, Turn,
};

fn lane(traffic_light: bool) -> LaneDescription {
    LaneDescription {
        kinds: vec![],
        left: true,
        straight: true,
        right: true,
        traffic_light,
    }
}

fn node(kind: NodeType, x: f64, y: f64) -> NodeDescription {
    NodeDescription {
        kind,
        x,
        y,
        spawn: vec![],
        dests: vec![],
    }
}

/// A junction between two edge nodes, west and east of it.
fn corridor() -> InfraDescription {
    let mut west = node(NodeType::Edge, -20.0, 0.0);
    west.spawn = vec![(RoaduserKind::Car, 0.2)];
    west.dests = vec![(2, RoaduserKind::Car, 1.0)];
    let east = node(NodeType::NetTunnel, 20.0, 0.0);
    InfraDescription {
        nodes: vec![node(NodeType::Junction, 0.0, 0.0), west, east],
        roads: vec![
            RoadDescription {
                alpha: 0,
                alpha_slot: 3,
                beta: 1,
                beta_slot: 1,
                length: None,
                to_alpha: vec![lane(true)],
                to_beta: vec![lane(false)],
            },
            RoadDescription {
                alpha: 0,
                alpha_slot: 1,
                beta: 2,
                beta_slot: 3,
                length: Some(12),
                to_alpha: vec![lane(true)],
                to_beta: vec![LaneDescription {
                    kinds: vec![RoaduserKind::Car, RoaduserKind::Bus],
                    ..lane(false)
                }],
            },
        ],
    }
}

#[test]
fn builds_the_described_network() {
    let (network, ids) = Network::from_description(&corridor()).unwrap();
    let [junction, west, east] = [ids[0], ids[1], ids[2]];

    assert!(network.node(junction).is_junction());
    assert!(network.node(west).special().is_some());
    assert_eq!(network.node(junction).road_at(Slot::WEST), network.node(west).road_at(Slot::EAST));
    assert_eq!(network.iter_lanes().count(), 4);

    let west_road = network.node(west).road_at(Slot::EAST).unwrap();
    assert_eq!(network.road(west_road).length(), 20);

    let exit = network
        .leaving_lanes(junction)
        .find(|lane| network.lane(*lane).to() == east)
        .unwrap();
    let exit = network.lane(exit);
    assert_eq!(exit.length(), 12);
    assert!(exit.allows(RoaduserKind::Bus));
    assert!(!exit.allows(RoaduserKind::Bicycle));
    assert!(exit.targets().get(Turn::Left));

    let spawn = network.node(west).special().unwrap().spawn_frequencies();
    assert_eq!(spawn.len(), 1);
    assert_eq!(spawn[0].kind, RoaduserKind::Car);
}

#[test]
fn described_traffic_reaches_the_tunnel() {
    let (network, ids) = Network::from_description(&corridor()).unwrap();
    let east = ids[2];
    let mut sim = Simulation::new(network, SimConfig::default()).unwrap();
    for _ in 0..200 {
        sim.step().unwrap();
    }
    let stats = sim.network().node(east).special().unwrap().stats();
    assert!(stats.arrived > 0);
    assert_eq!(stats.sent, stats.arrived);
    assert_eq!(stats.misrouted, 0);
    assert!(stats.average_trip_time() >= 16.0);
}

#[test]
fn bad_descriptions_are_rejected() {
    let mut desc = corridor();
    desc.roads[0].beta = 7;
    assert_eq!(
        Network::from_description(&desc).err(),
        Some(TopologyError::BadNodeIndex(7))
    );

    let mut desc = corridor();
    desc.roads[1].alpha_slot = 4;
    assert_eq!(
        Network::from_description(&desc).err(),
        Some(TopologyError::BadSlot(4))
    );

    let mut desc = corridor();
    desc.roads[1].alpha_slot = 3;
    assert!(matches!(
        Network::from_description(&desc).err(),
        Some(TopologyError::SlotOccupied { slot, .. }) if slot == Slot::WEST
    ));
}
