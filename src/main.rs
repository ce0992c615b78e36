use std::time::Instant;

use junction_sim::{
    ColearnPolicy, LaneAttributes, Network, NullSink, Point2d, RoadAttributes, RoaduserKind,
    SimConfig, SimError, Simulation, Slot, StuckPolicy, Tc1,
};

/// A single signalised junction with an edge node on each of its four sides.
fn cross_network() -> Result<Network, SimError> {
    let mut net = Network::new();
    let junction = net.add_junction(Point2d::new(0.0, 0.0));
    let lanes = [LaneAttributes::default()];
    let mut edges = vec![];
    let positions = [(0.0, 30.0), (30.0, 0.0), (0.0, -30.0), (-30.0, 0.0)];
    for (slot, (x, y)) in Slot::ALL.into_iter().zip(positions) {
        let edge = net.add_edge_node(Point2d::new(x, y));
        net.add_road(&RoadAttributes {
            alpha: (junction, slot),
            beta: (edge, slot.opposite()),
            length: None,
            to_alpha: &lanes,
            to_beta: &lanes,
        })?;
        edges.push(edge);
    }
    for from in edges.iter().copied() {
        net.add_spawn_frequency(from, RoaduserKind::Car, 0.15)?;
        net.add_spawn_frequency(from, RoaduserKind::Bus, 0.01)?;
        for to in edges.iter().copied().filter(|to| *to != from) {
            for kind in [RoaduserKind::Car, RoaduserKind::Bus] {
                net.add_dest_frequency(from, to, kind, 1.0)?;
            }
        }
    }
    Ok(net)
}

fn main() -> Result<(), SimError> {
    env_logger::init();

    let config = SimConfig {
        seed: 42,
        accident_rate: 500,
        stuck_cars: Some(StuckPolicy::default()),
        ..Default::default()
    };
    let mut sim = Simulation::new(cross_network()?, config)?
        .with_controller(Tc1::new())
        .with_policy(ColearnPolicy::new());

    println!("Simulating...");
    const NUM_CYCLES: usize = 5000;
    let start = Instant::now();
    let summaries = sim.run_series(3, NUM_CYCLES, &mut NullSink)?;
    let per_cycle = start.elapsed() / (3 * NUM_CYCLES) as u32;

    for summary in &summaries {
        println!(
            "Series {} (seed {}): {} cycles, {} entered, {} arrived, {} removed, {} accidents{}",
            summary.series,
            summary.seed,
            summary.cycles,
            summary.stats.entered,
            summary.stats.arrived,
            summary.stats.removed,
            summary.stats.accidents,
            if summary.completed() { "" } else { " (abandoned)" },
        );
    }
    println!("Avg. cycle: {per_cycle:?}");
    Ok(())
}
