//! Tests of determinism, series control and the background driver.

mod common;

use std::time::{Duration, Instant};

use junction_sim::{
    ColearnPolicy, CycleStats, NullSink, SimConfig, SimDriver, SimError, Simulation,
    StuckPolicy, Tc1,
};

fn learning_sim(seed: u64) -> Simulation {
    let mut cross = common::cross(15, true);
    common::add_traffic(&mut cross, 0.25);
    let config = SimConfig {
        seed,
        accident_rate: 40,
        stuck_cars: Some(StuckPolicy {
            max_waiting_time: 50,
            penalty: 10.0,
        }),
        ..Default::default()
    };
    Simulation::new(cross.network, config)
        .unwrap()
        .with_controller(Tc1::new())
        .with_policy(ColearnPolicy::new())
}

#[test]
fn identical_seeds_give_identical_runs() {
    let mut runs = vec![];
    for _ in 0..2 {
        let mut sim = learning_sim(9);
        let mut stats: Vec<CycleStats> = vec![];
        for _ in 0..300 {
            sim.step_with(&mut stats).unwrap();
        }
        runs.push((stats, sim.export_tables()));
    }
    assert_eq!(runs[0].0, runs[1].0);
    assert_eq!(runs[0].1, runs[1].1);
    assert!(runs[0].0.last().unwrap().entered > 0);
}

#[test]
fn different_seeds_give_different_runs() {
    let mut entered = vec![];
    for seed in [1, 2] {
        let mut sim = learning_sim(seed);
        let mut stats: Vec<CycleStats> = vec![];
        for _ in 0..300 {
            sim.step_with(&mut stats).unwrap();
        }
        entered.push(stats);
    }
    assert_ne!(entered[0], entered[1]);
}

#[test]
fn learning_run_keeps_invariants() {
    let mut sim = learning_sim(4);
    for _ in 0..500 {
        sim.step().unwrap();
        sim.check_invariants().unwrap();
    }
    let stats = sim.snapshot();
    assert_eq!(stats.entered, stats.arrived + stats.removed + stats.in_network);
}

#[test]
fn series_are_reseeded_and_reset() {
    let mut sim = learning_sim(21);
    let mut stats: Vec<CycleStats> = vec![];
    let summaries = sim.run_series(3, 100, &mut stats).unwrap();

    assert_eq!(summaries.len(), 3);
    assert_eq!(stats.len(), 300);
    for (i, summary) in summaries.iter().enumerate() {
        assert!(summary.completed());
        assert_eq!(summary.series, i);
        assert_eq!(summary.cycles, 100);
        assert_eq!(summary.stats.cycle, 100);
    }
    assert_ne!(summaries[0].seed, summaries[1].seed);
    assert_ne!(summaries[1].seed, summaries[2].seed);
    // Every series starts from an empty network.
    assert_eq!(stats[100].cycle, 1);
    assert_eq!(stats[100].arrived, 0);

    // Running the first series again reproduces it.
    let mut again = learning_sim(21);
    let first = again.run_series(1, 100, &mut NullSink).unwrap();
    assert_eq!(first[0], summaries[0]);
}

#[test]
fn reset_clears_the_network() {
    let mut sim = learning_sim(2);
    for _ in 0..100 {
        sim.step().unwrap();
    }
    assert!(sim.network().iter_roadusers().count() > 0);

    sim.reset().unwrap();
    assert_eq!(sim.cycle(), 0);
    assert_eq!(sim.entered(), 0);
    assert_eq!(sim.network().iter_roadusers().count(), 0);
    assert!(sim.accidents().disabled().is_empty());
    assert!(sim.network().iter_lanes().all(|lane| lane.is_enabled()));
    assert_eq!(sim.export_tables()["states"].as_array().unwrap().len(), 0);
    sim.check_invariants().unwrap();
}

fn wait_for(driver: &SimDriver, done: impl Fn(&Simulation) -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(10) {
        if driver.with_simulation(|sim| done(sim)) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn driver_paces_pauses_and_stops() {
    let driver = SimDriver::spawn(learning_sim(8), Duration::from_millis(1));
    assert!(driver.is_paused());
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(driver.with_simulation(|sim| sim.cycle()), 0);

    driver.resume();
    assert!(wait_for(&driver, |sim| sim.cycle() >= 10));
    assert_eq!(driver.reset(), Err(SimError::Running));

    driver.pause();
    let paused_at = driver.with_simulation(|sim| sim.cycle());
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(driver.with_simulation(|sim| sim.cycle()), paused_at);

    driver.reset().unwrap();
    driver.set_interval(Duration::ZERO);
    driver.resume();
    assert!(wait_for(&driver, |sim| sim.cycle() >= 5));

    let sim = driver.stop().unwrap();
    assert!(!sim.is_running());
    assert!(sim.cycle() >= 5);
    sim.check_invariants().unwrap();
}
