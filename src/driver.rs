//! A background thread that steps a simulation at a fixed wall-clock pace.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info};

use crate::error::SimError;
use crate::simulation::Simulation;

/// Pause state shared with the driver thread.
#[derive(Debug)]
struct Control {
    paused: bool,
    stopped: bool,
    interval: Duration,
}

struct Shared {
    sim: Mutex<Simulation>,
    control: Mutex<Control>,
    wake: Condvar,
}

impl Shared {
    fn sim(&self) -> MutexGuard<'_, Simulation> {
        self.sim.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs cycles of a [Simulation] on its own thread.
///
/// The thread holds the simulation only while a cycle runs, so a cycle is never
/// interrupted. It starts paused.
pub struct SimDriver {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl SimDriver {
    /// Moves the simulation onto a new thread that runs one cycle per `interval` once resumed.
    pub fn spawn(sim: Simulation, interval: Duration) -> Self {
        let shared = Arc::new(Shared {
            sim: Mutex::new(sim),
            control: Mutex::new(Control {
                paused: true,
                stopped: false,
                interval,
            }),
            wake: Condvar::new(),
        });
        let thread_shared = shared.clone();
        let handle = thread::spawn(move || run(&thread_shared));
        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Starts or continues stepping.
    pub fn resume(&self) {
        let mut sim = self.shared.sim();
        sim.set_running(true);
        self.shared.control().paused = false;
        drop(sim);
        self.shared.wake.notify_all();
    }

    /// Stops stepping. Waits for the cycle in progress, if any.
    pub fn pause(&self) {
        let mut sim = self.shared.sim();
        self.shared.control().paused = true;
        sim.set_running(false);
        drop(sim);
        self.shared.wake.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.shared.control().paused
    }

    /// Sets the wall-clock time between cycles.
    pub fn set_interval(&self, interval: Duration) {
        self.shared.control().interval = interval;
        self.shared.wake.notify_all();
    }

    /// Runs `f` with the simulation, between cycles.
    pub fn with_simulation<R>(&self, f: impl FnOnce(&mut Simulation) -> R) -> R {
        f(&mut self.shared.sim())
    }

    /// Resets the simulation. Fails with [SimError::Running] unless paused.
    pub fn reset(&self) -> Result<(), SimError> {
        self.shared.sim().reset()
    }

    /// Stops the thread and hands back the simulation.
    pub fn stop(mut self) -> Option<Simulation> {
        self.shutdown();
        let shared = Arc::clone(&self.shared);
        drop(self);
        let shared = Arc::try_unwrap(shared).ok()?;
        let mut sim = shared.sim.into_inner().unwrap_or_else(PoisonError::into_inner);
        sim.set_running(false);
        Some(sim)
    }

    fn shutdown(&mut self) {
        self.shared.control().stopped = true;
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Simulation driver thread panicked");
            }
        }
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The driver thread: waits while paused, otherwise runs a cycle and sleeps
/// for the interval. A failed cycle abandons the series.
///
/// Locks are taken in the order simulation, then control.
fn run(shared: &Shared) {
    debug!("Simulation driver started");
    loop {
        let interval = {
            let mut control = shared.control();
            while control.paused && !control.stopped {
                control = shared
                    .wake
                    .wait(control)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if control.stopped {
                break;
            }
            control.interval
        };

        {
            let mut sim = shared.sim();
            if shared.control().paused {
                continue;
            }
            if let Err(err) = sim.step() {
                error!("Series {} abandoned at cycle {}: {err}", sim.series(), sim.cycle());
                sim.set_running(false);
                let next = sim.next_series();
                sim.set_running(true);
                match next {
                    Ok(()) => info!("Continuing with series {}", sim.series()),
                    Err(err) => error!("Could not start the next series: {err}"),
                }
            }
        }

        let control = shared.control();
        if !control.stopped && !control.paused {
            let _ = shared
                .wake
                .wait_timeout(control, interval)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
    debug!("Simulation driver stopped");
}
