use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::info;

use crate::config::SimulationConfig;
use crate::grid::GridError;
use crate::grid::GridState;
use crate::scheduler::PeriodicScheduler;
use crate::scheduler::SchedulerError;
use crate::shared::SharedCell;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The simulation is stopped
    Idle,

    /// The grid moved on to `generation`
    Advanced { generation: u64 },

    /// The grid moved on to an empty `generation` and the simulation stopped itself
    Extinct { generation: u64 },
}

/// Everything the scheduler thread and the outside world share.
#[derive(Debug)]
struct Shared {
    grid: SharedCell<GridState>,

    /// Set by ticks, cleared by the render consumer
    dirty: SharedCell<bool>,

    /// Whether ticks advance the grid
    running: SharedCell<bool>,
}

impl Shared {
    /// The grid is written before the dirty flag, so a consumer that sees `dirty` and then reads
    /// the grid gets a generation at least as new as the one that set it.
    fn tick(&self) -> Result<TickOutcome, GridError> {
        if !self.running.read() {
            return Ok(TickOutcome::Idle);
        }

        let mut grid = self.grid.read();

        let outcome = match grid.step() {
            Ok(()) => TickOutcome::Advanced {
                generation: grid.generation(),
            },
            Err(GridError::Extinction { generation }) => TickOutcome::Extinct { generation },
            Err(e @ GridError::EmptyState) => {
                self.running.write(false);
                return Err(e);
            }
        };

        self.grid.write(grid);
        self.dirty.write(true);

        match outcome {
            TickOutcome::Extinct { generation } => {
                self.running.write(false);
                info!(generation, "Population went extinct, stopping");
            }
            TickOutcome::Advanced { generation } => debug!(generation, "Stepped"),
            TickOutcome::Idle => {}
        }

        Ok(outcome)
    }
}

/// Owns the grid and steps it on a background [`PeriodicScheduler`].
///
/// The scheduler's ticks are the only writer of the grid. Readers take snapshots with
/// [`SimulationController::grid`] and learn about new generations through the dirty flag.
pub struct SimulationController {
    shared: Arc<Shared>,
    scheduler: PeriodicScheduler,
}

impl SimulationController {
    pub fn new(grid: GridState, config: &SimulationConfig) -> Result<Self, SchedulerError> {
        let period = config.period()?;

        let shared = Arc::new(Shared {
            grid: SharedCell::new(grid),
            dirty: SharedCell::new(true),
            running: SharedCell::new(config.start_running),
        });

        let scheduler = PeriodicScheduler::spawn(period, {
            let shared = Arc::clone(&shared);
            move || {
                shared.tick()?;
                Ok(())
            }
        })?;

        Ok(Self { shared, scheduler })
    }

    pub fn start(&self) {
        self.set_running(true);
    }

    pub fn stop(&self) {
        self.set_running(false);
    }

    /// Flip between running and stopped. Returns whether the simulation is now running.
    ///
    /// If a tick stops the simulation between the read and the write, the write still wins: the
    /// returned state is the one stored.
    pub fn toggle(&self) -> bool {
        let running = !self.shared.running.read();
        let was = self.set_running(running);

        if was == running {
            debug!(running, "Run flag changed during toggle");
        }

        running
    }

    /// Store the run flag and wake the scheduler. Returns the flag it replaced.
    fn set_running(&self, running: bool) -> bool {
        let was = self.shared.running.replace(running);

        if was != running {
            info!(running, "Simulation toggled");
        }

        self.scheduler.wake();

        was
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.read()
    }

    pub fn set_frequency(&self, hz: f64) -> Result<(), SchedulerError> {
        self.scheduler.set_frequency(hz)?;
        info!(hz, "Frequency changed");

        Ok(())
    }

    pub fn set_period(&self, period: Duration) -> Result<(), SchedulerError> {
        self.scheduler.set_period(period)?;
        info!(?period, "Period changed");

        Ok(())
    }

    pub fn period(&self) -> Duration {
        self.scheduler.period()
    }

    /// Current frequency in Hz
    pub fn frequency(&self) -> f64 {
        1.0 / self.period().as_secs_f64()
    }

    /// Snapshot of the current generation.
    pub fn grid(&self) -> GridState {
        self.shared.grid.read()
    }

    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.read()
    }

    /// Read and clear the dirty flag. Returns whether a new generation was published since the
    /// last call.
    pub fn take_dirty(&self) -> bool {
        self.shared.dirty.replace(false)
    }

    /// Stop the scheduler thread. Dropping the controller does the same.
    pub fn shutdown(self) {
        self.scheduler.shutdown();
    }
}
