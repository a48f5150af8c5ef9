//! Runs an action over and over on a background thread, at an adjustable period.
//!
//! Each iteration runs the action, then sleeps for whatever is left of the period. An action that
//! overruns the period is followed immediately by the next one: the deficit is dropped rather than
//! made up with a burst of catch-up ticks.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Condvar;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::shared::SharedCell;

/// A single-slot event. [`WakeSignal::set`] wakes whoever is waiting, or the next waiter if nobody
/// is. A wait consumes the signal.
#[derive(Debug, Default)]
pub struct WakeSignal {
    set: Mutex<bool>,
    cond: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        *self.set.lock() = true;
        self.cond.notify_one();
    }

    /// Block until the signal is set or `timeout` has passed. Returns whether the signal fired.
    /// The signal is clear afterwards either way.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut set = self.set.lock();

        while !*set {
            if self.cond.wait_until(&mut set, deadline).timed_out() {
                break;
            }
        }

        std::mem::replace(&mut *set, false)
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Frequency must be a positive, finite number of Hz, got {hz}")]
    InvalidFrequency { hz: f64 },

    #[error("Period must be positive")]
    ZeroPeriod,

    #[error("Failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Convert a frequency to the period between ticks.
pub fn period_from_frequency(hz: f64) -> Result<Duration, SchedulerError> {
    if !hz.is_finite() || hz <= 0.0 {
        return Err(SchedulerError::InvalidFrequency { hz });
    }

    Duration::try_from_secs_f64(1.0 / hz)
        .ok()
        .filter(|p| !p.is_zero())
        .ok_or(SchedulerError::InvalidFrequency { hz })
}

/// State shared between the scheduler handle and its thread.
struct Timing {
    period: SharedCell<Duration>,
    wake: WakeSignal,
    shutdown: AtomicBool,
    ticks: AtomicU64,
}

/// Handle to a background thread that calls an action once per period.
///
/// Dropping the handle stops the thread and waits for the tick in flight to finish.
pub struct PeriodicScheduler {
    timing: Arc<Timing>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicScheduler {
    /// Start calling `action` every `period`. The first call happens right away.
    ///
    /// An `Err` or panic out of `action` is logged and the loop carries on with the next tick.
    pub fn spawn<F>(period: Duration, action: F) -> Result<Self, SchedulerError>
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }

        let timing = Arc::new(Timing {
            period: SharedCell::new(period),
            wake: WakeSignal::new(),
            shutdown: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
        });

        let handle = thread::Builder::new()
            .name("life-scheduler".into())
            .spawn({
                let timing = Arc::clone(&timing);
                move || run(&timing, action)
            })?;

        info!(?period, "Scheduler started");

        Ok(Self {
            timing,
            handle: Some(handle),
        })
    }

    pub fn period(&self) -> Duration {
        self.timing.period.read()
    }

    /// Number of ticks started so far, including no-op ones.
    pub fn ticks(&self) -> u64 {
        self.timing.ticks.load(Ordering::Acquire)
    }

    /// Change the period. If it actually changed, the current wait is cut short so the new cadence
    /// applies from the next tick on.
    pub fn set_period(&self, period: Duration) -> Result<(), SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }

        if self.timing.period.replace(period) != period {
            debug!(?period, "Period changed");
            self.wake();
        }

        Ok(())
    }

    pub fn set_frequency(&self, hz: f64) -> Result<(), SchedulerError> {
        self.set_period(period_from_frequency(hz)?)
    }

    /// Cut the current wait short, so the next tick starts now.
    pub fn wake(&self) {
        self.timing.wake.set();
    }

    /// Stop the loop and wait for the thread to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.timing.shutdown.store(true, Ordering::Release);
        self.timing.wake.set();

        if handle.join().is_err() {
            warn!("Scheduler thread panicked");
        }

        info!(ticks = self.ticks(), "Scheduler stopped");
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn run<F>(timing: &Timing, mut action: F)
where
    F: FnMut() -> anyhow::Result<()>,
{
    while !timing.shutdown.load(Ordering::Acquire) {
        let start = Instant::now();
        let tick = timing.ticks.fetch_add(1, Ordering::AcqRel);

        match std::panic::catch_unwind(AssertUnwindSafe(&mut action)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(tick, "Tick failed: {e:#}"),
            Err(_) => warn!(tick, "Tick panicked"),
        }

        let remaining = timing.period.read().saturating_sub(start.elapsed());
        timing.wake.wait_timeout(remaining);
    }
}
