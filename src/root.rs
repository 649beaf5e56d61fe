//! Root coordinator: owns the model tree and drives the simulation loop.
//!
//! The `RootCoordinator` wraps the top-level [`Coordinator`], the optional
//! trace loggers and the real-time clock. Each cycle at the next event time
//! `t` is: log `t`, `collection(t)`, `transition(t)`, `clear()`.

use crate::clock::{RealTimeClock, SystemClock};
use crate::coordinator::Coordinator;
use crate::coupled::CoupledModel;
use crate::error::SimResult;
use crate::logger::{Logger, Loggers};
use crate::simulator::AbstractSimulator;
use crate::types::{is_finite, SimTime};

/// Statistics collected by the root coordinator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RootStats {
    /// Total number of cycles executed
    pub cycles: u64,
    /// Time of the last executed cycle
    pub last_event_time: Option<SimTime>,
    /// Largest lateness of the real-time clock seen by `simulate_for`
    pub max_drift: SimTime,
}

/// The top of the simulation tree.
///
/// # Example
///
/// ```ignore
/// let mut root = RootCoordinator::new(model)?;
/// root.set_logger(Box::new(CsvLogger::stdout()));
/// root.start()?;
/// root.simulate(1000)?;
/// root.stop()?;
/// ```
pub struct RootCoordinator {
    top: Coordinator,
    loggers: Loggers,
    clock: Box<dyn RealTimeClock>,
    stats: RootStats,
}

impl RootCoordinator {
    /// Builds the simulation tree for `model`, starting at time 0.
    pub fn new(model: CoupledModel) -> SimResult<Self> {
        Self::with_start_time(model, 0.0)
    }

    /// Builds the simulation tree for `model`, starting at `time`.
    ///
    /// Model ids are assigned here, depth first, the top model being 0.
    pub fn with_start_time(model: CoupledModel, time: SimTime) -> SimResult<Self> {
        let mut top = Coordinator::new(model, time)?;
        let count = top.set_model_id(0);
        tracing::debug!(model = top.component().name(), models = count, "model tree built");
        Ok(Self {
            top,
            loggers: Loggers::new(),
            clock: Box::new(SystemClock::new()),
            stats: RootStats::default(),
        })
    }

    /// Sets the primary trace logger.
    pub fn set_logger(&mut self, logger: Box<dyn Logger>) {
        self.loggers.set_primary(logger);
    }

    /// Sets the debug trace logger. It receives the same records as the
    /// primary one.
    pub fn set_debug_logger(&mut self, logger: Box<dyn Logger>) {
        self.loggers.set_debug(logger);
    }

    /// Replaces the clock used by [`RootCoordinator::simulate_for`].
    pub fn set_clock(&mut self, clock: Box<dyn RealTimeClock>) {
        self.clock = clock;
    }

    /// Starts the loggers and the model tree at the start time.
    pub fn start(&mut self) -> SimResult<()> {
        let time = self.top.time_last();
        tracing::info!(model = self.top.component().name(), time, "simulation start");
        self.stats = RootStats::default();
        // the tree is scheduled even when a logger fails to start
        let opened = self.loggers.start();
        let started = self.top.start(time, &self.loggers);
        opened?;
        started
    }

    /// Logs final states at the last event time, then stops the loggers.
    pub fn stop(&mut self) -> SimResult<()> {
        let time = self.top.time_last();
        tracing::info!(
            model = self.top.component().name(),
            time,
            cycles = self.stats.cycles,
            "simulation stop"
        );
        // loggers are flushed on every path
        let stopped = self.top.stop(time, &self.loggers);
        let flushed = self.loggers.stop();
        stopped?;
        flushed?;
        Ok(())
    }

    /// Runs up to `iterations` cycles, as fast as possible. Stops early when
    /// no event is scheduled. Returns the number of cycles executed.
    pub fn simulate(&mut self, iterations: u64) -> SimResult<u64> {
        let mut executed = 0;
        while executed < iterations {
            let time = self.top.time_next();
            if !is_finite(time) {
                break;
            }
            self.cycle(time)?;
            executed += 1;
        }
        Ok(executed)
    }

    /// Runs every cycle scheduled before `time_last + duration`, pacing
    /// them against the real-time clock. Returns the number of cycles
    /// executed.
    ///
    /// Events still run at their virtual times; clock drift only shortens or
    /// lengthens the following waits.
    pub fn simulate_for(&mut self, duration: SimTime) -> SimResult<u64> {
        let time_final = self.top.time_last() + duration;
        let mut current = self.top.time_last();
        let mut executed = 0;

        while self.top.time_next() < time_final {
            let time = self.top.time_next();
            let elapsed = self.clock.wait_for((time - current).max(0.0))?;
            current += elapsed;

            let drift = current - time;
            if drift > self.stats.max_drift {
                self.stats.max_drift = drift;
            }
            if drift > self.clock.tolerance() {
                tracing::warn!(time, drift, "real-time clock is late");
            } else {
                tracing::trace!(time, drift, "real-time wait");
            }

            self.cycle(time)?;
            executed += 1;
        }
        Ok(executed)
    }

    /// One simulation cycle at `time`. Port buffers are cleared on every
    /// exit path once collection has begun.
    fn cycle(&mut self, time: SimTime) -> SimResult<()> {
        tracing::debug!(time, cycle = self.stats.cycles, "cycle");
        self.loggers.log_time(time)?;

        if let Err(e) = self.top.collection(time) {
            self.top.clear();
            return Err(e);
        }
        let result = self.top.transition(time, &self.loggers);
        self.top.clear();

        self.stats.cycles += 1;
        self.stats.last_event_time = Some(time);
        result
    }

    /// Returns the top-level coordinator.
    pub fn top_coordinator(&self) -> &Coordinator {
        &self.top
    }

    /// Time of the last transition of the model tree.
    pub fn time_last(&self) -> SimTime {
        self.top.time_last()
    }

    /// Time of the next scheduled event.
    pub fn time_next(&self) -> SimTime {
        self.top.time_next()
    }

    /// Returns the root statistics.
    pub fn stats(&self) -> &RootStats {
        &self.stats
    }

    /// Exports root statistics and the whole tree's counters.
    pub fn export_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "root": {
                "time_last": self.top.time_last(),
                "time_next": self.top.time_next(),
                "cycles": self.stats.cycles,
                "last_event_time": self.stats.last_event_time,
                "max_drift": self.stats.max_drift,
            },
            "model": self.top.export_stats(),
        })
    }
}

impl std::fmt::Debug for RootCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootCoordinator")
            .field("model", &self.top.component().name())
            .field("time_last", &self.top.time_last())
            .field("time_next", &self.top.time_next())
            .field("loggers", &self.loggers)
            .field("stats", &self.stats)
            .finish()
    }
}
