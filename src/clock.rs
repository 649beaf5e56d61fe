//! Real-time clocks for paced execution.
//!
//! [`RootCoordinator::simulate_for`](crate::root::RootCoordinator::simulate_for)
//! asks its clock to wait for the virtual time until the next event. The
//! clock blocks and reports how much virtual time actually went by, which
//! may differ from the request.

use std::thread;
use std::time::{Duration, Instant};

use crate::error::{SimError, SimResult};
use crate::types::SimTime;

/// A blocking source of real elapsed time.
pub trait RealTimeClock: Send {
    /// Blocks for about `duration` virtual time units and returns the
    /// virtual time that actually elapsed.
    fn wait_for(&mut self, duration: SimTime) -> SimResult<SimTime>;

    /// Drift (in virtual time units) above which the root coordinator
    /// reports a warning.
    fn tolerance(&self) -> SimTime {
        0.0
    }
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Clone, Debug)]
pub struct SystemClock {
    /// Real seconds per virtual time unit
    seconds_per_unit: f64,
    tolerance: SimTime,
}

impl SystemClock {
    /// One virtual time unit per real second.
    pub fn new() -> Self {
        Self {
            seconds_per_unit: 1.0,
            tolerance: 0.01,
        }
    }

    /// Sets how many real seconds one virtual time unit lasts.
    pub fn with_scale(mut self, seconds_per_unit: f64) -> Self {
        self.seconds_per_unit = seconds_per_unit;
        self
    }

    /// Sets the drift tolerance.
    pub fn with_tolerance(mut self, tolerance: SimTime) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Returns the real seconds per virtual time unit.
    pub fn scale(&self) -> f64 {
        self.seconds_per_unit
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RealTimeClock for SystemClock {
    fn wait_for(&mut self, duration: SimTime) -> SimResult<SimTime> {
        if !(self.seconds_per_unit > 0.0 && self.seconds_per_unit.is_finite()) {
            return Err(SimError::Clock(format!(
                "invalid scale: {} seconds per time unit",
                self.seconds_per_unit
            )));
        }
        let seconds = duration * self.seconds_per_unit;
        let request = Duration::try_from_secs_f64(seconds)
            .map_err(|e| SimError::Clock(format!("cannot wait for {}: {}", duration, e)))?;

        let started = Instant::now();
        thread::sleep(request);
        Ok(started.elapsed().as_secs_f64() / self.seconds_per_unit)
    }

    fn tolerance(&self) -> SimTime {
        self.tolerance
    }
}

/// Clock that never blocks.
///
/// Each wait returns the requested duration plus a fixed drift, which makes
/// paced runs deterministic and instantaneous.
#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    drift: SimTime,
    waited: SimTime,
    waits: u64,
}

impl VirtualClock {
    /// A clock reporting exactly the requested duration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that overshoots every wait by `drift`.
    pub fn with_drift(drift: SimTime) -> Self {
        Self {
            drift,
            ..Self::default()
        }
    }

    /// Total virtual time reported so far.
    pub fn waited(&self) -> SimTime {
        self.waited
    }

    /// Number of waits performed.
    pub fn waits(&self) -> u64 {
        self.waits
    }
}

impl RealTimeClock for VirtualClock {
    fn wait_for(&mut self, duration: SimTime) -> SimResult<SimTime> {
        if duration.is_nan() || duration < 0.0 {
            return Err(SimError::Clock(format!("cannot wait for {}", duration)));
        }
        let elapsed = duration + self.drift;
        self.waited += elapsed;
        self.waits += 1;
        Ok(elapsed)
    }
}
