//! Periodic job generator.

use crate::atomic::{Atomic, AtomicModel};
use crate::error::SimResult;
use crate::port::PortSet;
use crate::types::{SimTime, INFINITY};

/// Emits job ids `0, 1, 2, ...` on `out`, one every `period`.
///
/// With a limit set, the generator goes passive after emitting that many
/// jobs.
///
/// # Example
///
/// ```rust
/// use pdevs::models::Generator;
///
/// let model = Generator::new(1.0).with_limit(3).into_model("gen").unwrap();
/// assert_eq!(model.name(), "gen");
/// ```
#[derive(Clone, Debug)]
pub struct Generator {
    /// Time between two jobs
    pub period: SimTime,
    /// Maximum number of jobs to emit
    pub limit: Option<u64>,
    /// Id of the next job
    pub next_job: u64,
}

impl Generator {
    /// Output port name.
    pub const OUT: &'static str = "out";

    /// Creates an unlimited generator.
    pub fn new(period: SimTime) -> Self {
        Self {
            period,
            limit: None,
            next_job: 0,
        }
    }

    /// Stops after `limit` jobs.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` once the job limit is reached.
    pub fn exhausted(&self) -> bool {
        self.limit.map_or(false, |limit| self.next_job >= limit)
    }

    /// Wraps the generator in an atomic model with an `out` port.
    pub fn into_model(self, name: impl Into<String>) -> SimResult<AtomicModel> {
        AtomicModel::new(name, self).with_out_port(Self::OUT)
    }
}

impl Atomic for Generator {
    fn internal_transition(&mut self) {
        self.next_job += 1;
    }

    fn external_transition(&mut self, _elapsed: SimTime, _inputs: &PortSet) {}

    fn output(&self, outputs: &mut PortSet) -> SimResult<()> {
        outputs.push(Self::OUT, self.next_job)
    }

    fn time_advance(&self) -> SimTime {
        if self.exhausted() {
            INFINITY
        } else {
            self.period
        }
    }

    fn state(&self) -> String {
        format!("next_job={}", self.next_job)
    }
}
