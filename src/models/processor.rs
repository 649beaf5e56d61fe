//! Single-server job processor.
//!
//! The processor serves one job at a time for a fixed processing time and
//! emits the job id when done. Jobs that arrive while it is busy are
//! dropped and counted.

use serde_json::Value;

use crate::atomic::{Atomic, AtomicModel};
use crate::error::SimResult;
use crate::port::PortSet;
use crate::types::{SimTime, INFINITY};

/// A processor with no queue.
#[derive(Clone, Debug)]
pub struct Processor {
    /// Time needed to process one job
    pub processing_time: SimTime,
    /// Job currently being processed
    pub current: Option<Value>,
    /// Time left on the current job
    pub remaining: SimTime,
    /// Jobs completed
    pub processed: u64,
    /// Jobs dropped because the processor was busy
    pub dropped: u64,
}

impl Processor {
    /// Input port name.
    pub const IN: &'static str = "in";
    /// Output port name.
    pub const OUT: &'static str = "out";

    /// Creates an idle processor.
    pub fn new(processing_time: SimTime) -> Self {
        Self {
            processing_time,
            current: None,
            remaining: INFINITY,
            processed: 0,
            dropped: 0,
        }
    }

    /// Returns `true` while a job is in service.
    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    /// Wraps the processor in an atomic model with `in` and `out` ports.
    pub fn into_model(self, name: impl Into<String>) -> SimResult<AtomicModel> {
        AtomicModel::new(name, self)
            .with_in_port(Self::IN)?
            .with_out_port(Self::OUT)
    }
}

impl Atomic for Processor {
    fn internal_transition(&mut self) {
        if self.current.take().is_some() {
            self.processed += 1;
        }
        self.remaining = INFINITY;
    }

    fn external_transition(&mut self, elapsed: SimTime, inputs: &PortSet) {
        let mut jobs = inputs.messages(Self::IN).iter();
        if self.is_busy() {
            self.remaining -= elapsed;
        } else if let Some(job) = jobs.next() {
            self.current = Some(job.clone());
            self.remaining = self.processing_time;
        }
        self.dropped += jobs.count() as u64;
    }

    fn output(&self, outputs: &mut PortSet) -> SimResult<()> {
        match &self.current {
            Some(job) => outputs.push_value(Self::OUT, job.clone()),
            None => Ok(()),
        }
    }

    fn time_advance(&self) -> SimTime {
        self.remaining.max(0.0)
    }

    fn state(&self) -> String {
        match &self.current {
            Some(job) => format!(
                "busy job={} processed={} dropped={}",
                job, self.processed, self.dropped
            ),
            None => format!("idle processed={} dropped={}", self.processed, self.dropped),
        }
    }
}
