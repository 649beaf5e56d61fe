//! Passive message counter.

use serde_json::Value;

use crate::atomic::{Atomic, AtomicModel};
use crate::error::SimResult;
use crate::port::PortSet;
use crate::types::{SimTime, INFINITY};

/// Counts the messages received on `in`. Never produces output.
#[derive(Clone, Debug, Default)]
pub struct Counter {
    /// Messages received so far
    pub count: u64,
    /// Last message received
    pub last: Option<Value>,
}

impl Counter {
    /// Input port name.
    pub const IN: &'static str = "in";

    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the counter in an atomic model with an `in` port.
    pub fn into_model(self, name: impl Into<String>) -> SimResult<AtomicModel> {
        AtomicModel::new(name, self).with_in_port(Self::IN)
    }
}

impl Atomic for Counter {
    fn internal_transition(&mut self) {}

    fn external_transition(&mut self, _elapsed: SimTime, inputs: &PortSet) {
        let messages = inputs.messages(Self::IN);
        self.count += messages.len() as u64;
        if let Some(last) = messages.last() {
            self.last = Some(last.clone());
        }
    }

    fn output(&self, _outputs: &mut PortSet) -> SimResult<()> {
        Ok(())
    }

    fn time_advance(&self) -> SimTime {
        INFINITY
    }

    fn state(&self) -> String {
        format!("count={}", self.count)
    }
}
