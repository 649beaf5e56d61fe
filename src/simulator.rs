//! The abstract simulator contract and the leaf simulator.
//!
//! Every node of the simulation tree implements [`AbstractSimulator`]:
//! leaves are [`Simulator`]s wrapping one atomic model, inner nodes are
//! [`Coordinator`](crate::coordinator::Coordinator)s. A cycle at instant
//! `t` is always `collection(t)` on the whole tree, then `transition(t)`,
//! then `clear()`.

use serde::Serialize;

use crate::atomic::AtomicModel;
use crate::component::Component;
use crate::error::{SimError, SimResult};
use crate::logger::Loggers;
use crate::port::message_text;
use crate::types::{is_valid_advance, ModelId, SimTime, INFINITY};

/// Operations shared by every node of the simulation tree.
pub trait AbstractSimulator: Send {
    /// The wrapped component.
    fn component(&self) -> &Component;

    /// The wrapped component, mutably. Callers only touch port buffers.
    fn component_mut(&mut self) -> &mut Component;

    /// The id assigned by [`AbstractSimulator::set_model_id`].
    fn model_id(&self) -> ModelId {
        self.component().id()
    }

    /// Assigns `next` to this node and consecutive ids to its descendants,
    /// depth first. Returns the first unused id.
    fn set_model_id(&mut self, next: ModelId) -> ModelId;

    /// Time of the last transition.
    fn time_last(&self) -> SimTime;

    /// Time of the next scheduled event; `INFINITY` when passive.
    fn time_next(&self) -> SimTime;

    /// Initialises the time marks at `time` and logs initial states.
    fn start(&mut self, time: SimTime, loggers: &Loggers) -> SimResult<()>;

    /// Logs final states at `time`.
    fn stop(&mut self, time: SimTime, loggers: &Loggers) -> SimResult<()>;

    /// Output phase: imminent models write their output and messages are
    /// propagated along couplings. No model state changes.
    fn collection(&mut self, time: SimTime) -> SimResult<()>;

    /// State phase: imminent models and models with input transition, and
    /// the time marks are recomputed.
    fn transition(&mut self, time: SimTime, loggers: &Loggers) -> SimResult<()>;

    /// Empties every port buffer of this node (and its subtree).
    fn clear(&mut self) {
        self.component_mut().clear_ports();
    }

    /// Counters and time marks of this node (and its subtree) as JSON.
    fn export_stats(&self) -> serde_json::Value;
}

/// Counters kept by a leaf simulator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimulatorStats {
    /// Number of times the output function ran
    pub collections: u64,
    /// Number of internal transitions
    pub internal: u64,
    /// Number of external transitions
    pub external: u64,
    /// Number of confluent transitions
    pub confluent: u64,
}

impl SimulatorStats {
    /// Total number of transitions of any kind.
    pub fn transitions(&self) -> u64 {
        self.internal + self.external + self.confluent
    }
}

/// Which transition function a cycle selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransitionKind {
    Internal,
    External,
    Confluent,
}

/// Leaf simulator driving one atomic model.
pub struct Simulator {
    model: AtomicModel,
    time_last: SimTime,
    time_next: SimTime,
    stats: SimulatorStats,
}

impl Simulator {
    /// Wraps `model`, with `time_last = time` and nothing scheduled yet.
    pub fn new(model: AtomicModel, time: SimTime) -> Self {
        Self {
            model,
            time_last: time,
            time_next: INFINITY,
            stats: SimulatorStats::default(),
        }
    }

    /// Returns the wrapped atomic model.
    pub fn model(&self) -> &AtomicModel {
        &self.model
    }

    /// Returns the counters.
    pub fn stats(&self) -> &SimulatorStats {
        &self.stats
    }

    fn out_of_bounds(&self, time: SimTime) -> SimError {
        SimError::TransitionOutOfBounds {
            model: self.model.name().to_string(),
            time,
            time_last: self.time_last,
            time_next: self.time_next,
        }
    }

    /// Sets `time_last = time` and schedules the next internal event.
    fn schedule(&mut self, time: SimTime) -> SimResult<()> {
        let advance = self.model.behavior().time_advance();
        if !is_valid_advance(advance) {
            return Err(SimError::InvalidTimeAdvance {
                model: self.model.name().to_string(),
                advance,
            });
        }
        self.time_last = time;
        self.time_next = time + advance;
        Ok(())
    }

    fn log_state(&self, time: SimTime, loggers: &Loggers) -> SimResult<()> {
        if loggers.is_empty() {
            return Ok(());
        }
        let component = self.model.component();
        let state = self.model.behavior().state();
        loggers.burst(|l| l.log_state(time, component.id(), component.name(), &state))?;
        Ok(())
    }

    /// Logs this cycle's output messages followed by the new state, as one
    /// burst per logger.
    fn log_transition(&self, time: SimTime, loggers: &Loggers) -> SimResult<()> {
        if loggers.is_empty() {
            return Ok(());
        }
        let component = self.model.component();
        let state = self.model.behavior().state();
        loggers.burst(|l| {
            for port in component.out_ports().iter() {
                for message in port.messages() {
                    l.log_output(
                        time,
                        component.id(),
                        component.name(),
                        port.name(),
                        &message_text(message),
                    )?;
                }
            }
            l.log_state(time, component.id(), component.name(), &state)
        })?;
        Ok(())
    }
}

impl AbstractSimulator for Simulator {
    fn component(&self) -> &Component {
        self.model.component()
    }

    fn component_mut(&mut self) -> &mut Component {
        self.model.component_mut()
    }

    fn set_model_id(&mut self, next: ModelId) -> ModelId {
        self.model.component_mut().set_id(next);
        next + 1
    }

    fn time_last(&self) -> SimTime {
        self.time_last
    }

    fn time_next(&self) -> SimTime {
        self.time_next
    }

    fn start(&mut self, time: SimTime, loggers: &Loggers) -> SimResult<()> {
        self.stats = SimulatorStats::default();
        self.schedule(time)?;
        self.log_state(time, loggers)
    }

    fn stop(&mut self, time: SimTime, loggers: &Loggers) -> SimResult<()> {
        self.log_state(time, loggers)
    }

    fn collection(&mut self, time: SimTime) -> SimResult<()> {
        if time > self.time_next {
            return Err(self.out_of_bounds(time));
        }
        if time == self.time_next {
            let (component, behavior) = self.model.parts_mut();
            behavior.output(component.out_ports_mut())?;
            self.stats.collections += 1;
        }
        Ok(())
    }

    fn transition(&mut self, time: SimTime, loggers: &Loggers) -> SimResult<()> {
        if time < self.time_last || time > self.time_next {
            return Err(self.out_of_bounds(time));
        }

        let imminent = time == self.time_next;
        let has_input = !self.model.component().in_empty();
        let kind = match (imminent, has_input) {
            (true, true) => TransitionKind::Confluent,
            (true, false) => TransitionKind::Internal,
            (false, true) => TransitionKind::External,
            (false, false) => return Ok(()),
        };

        let elapsed = time - self.time_last;
        let (component, behavior) = self.model.parts_mut();
        match kind {
            TransitionKind::Internal => {
                behavior.internal_transition();
                self.stats.internal += 1;
            }
            TransitionKind::External => {
                behavior.external_transition(elapsed, component.in_ports());
                self.stats.external += 1;
            }
            TransitionKind::Confluent => {
                behavior.confluent_transition(component.in_ports());
                self.stats.confluent += 1;
            }
        }
        tracing::trace!(model = self.model.name(), time, ?kind, "transition");

        // Time marks are updated before logging so that a logger failure
        // leaves the node consistent.
        self.schedule(time)?;
        self.log_transition(time, loggers)
    }

    fn export_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "model": self.model.name(),
            "model_id": self.model_id(),
            "kind": "atomic",
            "time_last": self.time_last,
            "time_next": self.time_next,
            "collections": self.stats.collections,
            "internal_transitions": self.stats.internal,
            "external_transitions": self.stats.external,
            "confluent_transitions": self.stats.confluent,
        })
    }
}
