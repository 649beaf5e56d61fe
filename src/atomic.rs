//! Atomic models and the behaviour contract model authors implement.
//!
//! An atomic model is a leaf of the model tree: a [`Component`] plus a boxed
//! [`Atomic`] behaviour holding the model-specific state and the DEVS
//! functions over it.

use std::fmt;

use crate::component::Component;
use crate::error::SimResult;
use crate::port::PortSet;
use crate::types::SimTime;

/// The behaviour of an atomic Parallel DEVS model.
///
/// The kernel calls these functions; it never inspects the state itself.
/// `output` is only ever called on an imminent model, right before its
/// internal or confluent transition, and must not change the state.
pub trait Atomic: Send {
    /// Internal transition: the scheduled time was reached with no input.
    fn internal_transition(&mut self);

    /// External transition: input arrived `elapsed` time units after the
    /// last transition, before the scheduled time.
    fn external_transition(&mut self, elapsed: SimTime, inputs: &PortSet);

    /// Confluent transition: input arrived exactly at the scheduled time.
    ///
    /// Defaults to the internal transition followed by the external
    /// transition with zero elapsed time.
    fn confluent_transition(&mut self, inputs: &PortSet) {
        self.internal_transition();
        self.external_transition(0.0, inputs);
    }

    /// Output function: writes this model's messages for the current
    /// imminent instant.
    fn output(&self, outputs: &mut PortSet) -> SimResult<()>;

    /// Time until the next internal event; `INFINITY` when passive.
    fn time_advance(&self) -> SimTime;

    /// Text rendering of the state, handed to loggers.
    fn state(&self) -> String {
        String::new()
    }
}

/// An atomic model: component interface plus behaviour.
pub struct AtomicModel {
    component: Component,
    behavior: Box<dyn Atomic>,
}

impl AtomicModel {
    /// Wraps `behavior` in a component called `name` with no ports.
    pub fn new(name: impl Into<String>, behavior: impl Atomic + 'static) -> Self {
        Self::from_boxed(name, Box::new(behavior))
    }

    /// Like [`AtomicModel::new`], for behaviour that is already boxed.
    pub fn from_boxed(name: impl Into<String>, behavior: Box<dyn Atomic>) -> Self {
        Self {
            component: Component::new(name),
            behavior,
        }
    }

    /// Declares an input port.
    pub fn with_in_port(mut self, name: impl Into<String>) -> SimResult<Self> {
        self.component.add_in_port(name)?;
        Ok(self)
    }

    /// Declares an output port.
    pub fn with_out_port(mut self, name: impl Into<String>) -> SimResult<Self> {
        self.component.add_out_port(name)?;
        Ok(self)
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        self.component.name()
    }

    /// Returns the component.
    pub fn component(&self) -> &Component {
        &self.component
    }

    pub(crate) fn component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    /// Returns the behaviour.
    pub fn behavior(&self) -> &dyn Atomic {
        self.behavior.as_ref()
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Component, &mut dyn Atomic) {
        (&mut self.component, self.behavior.as_mut())
    }
}

impl fmt::Debug for AtomicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicModel")
            .field("component", &self.component)
            .field("state", &self.behavior.state())
            .finish()
    }
}
