//! Model components.
//!
//! A `Component` is the identity and interface shared by atomic and coupled
//! models: a name, a run-scoped id and two sets of ports. The kernel only
//! ever mutates a component's port buffers; its structure is fixed once the
//! model tree is built.

use crate::error::SimResult;
use crate::port::PortSet;
use crate::types::ModelId;

/// Identity and port interface of a model.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    id: ModelId,
    name: String,
    in_ports: PortSet,
    out_ports: PortSet,
}

impl Component {
    /// Creates a component with no ports.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: 0,
            in_ports: PortSet::new(name.clone()),
            out_ports: PortSet::new(name.clone()),
            name,
        }
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the id assigned when the run started.
    pub fn id(&self) -> ModelId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ModelId) {
        self.id = id;
    }

    /// Declares an input port.
    pub fn add_in_port(&mut self, name: impl Into<String>) -> SimResult<usize> {
        self.in_ports.add(name)
    }

    /// Declares an output port.
    pub fn add_out_port(&mut self, name: impl Into<String>) -> SimResult<usize> {
        self.out_ports.add(name)
    }

    /// Input ports.
    pub fn in_ports(&self) -> &PortSet {
        &self.in_ports
    }

    /// Input ports, mutably (message buffers only).
    pub fn in_ports_mut(&mut self) -> &mut PortSet {
        &mut self.in_ports
    }

    /// Output ports.
    pub fn out_ports(&self) -> &PortSet {
        &self.out_ports
    }

    /// Output ports, mutably (message buffers only).
    pub fn out_ports_mut(&mut self) -> &mut PortSet {
        &mut self.out_ports
    }

    /// Returns `true` if no input port holds a message.
    pub fn in_empty(&self) -> bool {
        self.in_ports.is_empty()
    }

    /// Returns `true` if no output port holds a message.
    pub fn out_empty(&self) -> bool {
        self.out_ports.is_empty()
    }

    /// Empties every input and output port.
    pub fn clear_ports(&mut self) {
        self.in_ports.clear();
        self.out_ports.clear();
    }
}
