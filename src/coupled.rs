//! Coupled models and their couplings.
//!
//! A coupled model is a composite: boundary ports, an ordered list of
//! children and a static set of couplings. Couplings name their endpoints by
//! child and port name; they are resolved to indices (and checked) when a
//! [`Coordinator`](crate::coordinator::Coordinator) is built for the model.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::atomic::AtomicModel;
use crate::component::Component;
use crate::error::{SimError, SimResult};

/// The three kinds of coupling in a coupled model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CouplingKind {
    /// Child output port to sibling input port (IC).
    Internal,
    /// Parent input port to child input port (EIC).
    ExternalInput,
    /// Child output port to parent output port (EOC).
    ExternalOutput,
}

/// One end of a coupling.
///
/// `model == None` designates the coupled model's own boundary port.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub model: Option<String>,
    pub port: String,
}

impl Endpoint {
    /// An endpoint on a child's port.
    pub fn child(model: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            port: port.into(),
        }
    }

    /// An endpoint on the coupled model's own boundary port.
    pub fn boundary(port: impl Into<String>) -> Self {
        Self {
            model: None,
            port: port.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{}.{}", model, self.port),
            None => write!(f, "<self>.{}", self.port),
        }
    }
}

/// A directed edge from an output port to an input port.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coupling {
    pub from: Endpoint,
    pub to: Endpoint,
}

impl Coupling {
    /// Creates a coupling between two endpoints.
    pub fn new(from: Endpoint, to: Endpoint) -> Self {
        Self { from, to }
    }

    /// Internal coupling: `from_model.from_port` -> `to_model.to_port`.
    pub fn internal(
        from_model: impl Into<String>,
        from_port: impl Into<String>,
        to_model: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        Self::new(
            Endpoint::child(from_model, from_port),
            Endpoint::child(to_model, to_port),
        )
    }

    /// External input coupling: own `port` -> `to_model.to_port`.
    pub fn external_input(
        port: impl Into<String>,
        to_model: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        Self::new(Endpoint::boundary(port), Endpoint::child(to_model, to_port))
    }

    /// External output coupling: `from_model.from_port` -> own `port`.
    pub fn external_output(
        from_model: impl Into<String>,
        from_port: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self::new(Endpoint::child(from_model, from_port), Endpoint::boundary(port))
    }

    /// Classifies the coupling; `None` for boundary-to-boundary edges,
    /// which the kernel does not support.
    pub fn kind(&self) -> Option<CouplingKind> {
        match (&self.from.model, &self.to.model) {
            (Some(_), Some(_)) => Some(CouplingKind::Internal),
            (None, Some(_)) => Some(CouplingKind::ExternalInput),
            (Some(_), None) => Some(CouplingKind::ExternalOutput),
            (None, None) => None,
        }
    }
}

impl fmt::Display for Coupling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A node of the model tree.
#[derive(Debug)]
pub enum Model {
    Atomic(AtomicModel),
    Coupled(CoupledModel),
}

impl Model {
    /// Returns the model name.
    pub fn name(&self) -> &str {
        self.component().name()
    }

    /// Returns the component.
    pub fn component(&self) -> &Component {
        match self {
            Model::Atomic(m) => m.component(),
            Model::Coupled(m) => m.component(),
        }
    }
}

impl From<AtomicModel> for Model {
    fn from(model: AtomicModel) -> Self {
        Model::Atomic(model)
    }
}

impl From<CoupledModel> for Model {
    fn from(model: CoupledModel) -> Self {
        Model::Coupled(model)
    }
}

/// A composite model: boundary ports, children and couplings.
#[derive(Debug)]
pub struct CoupledModel {
    component: Component,
    children: Vec<Model>,
    couplings: Vec<Coupling>,
}

impl CoupledModel {
    /// Creates an empty coupled model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            component: Component::new(name),
            children: Vec::new(),
            couplings: Vec::new(),
        }
    }

    /// Declares a boundary input port.
    pub fn with_in_port(mut self, name: impl Into<String>) -> SimResult<Self> {
        self.component.add_in_port(name)?;
        Ok(self)
    }

    /// Declares a boundary output port.
    pub fn with_out_port(mut self, name: impl Into<String>) -> SimResult<Self> {
        self.component.add_out_port(name)?;
        Ok(self)
    }

    /// Adds a child; names must be unique among siblings.
    pub fn add_child(&mut self, child: impl Into<Model>) -> SimResult<()> {
        let child = child.into();
        if self.child(child.name()).is_some() {
            return Err(SimError::DuplicateChild {
                model: self.name().to_string(),
                child: child.name().to_string(),
            });
        }
        self.children.push(child);
        Ok(())
    }

    /// Builder form of [`CoupledModel::add_child`].
    pub fn with_child(mut self, child: impl Into<Model>) -> SimResult<Self> {
        self.add_child(child)?;
        Ok(self)
    }

    /// Adds a coupling. Endpoints are checked when the model is simulated.
    pub fn add_coupling(&mut self, coupling: Coupling) {
        self.couplings.push(coupling);
    }

    /// Builder form of [`CoupledModel::add_coupling`].
    pub fn with_coupling(mut self, coupling: Coupling) -> Self {
        self.add_coupling(coupling);
        self
    }

    /// Adds an internal coupling between two children.
    pub fn add_internal_coupling(
        &mut self,
        from_model: &str,
        from_port: &str,
        to_model: &str,
        to_port: &str,
    ) {
        self.add_coupling(Coupling::internal(from_model, from_port, to_model, to_port));
    }

    /// Adds an external input coupling.
    pub fn add_external_input_coupling(&mut self, port: &str, to_model: &str, to_port: &str) {
        self.add_coupling(Coupling::external_input(port, to_model, to_port));
    }

    /// Adds an external output coupling.
    pub fn add_external_output_coupling(&mut self, from_model: &str, from_port: &str, port: &str) {
        self.add_coupling(Coupling::external_output(from_model, from_port, port));
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        self.component.name()
    }

    /// Returns the boundary component.
    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Returns the children in insertion order.
    pub fn children(&self) -> &[Model] {
        &self.children
    }

    /// Returns the child called `name`.
    pub fn child(&self, name: &str) -> Option<&Model> {
        self.children.iter().find(|c| c.name() == name)
    }

    /// Returns the couplings in insertion order.
    pub fn couplings(&self) -> &[Coupling] {
        &self.couplings
    }

    pub(crate) fn into_parts(self) -> (Component, Vec<Model>, Vec<Coupling>) {
        (self.component, self.children, self.couplings)
    }
}
