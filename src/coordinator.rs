//! Coordinator: the simulator of a coupled model.
//!
//! A `Coordinator` owns one child simulator per child model and the
//! couplings between them, resolved to `(child, port)` indices when the
//! coordinator is built. Its `time_next` is the minimum over its children.

use std::collections::HashSet;

use crate::component::Component;
use crate::coupled::{Coupling, CouplingKind, CoupledModel, Model};
use crate::error::{ErrorClass, SimError, SimResult};
use crate::logger::Loggers;
use crate::simulator::{AbstractSimulator, Simulator};
use crate::types::{ModelId, SimTime, INFINITY};

/// A resolved port: `child` index and port index within that child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PortRef {
    child: usize,
    port: usize,
}

/// Counters kept by a coordinator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Collection phases in which at least one child was imminent
    pub collections: u64,
    /// Transition phases executed
    pub transitions: u64,
    /// Messages copied along couplings
    pub messages_routed: u64,
}

/// Simulator of a coupled model.
pub struct Coordinator {
    component: Component,
    children: Vec<Box<dyn AbstractSimulator>>,
    /// child output -> sibling input
    ic: Vec<(PortRef, PortRef)>,
    /// own input -> child input
    eic: Vec<(usize, PortRef)>,
    /// child output -> own output
    eoc: Vec<(PortRef, usize)>,
    time_last: SimTime,
    time_next: SimTime,
    stats: CoordinatorStats,
}

impl Coordinator {
    /// Builds the simulation subtree for `model`, starting at `time`.
    ///
    /// Fails if a coupling refers to a missing child or port, couples a
    /// child to itself, or is declared twice.
    pub fn new(model: CoupledModel, time: SimTime) -> SimResult<Self> {
        let (component, children, couplings) = model.into_parts();

        let children = children
            .into_iter()
            .map(|child| -> SimResult<Box<dyn AbstractSimulator>> {
                let simulator: Box<dyn AbstractSimulator> = match child {
                    Model::Atomic(m) => Box::new(Simulator::new(m, time)),
                    Model::Coupled(m) => Box::new(Coordinator::new(m, time)?),
                };
                Ok(simulator)
            })
            .collect::<SimResult<Vec<_>>>()?;

        let mut coordinator = Self {
            component,
            children,
            ic: Vec::new(),
            eic: Vec::new(),
            eoc: Vec::new(),
            time_last: time,
            time_next: INFINITY,
            stats: CoordinatorStats::default(),
        };
        coordinator.resolve_couplings(&couplings)?;
        Ok(coordinator)
    }

    fn dangling(&self, coupling: &Coupling, what: String) -> SimError {
        SimError::DanglingCoupling {
            model: self.component.name().to_string(),
            reason: format!("{}: {}", coupling, what),
        }
    }

    fn child_index(&self, coupling: &Coupling, name: &str) -> SimResult<usize> {
        self.children
            .iter()
            .position(|c| c.component().name() == name)
            .ok_or_else(|| self.dangling(coupling, format!("no child named '{}'", name)))
    }

    fn child_out(&self, coupling: &Coupling, name: &str, port: &str) -> SimResult<PortRef> {
        let child = self.child_index(coupling, name)?;
        let port = self.children[child]
            .component()
            .out_ports()
            .index_of(port)
            .ok_or_else(|| {
                self.dangling(coupling, format!("'{}' has no output port '{}'", name, port))
            })?;
        Ok(PortRef { child, port })
    }

    fn child_in(&self, coupling: &Coupling, name: &str, port: &str) -> SimResult<PortRef> {
        let child = self.child_index(coupling, name)?;
        let port = self.children[child]
            .component()
            .in_ports()
            .index_of(port)
            .ok_or_else(|| {
                self.dangling(coupling, format!("'{}' has no input port '{}'", name, port))
            })?;
        Ok(PortRef { child, port })
    }

    fn resolve_couplings(&mut self, couplings: &[Coupling]) -> SimResult<()> {
        let mut seen = HashSet::new();
        for coupling in couplings {
            if !seen.insert(coupling) {
                return Err(SimError::DuplicateCoupling {
                    model: self.component.name().to_string(),
                    coupling: coupling.to_string(),
                });
            }

            let from = coupling.from.model.as_deref();
            let to = coupling.to.model.as_deref();
            match (coupling.kind(), from, to) {
                (Some(CouplingKind::Internal), Some(from), Some(to)) => {
                    if from == to {
                        return Err(SimError::SelfCoupling {
                            model: self.component.name().to_string(),
                            child: from.to_string(),
                        });
                    }
                    let src = self.child_out(coupling, from, &coupling.from.port)?;
                    let dst = self.child_in(coupling, to, &coupling.to.port)?;
                    self.ic.push((src, dst));
                }
                (Some(CouplingKind::ExternalInput), None, Some(to)) => {
                    let own = self
                        .component
                        .in_ports()
                        .index_of(&coupling.from.port)
                        .ok_or_else(|| {
                            self.dangling(coupling, "no such boundary input port".to_string())
                        })?;
                    let dst = self.child_in(coupling, to, &coupling.to.port)?;
                    self.eic.push((own, dst));
                }
                (Some(CouplingKind::ExternalOutput), Some(from), None) => {
                    let src = self.child_out(coupling, from, &coupling.from.port)?;
                    let own = self
                        .component
                        .out_ports()
                        .index_of(&coupling.to.port)
                        .ok_or_else(|| {
                            self.dangling(coupling, "no such boundary output port".to_string())
                        })?;
                    self.eoc.push((src, own));
                }
                _ => {
                    return Err(self.dangling(
                        coupling,
                        "boundary-to-boundary couplings are not supported".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Returns the child simulators in model order.
    pub fn children(&self) -> &[Box<dyn AbstractSimulator>] {
        &self.children
    }

    /// Returns the child simulator of the model called `name`.
    pub fn child(&self, name: &str) -> Option<&dyn AbstractSimulator> {
        self.children
            .iter()
            .find(|c| c.component().name() == name)
            .map(|c| c.as_ref())
    }

    /// Returns the counters.
    pub fn stats(&self) -> &CoordinatorStats {
        &self.stats
    }

    /// Recomputes `time_next` as the minimum over the children.
    pub fn recompute_time_next(&mut self) -> SimTime {
        self.time_next = self
            .children
            .iter()
            .map(|c| c.time_next())
            .fold(INFINITY, f64::min);
        self.time_next
    }

    fn out_of_bounds(&self, time: SimTime) -> SimError {
        SimError::TransitionOutOfBounds {
            model: self.component.name().to_string(),
            time,
            time_last: self.time_last,
            time_next: self.time_next,
        }
    }
}

impl AbstractSimulator for Coordinator {
    fn component(&self) -> &Component {
        &self.component
    }

    fn component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn set_model_id(&mut self, next: ModelId) -> ModelId {
        self.component.set_id(next);
        self.children
            .iter_mut()
            .fold(next + 1, |id, child| child.set_model_id(id))
    }

    fn time_last(&self) -> SimTime {
        self.time_last
    }

    fn time_next(&self) -> SimTime {
        self.time_next
    }

    fn start(&mut self, time: SimTime, loggers: &Loggers) -> SimResult<()> {
        self.time_last = time;
        self.stats = CoordinatorStats::default();
        let mut deferred = None;
        for child in &mut self.children {
            if let Err(e) = child.start(time, loggers) {
                if e.class() != ErrorClass::Environment {
                    self.recompute_time_next();
                    return Err(e);
                }
                deferred.get_or_insert(e);
            }
        }
        self.recompute_time_next();
        deferred.map_or(Ok(()), Err)
    }

    fn stop(&mut self, time: SimTime, loggers: &Loggers) -> SimResult<()> {
        // every child logs its final state even if an earlier one failed
        let mut first = None;
        for child in &mut self.children {
            if let Err(e) = child.stop(time, loggers) {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    fn collection(&mut self, time: SimTime) -> SimResult<()> {
        if time > self.time_next {
            return Err(self.out_of_bounds(time));
        }
        if time < self.time_next {
            return Ok(());
        }

        let imminent: Vec<bool> = self.children.iter().map(|c| c.time_next() == time).collect();
        for (child, &is_imminent) in self.children.iter_mut().zip(&imminent) {
            if is_imminent {
                child.collection(time)?;
            }
        }

        for &(src, dst) in &self.ic {
            if !imminent[src.child] {
                continue;
            }
            let messages = self.children[src.child]
                .component()
                .out_ports()
                .port(src.port)
                .messages()
                .to_vec();
            if messages.is_empty() {
                continue;
            }
            self.stats.messages_routed += messages.len() as u64;
            self.children[dst.child]
                .component_mut()
                .in_ports_mut()
                .port_mut(dst.port)
                .extend(messages);
        }

        for &(src, own) in &self.eoc {
            if !imminent[src.child] {
                continue;
            }
            let messages = self.children[src.child]
                .component()
                .out_ports()
                .port(src.port)
                .messages()
                .to_vec();
            self.stats.messages_routed += messages.len() as u64;
            self.component.out_ports_mut().port_mut(own).extend(messages);
        }

        self.stats.collections += 1;
        Ok(())
    }

    fn transition(&mut self, time: SimTime, loggers: &Loggers) -> SimResult<()> {
        if time < self.time_last || time > self.time_next {
            return Err(self.out_of_bounds(time));
        }

        for &(own, dst) in &self.eic {
            let messages = self.component.in_ports().port(own).messages().to_vec();
            if messages.is_empty() {
                continue;
            }
            self.stats.messages_routed += messages.len() as u64;
            self.children[dst.child]
                .component_mut()
                .in_ports_mut()
                .port_mut(dst.port)
                .extend(messages);
        }

        // An environment failure in one child must not leave its siblings
        // untransitioned: finish the instant, then report the first one.
        let mut deferred = None;
        for child in &mut self.children {
            if child.time_next() != time && child.component().in_empty() {
                continue;
            }
            if let Err(e) = child.transition(time, loggers) {
                if e.class() != ErrorClass::Environment {
                    return Err(e);
                }
                deferred.get_or_insert(e);
            }
        }

        self.time_last = time;
        self.recompute_time_next();
        self.stats.transitions += 1;

        match deferred {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn clear(&mut self) {
        for child in &mut self.children {
            child.clear();
        }
        self.component.clear_ports();
    }

    fn export_stats(&self) -> serde_json::Value {
        let children: Vec<_> = self.children.iter().map(|c| c.export_stats()).collect();
        serde_json::json!({
            "model": self.component.name(),
            "model_id": self.model_id(),
            "kind": "coupled",
            "time_last": self.time_last,
            "time_next": self.time_next,
            "collections": self.stats.collections,
            "transitions": self.stats.transitions,
            "messages_routed": self.stats.messages_routed,
            "children": children,
        })
    }
}
