//! Message ports.
//!
//! A port is a named buffer of messages that lives for exactly one
//! simulation cycle: filled during the collection phase, read during the
//! transition phase and emptied by `clear()`. Messages are carried as
//! `serde_json::Value` so that any serialisable payload can cross a
//! coupling without the kernel knowing its type.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{SimError, SimResult};

/// A named message buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    name: String,
    messages: Vec<Value>,
}

impl Port {
    /// Creates an empty port.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
        }
    }

    /// Returns the port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the messages buffered this cycle, in arrival order.
    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    /// Appends a message.
    pub fn push(&mut self, message: Value) {
        self.messages.push(message);
    }

    /// Appends every message from `messages`.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Value>) {
        self.messages.extend(messages);
    }

    /// Returns `true` if the port holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the number of buffered messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Drops every buffered message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Deserializes every buffered message into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        self.messages
            .iter()
            .map(|m| serde_json::from_value(m.clone()))
            .collect()
    }

    /// Text form of message `index` as handed to loggers.
    ///
    /// Strings are written bare; every other value uses compact JSON.
    pub fn log_message(&self, index: usize) -> Option<String> {
        self.messages.get(index).map(message_text)
    }
}

/// Renders a message for a log line.
pub fn message_text(message: &Value) -> String {
    match message {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// An ordered collection of uniquely named ports belonging to one model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PortSet {
    owner: String,
    ports: Vec<Port>,
}

impl PortSet {
    /// Creates an empty port set owned by the model called `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ports: Vec::new(),
        }
    }

    /// Declares a new port.
    pub fn add(&mut self, name: impl Into<String>) -> SimResult<usize> {
        let name = name.into();
        if self.index_of(&name).is_some() {
            return Err(SimError::DuplicatePort {
                model: self.owner.clone(),
                port: name,
            });
        }
        self.ports.push(Port::new(name));
        Ok(self.ports.len() - 1)
    }

    /// Returns the position of the port called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name == name)
    }

    /// Returns the port called `name`.
    pub fn get(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Returns the port called `name` mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    /// Returns the port at `index`.
    pub fn port(&self, index: usize) -> &Port {
        &self.ports[index]
    }

    /// Returns the port at `index` mutably.
    pub fn port_mut(&mut self, index: usize) -> &mut Port {
        &mut self.ports[index]
    }

    /// Pushes a serialisable message onto the port called `name`.
    ///
    /// Fails with [`SimError::UnknownPort`] if no such port was declared.
    pub fn push<T: Serialize>(&mut self, name: &str, message: T) -> SimResult<()> {
        let value = serde_json::to_value(message).map_err(|e| SimError::InvalidMessage {
            model: self.owner.clone(),
            port: name.to_string(),
            reason: e.to_string(),
        })?;
        self.push_value(name, value)
    }

    /// Pushes a raw JSON message onto the port called `name`.
    pub fn push_value(&mut self, name: &str, message: Value) -> SimResult<()> {
        match self.get_mut(name) {
            Some(port) => {
                port.push(message);
                Ok(())
            }
            None => Err(SimError::UnknownPort {
                model: self.owner.clone(),
                port: name.to_string(),
            }),
        }
    }

    /// Messages on the port called `name`; empty if it doesn't exist.
    pub fn messages(&self, name: &str) -> &[Value] {
        self.get(name).map(|p| p.messages()).unwrap_or(&[])
    }

    /// Returns `true` if no port holds a message.
    pub fn is_empty(&self) -> bool {
        self.ports.iter().all(Port::is_empty)
    }

    /// Empties every port.
    pub fn clear(&mut self) {
        for port in &mut self.ports {
            port.clear();
        }
    }

    /// Iterates over the ports in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Returns the number of declared ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Returns the name of the owning model.
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_buffering() {
        let mut port = Port::new("out");
        assert!(port.is_empty());

        port.push(json!(1));
        port.push(json!("two"));
        assert_eq!(port.len(), 2);
        assert_eq!(port.log_message(0).as_deref(), Some("1"));
        assert_eq!(port.log_message(1).as_deref(), Some("two"));
        assert_eq!(port.log_message(2), None);

        port.clear();
        assert!(port.is_empty());
    }

    #[test]
    fn test_port_decode() {
        let mut port = Port::new("in");
        port.extend([json!(3), json!(4)]);
        let values: Vec<u32> = port.decode().unwrap();
        assert_eq!(values, vec![3, 4]);

        port.push(json!("not a number"));
        assert!(port.decode::<u32>().is_err());
    }

    #[test]
    fn test_port_set_duplicates_rejected() {
        let mut ports = PortSet::new("gen");
        assert_eq!(ports.add("out").unwrap(), 0);
        assert_eq!(ports.add("done").unwrap(), 1);

        let err = ports.add("out").unwrap_err();
        assert!(matches!(err, SimError::DuplicatePort { .. }));
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_port_set_push_unknown_port() {
        let mut ports = PortSet::new("gen");
        ports.add("out").unwrap();

        ports.push("out", 7).unwrap();
        assert_eq!(ports.messages("out"), &[json!(7)]);

        let err = ports.push("missing", 1).unwrap_err();
        match err {
            SimError::UnknownPort { model, port } => {
                assert_eq!(model, "gen");
                assert_eq!(port, "missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_port_set_clear() {
        let mut ports = PortSet::new("m");
        ports.add("a").unwrap();
        ports.add("b").unwrap();
        ports.push("a", "x").unwrap();
        ports.push("b", "y").unwrap();
        assert!(!ports.is_empty());

        ports.clear();
        assert!(ports.is_empty());
        assert!(ports.messages("a").is_empty());
        assert!(ports.messages("missing").is_empty());
    }
}
