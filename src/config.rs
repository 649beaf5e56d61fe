//! Declarative simulation setup.
//!
//! A [`SimConfig`] describes a model tree (coupled models, atomic models by
//! registered type name, couplings) and how to run it. It loads from YAML or
//! JSON and builds a ready [`RootCoordinator`].
//!
//! # Layout
//!
//! ```yaml
//! simulation:
//!   start_time: 0.0
//!   run:
//!     mode: iterations
//!     iterations: 100
//!   log_level: info
//!   collect_stats: true
//!   output_file: trace.csv
//!
//! model:
//!   name: gpt
//!   children:
//!     - kind: atomic
//!       name: generator
//!       type: Generator
//!       attrs:
//!         period: "1.0"
//!     - kind: atomic
//!       name: counter
//!       type: Counter
//!   couplings:
//!     - from: { model: generator, port: out }
//!       to: { model: counter, port: in }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::clock::SystemClock;
use crate::coupled::{Coupling, CoupledModel, Endpoint};
use crate::error::{SimError, SimResult};
use crate::logger::CsvLogger;
use crate::registry::ModelRegistry;
use crate::root::RootCoordinator;
use crate::types::SimTime;

/// Why a configuration could not be loaded or built.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("unknown configuration format '{0}' (expected yaml, yml or json)")]
    UnknownFormat(String),

    #[error(transparent)]
    Model(#[from] SimError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How the simulation is driven.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunMode {
    /// As fast as possible, for at most `iterations` cycles.
    Iterations { iterations: u64 },
    /// Paced against the wall clock for `duration` virtual time units.
    RealTime {
        duration: SimTime,
        #[serde(default = "default_seconds_per_unit")]
        seconds_per_unit: f64,
    },
}

fn default_seconds_per_unit() -> f64 {
    1.0
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Iterations { iterations: 1000 }
    }
}

/// How to run the model tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Virtual time of the first `start`
    #[serde(default)]
    pub start_time: SimTime,

    /// Run mode and its budget
    #[serde(default)]
    pub run: RunMode,

    /// `tracing` filter passed to `init_logging`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Print run statistics when done
    #[serde(default)]
    pub collect_stats: bool,

    /// CSV trace destination; stdout when absent
    #[serde(default)]
    pub output_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            run: RunMode::default(),
            log_level: default_log_level(),
            collect_stats: false,
            output_file: None,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.start_time.is_finite() {
            return Err(ConfigError::Validation(format!(
                "start_time must be finite, got {}",
                self.start_time
            )));
        }
        if let RunMode::RealTime {
            duration,
            seconds_per_unit,
        } = self.run
        {
            if duration.is_nan() || duration < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "real_time duration must be non-negative, got {}",
                    duration
                )));
            }
            if !(seconds_per_unit > 0.0 && seconds_per_unit.is_finite()) {
                return Err(ConfigError::Validation(format!(
                    "seconds_per_unit must be positive, got {}",
                    seconds_per_unit
                )));
            }
        }
        Ok(())
    }
}

/// An atomic model instantiated from the registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AtomicConfig {
    /// Model name, unique among siblings
    pub name: String,

    /// Registered type name
    #[serde(rename = "type")]
    pub model_type: String,

    /// Factory attributes, parsed by the factory
    #[serde(default)]
    pub attrs: HashMap<String, String>,
}

/// A coupled model: boundary ports, children and couplings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoupledConfig {
    /// Model name, unique among siblings
    pub name: String,

    /// Boundary input port names
    #[serde(default)]
    pub in_ports: Vec<String>,

    /// Boundary output port names
    #[serde(default)]
    pub out_ports: Vec<String>,

    /// Children, in order
    #[serde(default)]
    pub children: Vec<ModelConfig>,

    /// Couplings; an endpoint without `model` is a boundary port
    #[serde(default)]
    pub couplings: Vec<Coupling>,
}

/// A node of the configured model tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelConfig {
    Atomic(AtomicConfig),
    Coupled(CoupledConfig),
}

impl ModelConfig {
    /// Returns the model name.
    pub fn name(&self) -> &str {
        match self {
            ModelConfig::Atomic(a) => &a.name,
            ModelConfig::Coupled(c) => &c.name,
        }
    }
}

impl CoupledConfig {
    /// Creates an empty coupled model description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
            children: Vec::new(),
            couplings: Vec::new(),
        }
    }

    /// Declares a boundary input port.
    pub fn in_port(mut self, name: impl Into<String>) -> Self {
        self.in_ports.push(name.into());
        self
    }

    /// Declares a boundary output port.
    pub fn out_port(mut self, name: impl Into<String>) -> Self {
        self.out_ports.push(name.into());
        self
    }

    /// Adds an atomic child.
    pub fn atomic(
        mut self,
        name: impl Into<String>,
        model_type: impl Into<String>,
        attrs: &[(&str, &str)],
    ) -> Self {
        self.children.push(ModelConfig::Atomic(AtomicConfig {
            name: name.into(),
            model_type: model_type.into(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }));
        self
    }

    /// Adds a coupled child.
    pub fn coupled(mut self, child: CoupledConfig) -> Self {
        self.children.push(ModelConfig::Coupled(child));
        self
    }

    /// Adds a coupling.
    pub fn coupling(mut self, coupling: Coupling) -> Self {
        self.couplings.push(coupling);
        self
    }

    fn child(&self, name: &str) -> Option<&ModelConfig> {
        self.children.iter().find(|c| c.name() == name)
    }

    /// Checks child names and coupling references, recursively.
    ///
    /// Ports of atomic children are declared by their factories, so they
    /// are checked when the model is built.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::Validation("Model with empty name".to_string()));
        }

        let mut names = HashSet::new();
        for child in &self.children {
            if !names.insert(child.name()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate child '{}' in '{}'",
                    child.name(),
                    self.name
                )));
            }
            if let ModelConfig::Coupled(c) = child {
                c.validate()?;
            }
        }

        for coupling in &self.couplings {
            self.validate_endpoint(coupling, &coupling.from, true)?;
            self.validate_endpoint(coupling, &coupling.to, false)?;
        }
        Ok(())
    }

    fn validate_endpoint(&self, coupling: &Coupling, end: &Endpoint, source: bool) -> ConfigResult<()> {
        let found = match (&end.model, source) {
            (None, true) => self.in_ports.contains(&end.port),
            (None, false) => self.out_ports.contains(&end.port),
            (Some(model), _) => match self.child(model) {
                None => false,
                Some(ModelConfig::Atomic(_)) => true,
                Some(ModelConfig::Coupled(c)) if source => c.out_ports.contains(&end.port),
                Some(ModelConfig::Coupled(c)) => c.in_ports.contains(&end.port),
            },
        };
        if found {
            Ok(())
        } else {
            Err(ConfigError::Validation(format!(
                "Coupling {} in '{}' references unknown endpoint {}",
                coupling, self.name, end
            )))
        }
    }

    /// Builds the model tree, instantiating atomic models from `registry`.
    pub fn build(&self, registry: &ModelRegistry) -> ConfigResult<CoupledModel> {
        let mut model = CoupledModel::new(self.name.as_str());
        for port in &self.in_ports {
            model = model.with_in_port(port.as_str())?;
        }
        for port in &self.out_ports {
            model = model.with_out_port(port.as_str())?;
        }

        for child in &self.children {
            match child {
                ModelConfig::Atomic(a) => {
                    let atomic = registry
                        .create(&a.model_type, &a.name, &a.attrs)
                        .ok_or_else(|| {
                            ConfigError::Validation(format!(
                                "Unknown model type '{}' for '{}'",
                                a.model_type, a.name
                            ))
                        })??;
                    model.add_child(atomic)?;
                }
                ModelConfig::Coupled(c) => model.add_child(c.build(registry)?)?,
            }
        }

        for coupling in &self.couplings {
            model.add_coupling(coupling.clone());
        }
        Ok(model)
    }

    /// Counts the models of this subtree, itself included.
    pub fn model_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| match c {
                ModelConfig::Atomic(_) => 1,
                ModelConfig::Coupled(c) => c.model_count(),
            })
            .sum::<usize>()
    }
}

impl Default for CoupledConfig {
    fn default() -> Self {
        Self::new("top")
    }
}

/// On-disk configuration formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn of(path: &Path) -> ConfigResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    fn parse(self, text: &str) -> ConfigResult<SimConfig> {
        let config: SimConfig = match self {
            Format::Yaml => serde_yaml::from_str(text)?,
            Format::Json => serde_json::from_str(text)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn render(self, config: &SimConfig) -> ConfigResult<String> {
        Ok(match self {
            Format::Yaml => serde_yaml::to_string(config)?,
            Format::Json => serde_json::to_string_pretty(config)?,
        })
    }
}

/// A model tree and how to run it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// Global simulation parameters
    #[serde(default)]
    pub simulation: SimulationParams,

    /// Top-level coupled model
    #[serde(default)]
    pub model: CoupledConfig,
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        Format::Yaml.parse(yaml)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Format::Json.parse(json)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Format::Yaml.parse(&std::fs::read_to_string(path)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Format::Json.parse(&std::fs::read_to_string(path)?)
    }

    /// Loads a file, picking the format from its extension
    /// (`.yaml`, `.yml` or `.json`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        Format::of(path)?.parse(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.simulation.validate()?;
        self.model.validate()
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Format::Yaml.render(self)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Format::Json.render(self)
    }

    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Returns the number of models in the tree, the top model included.
    pub fn model_count(&self) -> usize {
        self.model.model_count()
    }

    /// Builds the configured model tree.
    pub fn build_model(&self, registry: &ModelRegistry) -> ConfigResult<CoupledModel> {
        self.model.build(registry)
    }

    /// Builds a root coordinator for the configured model: start time,
    /// wall clock scale and a CSV trace logger (file or stdout).
    pub fn build_root(&self, registry: &ModelRegistry) -> ConfigResult<RootCoordinator> {
        let model = self.build_model(registry)?;
        let mut root = RootCoordinator::with_start_time(model, self.simulation.start_time)?;

        if let RunMode::RealTime {
            seconds_per_unit, ..
        } = self.simulation.run
        {
            root.set_clock(Box::new(SystemClock::new().with_scale(seconds_per_unit)));
        }
        match &self.simulation.output_file {
            Some(path) => root.set_logger(Box::new(CsvLogger::create(path)?)),
            None => root.set_logger(Box::new(CsvLogger::stdout())),
        }
        Ok(root)
    }

    /// Starts `root`, runs it in the configured mode and stops it.
    /// Returns the number of cycles executed.
    pub fn run(&self, root: &mut RootCoordinator) -> SimResult<u64> {
        root.start()?;
        let cycles = match self.simulation.run {
            RunMode::Iterations { iterations } => root.simulate(iterations)?,
            RunMode::RealTime { duration, .. } => root.simulate_for(duration)?,
        };
        root.stop()?;
        Ok(cycles)
    }
}

/// Builder for creating SimConfig programmatically.
#[derive(Default)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the start time.
    pub fn start_time(mut self, time: SimTime) -> Self {
        self.config.simulation.start_time = time;
        self
    }

    /// Runs as fast as possible for at most `iterations` cycles.
    pub fn iterations(mut self, iterations: u64) -> Self {
        self.config.simulation.run = RunMode::Iterations { iterations };
        self
    }

    /// Runs paced against the wall clock.
    pub fn real_time(mut self, duration: SimTime, seconds_per_unit: f64) -> Self {
        self.config.simulation.run = RunMode::RealTime {
            duration,
            seconds_per_unit,
        };
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.simulation.log_level = level.into();
        self
    }

    /// Enables statistics collection.
    pub fn collect_stats(mut self, enable: bool) -> Self {
        self.config.simulation.collect_stats = enable;
        self
    }

    /// Writes the trace to `path` instead of stdout.
    pub fn output_file(mut self, path: impl Into<String>) -> Self {
        self.config.simulation.output_file = Some(path.into());
        self
    }

    /// Sets the top-level model.
    pub fn model(mut self, model: CoupledConfig) -> Self {
        self.config.model = model;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<SimConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;

    fn gpt() -> CoupledConfig {
        CoupledConfig::new("gpt")
            .out_port("done")
            .atomic("generator", "Generator", &[("period", "1.0"), ("limit", "3")])
            .atomic("processor", "Processor", &[("processing_time", "0.5")])
            .atomic("counter", "Counter", &[])
            .coupling(Coupling::internal("generator", "out", "processor", "in"))
            .coupling(Coupling::internal("processor", "out", "counter", "in"))
            .coupling(Coupling::external_output("processor", "out", "done"))
    }

    #[test]
    fn test_default_config() {
        let config = SimConfig::new();
        assert_eq!(config.simulation.start_time, 0.0);
        assert_eq!(config.simulation.run, RunMode::Iterations { iterations: 1000 });
        assert_eq!(config.model.name, "top");
        assert!(config.model.children.is_empty());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
simulation:
  start_time: 2.0
  run:
    mode: real_time
    duration: 10.0
    seconds_per_unit: 0.01
  log_level: debug

model:
  name: top
  children:
    - kind: atomic
      name: gen
      type: Generator
      attrs:
        period: "1.0"
    - kind: coupled
      name: sub
      in_ports: [in]
      children:
        - kind: atomic
          name: sink
          type: Counter
      couplings:
        - from: { port: in }
          to: { model: sink, port: in }
  couplings:
    - from: { model: gen, port: out }
      to: { model: sub, port: in }
"#;

        let config = SimConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.simulation.start_time, 2.0);
        assert_eq!(
            config.simulation.run,
            RunMode::RealTime {
                duration: 10.0,
                seconds_per_unit: 0.01
            }
        );
        assert_eq!(config.model.children.len(), 2);
        assert_eq!(config.model_count(), 4);
    }

    #[test]
    fn test_json_parsing() {
        let json = r#"{
            "simulation": { "run": { "mode": "iterations", "iterations": 5 } },
            "model": {
                "name": "top",
                "children": [
                    { "kind": "atomic", "name": "c", "type": "Counter" }
                ]
            }
        }"#;

        let config = SimConfig::from_json(json).unwrap();
        assert_eq!(config.simulation.run, RunMode::Iterations { iterations: 5 });
        assert_eq!(config.model_count(), 2);
    }

    #[test]
    fn test_builder() {
        let config = SimConfigBuilder::new()
            .iterations(20)
            .log_level("warn")
            .collect_stats(true)
            .model(gpt())
            .build()
            .unwrap();

        assert_eq!(config.simulation.log_level, "warn");
        assert!(config.simulation.collect_stats);
        assert_eq!(config.model_count(), 4);
    }

    #[test]
    fn test_build_model() {
        let config = SimConfigBuilder::new().model(gpt()).build().unwrap();
        let model = config.build_model(&default_registry()).unwrap();
        assert_eq!(model.name(), "gpt");
        assert_eq!(model.children().len(), 3);
        assert_eq!(model.couplings().len(), 3);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let config = SimConfigBuilder::new()
            .model(CoupledConfig::new("top").atomic("x", "Teleporter", &[]))
            .build()
            .unwrap();
        let err = config.build_model(&default_registry()).unwrap_err();
        assert!(err.to_string().contains("Teleporter"));
    }

    #[test]
    fn test_validation_duplicate_child() {
        let result = SimConfigBuilder::new()
            .model(
                CoupledConfig::new("top")
                    .atomic("a", "Counter", &[])
                    .atomic("a", "Counter", &[]),
            )
            .build();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_unknown_child_in_coupling() {
        let result = SimConfigBuilder::new()
            .model(
                CoupledConfig::new("top")
                    .atomic("a", "Generator", &[])
                    .coupling(Coupling::internal("a", "out", "ghost", "in")),
            )
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_unknown_boundary_port() {
        let result = SimConfigBuilder::new()
            .model(
                CoupledConfig::new("top")
                    .atomic("a", "Counter", &[])
                    .coupling(Coupling::external_input("missing", "a", "in")),
            )
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_bad_run_params() {
        let result = SimConfigBuilder::new().real_time(-1.0, 1.0).build();
        assert!(result.is_err());
        let result = SimConfigBuilder::new().real_time(1.0, 0.0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_atomic_port_errors_surface_at_build() {
        let config = SimConfigBuilder::new()
            .model(
                CoupledConfig::new("top")
                    .atomic("a", "Counter", &[])
                    .atomic("b", "Counter", &[])
                    .coupling(Coupling::internal("a", "out", "b", "in")),
            )
            .build()
            .unwrap();
        let err = config.build_root(&default_registry()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Model(SimError::DanglingCoupling { .. })
        ));
    }

    #[test]
    fn test_run_iterations() {
        let config = SimConfigBuilder::new()
            .iterations(100)
            .output_file(
                std::env::temp_dir()
                    .join("pdevs_config_run.csv")
                    .to_string_lossy()
                    .into_owned(),
            )
            .model(gpt())
            .build()
            .unwrap();
        let mut root = config.build_root(&default_registry()).unwrap();
        // 3 jobs generated and 3 completed
        assert_eq!(config.run(&mut root).unwrap(), 6);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = SimConfigBuilder::new()
            .real_time(5.0, 0.5)
            .model(gpt())
            .build()
            .unwrap();

        let yaml = config.to_yaml().unwrap();
        let restored = SimConfig::from_yaml(&yaml).unwrap();

        assert_eq!(config.simulation.run, restored.simulation.run);
        assert_eq!(config.model_count(), restored.model_count());
        assert_eq!(restored.model.couplings, config.model.couplings);
    }
}
