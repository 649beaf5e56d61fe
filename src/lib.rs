//! # pdevs
//!
//! A hierarchical Parallel DEVS simulation kernel.
//!
//! Models form a tree: atomic models are the leaves, coupled models compose
//! children and connect their ports through couplings. The simulation tree
//! mirrors the model tree, with a [`Simulator`] per atomic model and a
//! [`Coordinator`] per coupled model, driven by a [`RootCoordinator`].
//!
//! ## Design Principles
//!
//! - **Two-phase cycle**: every instant runs `collection` (outputs are
//!   produced and routed) before `transition` (states change), then
//!   `clear` empties every port.
//! - **Simultaneous events**: a model that is imminent and receives input
//!   at the same instant runs its confluent transition.
//! - **Two run modes**: as fast as possible with an iteration budget, or
//!   paced against a [`RealTimeClock`] for a virtual duration.
//! - **Pluggable trace**: the simulation trace (times, outputs, states)
//!   goes to up to two [`Logger`]s; kernel diagnostics go through `tracing`.
//!
//! ## Quick Start
//!
//! ```rust
//! use pdevs::{Coupling, CoupledModel, RootCoordinator};
//! use pdevs::models::{Counter, Generator};
//!
//! let model = CoupledModel::new("top")
//!     .with_child(Generator::new(1.0).with_limit(3).into_model("gen").unwrap())
//!     .unwrap()
//!     .with_child(Counter::new().into_model("counter").unwrap())
//!     .unwrap()
//!     .with_coupling(Coupling::internal("gen", "out", "counter", "in"));
//!
//! let mut root = RootCoordinator::new(model).unwrap();
//! root.start().unwrap();
//! let cycles = root.simulate(100).unwrap();
//! root.stop().unwrap();
//!
//! assert_eq!(cycles, 3);
//! println!("{}", root.export_stats());
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use pdevs::config::SimConfig;
//! use pdevs::registry::default_registry;
//!
//! let config = SimConfig::from_file("gpt.yaml")?;
//! let mut root = config.build_root(&default_registry())?;
//! config.run(&mut root)?;
//! ```

pub mod types;
pub mod error;
pub mod port;
pub mod component;
pub mod atomic;
pub mod coupled;
pub mod simulator;
pub mod coordinator;
pub mod root;
pub mod clock;
pub mod logger;
pub mod config;
pub mod registry;
pub mod stats;
pub mod models;

// Re-export commonly used types
pub use types::{ModelId, SimTime, INFINITY};
pub use error::{ErrorClass, SimError, SimResult};
pub use port::{Port, PortSet};
pub use component::Component;
pub use atomic::{Atomic, AtomicModel};
pub use coupled::{Coupling, CouplingKind, CoupledModel, Endpoint, Model};
pub use simulator::{AbstractSimulator, Simulator, SimulatorStats};
pub use coordinator::{Coordinator, CoordinatorStats};
pub use root::{RootCoordinator, RootStats};
pub use clock::{RealTimeClock, SystemClock, VirtualClock};
pub use logger::{CsvLogger, LogRecord, Logger, Loggers, RecordingLogger};
pub use config::{ConfigError, SimConfig, SimConfigBuilder};
pub use registry::{default_registry, ModelRegistry};
pub use stats::{SimulationStats, StatsCollector, Timer};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging. `RUST_LOG`
/// overrides `level`. Calling it again is a no-op.
///
/// # Example
///
/// ```rust,ignore
/// pdevs::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
