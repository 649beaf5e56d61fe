//! Built-in atomic models.
//!
//! These models can be used directly, from a configuration file through
//! the [`default_registry`](crate::registry::default_registry), or as
//! references for implementing custom [`Atomic`](crate::atomic::Atomic)
//! behaviour.
//!
//! # Available Models
//!
//! - [`Generator`] - Emits an incrementing job id every period
//! - [`Processor`] - Serves one job at a time, drops jobs while busy
//! - [`Counter`] - Passive sink counting received messages

pub mod counter;
pub mod generator;
pub mod processor;

pub use counter::Counter;
pub use generator::Generator;
pub use processor::Processor;
