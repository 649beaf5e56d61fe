//! Core type definitions for the simulation kernel.
//!
//! This module defines the fundamental types shared by every simulation node.

/// Simulation time.
///
/// Parallel DEVS time is continuous, so it is carried as `f64`. A model that
/// has no scheduled internal event reports [`INFINITY`] as its next time.
pub type SimTime = f64;

/// Identifier assigned to every model when a run starts.
///
/// Ids are assigned depth-first from the top coordinator (which gets `0`)
/// and are unique within one run.
pub type ModelId = u64;

/// The "never" time: a passive model schedules its next event here.
pub const INFINITY: SimTime = f64::INFINITY;

/// Returns `true` if `time` is a finite, schedulable instant.
#[inline]
pub fn is_finite(time: SimTime) -> bool {
    time.is_finite()
}

/// Returns `true` if `time` is a valid time advance (non-negative or infinity).
///
/// NaN and negative values are model errors.
#[inline]
pub fn is_valid_advance(advance: SimTime) -> bool {
    advance >= 0.0
}
