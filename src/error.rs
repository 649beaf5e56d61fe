//! Error types for the simulation kernel.
//!
//! Every failure falls into one of three classes (see [`ErrorClass`]):
//! a model broke the DEVS contract, the coupling structure is
//! misconfigured, or an environment collaborator (logger, clock) failed.
//! None of them is retried by the kernel.

use thiserror::Error;

use crate::types::SimTime;

/// Errors raised by the simulation kernel.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("model '{model}' returned an invalid time advance: {advance}")]
    InvalidTimeAdvance { model: String, advance: SimTime },

    #[error(
        "model '{model}' cannot act at t={time} outside [{time_last}, {time_next}]"
    )]
    TransitionOutOfBounds {
        model: String,
        time: SimTime,
        time_last: SimTime,
        time_next: SimTime,
    },

    #[error("model '{model}' has no port named '{port}'")]
    UnknownPort { model: String, port: String },

    #[error("model '{model}' produced an unserialisable message on '{port}': {reason}")]
    InvalidMessage {
        model: String,
        port: String,
        reason: String,
    },

    #[error("model '{model}' declares port '{port}' twice")]
    DuplicatePort { model: String, port: String },

    #[error("coupled model '{model}' has two children named '{child}'")]
    DuplicateChild { model: String, child: String },

    #[error("coupled model '{model}' has a dangling coupling: {reason}")]
    DanglingCoupling { model: String, reason: String },

    #[error("coupled model '{model}' declares coupling {coupling} twice")]
    DuplicateCoupling { model: String, coupling: String },

    #[error("coupled model '{model}' couples child '{child}' to itself")]
    SelfCoupling { model: String, child: String },

    #[error("logger error: {0}")]
    Logger(#[from] std::io::Error),

    #[error("real-time clock error: {0}")]
    Clock(String),
}

/// Coarse classification of a [`SimError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// An atomic model violated the DEVS contract.
    InvalidModel,
    /// The model structure (ports, children, couplings) is inconsistent.
    Configuration,
    /// A logger or clock collaborator failed.
    Environment,
}

impl SimError {
    /// Returns the class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            SimError::InvalidTimeAdvance { .. }
            | SimError::TransitionOutOfBounds { .. }
            | SimError::UnknownPort { .. }
            | SimError::InvalidMessage { .. } => ErrorClass::InvalidModel,
            SimError::DuplicatePort { .. }
            | SimError::DuplicateChild { .. }
            | SimError::DanglingCoupling { .. }
            | SimError::DuplicateCoupling { .. }
            | SimError::SelfCoupling { .. } => ErrorClass::Configuration,
            SimError::Logger(_) | SimError::Clock(_) => ErrorClass::Environment,
        }
    }
}

/// Result type for kernel operations.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_time_advance() {
        let e = SimError::InvalidTimeAdvance {
            model: "gen".to_string(),
            advance: -1.0,
        };
        let s = e.to_string();
        assert!(s.contains("gen"));
        assert!(s.contains("-1"));
    }

    #[test]
    fn test_display_out_of_bounds() {
        let e = SimError::TransitionOutOfBounds {
            model: "proc".to_string(),
            time: 5.0,
            time_last: 1.0,
            time_next: 3.0,
        };
        assert!(e.to_string().contains("t=5"));
    }

    #[test]
    fn test_error_classes() {
        let model = SimError::InvalidTimeAdvance {
            model: "m".to_string(),
            advance: f64::NAN,
        };
        assert_eq!(model.class(), ErrorClass::InvalidModel);

        let config = SimError::SelfCoupling {
            model: "top".to_string(),
            child: "a".to_string(),
        };
        assert_eq!(config.class(), ErrorClass::Configuration);

        let io = std::io::Error::new(std::io::ErrorKind::WriteZero, "tx buffer full");
        let env: SimError = io.into();
        assert_eq!(env.class(), ErrorClass::Environment);
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(SimError::Clock("stalled".to_string()));
        assert!(e.to_string().contains("stalled"));
    }
}
