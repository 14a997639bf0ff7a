//! Simulation error types

use crate::config::ConfigError;
use crate::report::RunawayReport;
use core_types::Tick;
use resources::ResourceError;
use thiserror::Error;

/// Errors that abort a run
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimError {
    /// Parameters or jobs rejected at startup
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The clock passed the runaway limit with work remaining
    #[error("Runaway simulation: {0}")]
    Runaway(Box<RunawayReport>),

    /// Internal bookkeeping disagrees with itself
    #[error("Invariant violated at tick {tick}: {detail}")]
    Invariant { tick: Tick, detail: String },

    /// A memory or device table refused an operation the engine believed valid
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
}

impl SimError {
    pub(crate) fn invariant(tick: Tick, detail: impl Into<String>) -> Self {
        SimError::Invariant {
            tick,
            detail: detail.into(),
        }
    }

    /// True for errors that indicate an engine bug rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(self, SimError::Invariant { .. } | SimError::Resource(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SimError::invariant(7, "pid 3 in two queues");
        assert_eq!(
            err.to_string(),
            "Invariant violated at tick 7: pid 3 in two queues"
        );
        assert!(err.is_internal());

        let err: SimError = ConfigError::ZeroQuantum.into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Time quantum must be positive"
        );
        assert!(!err.is_internal());
    }
}
