//! Simulation configuration
//!
//! The parsed operating-system parameter record. Loaders produce it, the
//! simulator validates it once in [`Simulator::new`](crate::Simulator::new).

use core_types::{JobError, Tick};
use resources::{DeviceUnits, MemoryConfig, ResourceError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tick ceiling after which a run is considered a runaway
pub const DEFAULT_RUNAWAY_LIMIT: Tick = 3000;

/// Scheduling discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Algorithm {
    /// First-in, first-out
    Fifo,
    /// Static initial priority
    Ipri,
    /// Multi-level feedback queue
    Mlfq,
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "FIFO" => Ok(Algorithm::Fifo),
            "IPRI" => Ok(Algorithm::Ipri),
            "MLFQ" => Ok(Algorithm::Mlfq),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Fifo => "FIFO",
            Algorithm::Ipri => "IPRI",
            Algorithm::Mlfq => "MLFQ",
        };
        f.write_str(name)
    }
}

/// Configuration errors, fatal at startup
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    Memory(#[from] ResourceError),

    #[error("Maximum process count must be positive")]
    ZeroMaxProcesses,

    #[error("Time quantum must be positive")]
    ZeroQuantum,

    #[error("Runaway limit must be positive")]
    ZeroRunawayLimit,

    #[error("Unknown scheduling algorithm: '{0}'")]
    UnknownAlgorithm(String),

    #[error("Invalid job: {0}")]
    InvalidJob(#[from] JobError),
}

fn default_runaway_limit() -> Tick {
    DEFAULT_RUNAWAY_LIMIT
}

/// Operating-system parameters for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    pub memory: MemoryConfig,
    /// Capacity of the process table
    pub max_processes: usize,
    /// CPU ticks granted per dispatch
    pub quantum: Tick,
    #[serde(default)]
    pub devices: DeviceUnits,
    /// Emit a snapshot every N ticks; zero disables snapshots
    #[serde(default)]
    pub report_interval: Tick,
    pub algorithm: Algorithm,
    #[serde(default = "default_runaway_limit")]
    pub runaway_limit: Tick,
}

impl SimConfig {
    /// Checks the parameters describe a machine that can run anything
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.memory.validate()?;
        if self.max_processes == 0 {
            return Err(ConfigError::ZeroMaxProcesses);
        }
        if self.quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.runaway_limit == 0 {
            return Err(ConfigError::ZeroRunawayLimit);
        }
        Ok(())
    }

    /// Builder: sets the scheduling algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Builder: sets the memory model
    pub fn with_memory(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }

    /// Builder: sets the time quantum
    pub fn with_quantum(mut self, quantum: Tick) -> Self {
        self.quantum = quantum;
        self
    }

    /// Builder: sets the process table capacity
    pub fn with_max_processes(mut self, max_processes: usize) -> Self {
        self.max_processes = max_processes;
        self
    }

    /// Builder: sets the installed device units
    pub fn with_devices(mut self, devices: DeviceUnits) -> Self {
        self.devices = devices;
        self
    }

    /// Builder: sets the snapshot interval
    pub fn with_report_interval(mut self, report_interval: Tick) -> Self {
        self.report_interval = report_interval;
        self
    }

    /// Builder: sets the runaway tick ceiling
    pub fn with_runaway_limit(mut self, runaway_limit: Tick) -> Self {
        self.runaway_limit = runaway_limit;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::Fixed {
                block_size: 1000,
                total_blocks: 32,
            },
            max_processes: 8,
            quantum: 4,
            devices: DeviceUnits::default(),
            report_interval: 0,
            algorithm: Algorithm::Fifo,
            runaway_limit: DEFAULT_RUNAWAY_LIMIT,
        }
    }
}
