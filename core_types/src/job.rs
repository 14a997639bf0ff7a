//! Job descriptions: the workloads waiting in the input queue

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of cycles a job may describe
pub const MAX_CYCLES: usize = 10;

/// Class of I/O device a cycle needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Disk,
    Tape,
    Cdrom,
}

impl DeviceClass {
    /// Every device class, in table order
    pub const ALL: [DeviceClass; 3] = [DeviceClass::Disk, DeviceClass::Tape, DeviceClass::Cdrom];

    /// Decodes the numeric device code used by job records (1 = disk, 2 = tape, 3 = CD-ROM)
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(DeviceClass::Disk),
            2 => Some(DeviceClass::Tape),
            3 => Some(DeviceClass::Cdrom),
            _ => None,
        }
    }

    /// Returns the numeric device code
    pub fn code(&self) -> i32 {
        match self {
            DeviceClass::Disk => 1,
            DeviceClass::Tape => 2,
            DeviceClass::Cdrom => 3,
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceClass::Disk => "disk",
            DeviceClass::Tape => "tape",
            DeviceClass::Cdrom => "cdrom",
        };
        f.write_str(name)
    }
}

/// One CPU burst followed by an I/O burst on a device
///
/// An `io_units` of zero means the cycle is CPU-only; `device` is then ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    #[serde(rename = "cpu")]
    pub cpu_units: u32,
    #[serde(rename = "io", default)]
    pub io_units: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceClass>,
}

impl Cycle {
    /// A CPU-only cycle
    pub fn cpu(cpu_units: u32) -> Self {
        Self {
            cpu_units,
            io_units: 0,
            device: None,
        }
    }

    /// A cycle with a CPU burst followed by I/O on `device`
    pub fn with_io(cpu_units: u32, io_units: u32, device: DeviceClass) -> Self {
        Self {
            cpu_units,
            io_units,
            device: Some(device),
        }
    }

    /// True when the cycle describes no work at all
    pub fn is_empty(&self) -> bool {
        self.cpu_units == 0 && self.io_units == 0
    }

    /// Device this cycle must acquire, if it performs I/O
    pub fn io_device(&self) -> Option<DeviceClass> {
        if self.io_units > 0 {
            self.device
        } else {
            None
        }
    }
}

/// Job validation error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job '{0}' has no cycles")]
    NoCycles(String),

    #[error("Job '{name}' has {count} cycles, at most {max} are allowed")]
    TooManyCycles {
        name: String,
        count: usize,
        max: usize,
    },

    #[error("Job '{name}' cycle {index} performs I/O without a device")]
    MissingDevice { name: String, index: usize },
}

/// A process description waiting in the input queue
///
/// Immutable once read. It carries no id or timing; those are assigned
/// when the job is admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescription {
    pub name: String,
    /// Lower numbers are higher priority
    pub priority: i32,
    pub memsize: u64,
    pub cycles: Vec<Cycle>,
}

impl JobDescription {
    /// Creates a job description
    pub fn new(name: impl Into<String>, priority: i32, memsize: u64, cycles: Vec<Cycle>) -> Self {
        Self {
            name: name.into(),
            priority,
            memsize,
            cycles,
        }
    }

    /// Checks the cycle list is usable by the engine
    pub fn validate(&self) -> Result<(), JobError> {
        if self.cycles.is_empty() {
            return Err(JobError::NoCycles(self.name.clone()));
        }
        if self.cycles.len() > MAX_CYCLES {
            return Err(JobError::TooManyCycles {
                name: self.name.clone(),
                count: self.cycles.len(),
                max: MAX_CYCLES,
            });
        }
        for (index, cycle) in self.cycles.iter().enumerate() {
            if cycle.io_units > 0 && cycle.device.is_none() {
                return Err(JobError::MissingDevice {
                    name: self.name.clone(),
                    index,
                });
            }
        }
        Ok(())
    }

    /// Total CPU units the job will consume
    pub fn total_cpu_units(&self) -> u64 {
        self.cycles.iter().map(|c| c.cpu_units as u64).sum()
    }

    /// Total I/O units the job will consume
    pub fn total_io_units(&self) -> u64 {
        self.cycles.iter().map(|c| c.io_units as u64).sum()
    }
}
