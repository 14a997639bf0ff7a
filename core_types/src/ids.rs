//! Identifiers for simulated entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulated clock value
pub type Tick = u64;

/// Unique identifier for an admitted process
///
/// Process ids are positive and handed out in admission order. They are
/// never reused within a run, so a stale reference can always be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(u32);

impl ProcessId {
    /// The first id handed out by a fresh simulation
    pub const FIRST: ProcessId = ProcessId(1);

    /// Creates a process id from a raw value
    ///
    /// Returns `None` for zero, which is not a valid process id.
    pub fn new(raw: u32) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Returns the raw id value
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns the id that follows this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID {}", self.0)
    }
}

/// Identifier of a device unit, unique within its device class
///
/// Device ids start at 1, matching the unit numbering in the parameter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
