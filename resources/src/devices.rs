//! I/O device allocation tables
//!
//! One table per device class. Devices are handed out lowest id first and are
//! released only by the process that holds them.

use crate::error::ResourceError;
use core_types::{DeviceClass, DeviceId, ProcessId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of units installed per device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUnits {
    #[serde(default)]
    pub disk: u32,
    #[serde(default)]
    pub tape: u32,
    #[serde(default)]
    pub cdrom: u32,
}

impl DeviceUnits {
    pub fn new(disk: u32, tape: u32, cdrom: u32) -> Self {
        Self { disk, tape, cdrom }
    }

    /// Units installed for `class`
    pub fn units(&self, class: DeviceClass) -> u32 {
        match class {
            DeviceClass::Disk => self.disk,
            DeviceClass::Tape => self.tape,
            DeviceClass::Cdrom => self.cdrom,
        }
    }
}

impl Default for DeviceUnits {
    fn default() -> Self {
        Self::new(2, 1, 1)
    }
}

/// Allocation state of one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    Available,
    Busy(ProcessId),
}

/// One device unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    pub state: DeviceState,
}

impl Device {
    /// Process currently using the device
    pub fn owner(&self) -> Option<ProcessId> {
        match self.state {
            DeviceState::Busy(pid) => Some(pid),
            DeviceState::Available => None,
        }
    }
}

/// Device row in a report snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub class: DeviceClass,
    pub id: DeviceId,
    pub owner: Option<ProcessId>,
}

/// Allocation tables for every device class
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    tables: BTreeMap<DeviceClass, Vec<Device>>,
}

impl DeviceRegistry {
    /// Creates the tables with every device available
    pub fn new(units: DeviceUnits) -> Self {
        let tables = DeviceClass::ALL
            .iter()
            .map(|&class| {
                let devices = (1..=units.units(class))
                    .map(|id| Device {
                        id: DeviceId(id),
                        state: DeviceState::Available,
                    })
                    .collect();
                (class, devices)
            })
            .collect();
        Self { tables }
    }

    fn table(&self, class: DeviceClass) -> &[Device] {
        self.tables.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Allocates the lowest-numbered available device of `class` to `owner`
    ///
    /// Returns `None` when every unit is busy (or none is installed).
    pub fn allocate(&mut self, class: DeviceClass, owner: ProcessId) -> Option<DeviceId> {
        let device = self
            .tables
            .get_mut(&class)?
            .iter_mut()
            .find(|d| d.state == DeviceState::Available)?;
        device.state = DeviceState::Busy(owner);
        Some(device.id)
    }

    /// Marks a device available again
    pub fn release(
        &mut self,
        class: DeviceClass,
        id: DeviceId,
        owner: ProcessId,
    ) -> Result<(), ResourceError> {
        let device = self
            .tables
            .get_mut(&class)
            .and_then(|table| table.iter_mut().find(|d| d.id == id))
            .ok_or(ResourceError::UnknownDevice { class, id })?;

        match device.state {
            DeviceState::Available => Err(ResourceError::DeviceNotBusy { class, id }),
            DeviceState::Busy(holder) if holder != owner => {
                Err(ResourceError::DeviceOwnerMismatch {
                    class,
                    id,
                    owner: holder,
                    claimed: owner,
                })
            }
            DeviceState::Busy(_) => {
                device.state = DeviceState::Available;
                Ok(())
            }
        }
    }

    /// Process holding a device, if any
    pub fn owner(&self, class: DeviceClass, id: DeviceId) -> Option<ProcessId> {
        self.table(class)
            .iter()
            .find(|d| d.id == id)
            .and_then(Device::owner)
    }

    /// Units installed for `class`
    pub fn units(&self, class: DeviceClass) -> usize {
        self.table(class).len()
    }

    /// Units of `class` currently available
    pub fn available(&self, class: DeviceClass) -> usize {
        self.table(class)
            .iter()
            .filter(|d| d.state == DeviceState::Available)
            .count()
    }

    /// Every busy device with its owner
    pub fn busy(&self) -> impl Iterator<Item = (DeviceClass, DeviceId, ProcessId)> + '_ {
        self.tables.iter().flat_map(|(&class, table)| {
            table
                .iter()
                .filter_map(move |d| d.owner().map(|owner| (class, d.id, owner)))
        })
    }

    /// Every device in class order
    pub fn snapshot(&self) -> Vec<DeviceSnapshot> {
        self.tables
            .iter()
            .flat_map(|(&class, table)| {
                table.iter().map(move |d| DeviceSnapshot {
                    class,
                    id: d.id,
                    owner: d.owner(),
                })
            })
            .collect()
    }
}
