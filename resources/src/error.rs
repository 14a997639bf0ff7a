//! Resource-related errors
//!
//! Running out of memory or devices is not an error; callers get
//! [`ReserveOutcome::InsufficientNow`](crate::ReserveOutcome) or `None` instead.
//! The variants here describe broken bookkeeping.

use core_types::{DeviceClass, DeviceId, ProcessId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Invalid memory configuration: {0}")]
    InvalidMemoryConfig(String),

    #[error("Memory block {block} is not held by {owner}")]
    BlockNotOwned { block: usize, owner: ProcessId },

    #[error("Releasing {amount} units would exceed capacity ({free} free of {total})")]
    ReleaseExceedsCapacity { amount: u64, free: u64, total: u64 },

    #[error("Reservation for {owner} was not made by this memory model")]
    ReservationModelMismatch { owner: ProcessId },

    #[error("Unknown {class} device {id}")]
    UnknownDevice { class: DeviceClass, id: DeviceId },

    #[error("{class} device {id} is not busy")]
    DeviceNotBusy { class: DeviceClass, id: DeviceId },

    #[error("{class} device {id} is owned by {owner}, not {claimed}")]
    DeviceOwnerMismatch {
        class: DeviceClass,
        id: DeviceId,
        owner: ProcessId,
        claimed: ProcessId,
    },
}
