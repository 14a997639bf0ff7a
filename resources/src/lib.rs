//! # Resources
//!
//! This crate provides the finite resource pools of the simulated machine:
//! main memory and the I/O device units.
//!
//! ## Philosophy
//!
//! - **Resources are finite and must be explicit**
//! - **Every allocated unit has exactly one owner**
//! - **Accounting is deterministic and testable**
//! - **Pools answer questions, they do not schedule**: deciding *who* gets a
//!   resource belongs to the kernel, the pool only says whether it is possible
//!
//! ## Core Concepts
//!
//! - [`MemoryPool`]: unmodeled, fixed-block or variable-size memory
//! - [`Reservation`]: proof that memory was reserved for a process; it must be
//!   handed back to [`MemoryPool::release`]
//! - [`DeviceRegistry`]: one allocation table per [`DeviceClass`](core_types::DeviceClass)
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - Real addressing, paging or contiguity
//! - A scheduler (pools never queue requests)
//! - Thread-safe; the simulation owns the pools exclusively

pub mod devices;
pub mod error;
pub mod memory;

pub use devices::{Device, DeviceRegistry, DeviceSnapshot, DeviceState, DeviceUnits};
pub use error::ResourceError;
pub use memory::{
    BlockState, FixedBlockPool, MemoryConfig, MemoryPool, MemoryUsage, Reservation,
    ReserveOutcome, VariablePool,
};
