//! # Core Types
//!
//! This crate defines the fundamental types shared by the simulator crates.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: identifiers are newtypes and cannot be confused
//!   with counters or priorities.
//! - **Validated at the edge**: a [`JobDescription`] is checked once, when it
//!   enters the system, so the engine never re-validates workloads.
//!
//! ## Key Types
//!
//! - [`ProcessId`]: Unique identifier for an admitted process
//! - [`DeviceClass`] / [`DeviceId`]: I/O device addressing
//! - [`Cycle`]: One CPU burst followed by an optional I/O burst
//! - [`JobDescription`]: A not-yet-admitted workload from the input queue
//! - [`ProcessState`]: Lifecycle state of an admitted process

pub mod ids;
pub mod job;
pub mod state;

pub use ids::{DeviceId, ProcessId, Tick};
pub use job::{Cycle, DeviceClass, JobDescription, JobError, MAX_CYCLES};
pub use state::ProcessState;
