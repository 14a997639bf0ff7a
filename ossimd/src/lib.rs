//! # Operating System Simulator Host
//!
//! This crate runs the process-lifecycle simulator against input files.
//!
//! ## Philosophy
//!
//! - **Host owns I/O**: the engine never reads files or prints
//! - **Two input formats**: the legacy fixed-layout records, and JSON
//! - **Output is rendering**: text for people, JSON lines for tools
//!
//! ## Responsibilities
//!
//! The host:
//! - Decodes the parameter and job records
//! - Builds and runs a [`sim_kernel::Simulator`]
//! - Prints the parameter block, lifecycle events, periodic process tables
//!   and the final accounting
//! - Maps failures to exit codes

pub mod records;
pub mod report;
pub mod runtime;

pub use records::{load_jobs, load_params, RecordError};
pub use report::{ConsoleReporter, OutputFormat};
pub use runtime::{HostConfig, HostError, HostRuntime};
