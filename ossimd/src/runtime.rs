//! # Host Runtime
//!
//! Loads the inputs, runs the simulator to completion and reports.

use crate::records::{self, RecordError};
use crate::report::{ConsoleReporter, OutputFormat};
use core_types::{JobDescription, Tick};
use sim_kernel::{ConfigError, RunSummary, SimConfig, SimError, Simulator};
use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;
use tracing::info;

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Input error: {0}")]
    Record(#[from] RecordError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Failed to write report: {0}")]
    Output(#[source] io::Error),
}

impl HostError {
    /// Process exit code for this error
    ///
    /// 1 for anything detected before the first tick, 2 for a run that was
    /// killed or found inconsistent, 3 for a run whose report could not be
    /// written.
    pub fn exit_code(&self) -> i32 {
        match self {
            HostError::Record(_) | HostError::Config(_) => 1,
            HostError::Simulation(SimError::Config(_)) => 1,
            HostError::Simulation(_) => 2,
            HostError::Output(_) => 3,
        }
    }
}

/// Host runtime configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Operating-system parameter file
    pub params_path: PathBuf,
    /// Job file
    pub jobs_path: PathBuf,
    /// Print every event
    pub debug: bool,
    pub format: OutputFormat,
    /// Overrides the runaway limit from the parameter file
    pub max_ticks: Option<Tick>,
}

impl HostConfig {
    pub fn new(params_path: impl Into<PathBuf>, jobs_path: impl Into<PathBuf>) -> Self {
        Self {
            params_path: params_path.into(),
            jobs_path: jobs_path.into(),
            debug: false,
            format: OutputFormat::Text,
            max_ticks: None,
        }
    }
}

/// A loaded, ready-to-run simulation
pub struct HostRuntime {
    params: SimConfig,
    jobs: Vec<JobDescription>,
    reporter: Rc<RefCell<ConsoleReporter>>,
}

impl HostRuntime {
    /// Loads and validates the inputs named by `config`, reporting on stdio
    pub fn new(config: &HostConfig) -> Result<Self, HostError> {
        let reporter = ConsoleReporter::stdio(config.format, config.debug);
        Self::with_reporter(config, reporter)
    }

    /// Loads and validates the inputs, reporting through `reporter`
    pub fn with_reporter(config: &HostConfig, reporter: ConsoleReporter) -> Result<Self, HostError> {
        let mut params = records::load_params(&config.params_path)?;
        if let Some(limit) = config.max_ticks {
            params.runaway_limit = limit;
        }
        params.validate()?;
        let jobs = records::load_jobs(&config.jobs_path)?;
        info!(
            params = %config.params_path.display(),
            jobs = jobs.len(),
            algorithm = %params.algorithm,
            "inputs loaded"
        );

        Ok(Self {
            params,
            jobs,
            reporter: Rc::new(RefCell::new(reporter)),
        })
    }

    pub fn params(&self) -> &SimConfig {
        &self.params
    }

    pub fn jobs(&self) -> &[JobDescription] {
        &self.jobs
    }

    /// Runs the simulation to completion
    ///
    /// A report that could not be written fails the run even when the
    /// simulation itself finished.
    pub fn run(self) -> Result<RunSummary, HostError> {
        self.reporter.borrow_mut().params(&self.params);

        let mut simulator =
            Simulator::new(self.params, self.jobs)?.with_sink(Rc::clone(&self.reporter));
        let summary = simulator.run()?;

        let mut reporter = self.reporter.borrow_mut();
        reporter.summary(&summary);
        if let Some(e) = reporter.take_failure() {
            return Err(HostError::Output(e));
        }
        Ok(summary)
    }
}
