//! # Simulated Kernel
//!
//! A discrete-event simulator of a single-CPU operating system's process
//! lifecycle: admission, scheduling, dispatch, CPU and I/O bursts, memory
//! allocation and termination.
//!
//! ## Philosophy
//!
//! - **One owner**: a single [`Simulator`] owns the clock, the process table,
//!   every queue, the resource pools and the event queue. Every operation
//!   takes `&mut self`, and a tick is atomic.
//! - **Deterministic**: the same configuration and jobs always produce the
//!   same event sequence. Same-tick events fire in registration order.
//! - **Inspectable**: every notification is kept in an audit log, the whole
//!   machine can be snapshotted, and [`Simulator::check_invariants`] runs at
//!   the end of every tick.
//!
//! ## Tick phases
//!
//! 1. I/O completions due now
//! 2. Quantum timeouts due now
//! 3. One CPU unit for the executing process, with service calls and cycle
//!    advances when its burst runs out
//! 4. Dispatch, if the CPU is free and ran no unit this tick
//! 5. I/O subsystem: start pending requests, account one unit per working one
//! 6. Cleanup of processes that finished this tick
//! 7. Admission, if anything finished
//!
//! A snapshot is handed to the [`ReportSink`] every `report_interval` ticks.

pub mod config;
pub mod error;
pub mod event_queue;
pub mod intake;
pub mod policy;
pub mod process_table;
pub mod queues;
pub mod report;

mod admission;
mod dispatcher;
mod interrupts;
mod invariants;

pub use config::{Algorithm, ConfigError, SimConfig, DEFAULT_RUNAWAY_LIMIT};
pub use error::SimError;
pub use event_queue::{Event, EventKind, EventQueue};
pub use intake::JobIntake;
pub use policy::{policy_for, SchedulingPolicy};
pub use process_table::{ProcessControlBlock, ProcessTable};
pub use queues::{BlockedEntry, BlockedQueue, ReadyEntry, ReadyQueue, RequestState};
pub use report::{
    NullSink, ProcessSnapshot, ProcessSummary, RecordingSink, Rejection, ReportSink, RunSummary,
    RunawayReport, SimEvent, Snapshot,
};

use core_types::{JobDescription, ProcessId, Tick};
use resources::{DeviceRegistry, MemoryPool};
use tracing::{debug, error};

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Work remains
    Running,
    /// Every job was admitted or rejected and every process has finished
    Complete,
}

/// The simulation context
pub struct Simulator {
    config: SimConfig,
    clock: Tick,
    started: bool,
    policy: Box<dyn SchedulingPolicy>,
    intake: JobIntake,
    table: ProcessTable,
    next_pid: ProcessId,
    memory: MemoryPool,
    devices: DeviceRegistry,
    ready: ReadyQueue,
    blocked: BlockedQueue,
    events: EventQueue,
    executing: Option<ProcessId>,
    /// Process whose I/O just completed; dispatched ahead of the ready queue
    held: Option<ProcessId>,
    /// Reached Done this tick, awaiting cleanup
    terminated: Vec<ProcessId>,
    finished: Vec<ProcessSummary>,
    rejected: Vec<Rejection>,
    idle_ticks: Tick,
    sink: Box<dyn ReportSink>,
    audit_log: Vec<SimEvent>,
}

impl Simulator {
    /// Creates a simulator for `jobs` on the machine described by `config`
    ///
    /// Validates the configuration and every job. No tick runs until
    /// [`step`](Self::step) or [`run`](Self::run) is called.
    pub fn new(config: SimConfig, jobs: Vec<JobDescription>) -> Result<Self, SimError> {
        config.validate()?;
        for job in &jobs {
            job.validate().map_err(ConfigError::from)?;
        }

        let policy = policy_for(config.algorithm);
        let intake = JobIntake::new(jobs, policy.as_ref());

        Ok(Self {
            clock: 0,
            started: false,
            intake,
            table: ProcessTable::new(config.max_processes),
            next_pid: ProcessId::FIRST,
            memory: MemoryPool::new(&config.memory),
            devices: DeviceRegistry::new(config.devices),
            ready: ReadyQueue::new(),
            blocked: BlockedQueue::new(),
            events: EventQueue::new(),
            executing: None,
            held: None,
            terminated: Vec::new(),
            finished: Vec::new(),
            rejected: Vec::new(),
            idle_ticks: 0,
            sink: Box::new(NullSink),
            audit_log: Vec::new(),
            policy,
            config,
        })
    }

    /// Builder: routes notifications and snapshots to `sink`
    pub fn with_sink<S: ReportSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Executes one tick
    ///
    /// The first call runs tick 0, which admits the initial jobs. Calling
    /// again after [`StepOutcome::Complete`] does nothing.
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        if !self.started {
            self.started = true;
            debug!(
                algorithm = %self.config.algorithm,
                jobs = self.intake.len(),
                "simulation starting"
            );
            self.admit_jobs()?;
        } else {
            if self.is_complete() {
                return Ok(StepOutcome::Complete);
            }
            self.clock += 1;
        }

        if self.clock > self.config.runaway_limit && !self.is_complete() {
            return Err(self.runaway());
        }

        tracing::trace!(tick = self.clock, "tick");
        self.handle_io_completions()?;
        self.handle_timeouts()?;
        let cpu_used = self.run_cpu()?;
        if !cpu_used && self.executing.is_none() {
            self.dispatch()?;
        }
        self.service_io()?;
        if self.reap_terminated()? {
            self.admit_jobs()?;
        }

        let interval = self.config.report_interval;
        if interval > 0 && self.clock > 0 && self.clock % interval == 0 {
            let snapshot = self.snapshot();
            self.sink.snapshot(&snapshot);
        }

        self.check_invariants()?;

        if self.is_complete() {
            debug!(tick = self.clock, idle = self.idle_ticks, "simulation complete");
            Ok(StepOutcome::Complete)
        } else {
            Ok(StepOutcome::Running)
        }
    }

    /// Steps until every job has finished or been rejected
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        while self.step()? == StepOutcome::Running {}
        Ok(self.summary())
    }

    /// True once the intake and the process table are both empty
    pub fn is_complete(&self) -> bool {
        self.started && self.intake.is_empty() && self.table.is_empty()
    }

    /// Accounting of the run so far
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            finish_tick: self.clock,
            idle_ticks: self.idle_ticks,
            processes: self.finished.clone(),
            rejected: self.rejected.clone(),
        }
    }

    /// Point-in-time view of the machine
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.clock,
            executing: self.executing,
            held: self.held,
            processes: self.process_rows(),
            ready: self.ready.pids(),
            blocked: self.blocked.iter().copied().collect(),
            memory: self.memory.usage(),
            devices: self.devices.snapshot(),
            waiting_jobs: self.intake.len(),
            idle_ticks: self.idle_ticks,
        }
    }

    fn process_rows(&self) -> Vec<ProcessSnapshot> {
        self.table
            .iter()
            .map(|pcb| ProcessSnapshot {
                pid: pcb.id,
                name: pcb.name.clone(),
                state: pcb.state,
                priority: pcb.current_priority,
                total_cpu: pcb.total_cpu,
                total_ios: pcb.total_ios,
                cycle_index: pcb.cycle_index,
                cycles: pcb.cycles.len(),
                remaining_units: pcb.remaining_units,
            })
            .collect()
    }

    fn runaway(&mut self) -> SimError {
        let report = RunawayReport {
            tick: self.clock,
            limit: self.config.runaway_limit,
            executing: self.executing,
            held: self.held,
            stuck: self.process_rows(),
            waiting_jobs: self.intake.names(),
        };
        error!(
            tick = report.tick,
            limit = report.limit,
            live = report.stuck.len(),
            waiting = report.waiting_jobs.len(),
            "runaway simulation"
        );
        self.sink.runaway(&report);
        SimError::Runaway(Box::new(report))
    }

    /// Records a notification in the audit log and hands it to the sink
    pub(crate) fn emit(&mut self, event: SimEvent) {
        self.sink.record(&event);
        self.audit_log.push(event);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn algorithm(&self) -> Algorithm {
        self.policy.algorithm()
    }

    /// Current simulated time
    pub fn clock(&self) -> Tick {
        self.clock
    }

    pub fn executing(&self) -> Option<ProcessId> {
        self.executing
    }

    pub fn held(&self) -> Option<ProcessId> {
        self.held
    }

    pub fn process(&self, pid: ProcessId) -> Option<&ProcessControlBlock> {
        self.table.get(pid)
    }

    pub fn process_table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn ready_queue(&self) -> &ReadyQueue {
        &self.ready
    }

    pub fn blocked_queue(&self) -> &BlockedQueue {
        &self.blocked
    }

    pub fn memory(&self) -> &MemoryPool {
        &self.memory
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Jobs not yet admitted
    pub fn waiting_jobs(&self) -> usize {
        self.intake.len()
    }

    pub fn idle_ticks(&self) -> Tick {
        self.idle_ticks
    }

    /// Finished processes in termination order
    pub fn finished(&self) -> &[ProcessSummary] {
        &self.finished
    }

    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }

    /// Every notification emitted so far
    pub fn audit_log(&self) -> &[SimEvent] {
        &self.audit_log
    }
}
