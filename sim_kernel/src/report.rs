//! Notifications and snapshots handed to the reporting layer
//!
//! The engine never formats text. Everything observable about a run is a
//! [`SimEvent`], a periodic [`Snapshot`], or a final [`RunSummary`], and a
//! [`ReportSink`] decides what to do with them.

use crate::queues::BlockedEntry;
use core_types::{DeviceClass, DeviceId, ProcessId, ProcessState, Tick};
use resources::{DeviceSnapshot, MemoryUsage};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    /// Job moved from the input queue into the process table
    Admitted {
        tick: Tick,
        pid: ProcessId,
        name: String,
        memsize: u64,
        /// Blocks reserved under the fixed-block model
        blocks: Option<u64>,
    },
    /// Job can never fit in memory and was dropped
    Rejected {
        tick: Tick,
        name: String,
        memsize: u64,
        ceiling: u64,
    },
    /// First dispatch of a process
    Started { tick: Tick, pid: ProcessId },
    /// Quantum expired; the process went back to the ready queue
    TimedOut {
        tick: Tick,
        pid: ProcessId,
        priority: i32,
    },
    /// CPU burst finished with I/O to do
    ServiceCall {
        tick: Tick,
        pid: ProcessId,
        device: DeviceClass,
        io_units: u32,
    },
    DeviceAllocated {
        tick: Tick,
        pid: ProcessId,
        device: DeviceClass,
        device_id: DeviceId,
    },
    IoCompleted {
        tick: Tick,
        pid: ProcessId,
        device: DeviceClass,
        device_id: DeviceId,
    },
    /// Process finished and left the process table
    Terminated { tick: Tick, summary: ProcessSummary },
}

impl SimEvent {
    pub fn tick(&self) -> Tick {
        match self {
            SimEvent::Admitted { tick, .. }
            | SimEvent::Rejected { tick, .. }
            | SimEvent::Started { tick, .. }
            | SimEvent::TimedOut { tick, .. }
            | SimEvent::ServiceCall { tick, .. }
            | SimEvent::DeviceAllocated { tick, .. }
            | SimEvent::IoCompleted { tick, .. }
            | SimEvent::Terminated { tick, .. } => *tick,
        }
    }

    /// Process the event concerns; `None` for rejected jobs, which never got one
    pub fn pid(&self) -> Option<ProcessId> {
        match self {
            SimEvent::Admitted { pid, .. }
            | SimEvent::Started { pid, .. }
            | SimEvent::TimedOut { pid, .. }
            | SimEvent::ServiceCall { pid, .. }
            | SimEvent::DeviceAllocated { pid, .. }
            | SimEvent::IoCompleted { pid, .. } => Some(*pid),
            SimEvent::Terminated { summary, .. } => Some(summary.pid),
            SimEvent::Rejected { .. } => None,
        }
    }
}

/// Accounting of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub pid: ProcessId,
    pub name: String,
    pub initial_priority: i32,
    pub final_priority: i32,
    pub admitted_at: Tick,
    pub start_time: Option<Tick>,
    pub end_time: Tick,
    pub total_cpu: u64,
    pub total_ios: u64,
}

impl ProcessSummary {
    /// Ticks from admission to termination
    pub fn turnaround(&self) -> Tick {
        self.end_time.saturating_sub(self.admitted_at)
    }
}

/// One row of the process table in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: ProcessId,
    pub name: String,
    pub state: ProcessState,
    pub priority: i32,
    pub total_cpu: u64,
    pub total_ios: u64,
    pub cycle_index: usize,
    pub cycles: usize,
    pub remaining_units: u32,
}

/// Point-in-time view of the whole machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: Tick,
    pub executing: Option<ProcessId>,
    pub held: Option<ProcessId>,
    pub processes: Vec<ProcessSnapshot>,
    /// Ready queue, head first
    pub ready: Vec<ProcessId>,
    /// Blocked queue, head first
    pub blocked: Vec<BlockedEntry>,
    pub memory: MemoryUsage,
    pub devices: Vec<DeviceSnapshot>,
    pub waiting_jobs: usize,
    pub idle_ticks: Tick,
}

/// A job dropped because it can never fit in memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub name: String,
    pub memsize: u64,
    pub ceiling: u64,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub finish_tick: Tick,
    pub idle_ticks: Tick,
    /// Finished processes in termination order
    pub processes: Vec<ProcessSummary>,
    pub rejected: Vec<Rejection>,
}

impl RunSummary {
    pub fn total_cpu(&self) -> u64 {
        self.processes.iter().map(|p| p.total_cpu).sum()
    }

    pub fn process(&self, name: &str) -> Option<&ProcessSummary> {
        self.processes.iter().find(|p| p.name == name)
    }
}

/// State captured when a run exceeds its tick ceiling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunawayReport {
    pub tick: Tick,
    pub limit: Tick,
    pub executing: Option<ProcessId>,
    pub held: Option<ProcessId>,
    /// Every process still in the table
    pub stuck: Vec<ProcessSnapshot>,
    /// Names of jobs never admitted
    pub waiting_jobs: Vec<String>,
}

impl fmt::Display for RunawayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clock reached {} (limit {}) with {} process(es) live and {} job(s) waiting",
            self.tick,
            self.limit,
            self.stuck.len(),
            self.waiting_jobs.len()
        )
    }
}

/// Receiver of everything a run reports
///
/// Every method defaults to doing nothing, so a sink implements only what it
/// displays.
pub trait ReportSink {
    fn record(&mut self, _event: &SimEvent) {}

    fn snapshot(&mut self, _snapshot: &Snapshot) {}

    fn runaway(&mut self, _report: &RunawayReport) {}
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReportSink for NullSink {}

/// A shared sink, so the caller keeps a handle after the simulator takes one
impl<S: ReportSink> ReportSink for Rc<RefCell<S>> {
    fn record(&mut self, event: &SimEvent) {
        self.borrow_mut().record(event);
    }

    fn snapshot(&mut self, snapshot: &Snapshot) {
        self.borrow_mut().snapshot(snapshot);
    }

    fn runaway(&mut self, report: &RunawayReport) {
        self.borrow_mut().runaway(report);
    }
}

/// Sink that keeps everything it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<SimEvent>,
    pub snapshots: Vec<Snapshot>,
    pub runaways: Vec<RunawayReport>,
}

impl ReportSink for RecordingSink {
    fn record(&mut self, event: &SimEvent) {
        self.events.push(event.clone());
    }

    fn snapshot(&mut self, snapshot: &Snapshot) {
        self.snapshots.push(snapshot.clone());
    }

    fn runaway(&mut self, report: &RunawayReport) {
        self.runaways.push(report.clone());
    }
}
