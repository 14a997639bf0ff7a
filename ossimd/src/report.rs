//! # Console Reporter
//!
//! Renders simulator output for a terminal or a log collector.
//!
//! The engine never prints; it hands events and snapshots to a
//! [`ReportSink`]. This sink formats them either as aligned text or as one
//! JSON object per line.

use core_types::ProcessId;
use resources::{DeviceUnits, MemoryConfig, MemoryUsage};
use serde::Serialize;
use sim_kernel::{ReportSink, RunSummary, RunawayReport, SimConfig, SimEvent, Snapshot};
use std::fmt::Write as _;
use std::io::{self, Write};
use tracing::warn;

/// Output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Report sink writing to a pair of streams
///
/// The sink interface cannot fail, so the first write error is kept and
/// nothing more is written after it. The host collects it with
/// [`ConsoleReporter::take_failure`] once the run is over.
pub struct ConsoleReporter {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    format: OutputFormat,
    /// Print every event, not just lifecycle milestones
    debug: bool,
    failure: Option<io::Error>,
}

impl ConsoleReporter {
    /// Reporter on the process's stdout and stderr
    pub fn stdio(format: OutputFormat, debug: bool) -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()), format, debug)
    }

    pub fn with_writers(
        out: Box<dyn Write>,
        err: Box<dyn Write>,
        format: OutputFormat,
        debug: bool,
    ) -> Self {
        Self {
            out,
            err,
            format,
            debug,
            failure: None,
        }
    }

    /// First write error seen, if any
    pub fn take_failure(&mut self) -> Option<io::Error> {
        self.failure.take()
    }

    /// Prints the parameter block at the start of a run
    pub fn params(&mut self, config: &SimConfig) {
        match self.format {
            OutputFormat::Text => self.write_out(&render_params(config)),
            OutputFormat::Json => self.write_json(&Tagged::new("params", config)),
        }
    }

    /// Prints the final accounting
    pub fn summary(&mut self, summary: &RunSummary) {
        match self.format {
            OutputFormat::Text => self.write_out(&render_summary(summary)),
            OutputFormat::Json => self.write_json(&Tagged::new("summary", summary)),
        }
    }

    fn write_out(&mut self, text: &str) {
        if self.failure.is_some() {
            return;
        }
        let result = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush());
        self.record_failure(result);
    }

    fn write_err(&mut self, text: &str) {
        if self.failure.is_some() {
            return;
        }
        let result = self.err.write_all(text.as_bytes()).and_then(|_| self.err.flush());
        self.record_failure(result);
    }

    fn write_json<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => self.write_out(&format!("{}\n", line)),
            Err(e) => self.record_failure(Err(e.into())),
        }
    }

    fn record_failure(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            warn!(error = %e, "failed to write report, dropping further output");
            self.failure.get_or_insert(e);
        }
    }
}

impl ReportSink for ConsoleReporter {
    fn record(&mut self, event: &SimEvent) {
        match self.format {
            OutputFormat::Json => self.write_json(event),
            OutputFormat::Text => {
                if let Some(line) = render_event(event, self.debug) {
                    self.write_out(&line);
                }
            }
        }
    }

    fn snapshot(&mut self, snapshot: &Snapshot) {
        match self.format {
            OutputFormat::Text => self.write_out(&render_snapshot(snapshot)),
            OutputFormat::Json => self.write_json(&Tagged::new("snapshot", snapshot)),
        }
    }

    fn runaway(&mut self, report: &RunawayReport) {
        // Always text: this goes to the operator, not the collector
        self.write_err(&render_runaway(report));
    }
}

/// JSON line with a record kind
#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    record: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

impl<'a, T: Serialize> Tagged<'a, T> {
    fn new(record: &'static str, body: &'a T) -> Self {
        Self { record, body }
    }
}

fn pid_or_dash(pid: Option<ProcessId>) -> String {
    pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
}

fn describe_memory(memory: &MemoryConfig) -> String {
    match memory {
        MemoryConfig::None => "none".to_string(),
        MemoryConfig::Fixed {
            block_size,
            total_blocks,
        } => format!("fixed, {} blocks of {}", total_blocks, block_size),
        MemoryConfig::Variable {
            max_size,
            total_size,
        } => format!("variable, {} total, {} max per process", total_size, max_size),
    }
}

fn describe_devices(units: &DeviceUnits) -> String {
    format!(
        "disk {}, tape {}, cdrom {}",
        units.disk, units.tape, units.cdrom
    )
}

/// Parameter block printed before the first tick
pub fn render_params(config: &SimConfig) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Operating system parameters");
    let _ = writeln!(text, "  Memory model ....... {}", describe_memory(&config.memory));
    let _ = writeln!(text, "  Max processes ...... {}", config.max_processes);
    let _ = writeln!(text, "  Time quantum ....... {}", config.quantum);
    let _ = writeln!(text, "  Devices ............ {}", describe_devices(&config.devices));
    let _ = writeln!(text, "  Report every ....... {} units", config.report_interval);
    let _ = writeln!(text, "  Algorithm .......... {}", config.algorithm);
    let _ = writeln!(text, "  Runaway limit ...... {}", config.runaway_limit);
    text
}

/// One line for `event`, or `None` when it is only shown in debug mode
pub fn render_event(event: &SimEvent, debug: bool) -> Option<String> {
    let line = match event {
        SimEvent::Admitted {
            tick,
            pid,
            name,
            memsize,
            blocks,
        } => {
            let blocks = blocks
                .map(|b| format!(", {} blocks", b))
                .unwrap_or_default();
            format!("[{:>5}] {} admitted: {} ({} units{})", tick, pid, name, memsize, blocks)
        }
        SimEvent::Rejected {
            tick,
            name,
            memsize,
            ceiling,
        } => format!(
            "[{:>5}] job {} rejected: needs {} units, machine holds at most {}",
            tick, name, memsize, ceiling
        ),
        SimEvent::Started { tick, pid } => format!("[{:>5}] {} started", tick, pid),
        SimEvent::Terminated { tick, summary } => format!(
            "[{:>5}] {} terminated: {} cpu={} io={}",
            tick, summary.pid, summary.name, summary.total_cpu, summary.total_ios
        ),
        _ if !debug => return None,
        SimEvent::TimedOut { tick, pid, priority } => {
            format!("[{:>5}] {} timed out (priority {})", tick, pid, priority)
        }
        SimEvent::ServiceCall {
            tick,
            pid,
            device,
            io_units,
        } => format!("[{:>5}] {} requests {} units of {}", tick, pid, io_units, device),
        SimEvent::DeviceAllocated {
            tick,
            pid,
            device,
            device_id,
        } => format!("[{:>5}] {} allocated {} {}", tick, pid, device, device_id),
        SimEvent::IoCompleted {
            tick,
            pid,
            device,
            device_id,
        } => format!("[{:>5}] {} released {} {}", tick, pid, device, device_id),
    };
    Some(format!("{}\n", line))
}

/// Process table and resource usage at one tick
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "--- tick {} ---", snapshot.tick);
    let _ = writeln!(
        text,
        "  executing {}, held {}, idle {}, waiting jobs {}",
        pid_or_dash(snapshot.executing),
        pid_or_dash(snapshot.held),
        snapshot.idle_ticks,
        snapshot.waiting_jobs
    );
    let _ = writeln!(
        text,
        "  {:>7} {:<8} {:>2} {:>4} {:>6} {:>6} {:>6}",
        "PID", "NAME", "ST", "PRI", "CPU", "IO", "CYCLE"
    );
    for row in &snapshot.processes {
        let _ = writeln!(
            text,
            "  {:>7} {:<8} {:>2} {:>4} {:>6} {:>6} {:>6}",
            row.pid.to_string(),
            row.name,
            row.state.code(),
            row.priority,
            row.total_cpu,
            row.total_ios,
            format!("{}/{}", row.cycle_index + 1, row.cycles)
        );
    }

    let ready: Vec<String> = snapshot.ready.iter().map(ProcessId::to_string).collect();
    let _ = writeln!(text, "  ready: [{}]", ready.join(", "));
    for entry in &snapshot.blocked {
        let device = entry
            .device_id
            .map(|id| format!("{} {}", entry.device, id))
            .unwrap_or_else(|| entry.device.to_string());
        let _ = writeln!(
            text,
            "  blocked: {} on {} ({:?}, {} units)",
            entry.pid, device, entry.request, entry.io_units
        );
    }

    let memory = match snapshot.memory {
        MemoryUsage::Unmodeled => "not modeled".to_string(),
        MemoryUsage::Blocks {
            used,
            total,
            block_size,
        } => format!("{}/{} blocks of {}", used, total, block_size),
        MemoryUsage::Units { used, total } => format!("{}/{} units", used, total),
    };
    let _ = writeln!(text, "  memory: {}", memory);

    let devices: Vec<String> = snapshot
        .devices
        .iter()
        .map(|d| format!("{} {} {}", d.class, d.id, pid_or_dash(d.owner)))
        .collect();
    let _ = writeln!(text, "  devices: {}", devices.join(", "));
    text
}

/// Final accounting table
pub fn render_summary(summary: &RunSummary) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "Simulation finished at tick {} ({} idle ticks)",
        summary.finish_tick, summary.idle_ticks
    );
    let _ = writeln!(
        text,
        "  {:>7} {:<8} {:>6} {:>6} {:>6} {:>6} {:>10}",
        "PID", "NAME", "START", "END", "CPU", "IO", "TURNAROUND"
    );
    for p in &summary.processes {
        let start = p
            .start_time
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            text,
            "  {:>7} {:<8} {:>6} {:>6} {:>6} {:>6} {:>10}",
            p.pid.to_string(),
            p.name,
            start,
            p.end_time,
            p.total_cpu,
            p.total_ios,
            p.turnaround()
        );
    }
    for r in &summary.rejected {
        let _ = writeln!(
            text,
            "  rejected: {} ({} units, ceiling {})",
            r.name, r.memsize, r.ceiling
        );
    }
    text
}

/// Stuck state printed when a run is killed
pub fn render_runaway(report: &RunawayReport) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "RUNAWAY: {}", report);
    let _ = writeln!(
        text,
        "  executing {}, held {}",
        pid_or_dash(report.executing),
        pid_or_dash(report.held)
    );
    for row in &report.stuck {
        let _ = writeln!(
            text,
            "  {} {} {} cycle {}/{} remaining {}",
            row.pid,
            row.name,
            row.state,
            row.cycle_index + 1,
            row.cycles,
            row.remaining_units
        );
    }
    if !report.waiting_jobs.is_empty() {
        let _ = writeln!(text, "  never admitted: {}", report.waiting_jobs.join(", "));
    }
    text
}
