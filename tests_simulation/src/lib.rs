//! Simulation Test Utilities
//!
//! Shared helpers for the cross-crate simulation tests.
//!
//! ## Test Philosophy
//!
//! - **Invariants every tick**: scenarios are driven one tick at a time and
//!   the engine's consistency checks run after each one
//! - **Deterministic**: every scenario is reproducible from its config and jobs
//! - **Observable through events**: assertions read the audit log rather than
//!   private state wherever possible

use core_types::{Cycle, DeviceClass, JobDescription, ProcessId, Tick};
use resources::{DeviceUnits, MemoryConfig};
use sim_kernel::{Algorithm, SimConfig, SimError, SimEvent, Simulator, StepOutcome};

/// Process id from a raw value
pub fn pid(raw: u32) -> ProcessId {
    ProcessId::new(raw).expect("process ids are positive")
}

/// A machine with unmodeled memory and one unit of each device
pub fn machine(algorithm: Algorithm, quantum: Tick) -> SimConfig {
    SimConfig::default()
        .with_algorithm(algorithm)
        .with_quantum(quantum)
        .with_memory(MemoryConfig::None)
        .with_devices(DeviceUnits::new(1, 1, 1))
}

/// CPU-only job
pub fn cpu_job(name: &str, priority: i32, cpu: u32) -> JobDescription {
    JobDescription::new(name, priority, 10, vec![Cycle::cpu(cpu)])
}

/// Job alternating CPU bursts and I/O on `device`, ending with a CPU burst
pub fn io_job(
    name: &str,
    priority: i32,
    bursts: u32,
    cpu: u32,
    io: u32,
    device: DeviceClass,
) -> JobDescription {
    let mut cycles: Vec<Cycle> = (0..bursts)
        .map(|_| Cycle::with_io(cpu, io, device))
        .collect();
    cycles.push(Cycle::cpu(cpu));
    JobDescription::new(name, priority, 10, cycles)
}

/// Steps `sim` to completion, checking invariants and calling `observe`
/// after every tick
pub fn run_observed<F>(sim: &mut Simulator, mut observe: F) -> Result<(), SimError>
where
    F: FnMut(&Simulator),
{
    loop {
        let outcome = sim.step()?;
        sim.check_invariants()?;
        observe(sim);
        if outcome == StepOutcome::Complete {
            return Ok(());
        }
    }
}

/// Steps `sim` to completion with invariant checks
pub fn run_checked(sim: &mut Simulator) -> Result<(), SimError> {
    run_observed(sim, |_| {})
}

/// Tick at which `target` was dispatched for the first time
pub fn start_tick(sim: &Simulator, target: ProcessId) -> Option<Tick> {
    sim.audit_log().iter().find_map(|event| match event {
        SimEvent::Started { tick, pid } if *pid == target => Some(*tick),
        _ => None,
    })
}

/// Number of timeouts recorded for `target`
pub fn timeouts(sim: &Simulator, target: ProcessId) -> usize {
    sim.audit_log()
        .iter()
        .filter(|event| matches!(event, SimEvent::TimedOut { pid, .. } if *pid == target))
        .count()
}
