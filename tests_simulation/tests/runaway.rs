//! Runaway detection

use core_types::{Cycle, DeviceClass, JobDescription, ProcessState};
use resources::{DeviceUnits, MemoryConfig};
use sim_kernel::{Algorithm, RecordingSink, SimError, Simulator};
use std::cell::RefCell;
use std::rc::Rc;
use tests_simulation::{cpu_job, machine, pid, run_checked};

fn needs_cdrom(name: &str, memsize: u64) -> JobDescription {
    JobDescription::new(
        name,
        1,
        memsize,
        vec![Cycle::with_io(1, 3, DeviceClass::Cdrom), Cycle::cpu(1)],
    )
}

#[test]
fn test_missing_device_is_a_runaway() {
    let config = machine(Algorithm::Fifo, 4)
        .with_devices(DeviceUnits::new(1, 1, 0))
        .with_runaway_limit(20);
    let sink = Rc::new(RefCell::new(RecordingSink::default()));
    let mut sim = Simulator::new(config, vec![needs_cdrom("player", 10)])
        .unwrap()
        .with_sink(Rc::clone(&sink));

    let error = sim.run().unwrap_err();
    let report = match error {
        SimError::Runaway(report) => report,
        other => panic!("expected a runaway, got {:?}", other),
    };
    assert_eq!(report.tick, 21);
    assert_eq!(report.limit, 20);
    assert_eq!(report.executing, None);
    assert_eq!(report.stuck.len(), 1);
    assert_eq!(report.stuck[0].pid, pid(1));
    assert_eq!(report.stuck[0].state, ProcessState::Blocked);
    assert!(report.waiting_jobs.is_empty());

    let sink = sink.borrow();
    assert_eq!(sink.runaways.len(), 1);
    assert_eq!(sink.runaways[0], *report);
}

#[test]
fn test_runaway_lists_jobs_never_admitted() {
    let config = machine(Algorithm::Ipri, 4)
        .with_memory(MemoryConfig::Variable {
            max_size: 100,
            total_size: 100,
        })
        .with_devices(DeviceUnits::new(1, 1, 0))
        .with_runaway_limit(15);
    let mut behind = cpu_job("behind", 2, 1);
    behind.memsize = 50;
    let jobs = vec![needs_cdrom("player", 80), behind];
    let mut sim = Simulator::new(config, jobs).unwrap();

    let error = sim.run().unwrap_err();
    assert!(!error.is_internal());
    match error {
        SimError::Runaway(report) => {
            assert_eq!(report.waiting_jobs, vec!["behind".to_string()]);
            assert_eq!(report.stuck.len(), 1);
            assert!(report.to_string().contains("limit 15"));
        }
        other => panic!("expected a runaway, got {:?}", other),
    }
}

#[test]
fn test_finishing_at_the_limit_is_not_a_runaway() {
    let config = machine(Algorithm::Fifo, 4).with_runaway_limit(3);
    let mut sim = Simulator::new(config, vec![cpu_job("exact", 1, 3)]).unwrap();
    run_checked(&mut sim).unwrap();
    assert_eq!(sim.summary().finish_tick, 3);
}

#[test]
fn test_one_tick_over_the_limit_is_a_runaway() {
    let config = machine(Algorithm::Fifo, 4).with_runaway_limit(2);
    let mut sim = Simulator::new(config, vec![cpu_job("late", 1, 3)]).unwrap();
    let error = sim.run().unwrap_err();
    assert!(matches!(error, SimError::Runaway(ref report) if report.tick == 3));
}
