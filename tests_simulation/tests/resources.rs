//! Devices and memory under contention

use core_types::{Cycle, DeviceClass, DeviceId, JobDescription};
use resources::{DeviceUnits, MemoryConfig, MemoryUsage};
use sim_kernel::{Algorithm, RecordingSink, RequestState, SimEvent, Simulator};
use std::cell::RefCell;
use std::rc::Rc;
use tests_simulation::{cpu_job, machine, pid, run_checked, run_observed};

fn disk_job(name: &str) -> JobDescription {
    JobDescription::new(
        name,
        1,
        10,
        vec![Cycle::with_io(1, 3, DeviceClass::Disk), Cycle::cpu(1)],
    )
}

fn allocations(sim: &Simulator) -> Vec<(u64, u32, DeviceId)> {
    sim.audit_log()
        .iter()
        .filter_map(|event| match event {
            SimEvent::DeviceAllocated {
                tick,
                pid,
                device_id,
                ..
            } => Some((*tick, pid.as_u32(), *device_id)),
            _ => None,
        })
        .collect()
}

// ===== Devices =====

#[test]
fn test_request_waits_for_busy_device() {
    let config = machine(Algorithm::Fifo, 5);
    let mut sim = Simulator::new(config, vec![disk_job("A"), disk_job("B")]).unwrap();
    let (a, b) = (pid(1), pid(2));

    for _ in 0..=3 {
        sim.step().unwrap();
    }
    let waiting = sim.blocked_queue().get(b).unwrap();
    assert_eq!(waiting.request, RequestState::Pending);
    assert_eq!(waiting.device_id, None);
    assert_eq!(sim.devices().owner(DeviceClass::Disk, DeviceId(1)), Some(a));

    run_checked(&mut sim).unwrap();
    assert_eq!(
        allocations(&sim),
        vec![(1, 1, DeviceId(1)), (4, 2, DeviceId(1))]
    );

    let summary = sim.summary();
    let b_summary = summary.process("B").unwrap();
    assert_eq!(b_summary.total_ios, 3);
    assert_eq!(b_summary.end_time, 8);
}

#[test]
fn test_lowest_free_unit_is_allocated() {
    let config = machine(Algorithm::Fifo, 5).with_devices(DeviceUnits::new(2, 1, 1));
    let mut sim =
        Simulator::new(config, vec![disk_job("A"), disk_job("B"), disk_job("C")]).unwrap();
    run_observed(&mut sim, |sim| {
        assert!(sim.devices().busy().count() <= 2);
    })
    .unwrap();

    let ids: Vec<DeviceId> = allocations(&sim).into_iter().map(|(_, _, id)| id).collect();
    assert_eq!(&ids[..2], &[DeviceId(1), DeviceId(2)]);
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_snapshot_shows_device_owner() {
    let config = machine(Algorithm::Fifo, 5).with_report_interval(2);
    let sink = Rc::new(RefCell::new(RecordingSink::default()));
    let mut sim = Simulator::new(config, vec![disk_job("A"), cpu_job("B", 1, 4)])
        .unwrap()
        .with_sink(Rc::clone(&sink));
    sim.run().unwrap();

    let sink = sink.borrow();
    let first = &sink.snapshots[0];
    assert_eq!(first.tick, 2);
    let disk = first
        .devices
        .iter()
        .find(|d| d.class == DeviceClass::Disk)
        .unwrap();
    assert_eq!(disk.owner, Some(pid(1)));
    assert_eq!(first.blocked.len(), 1);
    assert_eq!(first.blocked[0].request, RequestState::Working);
    assert_eq!(first.executing, Some(pid(2)));
}

// ===== Memory =====

#[test]
fn test_fixed_blocks_reused_after_termination() {
    let config = machine(Algorithm::Fifo, 5).with_memory(MemoryConfig::Fixed {
        block_size: 10,
        total_blocks: 3,
    });
    let mut a = cpu_job("a", 1, 2);
    a.memsize = 25;
    let mut b = cpu_job("b", 1, 1);
    b.memsize = 21;
    let mut sim = Simulator::new(config, vec![a, b]).unwrap();

    run_observed(&mut sim, |sim| {
        if let MemoryUsage::Blocks { used, .. } = sim.memory().usage() {
            let expected = if sim.process_table().is_empty() { 0 } else { 3 };
            assert_eq!(used, expected, "tick {}", sim.clock());
        }
    })
    .unwrap();

    let admitted: Vec<(u64, Option<u64>)> = sim
        .audit_log()
        .iter()
        .filter_map(|event| match event {
            SimEvent::Admitted { tick, blocks, .. } => Some((*tick, *blocks)),
            _ => None,
        })
        .collect();
    assert_eq!(admitted, vec![(0, Some(3)), (2, Some(3))]);
}

#[test]
fn test_variable_memory_tracks_free_units() {
    let config = machine(Algorithm::Ipri, 5).with_memory(MemoryConfig::Variable {
        max_size: 60,
        total_size: 100,
    });
    let mut jobs = vec![cpu_job("a", 1, 3), cpu_job("b", 2, 2), cpu_job("c", 3, 1)];
    for (job, memsize) in jobs.iter_mut().zip([60, 30, 40]) {
        job.memsize = memsize;
    }
    let mut sim = Simulator::new(config, jobs).unwrap();

    sim.step().unwrap();
    assert_eq!(
        sim.memory().usage(),
        MemoryUsage::Units {
            used: 90,
            total: 100
        }
    );
    assert_eq!(sim.waiting_jobs(), 1);

    run_checked(&mut sim).unwrap();
    let c = sim.summary().process("c").cloned().unwrap();
    assert_eq!(c.admitted_at, 3);
    assert_eq!(
        sim.memory().usage(),
        MemoryUsage::Units {
            used: 0,
            total: 100
        }
    );
}
