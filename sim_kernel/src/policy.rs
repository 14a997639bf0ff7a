//! Scheduling disciplines
//!
//! A discipline is one [`SchedulingPolicy`] object, chosen once from the
//! configured [`Algorithm`]. It decides where a process goes when it enters
//! the ready or blocked queue, and how priorities move over time. Nothing
//! else in the kernel looks at the algorithm.

use crate::config::Algorithm;
use crate::process_table::ProcessControlBlock;
use core_types::JobDescription;
use std::fmt;

/// Ordering and feedback rules of a scheduling discipline
pub trait SchedulingPolicy: fmt::Debug {
    fn algorithm(&self) -> Algorithm;

    /// Key a process is queued under; lower keys are served first
    fn queue_priority(&self, pcb: &ProcessControlBlock) -> i32;

    /// Position for a new entry with `priority`, given the keys already queued
    /// (head first)
    ///
    /// The default places it after every entry with an equal or better key,
    /// which keeps arrival order within a priority band.
    fn insertion_index(&self, queued: &mut dyn Iterator<Item = i32>, priority: i32) -> usize {
        queued.take_while(|&existing| existing <= priority).count()
    }

    /// Orders the input queue before admission begins
    fn order_intake(&self, jobs: &mut [JobDescription]) {
        // Stable, so equal priorities keep arrival order
        jobs.sort_by_key(|job| job.priority);
    }

    /// Called when the process exhausts its quantum
    fn on_timeout(&self, _pcb: &mut ProcessControlBlock) {}

    /// Called when an I/O burst completes, before the process moves on to
    /// its next cycle
    fn on_io_cycle_complete(&self, _pcb: &mut ProcessControlBlock) {}
}

/// Strict arrival order
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstInFirstOut;

impl SchedulingPolicy for FirstInFirstOut {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Fifo
    }

    fn queue_priority(&self, _pcb: &ProcessControlBlock) -> i32 {
        0
    }

    fn insertion_index(&self, queued: &mut dyn Iterator<Item = i32>, _priority: i32) -> usize {
        queued.count()
    }

    fn order_intake(&self, _jobs: &mut [JobDescription]) {}
}

/// Static priority taken from the job description
#[derive(Debug, Clone, Copy, Default)]
pub struct InitialPriority;

impl SchedulingPolicy for InitialPriority {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Ipri
    }

    fn queue_priority(&self, pcb: &ProcessControlBlock) -> i32 {
        pcb.initial_priority
    }
}

/// Multi-level feedback queue
///
/// A timeout demotes the process one level. Finishing an I/O cycle without
/// having timed out during it promotes the process one level, never above
/// its initial priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiLevelFeedback;

impl SchedulingPolicy for MultiLevelFeedback {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Mlfq
    }

    fn queue_priority(&self, pcb: &ProcessControlBlock) -> i32 {
        pcb.current_priority
    }

    fn on_timeout(&self, pcb: &mut ProcessControlBlock) {
        pcb.current_priority = pcb.current_priority.saturating_add(1);
    }

    fn on_io_cycle_complete(&self, pcb: &mut ProcessControlBlock) {
        if !pcb.timed_out_this_cycle && pcb.current_priority > pcb.initial_priority {
            pcb.current_priority -= 1;
        }
    }
}

/// Selects the discipline for `algorithm`
pub fn policy_for(algorithm: Algorithm) -> Box<dyn SchedulingPolicy> {
    match algorithm {
        Algorithm::Fifo => Box::new(FirstInFirstOut),
        Algorithm::Ipri => Box::new(InitialPriority),
        Algorithm::Mlfq => Box::new(MultiLevelFeedback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Cycle, ProcessId};
    use resources::{MemoryConfig, MemoryPool, ReserveOutcome};

    fn pcb(priority: i32) -> ProcessControlBlock {
        let pid = ProcessId::FIRST;
        let mut memory = MemoryPool::new(&MemoryConfig::None);
        let reservation = match memory.try_reserve(pid, 1) {
            ReserveOutcome::Reserved(r) => r,
            ReserveOutcome::InsufficientNow => unreachable!(),
        };
        let job = JobDescription::new("p", priority, 1, vec![Cycle::cpu(1)]);
        ProcessControlBlock::admit(pid, job, reservation, 0)
    }

    fn index_in(policy: &dyn SchedulingPolicy, queued: &[i32], priority: i32) -> usize {
        policy.insertion_index(&mut queued.iter().copied(), priority)
    }

    #[test]
    fn test_policy_selection() {
        for algorithm in [Algorithm::Fifo, Algorithm::Ipri, Algorithm::Mlfq] {
            assert_eq!(policy_for(algorithm).algorithm(), algorithm);
        }
    }

    #[test]
    fn test_fifo_always_appends() {
        let policy = FirstInFirstOut;
        assert_eq!(index_in(&policy, &[5, 9, 1], 0), 3);
        assert_eq!(index_in(&policy, &[], 0), 0);
        assert_eq!(policy.queue_priority(&pcb(7)), 0);
    }

    #[test]
    fn test_priority_insertion_after_equal_band() {
        let policy = InitialPriority;
        let queued = [1, 2, 2, 4];
        assert_eq!(index_in(&policy, &queued, 0), 0);
        assert_eq!(index_in(&policy, &queued, 2), 3);
        assert_eq!(index_in(&policy, &queued, 3), 3);
        assert_eq!(index_in(&policy, &queued, 9), 4);
    }

    #[test]
    fn test_intake_ordering() {
        let mut jobs = vec![
            JobDescription::new("a", 3, 1, vec![Cycle::cpu(1)]),
            JobDescription::new("b", 1, 1, vec![Cycle::cpu(1)]),
            JobDescription::new("c", 3, 1, vec![Cycle::cpu(1)]),
            JobDescription::new("d", 2, 1, vec![Cycle::cpu(1)]),
        ];

        let mut fifo = jobs.clone();
        FirstInFirstOut.order_intake(&mut fifo);
        let names: Vec<&str> = fifo.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);

        InitialPriority.order_intake(&mut jobs);
        let names: Vec<&str> = jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_ipri_priority_never_changes() {
        let policy = InitialPriority;
        let mut p = pcb(2);
        policy.on_timeout(&mut p);
        policy.on_io_cycle_complete(&mut p);
        assert_eq!(p.current_priority, 2);
        assert_eq!(policy.queue_priority(&p), 2);
    }

    #[test]
    fn test_mlfq_demotion_and_promotion() {
        let policy = MultiLevelFeedback;
        let mut p = pcb(2);

        policy.on_timeout(&mut p);
        policy.on_timeout(&mut p);
        assert_eq!(p.current_priority, 4);
        assert_eq!(policy.queue_priority(&p), 4);

        // Timed out during this cycle: no promotion
        p.timed_out_this_cycle = true;
        policy.on_io_cycle_complete(&mut p);
        assert_eq!(p.current_priority, 4);

        p.timed_out_this_cycle = false;
        policy.on_io_cycle_complete(&mut p);
        assert_eq!(p.current_priority, 3);
        policy.on_io_cycle_complete(&mut p);
        policy.on_io_cycle_complete(&mut p);
        assert_eq!(p.current_priority, 2, "never promoted above its base level");
    }
}
