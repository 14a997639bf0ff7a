//! End-of-tick consistency checks
//!
//! Run after every tick. Any failure is an engine bug and aborts the run.

use crate::error::SimError;
use crate::event_queue::EventKind;
use crate::queues::RequestState;
use crate::Simulator;
use core_types::{ProcessId, ProcessState};
use resources::{BlockState, MemoryPool, MemoryUsage};
use std::collections::BTreeMap;

impl Simulator {
    /// Verifies the tables, queues, pools and events agree with each other
    pub fn check_invariants(&self) -> Result<(), SimError> {
        self.check_membership()?;
        self.check_queue_order()?;
        self.check_devices()?;
        self.check_memory()?;
        self.check_events()?;
        Ok(())
    }

    fn violation(&self, detail: String) -> SimError {
        SimError::invariant(self.clock, detail)
    }

    /// Each live process sits in exactly one place, matching its state
    fn check_membership(&self) -> Result<(), SimError> {
        let mut places: BTreeMap<ProcessId, Vec<ProcessState>> = BTreeMap::new();
        for pid in self.ready.pids() {
            places.entry(pid).or_default().push(ProcessState::Ready);
        }
        for pid in self.blocked.pids() {
            places.entry(pid).or_default().push(ProcessState::Blocked);
        }
        if let Some(pid) = self.executing {
            places.entry(pid).or_default().push(ProcessState::Executing);
        }
        if let Some(pid) = self.held {
            places.entry(pid).or_default().push(ProcessState::Held);
        }

        for (pid, found) in &places {
            if !self.table.contains(*pid) {
                return Err(self.violation(format!("{} queued but not in the process table", pid)));
            }
            if found.len() > 1 {
                return Err(self.violation(format!("{} is in several places: {:?}", pid, found)));
            }
        }

        for pcb in self.table.iter() {
            match places.get(&pcb.id).map(Vec::as_slice) {
                Some([place]) if *place == pcb.state => {}
                Some(found) => {
                    return Err(self.violation(format!(
                        "{} is {} but found in {:?}",
                        pcb.id, pcb.state, found
                    )))
                }
                None => {
                    return Err(self.violation(format!(
                        "{} is {} but in no queue",
                        pcb.id, pcb.state
                    )))
                }
            }
            if pcb.cycle_index >= pcb.cycles.len() {
                return Err(self.violation(format!("{} is live past its last cycle", pcb.id)));
            }
        }
        Ok(())
    }

    /// Queue keys match the policy and are non-decreasing from the head
    fn check_queue_order(&self) -> Result<(), SimError> {
        let mut previous = i32::MIN;
        for entry in self.ready.iter() {
            let expected = self
                .table
                .get(entry.pid)
                .map(|pcb| self.policy.queue_priority(pcb));
            if expected != Some(entry.priority) {
                return Err(self.violation(format!(
                    "{} queued ready at priority {} instead of {:?}",
                    entry.pid, entry.priority, expected
                )));
            }
            if entry.priority < previous {
                return Err(self.violation(format!("ready queue out of order at {}", entry.pid)));
            }
            previous = entry.priority;
        }

        let mut previous = i32::MIN;
        for entry in self.blocked.iter() {
            if entry.priority < previous {
                return Err(self.violation(format!("blocked queue out of order at {}", entry.pid)));
            }
            previous = entry.priority;
        }
        Ok(())
    }

    /// Busy devices and working requests are in one-to-one correspondence
    fn check_devices(&self) -> Result<(), SimError> {
        let mut working = 0;
        for entry in self.blocked.iter() {
            match (entry.request, entry.device_id) {
                (RequestState::Working, Some(id)) => {
                    working += 1;
                    if self.devices.owner(entry.device, id) != Some(entry.pid) {
                        return Err(self.violation(format!(
                            "{} works on {} {} it does not hold",
                            entry.pid, entry.device, id
                        )));
                    }
                }
                (RequestState::Pending, None) => {}
                (request, device_id) => {
                    return Err(self.violation(format!(
                        "{} has request {:?} with device {:?}",
                        entry.pid, request, device_id
                    )))
                }
            }
        }

        let busy = self.devices.busy().count();
        if busy != working {
            return Err(self.violation(format!(
                "{} devices busy but {} requests working",
                busy, working
            )));
        }
        Ok(())
    }

    /// Memory in use equals what the live processes hold
    fn check_memory(&self) -> Result<(), SimError> {
        match self.memory.usage() {
            MemoryUsage::Unmodeled => Ok(()),
            MemoryUsage::Blocks { used, total, .. } => {
                if let MemoryPool::Fixed(pool) = &self.memory {
                    for (block, state) in pool.block_states().iter().enumerate() {
                        if let BlockState::Used(owner) = state {
                            if self.table.get(*owner).is_none() {
                                return Err(self.violation(format!(
                                    "block {} held by {} which is not in the process table",
                                    block, owner
                                )));
                            }
                        }
                    }
                }
                let held: usize = self.table.iter().map(|pcb| pcb.reserved_blocks()).sum();
                if used > total || used as usize != held {
                    return Err(self.violation(format!(
                        "{} of {} blocks used, processes hold {}",
                        used, total, held
                    )));
                }
                Ok(())
            }
            MemoryUsage::Units { used, total } => {
                let held: u64 = self.table.iter().map(|pcb| pcb.memsize).sum();
                if used > total || used != held {
                    return Err(self.violation(format!(
                        "{} of {} units used, processes hold {}",
                        used, total, held
                    )));
                }
                Ok(())
            }
        }
    }

    /// Every pending event is in the future and matches its process
    fn check_events(&self) -> Result<(), SimError> {
        for event in self.events.iter() {
            if event.fire_time <= self.clock {
                return Err(self.violation(format!(
                    "{:?} for {} due at {} never fired",
                    event.kind, event.pid, event.fire_time
                )));
            }
            let consistent = match event.kind {
                EventKind::Timeout => self.executing == Some(event.pid),
                EventKind::IoCompletion => self
                    .blocked
                    .get(event.pid)
                    .is_some_and(|entry| entry.request == RequestState::Working),
            };
            if !consistent {
                return Err(self.violation(format!(
                    "stale {:?} for {}",
                    event.kind, event.pid
                )));
            }
        }

        if let Some(pid) = self.executing {
            if self.events.pending_for(pid).map(|e| e.kind) != Some(EventKind::Timeout) {
                return Err(self.violation(format!("{} executing without a timeout", pid)));
            }
        }
        for entry in self.blocked.iter() {
            let pending = self.events.pending_for(entry.pid).map(|e| e.kind);
            let expected = match entry.request {
                RequestState::Working => Some(EventKind::IoCompletion),
                _ => None,
            };
            if pending != expected {
                return Err(self.violation(format!(
                    "{} blocked with pending event {:?}",
                    entry.pid, pending
                )));
            }
        }
        Ok(())
    }
}
