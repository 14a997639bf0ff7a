//! Process control blocks and the fixed-capacity process table
//!
//! The table is a slot map: a dense vector of optional PCBs plus a free list,
//! with an index from [`ProcessId`] to slot. Slots are reused once a process
//! terminates; ids are not.

use core_types::{Cycle, JobDescription, ProcessId, ProcessState, Tick};
use resources::Reservation;
use std::collections::BTreeMap;

/// Full runtime record of an admitted process
#[derive(Debug)]
pub struct ProcessControlBlock {
    pub id: ProcessId,
    pub name: String,
    pub initial_priority: i32,
    /// Mutated by feedback scheduling; equals `initial_priority` otherwise
    pub current_priority: i32,
    pub memsize: u64,
    pub cycles: Vec<Cycle>,
    /// Index of the cycle in progress; equals `cycles.len()` once finished
    pub cycle_index: usize,
    /// CPU units left in the current cycle's burst
    pub remaining_units: u32,
    pub state: ProcessState,
    pub total_cpu: u64,
    pub total_ios: u64,
    pub start_time: Option<Tick>,
    pub end_time: Option<Tick>,
    pub admitted_at: Tick,
    /// Set when the quantum expired at least once during the current cycle
    pub timed_out_this_cycle: bool,
    reservation: Option<Reservation>,
}

impl ProcessControlBlock {
    /// Builds the PCB for a freshly admitted job
    pub fn admit(
        id: ProcessId,
        job: JobDescription,
        reservation: Reservation,
        admitted_at: Tick,
    ) -> Self {
        let remaining_units = job.cycles.first().map(|c| c.cpu_units).unwrap_or(0);
        Self {
            id,
            name: job.name,
            initial_priority: job.priority,
            current_priority: job.priority,
            memsize: job.memsize,
            cycles: job.cycles,
            cycle_index: 0,
            remaining_units,
            state: ProcessState::Ready,
            total_cpu: 0,
            total_ios: 0,
            start_time: None,
            end_time: None,
            admitted_at,
            timed_out_this_cycle: false,
            reservation: Some(reservation),
        }
    }

    /// The cycle in progress, `None` once every cycle has run
    pub fn current_cycle(&self) -> Option<&Cycle> {
        self.cycles.get(self.cycle_index)
    }

    /// Moves to the next cycle
    ///
    /// Returns false when no cycles remain; the process is then finished.
    pub fn advance_cycle(&mut self) -> bool {
        self.cycle_index = (self.cycle_index + 1).min(self.cycles.len());
        self.timed_out_this_cycle = false;
        match self.cycles.get(self.cycle_index) {
            Some(cycle) => {
                self.remaining_units = cycle.cpu_units;
                true
            }
            None => {
                self.remaining_units = 0;
                false
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cycle_index >= self.cycles.len()
    }

    /// Takes the memory reservation for release; `None` if already taken
    pub fn take_reservation(&mut self) -> Option<Reservation> {
        self.reservation.take()
    }

    /// Fixed blocks this process currently holds
    pub fn reserved_blocks(&self) -> usize {
        self.reservation
            .as_ref()
            .map(Reservation::block_count)
            .unwrap_or(0)
    }
}

/// Fixed-capacity table of admitted processes
#[derive(Debug)]
pub struct ProcessTable {
    slots: Vec<Option<ProcessControlBlock>>,
    free: Vec<usize>,
    index: BTreeMap<ProcessId, usize>,
}

impl ProcessTable {
    /// Creates an empty table with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            // Popped from the back, so the lowest slot is handed out first
            free: (0..capacity).rev().collect(),
            index: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Places a PCB in the lowest free slot
    ///
    /// Gives the PCB back when the table is full or the id is already present.
    pub fn insert(&mut self, pcb: ProcessControlBlock) -> Result<usize, ProcessControlBlock> {
        if self.index.contains_key(&pcb.id) {
            return Err(pcb);
        }
        let Some(slot) = self.free.pop() else {
            return Err(pcb);
        };
        self.index.insert(pcb.id, slot);
        self.slots[slot] = Some(pcb);
        Ok(slot)
    }

    /// Frees the slot held by `pid`
    pub fn remove(&mut self, pid: ProcessId) -> Option<ProcessControlBlock> {
        let slot = self.index.remove(&pid)?;
        self.free.push(slot);
        self.slots[slot].take()
    }

    pub fn get(&self, pid: ProcessId) -> Option<&ProcessControlBlock> {
        let slot = *self.index.get(&pid)?;
        self.slots[slot].as_ref()
    }

    pub fn get_mut(&mut self, pid: ProcessId) -> Option<&mut ProcessControlBlock> {
        let slot = *self.index.get(&pid)?;
        self.slots[slot].as_mut()
    }

    pub fn contains(&self, pid: ProcessId) -> bool {
        self.index.contains_key(&pid)
    }

    /// Slot index of a process
    pub fn slot_of(&self, pid: ProcessId) -> Option<usize> {
        self.index.get(&pid).copied()
    }

    /// Live processes in id order
    pub fn iter(&self) -> impl Iterator<Item = &ProcessControlBlock> + '_ {
        self.index
            .values()
            .filter_map(move |&slot| self.slots[slot].as_ref())
    }

    /// Ids of every process in the table, ascending
    pub fn pids(&self) -> Vec<ProcessId> {
        self.index.keys().copied().collect()
    }
}
