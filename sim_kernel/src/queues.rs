//! Ready and blocked queues
//!
//! Both queues are ordered by the active [`SchedulingPolicy`]: entries carry
//! the priority they were queued under, and insertion asks the policy for a
//! position. Removal from the middle happens on device allocation and I/O
//! completion, so the backing store is a `VecDeque` rather than a heap.

use crate::policy::SchedulingPolicy;
use core_types::{DeviceClass, DeviceId, ProcessId, Tick};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// An entry that can sit in a policy-ordered queue
pub trait Queued {
    fn pid(&self) -> ProcessId;
    fn priority(&self) -> i32;
}

/// Queue whose order is decided by a scheduling policy
#[derive(Debug, Clone)]
pub struct PolicyQueue<T> {
    entries: VecDeque<T>,
}

impl<T> Default for PolicyQueue<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T: Queued> PolicyQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry` where `policy` places it
    ///
    /// Returns the position it landed at.
    pub fn insert(&mut self, entry: T, policy: &dyn SchedulingPolicy) -> usize {
        let mut queued = self.entries.iter().map(|e| e.priority());
        let index = policy
            .insertion_index(&mut queued, entry.priority())
            .min(self.entries.len());
        self.entries.insert(index, entry);
        index
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.entries.pop_front()
    }

    pub fn front(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Removes the entry of `pid` wherever it is queued
    pub fn remove(&mut self, pid: ProcessId) -> Option<T> {
        let index = self.entries.iter().position(|e| e.pid() == pid)?;
        self.entries.remove(index)
    }

    pub fn get(&self, pid: ProcessId) -> Option<&T> {
        self.entries.iter().find(|e| e.pid() == pid)
    }

    pub fn get_mut(&mut self, pid: ProcessId) -> Option<&mut T> {
        self.entries.iter_mut().find(|e| e.pid() == pid)
    }

    pub fn contains(&self, pid: ProcessId) -> bool {
        self.get(pid).is_some()
    }

    /// Entries head first
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter()
    }

    /// Queued ids head first
    pub fn pids(&self) -> Vec<ProcessId> {
        self.entries.iter().map(|e| e.pid()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A process waiting for the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyEntry {
    pub pid: ProcessId,
    pub priority: i32,
}

impl Queued for ReadyEntry {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

pub type ReadyQueue = PolicyQueue<ReadyEntry>;

/// Progress of an outstanding I/O request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestState {
    /// Waiting for a free device
    Pending,
    /// Holding a device; completion is scheduled
    Working,
    /// Finished; the entry is about to be drained
    Done,
}

/// A process waiting on an I/O request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedEntry {
    pub pid: ProcessId,
    pub priority: i32,
    pub request: RequestState,
    pub device: DeviceClass,
    /// Set while the request is Working
    pub device_id: Option<DeviceId>,
    pub io_units: u32,
    pub blocked_at: Tick,
}

impl BlockedEntry {
    /// A new request, not yet holding a device
    pub fn pending(
        pid: ProcessId,
        priority: i32,
        device: DeviceClass,
        io_units: u32,
        blocked_at: Tick,
    ) -> Self {
        Self {
            pid,
            priority,
            request: RequestState::Pending,
            device,
            device_id: None,
            io_units,
            blocked_at,
        }
    }
}

impl Queued for BlockedEntry {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

pub type BlockedQueue = PolicyQueue<BlockedEntry>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{FirstInFirstOut, InitialPriority};

    fn pid(raw: u32) -> ProcessId {
        ProcessId::new(raw).unwrap()
    }

    fn ready(raw: u32, priority: i32) -> ReadyEntry {
        ReadyEntry {
            pid: pid(raw),
            priority,
        }
    }

    #[test]
    fn test_fifo_queue_keeps_arrival_order() {
        let mut queue = ReadyQueue::new();
        queue.insert(ready(1, 0), &FirstInFirstOut);
        queue.insert(ready(2, 0), &FirstInFirstOut);
        queue.insert(ready(3, 0), &FirstInFirstOut);
        assert_eq!(queue.pids(), vec![pid(1), pid(2), pid(3)]);
        assert_eq!(queue.pop_front().map(|e| e.pid), Some(pid(1)));
    }

    #[test]
    fn test_priority_queue_orders_by_band() {
        let mut queue = ReadyQueue::new();
        assert_eq!(queue.insert(ready(1, 3), &InitialPriority), 0);
        assert_eq!(queue.insert(ready(2, 1), &InitialPriority), 0);
        assert_eq!(queue.insert(ready(3, 3), &InitialPriority), 2);
        assert_eq!(queue.insert(ready(4, 2), &InitialPriority), 1);
        assert_eq!(queue.pids(), vec![pid(2), pid(4), pid(1), pid(3)]);
    }

    #[test]
    fn test_remove_from_middle() {
        let mut queue = ReadyQueue::new();
        for raw in 1..=4 {
            queue.insert(ready(raw, 0), &FirstInFirstOut);
        }
        assert_eq!(queue.remove(pid(3)).map(|e| e.pid), Some(pid(3)));
        assert!(queue.remove(pid(3)).is_none());
        assert!(!queue.contains(pid(3)));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_blocked_entry_lifecycle() {
        let mut queue = BlockedQueue::new();
        queue.insert(
            BlockedEntry::pending(pid(5), 1, DeviceClass::Disk, 4, 10),
            &InitialPriority,
        );

        let entry = queue.get_mut(pid(5)).unwrap();
        assert_eq!(entry.request, RequestState::Pending);
        entry.request = RequestState::Working;
        entry.device_id = Some(DeviceId(2));

        let entry = queue.get(pid(5)).unwrap();
        assert_eq!(entry.device_id, Some(DeviceId(2)));
        assert_eq!(entry.blocked_at, 10);
    }
}
