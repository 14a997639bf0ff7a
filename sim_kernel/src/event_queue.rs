//! Pending future occurrences keyed by simulated time
//!
//! Each process has at most one pending event: a timeout while it executes,
//! or an I/O completion while its device works. Events due in the same tick
//! fire by kind precedence, then in registration order.

use core_types::{ProcessId, Tick};
use serde::{Deserialize, Serialize};

/// Kind of event, ordered by firing precedence (I/O completion first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    IoCompletion,
    Timeout,
}

/// A scheduled occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub fire_time: Tick,
    pub pid: ProcessId,
    pub kind: EventKind,
    /// Registration order, used to break same-tick ties
    pub seq: u64,
}

#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<Event>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an event for `pid`
    ///
    /// Fails with the event already pending for that process, if any.
    pub fn schedule(&mut self, fire_time: Tick, pid: ProcessId, kind: EventKind) -> Result<(), Event> {
        if let Some(existing) = self.pending_for(pid) {
            return Err(*existing);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            fire_time,
            pid,
            kind,
            seq,
        });
        Ok(())
    }

    /// Removes and returns the events of `kind` due at `now`, oldest first
    pub fn take_due(&mut self, now: Tick, kind: EventKind) -> Vec<Event> {
        let (mut due, pending): (Vec<Event>, Vec<Event>) = self
            .events
            .drain(..)
            .partition(|e| e.fire_time == now && e.kind == kind);
        self.events = pending;
        due.sort_by_key(|e| e.seq);
        due
    }

    /// Drops the pending event of `pid`, returning it
    pub fn cancel(&mut self, pid: ProcessId) -> Option<Event> {
        let position = self.events.iter().position(|e| e.pid == pid)?;
        Some(self.events.remove(position))
    }

    pub fn pending_for(&self, pid: ProcessId) -> Option<&Event> {
        self.events.iter().find(|e| e.pid == pid)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Pending events in firing order
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        let mut ordered: Vec<&Event> = self.events.iter().collect();
        ordered.sort_by_key(|e| (e.fire_time, e.kind, e.seq));
        ordered.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: u32) -> ProcessId {
        ProcessId::new(raw).unwrap()
    }

    #[test]
    fn test_one_event_per_process() {
        let mut queue = EventQueue::new();
        queue.schedule(5, pid(1), EventKind::Timeout).unwrap();
        let existing = queue.schedule(9, pid(1), EventKind::IoCompletion).unwrap_err();
        assert_eq!(existing.fire_time, 5);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_take_due_filters_by_time_and_kind() {
        let mut queue = EventQueue::new();
        queue.schedule(5, pid(1), EventKind::Timeout).unwrap();
        queue.schedule(5, pid(2), EventKind::IoCompletion).unwrap();
        queue.schedule(6, pid(3), EventKind::IoCompletion).unwrap();

        let io = queue.take_due(5, EventKind::IoCompletion);
        assert_eq!(io.len(), 1);
        assert_eq!(io[0].pid, pid(2));

        let timeouts = queue.take_due(5, EventKind::Timeout);
        assert_eq!(timeouts.len(), 1);
        assert_eq!(timeouts[0].pid, pid(1));

        assert_eq!(queue.len(), 1);
        assert!(queue.take_due(5, EventKind::IoCompletion).is_empty());
    }

    #[test]
    fn test_same_tick_events_keep_registration_order() {
        let mut queue = EventQueue::new();
        queue.schedule(8, pid(3), EventKind::IoCompletion).unwrap();
        queue.schedule(8, pid(1), EventKind::IoCompletion).unwrap();
        queue.schedule(8, pid(2), EventKind::IoCompletion).unwrap();

        let fired: Vec<ProcessId> = queue
            .take_due(8, EventKind::IoCompletion)
            .into_iter()
            .map(|e| e.pid)
            .collect();
        assert_eq!(fired, vec![pid(3), pid(1), pid(2)]);
    }

    #[test]
    fn test_cancel_removes_stale_event() {
        let mut queue = EventQueue::new();
        queue.schedule(4, pid(1), EventKind::Timeout).unwrap();
        let cancelled = queue.cancel(pid(1)).unwrap();
        assert_eq!(cancelled.kind, EventKind::Timeout);
        assert!(queue.is_empty());
        assert!(queue.cancel(pid(1)).is_none());

        // A fresh event can be registered afterwards
        queue.schedule(7, pid(1), EventKind::IoCompletion).unwrap();
        assert_eq!(queue.pending_for(pid(1)).map(|e| e.kind), Some(EventKind::IoCompletion));
    }

    #[test]
    fn test_iter_in_firing_order() {
        let mut queue = EventQueue::new();
        queue.schedule(9, pid(1), EventKind::Timeout).unwrap();
        queue.schedule(3, pid(2), EventKind::Timeout).unwrap();
        queue.schedule(3, pid(3), EventKind::IoCompletion).unwrap();

        let order: Vec<ProcessId> = queue.iter().map(|e| e.pid).collect();
        assert_eq!(order, vec![pid(3), pid(2), pid(1)]);
    }
}
