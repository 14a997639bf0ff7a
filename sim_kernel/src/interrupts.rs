//! Interrupt handling, CPU bursts and the I/O subsystem

use crate::error::SimError;
use crate::event_queue::EventKind;
use crate::queues::{BlockedEntry, ReadyEntry, RequestState};
use crate::report::SimEvent;
use crate::Simulator;
use core_types::{DeviceClass, ProcessId, ProcessState, Tick};
use tracing::debug;

/// Where a process goes when its I/O completes
enum AfterIo {
    Done,
    Held,
    Ready,
}

impl Simulator {
    /// Fires the I/O completions due this tick
    pub(crate) fn handle_io_completions(&mut self) -> Result<(), SimError> {
        let now = self.clock;
        for event in self.events.take_due(now, EventKind::IoCompletion) {
            let pid = event.pid;
            let entry = self
                .blocked
                .get_mut(pid)
                .ok_or_else(|| SimError::invariant(now, format!("I/O completion for unblocked {}", pid)))?;
            if entry.request != RequestState::Working {
                return Err(SimError::invariant(
                    now,
                    format!("I/O completion for {} while {:?}", pid, entry.request),
                ));
            }
            let device = entry.device;
            let device_id = entry
                .device_id
                .ok_or_else(|| SimError::invariant(now, format!("{} working without a device", pid)))?;
            entry.request = RequestState::Done;

            self.devices.release(device, device_id, pid)?;
            self.blocked.remove(pid);

            let policy = self.policy.as_ref();
            let pcb = self
                .table
                .get_mut(pid)
                .ok_or_else(|| SimError::invariant(now, format!("blocked entry for unknown {}", pid)))?;
            policy.on_io_cycle_complete(pcb);
            let next = if !pcb.advance_cycle() {
                pcb.state = ProcessState::Done;
                pcb.end_time = Some(now);
                AfterIo::Done
            } else if self.held.is_none() {
                pcb.state = ProcessState::Held;
                AfterIo::Held
            } else {
                pcb.state = ProcessState::Ready;
                AfterIo::Ready
            };
            let priority = policy.queue_priority(pcb);

            match next {
                AfterIo::Done => self.terminated.push(pid),
                AfterIo::Held => self.held = Some(pid),
                AfterIo::Ready => {
                    self.ready
                        .insert(ReadyEntry { pid, priority }, self.policy.as_ref());
                }
            }

            debug!(%pid, %device, %device_id, tick = now, "I/O complete");
            self.emit(SimEvent::IoCompleted {
                tick: now,
                pid,
                device,
                device_id,
            });
        }
        Ok(())
    }

    /// Fires the quantum timeouts due this tick
    pub(crate) fn handle_timeouts(&mut self) -> Result<(), SimError> {
        let now = self.clock;
        for event in self.events.take_due(now, EventKind::Timeout) {
            let pid = event.pid;
            if self.executing != Some(pid) {
                return Err(SimError::invariant(
                    now,
                    format!("timeout for {} which is not executing", pid),
                ));
            }

            let policy = self.policy.as_ref();
            let pcb = self
                .table
                .get_mut(pid)
                .ok_or_else(|| SimError::invariant(now, format!("timeout for unknown {}", pid)))?;
            pcb.timed_out_this_cycle = true;
            policy.on_timeout(pcb);
            pcb.state = ProcessState::Ready;
            let priority = policy.queue_priority(pcb);
            let current_priority = pcb.current_priority;

            self.ready
                .insert(ReadyEntry { pid, priority }, self.policy.as_ref());
            self.executing = None;

            debug!(%pid, priority = current_priority, tick = now, "quantum expired");
            self.emit(SimEvent::TimedOut {
                tick: now,
                pid,
                priority: current_priority,
            });
        }
        Ok(())
    }

    /// Runs one CPU unit for the executing process
    ///
    /// Returns whether a unit was consumed. A process that leaves the CPU
    /// without running a unit (an empty burst) leaves the tick to dispatch.
    pub(crate) fn run_cpu(&mut self) -> Result<bool, SimError> {
        let now = self.clock;
        let Some(pid) = self.executing else {
            return Ok(false);
        };

        let pcb = self
            .table
            .get_mut(pid)
            .ok_or_else(|| SimError::invariant(now, format!("executing unknown {}", pid)))?;
        let consumed = pcb.remaining_units > 0;
        if consumed {
            pcb.remaining_units -= 1;
            pcb.total_cpu += 1;
        }
        if pcb.remaining_units == 0 {
            self.finish_burst(pid)?;
        }
        Ok(consumed)
    }

    /// Settles a process whose CPU burst just ran out
    ///
    /// CPU-only cycles advance in place and the process keeps the CPU under
    /// the same timeout; empty bursts are skipped in the same tick.
    fn finish_burst(&mut self, pid: ProcessId) -> Result<(), SimError> {
        let now = self.clock;
        loop {
            let pcb = self
                .table
                .get_mut(pid)
                .ok_or_else(|| SimError::invariant(now, format!("executing unknown {}", pid)))?;
            let cycle = *pcb
                .current_cycle()
                .ok_or_else(|| SimError::invariant(now, format!("{} executing past its last cycle", pid)))?;

            if let Some(device) = cycle.io_device() {
                return self.service_call(pid, device, cycle.io_units);
            }

            if !pcb.advance_cycle() {
                pcb.state = ProcessState::Done;
                pcb.end_time = Some(now);
                self.executing = None;
                self.events.cancel(pid);
                self.terminated.push(pid);
                debug!(%pid, tick = now, "finished last cycle");
                return Ok(());
            }
            if pcb.remaining_units > 0 {
                return Ok(());
            }
        }
    }

    /// Moves the executing process to the blocked queue for I/O on `device`
    fn service_call(
        &mut self,
        pid: ProcessId,
        device: DeviceClass,
        io_units: u32,
    ) -> Result<(), SimError> {
        let now = self.clock;
        match self.events.cancel(pid) {
            Some(event) if event.kind == EventKind::Timeout => {}
            other => {
                return Err(SimError::invariant(
                    now,
                    format!("{} made a service call with pending event {:?}", pid, other),
                ))
            }
        }

        let policy = self.policy.as_ref();
        let pcb = self
            .table
            .get_mut(pid)
            .ok_or_else(|| SimError::invariant(now, format!("service call from unknown {}", pid)))?;
        pcb.state = ProcessState::Blocked;
        let priority = policy.queue_priority(pcb);
        self.executing = None;
        self.blocked.insert(
            BlockedEntry::pending(pid, priority, device, io_units, now),
            self.policy.as_ref(),
        );

        debug!(%pid, %device, io_units, tick = now, "service call");
        self.emit(SimEvent::ServiceCall {
            tick: now,
            pid,
            device,
            io_units,
        });
        self.start_io(pid)?;
        Ok(())
    }

    /// Starts a pending request if a device of its class is free
    ///
    /// Returns whether the request is now working.
    fn start_io(&mut self, pid: ProcessId) -> Result<bool, SimError> {
        let now = self.clock;
        let entry = self
            .blocked
            .get_mut(pid)
            .ok_or_else(|| SimError::invariant(now, format!("no I/O request for {}", pid)))?;
        if entry.request != RequestState::Pending {
            return Ok(false);
        }
        let Some(device_id) = self.devices.allocate(entry.device, pid) else {
            return Ok(false);
        };
        entry.request = RequestState::Working;
        entry.device_id = Some(device_id);
        let device = entry.device;
        let fire_time = now + Tick::from(entry.io_units);

        self.events
            .schedule(fire_time, pid, EventKind::IoCompletion)
            .map_err(|existing| {
                SimError::invariant(
                    now,
                    format!("{} started I/O with {:?} still pending", pid, existing.kind),
                )
            })?;

        debug!(%pid, %device, %device_id, completes = fire_time, "device allocated");
        self.emit(SimEvent::DeviceAllocated {
            tick: now,
            pid,
            device,
            device_id,
        });
        Ok(true)
    }

    /// I/O subsystem phase
    ///
    /// Retries pending requests in queue order, then accounts one unit of
    /// I/O to every request holding a device.
    pub(crate) fn service_io(&mut self) -> Result<(), SimError> {
        let now = self.clock;
        let pending: Vec<ProcessId> = self
            .blocked
            .iter()
            .filter(|entry| entry.request == RequestState::Pending)
            .map(|entry| entry.pid)
            .collect();
        for pid in pending {
            self.start_io(pid)?;
        }

        let working: Vec<ProcessId> = self
            .blocked
            .iter()
            .filter(|entry| entry.request == RequestState::Working)
            .map(|entry| entry.pid)
            .collect();
        for pid in working {
            let pcb = self
                .table
                .get_mut(pid)
                .ok_or_else(|| SimError::invariant(now, format!("I/O for unknown {}", pid)))?;
            pcb.total_ios += 1;
        }
        Ok(())
    }
}
