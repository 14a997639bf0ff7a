//! Dispatch of the next process onto the idle CPU

use crate::error::SimError;
use crate::event_queue::EventKind;
use crate::report::SimEvent;
use crate::Simulator;
use core_types::ProcessState;
use tracing::{debug, trace};

impl Simulator {
    /// Puts the held process, or else the ready queue head, on the CPU
    ///
    /// The dispatch occupies the current tick; the timeout is set so the
    /// process gets exactly `quantum` units before it fires.
    pub(crate) fn dispatch(&mut self) -> Result<(), SimError> {
        let now = self.clock;
        let next = match self.held.take() {
            Some(pid) => Some(pid),
            None => self.ready.pop_front().map(|entry| entry.pid),
        };

        let Some(pid) = next else {
            if !self.table.is_empty() {
                self.idle_ticks += 1;
                trace!(tick = now, "cpu idle");
            }
            return Ok(());
        };

        let pcb = self
            .table
            .get_mut(pid)
            .ok_or_else(|| SimError::invariant(now, format!("dispatching unknown {}", pid)))?;
        pcb.state = ProcessState::Executing;
        let first_dispatch = pcb.start_time.is_none();
        if first_dispatch {
            pcb.start_time = Some(now);
        }
        self.executing = Some(pid);

        self.events
            .schedule(now + 1 + self.config.quantum, pid, EventKind::Timeout)
            .map_err(|existing| {
                SimError::invariant(
                    now,
                    format!("{} dispatched with {:?} still pending", pid, existing.kind),
                )
            })?;

        debug!(%pid, tick = now, "dispatched");
        if first_dispatch {
            self.emit(SimEvent::Started { tick: now, pid });
        }
        Ok(())
    }
}
