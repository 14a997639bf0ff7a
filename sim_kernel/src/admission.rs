//! Admission from the input queue and cleanup of finished processes

use crate::error::SimError;
use crate::process_table::ProcessControlBlock;
use crate::queues::ReadyEntry;
use crate::report::{ProcessSummary, Rejection, SimEvent};
use crate::Simulator;
use core_types::ProcessState;
use resources::ReserveOutcome;
use tracing::{debug, warn};

impl Simulator {
    /// Moves jobs from the head of the intake into the process table
    ///
    /// Stops at the first job that does not fit in memory right now, or when
    /// the table is full. Jobs that can never fit are dropped on the way.
    pub(crate) fn admit_jobs(&mut self) -> Result<(), SimError> {
        let now = self.clock;
        while !self.table.is_full() {
            let Some(memsize) = self.intake.peek().map(|job| job.memsize) else {
                break;
            };

            if !self.memory.can_admit_ever(memsize) {
                let Some(job) = self.intake.pop() else {
                    break;
                };
                let ceiling = self.memory.ceiling().unwrap_or(u64::MAX);
                warn!(job = %job.name, memsize, ceiling, "job exceeds memory ceiling, rejected");
                self.rejected.push(Rejection {
                    name: job.name.clone(),
                    memsize,
                    ceiling,
                });
                self.emit(SimEvent::Rejected {
                    tick: now,
                    name: job.name,
                    memsize,
                    ceiling,
                });
                continue;
            }

            let pid = self.next_pid;
            let reservation = match self.memory.try_reserve(pid, memsize) {
                ReserveOutcome::Reserved(reservation) => reservation,
                ReserveOutcome::InsufficientNow => break,
            };
            let Some(job) = self.intake.pop() else {
                self.memory.release(reservation)?;
                break;
            };
            self.next_pid = pid.next();

            let blocks = self.memory.blocks_for(memsize);
            let name = job.name.clone();
            let pcb = ProcessControlBlock::admit(pid, job, reservation, now);
            let priority = self.policy.queue_priority(&pcb);

            if let Err(mut pcb) = self.table.insert(pcb) {
                if let Some(reservation) = pcb.take_reservation() {
                    self.memory.release(reservation)?;
                }
                return Err(SimError::invariant(
                    now,
                    format!("process table refused {}", pid),
                ));
            }
            self.ready
                .insert(ReadyEntry { pid, priority }, self.policy.as_ref());

            debug!(%pid, job = %name, memsize, tick = now, "admitted");
            self.emit(SimEvent::Admitted {
                tick: now,
                pid,
                name,
                memsize,
                blocks,
            });
        }
        Ok(())
    }

    /// Removes processes that reached Done this tick
    ///
    /// Returns true when at least one process left the table.
    pub(crate) fn reap_terminated(&mut self) -> Result<bool, SimError> {
        let now = self.clock;
        let done = std::mem::take(&mut self.terminated);
        let any = !done.is_empty();

        for pid in done {
            self.events.cancel(pid);
            let mut pcb = self
                .table
                .remove(pid)
                .ok_or_else(|| SimError::invariant(now, format!("{} finished twice", pid)))?;
            if pcb.state != ProcessState::Done {
                return Err(SimError::invariant(
                    now,
                    format!("{} cleaned up while {}", pid, pcb.state),
                ));
            }
            if let Some(reservation) = pcb.take_reservation() {
                self.memory.release(reservation)?;
            }

            let summary = ProcessSummary {
                pid,
                name: pcb.name,
                initial_priority: pcb.initial_priority,
                final_priority: pcb.current_priority,
                admitted_at: pcb.admitted_at,
                start_time: pcb.start_time,
                end_time: pcb.end_time.unwrap_or(now),
                total_cpu: pcb.total_cpu,
                total_ios: pcb.total_ios,
            };
            debug!(%pid, cpu = summary.total_cpu, ios = summary.total_ios, tick = now, "terminated");
            self.finished.push(summary.clone());
            self.emit(SimEvent::Terminated { tick: now, summary });
        }
        Ok(any)
    }
}
