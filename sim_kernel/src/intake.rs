//! The input queue of jobs not yet admitted

use crate::policy::SchedulingPolicy;
use core_types::JobDescription;
use std::collections::VecDeque;

/// Jobs waiting for admission, in the order the policy wants them admitted
///
/// Ordered once, when the run is created; the admitter only ever looks at
/// the head.
#[derive(Debug, Clone, Default)]
pub struct JobIntake {
    jobs: VecDeque<JobDescription>,
}

impl JobIntake {
    pub fn new(mut jobs: Vec<JobDescription>, policy: &dyn SchedulingPolicy) -> Self {
        policy.order_intake(&mut jobs);
        Self { jobs: jobs.into() }
    }

    pub fn peek(&self) -> Option<&JobDescription> {
        self.jobs.front()
    }

    pub fn pop(&mut self) -> Option<JobDescription> {
        self.jobs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Names of the waiting jobs, head first
    pub fn names(&self) -> Vec<String> {
        self.jobs.iter().map(|job| job.name.clone()).collect()
    }
}
