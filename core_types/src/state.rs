//! Process lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an admitted process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    /// Waiting in the ready queue
    Ready,
    /// Owns the CPU
    Executing,
    /// Waiting for a device or for an I/O burst to finish
    Blocked,
    /// Just finished I/O and must be dispatched before the ready queue
    Held,
    /// Completed its last cycle
    Done,
}

impl ProcessState {
    /// Single-letter code used by the tabular reports
    pub fn code(&self) -> char {
        match self {
            ProcessState::Ready => 'R',
            ProcessState::Executing => 'E',
            ProcessState::Blocked => 'B',
            ProcessState::Held => 'H',
            ProcessState::Done => 'D',
        }
    }

    /// Returns true while the process still holds resources
    pub fn is_live(&self) -> bool {
        !matches!(self, ProcessState::Done)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Ready => "Ready",
            ProcessState::Executing => "Executing",
            ProcessState::Blocked => "Blocked",
            ProcessState::Held => "Held",
            ProcessState::Done => "Done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes_are_distinct() {
        let codes: Vec<char> = [
            ProcessState::Ready,
            ProcessState::Executing,
            ProcessState::Blocked,
            ProcessState::Held,
            ProcessState::Done,
        ]
        .iter()
        .map(|s| s.code())
        .collect();
        assert_eq!(codes, vec!['R', 'E', 'B', 'H', 'D']);
    }

    #[test]
    fn test_only_done_is_not_live() {
        assert!(ProcessState::Held.is_live());
        assert!(ProcessState::Blocked.is_live());
        assert!(!ProcessState::Done.is_live());
    }
}
