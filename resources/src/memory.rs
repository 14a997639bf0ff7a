//! Main memory models
//!
//! Three mutually exclusive models are supported:
//!
//! - **None**: memory is not simulated, every job fits
//! - **Fixed-block**: `total_blocks` blocks of `block_size` units each; a
//!   process needs `ceil(memsize / block_size)` blocks, not necessarily adjacent
//! - **Variable-size**: a running free remainder of `total_size`, with
//!   `max_size` capping the largest admissible process

use crate::error::ResourceError;
use core_types::ProcessId;
use serde::{Deserialize, Serialize};

/// Memory model selection and geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum MemoryConfig {
    None,
    Fixed { block_size: u64, total_blocks: u32 },
    Variable { max_size: u64, total_size: u64 },
}

impl MemoryConfig {
    /// Checks the geometry is usable
    pub fn validate(&self) -> Result<(), ResourceError> {
        match *self {
            MemoryConfig::None => Ok(()),
            MemoryConfig::Fixed {
                block_size,
                total_blocks,
            } => {
                if block_size == 0 {
                    return Err(ResourceError::InvalidMemoryConfig(
                        "block size must be positive".into(),
                    ));
                }
                if total_blocks == 0 {
                    return Err(ResourceError::InvalidMemoryConfig(
                        "at least one memory block is required".into(),
                    ));
                }
                Ok(())
            }
            MemoryConfig::Variable {
                max_size,
                total_size,
            } => {
                if total_size == 0 {
                    return Err(ResourceError::InvalidMemoryConfig(
                        "total memory size must be positive".into(),
                    ));
                }
                // A process between total_size and max_size could be admitted
                // by the ceiling check and then never fit.
                if max_size > total_size {
                    return Err(ResourceError::InvalidMemoryConfig(format!(
                        "maximum process size {} exceeds total memory {}",
                        max_size, total_size
                    )));
                }
                Ok(())
            }
        }
    }
}

/// State of one fixed-size block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockState {
    Free,
    Used(ProcessId),
}

#[derive(Debug, PartialEq, Eq)]
enum Reserved {
    Unmodeled,
    Blocks(Vec<usize>),
    Units(u64),
}

/// Memory held by one process
///
/// Not `Clone`: a reservation is released exactly once by giving it back.
#[derive(Debug, PartialEq, Eq)]
pub struct Reservation {
    owner: ProcessId,
    reserved: Reserved,
}

impl Reservation {
    /// Process the memory was reserved for
    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    /// Number of fixed blocks held (zero for the other models)
    pub fn block_count(&self) -> usize {
        match &self.reserved {
            Reserved::Blocks(blocks) => blocks.len(),
            _ => 0,
        }
    }

    /// Indices of the fixed blocks held
    pub fn blocks(&self) -> &[usize] {
        match &self.reserved {
            Reserved::Blocks(blocks) => blocks,
            _ => &[],
        }
    }
}

/// Result of a reservation attempt
#[derive(Debug, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved(Reservation),
    /// Not enough memory is free right now; it may be after a release
    InsufficientNow,
}

/// Memory occupancy, for reports and invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryUsage {
    Unmodeled,
    Blocks { used: u32, total: u32, block_size: u64 },
    Units { used: u64, total: u64 },
}

/// Fixed-block memory
#[derive(Debug, Clone)]
pub struct FixedBlockPool {
    block_size: u64,
    blocks: Vec<BlockState>,
}

impl FixedBlockPool {
    /// Creates a pool with every block free
    pub fn new(block_size: u64, total_blocks: u32) -> Self {
        Self {
            block_size,
            blocks: vec![BlockState::Free; total_blocks as usize],
        }
    }

    /// Blocks needed for `memsize` units
    pub fn blocks_for(&self, memsize: u64) -> u64 {
        memsize.div_ceil(self.block_size)
    }

    pub fn total_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn used_blocks(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, BlockState::Used(_)))
            .count()
    }

    /// Per-block state, lowest block first
    pub fn block_states(&self) -> &[BlockState] {
        &self.blocks
    }

    fn can_admit_ever(&self, memsize: u64) -> bool {
        self.blocks_for(memsize) <= self.blocks.len() as u64
    }

    fn try_reserve(&mut self, owner: ProcessId, memsize: u64) -> ReserveOutcome {
        let needed = self.blocks_for(memsize) as usize;
        let free: Vec<usize> = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == BlockState::Free)
            .map(|(index, _)| index)
            .take(needed)
            .collect();

        if free.len() < needed {
            return ReserveOutcome::InsufficientNow;
        }

        for &index in &free {
            self.blocks[index] = BlockState::Used(owner);
        }
        ReserveOutcome::Reserved(Reservation {
            owner,
            reserved: Reserved::Blocks(free),
        })
    }

    fn release(&mut self, owner: ProcessId, blocks: &[usize]) -> Result<(), ResourceError> {
        // Check everything first so a bad release leaves the table untouched
        for &block in blocks {
            match self.blocks.get(block) {
                Some(BlockState::Used(holder)) if *holder == owner => {}
                _ => return Err(ResourceError::BlockNotOwned { block, owner }),
            }
        }
        for &block in blocks {
            self.blocks[block] = BlockState::Free;
        }
        Ok(())
    }
}

/// Variable-size memory
#[derive(Debug, Clone)]
pub struct VariablePool {
    max_size: u64,
    total_size: u64,
    free: u64,
}

impl VariablePool {
    /// Creates a pool with all memory free
    pub fn new(max_size: u64, total_size: u64) -> Self {
        Self {
            max_size,
            total_size,
            free: total_size,
        }
    }

    pub fn used(&self) -> u64 {
        self.total_size - self.free
    }

    fn try_reserve(&mut self, owner: ProcessId, memsize: u64) -> ReserveOutcome {
        match self.free.checked_sub(memsize) {
            Some(remaining) => {
                self.free = remaining;
                ReserveOutcome::Reserved(Reservation {
                    owner,
                    reserved: Reserved::Units(memsize),
                })
            }
            None => ReserveOutcome::InsufficientNow,
        }
    }

    fn release(&mut self, amount: u64) -> Result<(), ResourceError> {
        match self.free.checked_add(amount) {
            Some(free) if free <= self.total_size => {
                self.free = free;
                Ok(())
            }
            _ => Err(ResourceError::ReleaseExceedsCapacity {
                amount,
                free: self.free,
                total: self.total_size,
            }),
        }
    }
}

/// The machine's main memory
#[derive(Debug, Clone)]
pub enum MemoryPool {
    Unmodeled,
    Fixed(FixedBlockPool),
    Variable(VariablePool),
}

impl MemoryPool {
    /// Builds the pool described by `config`
    pub fn new(config: &MemoryConfig) -> Self {
        match *config {
            MemoryConfig::None => MemoryPool::Unmodeled,
            MemoryConfig::Fixed {
                block_size,
                total_blocks,
            } => MemoryPool::Fixed(FixedBlockPool::new(block_size, total_blocks)),
            MemoryConfig::Variable {
                max_size,
                total_size,
            } => MemoryPool::Variable(VariablePool::new(max_size, total_size)),
        }
    }

    /// Whether a process of `memsize` could ever be admitted
    ///
    /// A false answer is permanent: the job can never run on this machine.
    pub fn can_admit_ever(&self, memsize: u64) -> bool {
        match self {
            MemoryPool::Unmodeled => true,
            MemoryPool::Fixed(pool) => pool.can_admit_ever(memsize),
            MemoryPool::Variable(pool) => memsize <= pool.max_size,
        }
    }

    /// Largest memsize this machine can ever admit
    pub fn ceiling(&self) -> Option<u64> {
        match self {
            MemoryPool::Unmodeled => None,
            MemoryPool::Fixed(pool) => Some(pool.block_size * pool.blocks.len() as u64),
            MemoryPool::Variable(pool) => Some(pool.max_size),
        }
    }

    /// Reserves memory for `owner` if enough is free right now
    pub fn try_reserve(&mut self, owner: ProcessId, memsize: u64) -> ReserveOutcome {
        match self {
            MemoryPool::Unmodeled => ReserveOutcome::Reserved(Reservation {
                owner,
                reserved: Reserved::Unmodeled,
            }),
            MemoryPool::Fixed(pool) => pool.try_reserve(owner, memsize),
            MemoryPool::Variable(pool) => pool.try_reserve(owner, memsize),
        }
    }

    /// Returns a reservation to the pool
    pub fn release(&mut self, reservation: Reservation) -> Result<(), ResourceError> {
        let owner = reservation.owner;
        match (self, reservation.reserved) {
            (MemoryPool::Unmodeled, Reserved::Unmodeled) => Ok(()),
            (MemoryPool::Fixed(pool), Reserved::Blocks(blocks)) => pool.release(owner, &blocks),
            (MemoryPool::Variable(pool), Reserved::Units(amount)) => pool.release(amount),
            _ => Err(ResourceError::ReservationModelMismatch { owner }),
        }
    }

    /// Blocks a process of `memsize` occupies (fixed model only)
    pub fn blocks_for(&self, memsize: u64) -> Option<u64> {
        match self {
            MemoryPool::Fixed(pool) => Some(pool.blocks_for(memsize)),
            _ => None,
        }
    }

    /// Current occupancy
    pub fn usage(&self) -> MemoryUsage {
        match self {
            MemoryPool::Unmodeled => MemoryUsage::Unmodeled,
            MemoryPool::Fixed(pool) => MemoryUsage::Blocks {
                used: pool.used_blocks() as u32,
                total: pool.total_blocks() as u32,
                block_size: pool.block_size,
            },
            MemoryPool::Variable(pool) => MemoryUsage::Units {
                used: pool.used(),
                total: pool.total_size,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: u32) -> ProcessId {
        ProcessId::new(raw).unwrap()
    }

    fn reserved(outcome: ReserveOutcome) -> Reservation {
        match outcome {
            ReserveOutcome::Reserved(r) => r,
            ReserveOutcome::InsufficientNow => panic!("expected a reservation"),
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(MemoryConfig::None.validate().is_ok());
        assert!(MemoryConfig::Fixed {
            block_size: 0,
            total_blocks: 4
        }
        .validate()
        .is_err());
        assert!(MemoryConfig::Fixed {
            block_size: 10,
            total_blocks: 0
        }
        .validate()
        .is_err());
        assert!(MemoryConfig::Variable {
            max_size: 200,
            total_size: 100
        }
        .validate()
        .is_err());
        assert!(MemoryConfig::Variable {
            max_size: 100,
            total_size: 100
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_fixed_blocks_round_up() {
        let pool = FixedBlockPool::new(10, 4);
        assert_eq!(pool.blocks_for(0), 0);
        assert_eq!(pool.blocks_for(1), 1);
        assert_eq!(pool.blocks_for(10), 1);
        assert_eq!(pool.blocks_for(11), 2);
    }

    #[test]
    fn test_fixed_can_admit_ever() {
        let pool = MemoryPool::new(&MemoryConfig::Fixed {
            block_size: 10,
            total_blocks: 4,
        });
        assert!(pool.can_admit_ever(40));
        assert!(!pool.can_admit_ever(41));
        assert_eq!(pool.ceiling(), Some(40));
    }

    #[test]
    fn test_fixed_reserve_and_release() {
        let mut pool = MemoryPool::new(&MemoryConfig::Fixed {
            block_size: 10,
            total_blocks: 4,
        });

        let a = reserved(pool.try_reserve(pid(1), 25));
        assert_eq!(a.blocks(), &[0, 1, 2]);
        assert_eq!(
            pool.usage(),
            MemoryUsage::Blocks {
                used: 3,
                total: 4,
                block_size: 10
            }
        );

        // Only one block left
        assert_eq!(pool.try_reserve(pid(2), 15), ReserveOutcome::InsufficientNow);
        let b = reserved(pool.try_reserve(pid(2), 5));
        assert_eq!(b.blocks(), &[3]);

        pool.release(a).unwrap();
        let c = reserved(pool.try_reserve(pid(3), 20));
        assert_eq!(c.blocks(), &[0, 1]);
    }

    #[test]
    fn test_fixed_blocks_need_not_be_contiguous() {
        let mut pool = MemoryPool::new(&MemoryConfig::Fixed {
            block_size: 1,
            total_blocks: 4,
        });
        let a = reserved(pool.try_reserve(pid(1), 1));
        let _b = reserved(pool.try_reserve(pid(2), 1));
        let c = reserved(pool.try_reserve(pid(3), 1));
        pool.release(a).unwrap();
        pool.release(c).unwrap();

        let d = reserved(pool.try_reserve(pid(4), 3));
        assert_eq!(d.blocks(), &[0, 2, 3]);
    }

    #[test]
    fn test_fixed_release_of_foreign_blocks_fails() {
        let mut pool = FixedBlockPool::new(10, 2);
        let result = pool.release(pid(9), &[0]);
        assert_eq!(
            result,
            Err(ResourceError::BlockNotOwned {
                block: 0,
                owner: pid(9)
            })
        );
    }

    #[test]
    fn test_variable_reserve_and_release() {
        let mut pool = MemoryPool::new(&MemoryConfig::Variable {
            max_size: 60,
            total_size: 100,
        });
        assert!(pool.can_admit_ever(60));
        assert!(!pool.can_admit_ever(61));

        let a = reserved(pool.try_reserve(pid(1), 60));
        assert_eq!(pool.try_reserve(pid(2), 50), ReserveOutcome::InsufficientNow);
        let b = reserved(pool.try_reserve(pid(2), 40));
        assert_eq!(pool.usage(), MemoryUsage::Units { used: 100, total: 100 });

        pool.release(a).unwrap();
        pool.release(b).unwrap();
        assert_eq!(pool.usage(), MemoryUsage::Units { used: 0, total: 100 });
    }

    #[test]
    fn test_unmodeled_memory_admits_everything() {
        let mut pool = MemoryPool::new(&MemoryConfig::None);
        assert!(pool.can_admit_ever(u64::MAX));
        assert_eq!(pool.ceiling(), None);
        let r = reserved(pool.try_reserve(pid(1), 1 << 40));
        assert_eq!(r.block_count(), 0);
        pool.release(r).unwrap();
    }

    #[test]
    fn test_release_into_wrong_model_fails() {
        let mut unmodeled = MemoryPool::new(&MemoryConfig::None);
        let r = reserved(unmodeled.try_reserve(pid(1), 5));

        let mut fixed = MemoryPool::new(&MemoryConfig::Fixed {
            block_size: 1,
            total_blocks: 1,
        });
        assert_eq!(
            fixed.release(r),
            Err(ResourceError::ReservationModelMismatch { owner: pid(1) })
        );
    }

    #[test]
    fn test_memory_config_json_shape() {
        let config: MemoryConfig =
            serde_json::from_str(r#"{"model": "fixed", "block_size": 1000, "total_blocks": 32}"#)
                .unwrap();
        assert_eq!(
            config,
            MemoryConfig::Fixed {
                block_size: 1000,
                total_blocks: 32
            }
        );
        let none: MemoryConfig = serde_json::from_str(r#"{"model": "none"}"#).unwrap();
        assert_eq!(none, MemoryConfig::None);
    }
}
