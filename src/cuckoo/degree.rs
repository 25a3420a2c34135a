//! Node degree tracking for one trimming pass
//!
//! Two bits per node of the current partition: `00` unseen, `01` seen once,
//! `11` seen twice or more. Transitions only go up, so concurrent `set`
//! calls with relaxed ordering cannot lose the saturated state. The counters
//! live in a scratch buffer borrowed from the solver, which reuses the same
//! allocation for the cuckoo table after trimming.

use std::sync::atomic::{AtomicU64, Ordering};

const NODES_PER_WORD: u64 = 32;

/// Saturating 2-bit-per-node degree counters over a borrowed word buffer.
#[derive(Clone, Copy)]
pub struct DegreeSet<'a> {
    bits: &'a [AtomicU64],
}

impl<'a> DegreeSet<'a> {
    /// Words required to track `once_bits` nodes.
    pub fn words_for(once_bits: u64) -> usize {
        (once_bits / NODES_PER_WORD) as usize
    }

    /// View `bits` as degree counters. The caller zeroes between passes.
    pub fn new(bits: &'a [AtomicU64]) -> Self {
        Self { bits }
    }

    /// Zero every counter. Callers serialize this against the sweep phases.
    pub fn reset(&self) {
        for w in self.bits {
            w.store(0, Ordering::Relaxed);
        }
    }

    /// Bump the counter for node `u`, saturating at two.
    #[inline]
    pub fn set(&self, u: u64) {
        let idx = (u / NODES_PER_WORD) as usize;
        let bit = 1u64 << (2 * (u % NODES_PER_WORD));
        let old = self.bits[idx].fetch_or(bit, Ordering::Relaxed);
        if old & bit != 0 {
            // second or later observation: saturate
            self.bits[idx].fetch_or(bit << 1, Ordering::Relaxed);
        }
    }

    /// True iff node `u` has been seen at least twice.
    #[inline]
    pub fn test(&self, u: u64) -> bool {
        let idx = (u / NODES_PER_WORD) as usize;
        self.bits[idx].load(Ordering::Relaxed) >> (2 * (u % NODES_PER_WORD)) & 2 != 0
    }
}
