//! Shrinking edge set
//!
//! A bitmap over every edge nonce that starts out full and only loses
//! members. Bits are stored inverted (set = dead) so a zeroed allocation
//! means "everything alive" and a kill is a single relaxed atomic OR.

use std::sync::atomic::{AtomicU64, Ordering};

/// Bit-packed set of alive edge nonces.
pub struct AliveSet {
    bits: Box<[AtomicU64]>,
    half_size: u64,
}

impl AliveSet {
    /// Width of the word returned by [`AliveSet::block`].
    pub const BLOCK_BITS: u64 = 64;

    /// Allocate a set of `half_size` nonces, all alive.
    /// `half_size` must be a multiple of 64.
    pub fn new(half_size: u64) -> Self {
        let nwords = (half_size / Self::BLOCK_BITS) as usize;
        let bits = (0..nwords).map(|_| AtomicU64::new(0)).collect();
        Self { bits, half_size }
    }

    /// Word of alive bits covering the 64-nonce block containing `n`.
    /// Set bits are alive nonces (the stored complement).
    #[inline]
    pub fn block(&self, n: u64) -> u64 {
        !self.bits[(n / Self::BLOCK_BITS) as usize].load(Ordering::Relaxed)
    }

    /// Kill nonce `n`. Monotone and idempotent, so concurrent calls with
    /// relaxed ordering cannot lose an update.
    #[inline]
    pub fn reset(&self, n: u64) {
        self.bits[(n / Self::BLOCK_BITS) as usize]
            .fetch_or(1u64 << (n % Self::BLOCK_BITS), Ordering::Relaxed);
    }

    /// True iff nonce `n` is still alive.
    #[inline]
    pub fn test(&self, n: u64) -> bool {
        self.bits[(n / Self::BLOCK_BITS) as usize].load(Ordering::Relaxed)
            >> (n % Self::BLOCK_BITS)
            & 1
            == 0
    }

    /// Number of alive nonces.
    pub fn count(&self) -> u64 {
        let dead: u64 = self
            .bits
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as u64)
            .sum();
        self.half_size - dead
    }

    /// Raw bitmap words (set bit = dead), for debug dumps and comparisons.
    pub fn words(&self) -> impl Iterator<Item = u64> + '_ {
        self.bits.iter().map(|w| w.load(Ordering::Relaxed))
    }
}
