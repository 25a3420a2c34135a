//! Open-addressed node-to-node table for path building
//!
//! Maps a side-tagged node to its companion along a stored edge. Keys are
//! compressed: a slot packs the key's surviving high bits above the
//! `sizeshift`-bit value, so distinct keys can occasionally be conflated.
//! The resulting spurious cycles are filtered out downstream by the solution
//! rescan. Slot value 0 means empty, which reserves node 0 as nil.
//!
//! The table borrows the same scratch buffer the degree counters used during
//! trimming; geometry is chosen so the two sizes coincide.

use super::Params;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lossy open-addressed map from node to companion node.
pub struct CuckooMap<'a> {
    slots: &'a [AtomicU64],
    sizeshift: u32,
    idx_shift: u32,
    cuckoo_mask: u64,
    key_mask: u64,
    max_drift: u64,
    size_mask: u64,
}

impl<'a> CuckooMap<'a> {
    /// View `slots` as an empty table. The caller zeroes the buffer first.
    pub fn new(slots: &'a [AtomicU64], params: &Params) -> Self {
        debug_assert_eq!(slots.len() as u64, params.cuckoo_size());
        Self {
            slots,
            sizeshift: params.sizeshift,
            idx_shift: params.idx_shift(),
            cuckoo_mask: params.cuckoo_size() - 1,
            key_mask: params.key_mask(),
            max_drift: params.max_drift(),
            size_mask: params.size() - 1,
        }
    }

    /// Insert or overwrite the companion of node `u`.
    ///
    /// Probes linearly from `u >> idx_shift`. An empty slot is claimed by
    /// CAS; a slot whose stored key matches is overwritten in place. Races
    /// between writers of the same logical key are accepted: the last write
    /// wins and either value is a valid successor for path building.
    pub fn set(&self, u: u64, v: u64) {
        let entry = (u << self.sizeshift) | v;
        let mut ui = u >> self.idx_shift;
        loop {
            let slot = &self.slots[ui as usize];
            match slot.compare_exchange(0, entry, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(old) => {
                    if old >> self.sizeshift == u & self.key_mask {
                        slot.store(entry, Ordering::Relaxed);
                        return;
                    }
                }
            }
            ui = (ui + 1) & self.cuckoo_mask;
        }
    }

    /// Companion of node `u`, or 0 if no entry matches.
    ///
    /// Probe distances beyond the design drift bound indicate a pathological
    /// key and are logged as a warning rather than treated as fatal.
    pub fn lookup(&self, u: u64) -> u64 {
        let start = u >> self.idx_shift;
        let mut ui = start;
        loop {
            let entry = self.slots[ui as usize].load(Ordering::Relaxed);
            if entry == 0 {
                return 0;
            }
            if entry >> self.sizeshift == u & self.key_mask {
                let drift = ui.wrapping_sub(start) & self.cuckoo_mask;
                if drift >= self.max_drift {
                    tracing::warn!("cuckoo probe drift {} for node {:#x}", drift, u);
                }
                return entry & self.size_mask;
            }
            ui = (ui + 1) & self.cuckoo_mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        Params {
            sizeshift: 12,
            proof_size: 6,
            part_bits: 0,
        }
    }

    fn slots(p: &Params) -> Vec<AtomicU64> {
        (0..p.cuckoo_size()).map(|_| AtomicU64::new(0)).collect()
    }

    #[test]
    fn test_lookup_empty() {
        let p = params();
        let buf = slots(&p);
        let map = CuckooMap::new(&buf, &p);
        assert_eq!(map.lookup(1), 0);
        assert_eq!(map.lookup(4095), 0);
    }

    #[test]
    fn test_set_then_lookup() {
        let p = params();
        let buf = slots(&p);
        let map = CuckooMap::new(&buf, &p);
        map.set(100, 2001);
        map.set(3000, 7);
        assert_eq!(map.lookup(100), 2001);
        assert_eq!(map.lookup(3000), 7);
        assert_eq!(map.lookup(101), 0);
    }

    #[test]
    fn test_overwrite_same_key() {
        let p = params();
        let buf = slots(&p);
        let map = CuckooMap::new(&buf, &p);
        map.set(100, 2001);
        map.set(100, 2002);
        assert_eq!(map.lookup(100), 2002);
    }

    #[test]
    fn test_colliding_slots_probe_forward() {
        let p = params();
        let buf = slots(&p);
        let map = CuckooMap::new(&buf, &p);
        // idx_shift is 6, so 64 and 65 both start probing at slot 1
        map.set(64, 11);
        map.set(65, 22);
        map.set(66, 33);
        assert_eq!(map.lookup(64), 11);
        assert_eq!(map.lookup(65), 22);
        assert_eq!(map.lookup(66), 33);
        // overwrite still finds the probed entry
        map.set(65, 44);
        assert_eq!(map.lookup(65), 44);
    }

    #[test]
    fn test_most_recent_value_wins() {
        let p = params();
        let buf = slots(&p);
        let map = CuckooMap::new(&buf, &p);
        for v in 1..10u64 {
            map.set(500, v);
        }
        assert_eq!(map.lookup(500), 9);
    }
}
