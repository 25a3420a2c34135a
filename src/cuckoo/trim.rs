//! Leaf-edge trimming kernels
//!
//! One `(side, part)` pass counts the degree of the chosen endpoint of every
//! alive edge, then kills the edges whose endpoint was seen only once; such
//! edges cannot lie on any cycle. Workers sweep disjoint 64-nonce blocks at
//! a fixed stride. The caller provides the barriers that separate the reset,
//! count and kill phases, so both kernels run with relaxed atomics only.

use super::alive::AliveSet;
use super::degree::DegreeSet;
use super::siphash::SipHasher;
use super::Params;

/// Shared state for the trimming workers of one solve run.
pub(crate) struct TrimPass<'a> {
    pub hasher: &'a SipHasher,
    pub alive: &'a AliveSet,
    pub degrees: DegreeSet<'a>,
    pub params: &'a Params,
    pub nthreads: usize,
}

impl TrimPass<'_> {
    /// Count phase: raise the degree counter of every alive edge endpoint
    /// that falls in partition `part` on side `side`.
    pub fn count_node_degrees(&self, id: usize, side: u64, part: u64) {
        let half_size = self.params.half_size();
        let node_mask = self.params.node_mask();
        let part_mask = self.params.part_mask();
        let part_bits = self.params.part_bits;
        let stride = self.nthreads as u64 * AliveSet::BLOCK_BITS;

        let mut block = id as u64 * AliveSet::BLOCK_BITS;
        while block < half_size {
            let mut word = self.alive.block(block);
            while word != 0 {
                let nonce = block + word.trailing_zeros() as u64;
                word &= word - 1;
                let u = self.hasher.node(nonce, side, node_mask);
                if u & part_mask == part {
                    self.degrees.set(u >> part_bits);
                }
            }
            block += stride;
        }
    }

    /// Kill phase: drop every alive edge whose endpoint in this `(side,
    /// part)` pass was seen only once.
    pub fn kill_leaf_edges(&self, id: usize, side: u64, part: u64) {
        let half_size = self.params.half_size();
        let node_mask = self.params.node_mask();
        let part_mask = self.params.part_mask();
        let part_bits = self.params.part_bits;
        let stride = self.nthreads as u64 * AliveSet::BLOCK_BITS;

        let mut block = id as u64 * AliveSet::BLOCK_BITS;
        while block < half_size {
            let mut word = self.alive.block(block);
            while word != 0 {
                let nonce = block + word.trailing_zeros() as u64;
                word &= word - 1;
                let u = self.hasher.node(nonce, side, node_mask);
                if u & part_mask == part && !self.degrees.test(u >> part_bits) {
                    self.alive.reset(nonce);
                }
            }
            block += stride;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    fn setup(p: &Params) -> (SipHasher, AliveSet, Vec<AtomicU64>) {
        let hasher = SipHasher::from_header(b"trim tests");
        let alive = AliveSet::new(p.half_size());
        let scratch = (0..p.scratch_words()).map(|_| AtomicU64::new(0)).collect();
        (hasher, alive, scratch)
    }

    fn run_pass(pass: &TrimPass<'_>, side: u64, part: u64) {
        pass.degrees.reset();
        for id in 0..pass.nthreads {
            pass.count_node_degrees(id, side, part);
        }
        for id in 0..pass.nthreads {
            pass.kill_leaf_edges(id, side, part);
        }
    }

    #[test]
    fn test_kill_only_removes_leaf_edges() {
        let p = Params {
            sizeshift: 12,
            proof_size: 6,
            part_bits: 0,
        };
        let (hasher, alive, scratch) = setup(&p);
        let pass = TrimPass {
            hasher: &hasher,
            alive: &alive,
            degrees: DegreeSet::new(&scratch),
            params: &p,
            nthreads: 1,
        };

        run_pass(&pass, 0, 0);

        // every surviving edge shares its U node with another alive edge
        let mut u_counts = hashbrown::HashMap::new();
        for nonce in 0..p.half_size() {
            if alive.test(nonce) {
                *u_counts
                    .entry(hasher.node(nonce, 0, p.node_mask()))
                    .or_insert(0u32) += 1;
            }
        }
        for (_, count) in u_counts {
            assert!(count >= 2);
        }
    }

    #[test]
    fn test_pass_is_thread_count_independent() {
        let p = Params {
            sizeshift: 12,
            proof_size: 6,
            part_bits: 0,
        };
        let (hasher, alive_a, scratch_a) = setup(&p);
        let (_, alive_b, scratch_b) = setup(&p);

        let pass_a = TrimPass {
            hasher: &hasher,
            alive: &alive_a,
            degrees: DegreeSet::new(&scratch_a),
            params: &p,
            nthreads: 1,
        };
        let pass_b = TrimPass {
            hasher: &hasher,
            alive: &alive_b,
            degrees: DegreeSet::new(&scratch_b),
            params: &p,
            nthreads: 4,
        };

        for side in 0..2 {
            run_pass(&pass_a, side, 0);
            run_pass(&pass_b, side, 0);
        }

        let words_a: Vec<u64> = alive_a.words().collect();
        let words_b: Vec<u64> = alive_b.words().collect();
        assert_eq!(words_a, words_b);
    }

    #[test]
    fn test_partitioned_passes_match_unpartitioned() {
        let p0 = Params {
            sizeshift: 12,
            proof_size: 6,
            part_bits: 0,
        };
        let p1 = Params {
            sizeshift: 12,
            proof_size: 6,
            part_bits: 1,
        };
        let (hasher, alive_a, scratch_a) = setup(&p0);
        let (_, alive_b, scratch_b) = setup(&p1);

        let pass_a = TrimPass {
            hasher: &hasher,
            alive: &alive_a,
            degrees: DegreeSet::new(&scratch_a),
            params: &p0,
            nthreads: 1,
        };
        let pass_b = TrimPass {
            hasher: &hasher,
            alive: &alive_b,
            degrees: DegreeSet::new(&scratch_b),
            params: &p1,
            nthreads: 1,
        };

        // one full round each: the partitioned degree set halves the memory
        // but must kill exactly the same edges
        for side in 0..2 {
            run_pass(&pass_a, side, 0);
        }
        for side in 0..2 {
            for part in 0..=p1.part_mask() {
                run_pass(&pass_b, side, part);
            }
        }

        let words_a: Vec<u64> = alive_a.words().collect();
        let words_b: Vec<u64> = alive_b.words().collect();
        assert_eq!(words_a, words_b);
    }
}
