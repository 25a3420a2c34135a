//! Cycle discovery over the trimmed edge set
//!
//! The cuckoo table holds a pseudo-forest: each stored node points one step
//! toward the root of its tree. Every alive edge either joins two trees, in
//! which case the shorter path is reversed and grafted onto the longer, or
//! connects two nodes of the same tree, in which case the two root paths
//! meet and close a cycle. A cycle of exactly the proof size is rescanned
//! against the alive set to recover its edge nonces.
//!
//! # Version History
//! - 0.1.0: Initial port of the path walk and merge from the CPU reference
//! - 0.2.0: Path faults return tagged errors; affected edge is skipped

use super::alive::AliveSet;
use super::map::CuckooMap;
use super::siphash::SipHasher;
use super::{Params, Solution};
use hashbrown::HashSet;
use thiserror::Error;

/// Why a path walk was abandoned.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    /// The walk ran past the design bound without reaching a root.
    #[error("maximum path length exceeded")]
    LengthExceeded,
    /// The walk ran into itself: a cycle shorter than the walk bound that
    /// cannot be a proof.
    #[error("illegal {0}-cycle")]
    IllegalCycle(usize),
}

/// Single-threaded cycle search over the surviving edges.
pub(crate) struct CycleFinder<'a> {
    hasher: &'a SipHasher,
    alive: &'a AliveSet,
    map: CuckooMap<'a>,
    params: &'a Params,
    us: Vec<u64>,
    vs: Vec<u64>,
}

impl<'a> CycleFinder<'a> {
    pub fn new(
        hasher: &'a SipHasher,
        alive: &'a AliveSet,
        map: CuckooMap<'a>,
        params: &'a Params,
    ) -> Self {
        let max_path_len = params.max_path_len();
        Self {
            hasher,
            alive,
            map,
            params,
            us: vec![0; max_path_len],
            vs: vec![0; max_path_len],
        }
    }

    /// Walk parent links from `u` toward its root.
    ///
    /// `buf[0]` already holds the starting endpoint; the walk fills
    /// `buf[1..=n]` and returns `n`, the index of the root.
    fn walk(map: &CuckooMap<'_>, mut u: u64, buf: &mut [u64]) -> Result<usize, PathError> {
        let max_path_len = buf.len();
        let mut n = 0usize;
        while u != 0 {
            n += 1;
            if n >= max_path_len {
                // scan backward: did the walk loop onto itself?
                let mut i = n;
                loop {
                    if i == 0 {
                        return Err(PathError::LengthExceeded);
                    }
                    i -= 1;
                    if buf[i] == u {
                        return Err(PathError::IllegalCycle(max_path_len - i));
                    }
                }
            }
            buf[n] = u;
            u = map.lookup(u);
        }
        Ok(n)
    }

    /// Scan every alive edge, growing the forest and recording proof-size
    /// cycles. Stops recording (but keeps the map consistent) once
    /// `max_sols` solutions are held.
    pub fn search(&mut self, max_sols: usize) -> Vec<Solution> {
        let half_size = self.params.half_size();
        let node_mask = self.params.node_mask();
        let proof_size = self.params.proof_size;
        let mut solutions: Vec<Solution> = Vec::new();

        let mut block = 0;
        while block < half_size {
            let mut word = self.alive.block(block);
            while word != 0 {
                let nonce = block + word.trailing_zeros() as u64;
                word &= word - 1;

                let u0 = self.hasher.endpoint(nonce, 0, node_mask);
                if u0 == 0 {
                    // node 0 is the cuckoo nil, skip the edge entirely
                    continue;
                }
                let v0 = self.hasher.endpoint(nonce, 1, node_mask);
                self.us[0] = u0;
                self.vs[0] = v0;
                let u = self.map.lookup(u0);
                let v = self.map.lookup(v0);

                let nu = match Self::walk(&self.map, u, &mut self.us) {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!("u-path fault at nonce {}: {}", nonce, e);
                        continue;
                    }
                };
                let nv = match Self::walk(&self.map, v, &mut self.vs) {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!("v-path fault at nonce {}: {}", nonce, e);
                        continue;
                    }
                };

                if self.us[nu] == self.vs[nv] {
                    // both paths reach the same root: strip the shared
                    // suffix to measure the cycle
                    let min = nu.min(nv);
                    let (mut iu, mut iv) = (nu - min, nv - min);
                    while self.us[iu] != self.vs[iv] {
                        iu += 1;
                        iv += 1;
                    }
                    let len = iu + iv + 1;
                    tracing::info!(
                        "{}-cycle found at {}%",
                        len,
                        nonce * 100 / half_size
                    );
                    if len == proof_size && solutions.len() < max_sols {
                        if let Some(sol) = self.recover(iu, iv) {
                            solutions.push(sol);
                        }
                    }
                } else if nu < nv {
                    // graft the shorter u-path onto the v-tree
                    for i in (0..nu).rev() {
                        self.map.set(self.us[i + 1], self.us[i]);
                    }
                    self.map.set(u0, v0);
                } else {
                    // ties also invert the v-path
                    for i in (0..nv).rev() {
                        self.map.set(self.vs[i + 1], self.vs[i]);
                    }
                    self.map.set(v0, u0);
                }
            }
            block += AliveSet::BLOCK_BITS;
        }
        solutions
    }

    /// Rescan the alive set for the nonces of a completed cycle.
    ///
    /// The lossy cuckoo table can conflate distinct keys, so a detected
    /// cycle is only trusted when the rescan finds exactly `proof_size`
    /// matching edges; anything else is dropped as spurious.
    fn recover(&self, nu: usize, nv: usize) -> Option<Solution> {
        let node_mask = self.params.node_mask();
        let proof_size = self.params.proof_size;

        let mut cycle: HashSet<(u64, u64)> = HashSet::with_capacity(proof_size);
        cycle.insert((self.us[0], self.vs[0]));
        for i in 0..nu {
            // u endpoints sit at even path indices
            cycle.insert((self.us[(i + 1) & !1], self.us[i | 1]));
        }
        for i in 0..nv {
            // v endpoints sit at even path indices
            cycle.insert((self.vs[i | 1], self.vs[(i + 1) & !1]));
        }

        let mut nonces = Vec::with_capacity(proof_size);
        let mut block = 0;
        while block < self.params.half_size() {
            let mut word = self.alive.block(block);
            while word != 0 {
                let nonce = block + word.trailing_zeros() as u64;
                word &= word - 1;
                let edge = (
                    self.hasher.endpoint(nonce, 0, node_mask),
                    self.hasher.endpoint(nonce, 1, node_mask),
                );
                if cycle.contains(&edge) {
                    nonces.push(nonce);
                    if proof_size > 2 {
                        // drop the pair so a colliding edge cannot match twice
                        cycle.remove(&edge);
                    }
                }
            }
            block += AliveSet::BLOCK_BITS;
        }

        if nonces.len() == proof_size {
            // the sweep runs in nonce order, so the proof is already sorted
            Some(Solution::new(nonces))
        } else {
            tracing::warn!(
                "rescan matched {} of {} cycle edges, dropping spurious cycle",
                nonces.len(),
                proof_size
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

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
    fn test_walk_reaches_root() {
        let p = params();
        let buf = slots(&p);
        let map = CuckooMap::new(&buf, &p);
        // chain 2 -> 4 -> 6, root 6
        map.set(2, 4);
        map.set(4, 6);

        let mut path = vec![0u64; p.max_path_len()];
        path[0] = 2;
        let n = CycleFinder::walk(&map, map.lookup(2), &mut path).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&path[..3], &[2, 4, 6]);
    }

    #[test]
    fn test_walk_detects_loop() {
        let p = params();
        let buf = slots(&p);
        let map = CuckooMap::new(&buf, &p);
        // 2 -> 4 -> 2: a pointer loop, not a valid tree
        map.set(2, 4);
        map.set(4, 2);

        let mut path = vec![0u64; p.max_path_len()];
        path[0] = 2;
        let err = CycleFinder::walk(&map, map.lookup(2), &mut path).unwrap_err();
        assert!(matches!(err, PathError::IllegalCycle(_)));
    }

    #[test]
    fn test_walk_empty_map() {
        let p = params();
        let buf = slots(&p);
        let map = CuckooMap::new(&buf, &p);
        let mut path = vec![0u64; p.max_path_len()];
        path[0] = 2;
        let n = CycleFinder::walk(&map, map.lookup(2), &mut path).unwrap();
        assert_eq!(n, 0);
    }
}
