// src/cuckoo/mod.rs - Cuckoo Cycle solver core

//! Cuckoo Cycle solver core
//!
//! Finds fixed-length cycles in a very large implicit bipartite graph whose
//! edges are generated by a keyed SipHash of an edge nonce. The pipeline is
//! edge trimming (repeated leaf-edge removal over a shared bitmap, the
//! memory-hard part) followed by cuckoo-hash path merging over the few
//! surviving edges.
//!
//! # Version History
//! - 0.1.0: Single-threaded trim and cycle walk
//! - 0.2.0: Data-parallel trimming workers, partitioned degree passes,
//!   degree/cuckoo scratch buffer sharing

pub mod alive;
pub mod degree;
pub mod finder;
pub mod map;
pub mod siphash;
mod trim;

pub use alive::AliveSet;
pub use degree::DegreeSet;
pub use finder::PathError;
pub use map::CuckooMap;
pub use siphash::SipHasher;

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;
use std::thread;
use thiserror::Error;

/// Canonical graph size exponent
pub const DEFAULT_SIZESHIFT: u32 = 20;
/// Canonical proof length
pub const DEFAULT_PROOF_SIZE: usize = 42;
/// Post-trim load (percent of cuckoo capacity) above which the search
/// is abandoned
pub const OVERLOAD_PERCENT: u64 = 90;

/// Errors from solver construction and execution
#[derive(Error, Debug)]
pub enum CuckooError {
    /// Rejected construction parameters
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Debug bitmap dump failed
    #[error("bitmap dump failed: {0}")]
    Dump(#[from] std::io::Error),
}

/// Graph size and table geometry, fixed for the lifetime of a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    /// log2 of the node space; the graph has `2^(sizeshift-1)` edges
    pub sizeshift: u32,
    /// Required cycle length
    pub proof_size: usize,
    /// Degree-counter partition bits; `2^part_bits` passes per side trade
    /// trimming speed for a smaller scratch buffer
    pub part_bits: u32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            sizeshift: DEFAULT_SIZESHIFT,
            proof_size: DEFAULT_PROOF_SIZE,
            part_bits: 0,
        }
    }
}

impl Params {
    /// Validate and build.
    pub fn new(sizeshift: u32, proof_size: usize, part_bits: u32) -> Result<Self, CuckooError> {
        let params = Self {
            sizeshift,
            proof_size,
            part_bits,
        };
        params.validate()?;
        Ok(params)
    }

    /// Reject geometries the solver cannot run.
    pub fn validate(&self) -> Result<(), CuckooError> {
        if !(12..=32).contains(&self.sizeshift) {
            return Err(CuckooError::Config(format!(
                "sizeshift {} out of range 12..=32",
                self.sizeshift
            )));
        }
        if self.proof_size < 2 || self.proof_size % 2 != 0 {
            return Err(CuckooError::Config(format!(
                "proof size {} must be even and at least 2 (cycles in a bipartite graph have even length)",
                self.proof_size
            )));
        }
        if self.part_bits + 6 > self.sizeshift {
            return Err(CuckooError::Config(format!(
                "part_bits {} too large for sizeshift {}",
                self.part_bits, self.sizeshift
            )));
        }
        Ok(())
    }

    /// Total node space, `2^sizeshift`.
    #[inline]
    pub fn size(&self) -> u64 {
        1u64 << self.sizeshift
    }

    /// Edge count and per-side node count, `2^(sizeshift-1)`.
    #[inline]
    pub fn half_size(&self) -> u64 {
        self.size() >> 1
    }

    /// Mask for raw node ids.
    #[inline]
    pub fn node_mask(&self) -> u64 {
        self.half_size() - 1
    }

    /// Mask selecting the degree partition of a node.
    #[inline]
    pub fn part_mask(&self) -> u64 {
        (1u64 << self.part_bits) - 1
    }

    /// Nodes tracked per degree pass.
    #[inline]
    pub fn once_bits(&self) -> u64 {
        self.half_size() >> self.part_bits
    }

    /// Cuckoo table index shift; chosen so the table and the degree
    /// counters occupy the same number of words.
    #[inline]
    pub fn idx_shift(&self) -> u32 {
        self.part_bits + 6
    }

    /// Cuckoo table slot count.
    #[inline]
    pub fn cuckoo_size(&self) -> u64 {
        self.size() >> self.idx_shift()
    }

    /// Key bits that survive the left shift by `sizeshift` when packing a
    /// cuckoo entry.
    #[inline]
    pub fn key_bits(&self) -> u32 {
        64 - self.sizeshift
    }

    /// Mask of the surviving key bits.
    #[inline]
    pub fn key_mask(&self) -> u64 {
        (1u64 << self.key_bits()) - 1
    }

    /// Design bound on cuckoo probe distance.
    #[inline]
    pub fn max_drift(&self) -> u64 {
        1u64 << (self.key_bits() - self.idx_shift())
    }

    /// Bound on cuckoo path length; grows with the cube root of the graph.
    #[inline]
    pub fn max_path_len(&self) -> usize {
        8usize << (self.sizeshift / 3)
    }

    /// Shared scratch buffer size in u64 words. The degree counters
    /// (2 bits per node) and the cuckoo table (one slot per `2^idx_shift`
    /// nodes) both need exactly this much.
    #[inline]
    pub fn scratch_words(&self) -> usize {
        DegreeSet::words_for(self.once_bits())
    }

    /// Trimming rounds needed to reach workable density, as a function of
    /// the partition count.
    #[inline]
    pub fn default_ntrims(&self) -> u32 {
        1 + (self.part_bits + 3) * (self.part_bits + 4) / 2
    }
}

/// A proof: the ascending edge nonces of one proof-size cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Edge nonces, strictly ascending
    pub nonces: Vec<u64>,
}

impl Solution {
    /// Wrap a recovered nonce list.
    pub fn new(nonces: Vec<u64>) -> Self {
        Self { nonces }
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, nonce) in self.nonces.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:x}", nonce)?;
        }
        Ok(())
    }
}

/// Terminal status of a solve run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Search completed and found at least one proof-size cycle
    Solved,
    /// Search completed without finding a proof-size cycle
    NoSolution,
    /// Post-trim edge density too high for the cuckoo table; search skipped
    Overloaded,
}

/// Outcome of one solve run
#[derive(Debug)]
pub struct SolveResult {
    /// Terminal status
    pub status: Status,
    /// Recovered proofs, at most `max_sols`
    pub solutions: Vec<Solution>,
    /// Alive edges after trimming
    pub alive_edges: u64,
}

/// Solver context: derived key plus run parameters.
pub struct Solver {
    hasher: SipHasher,
    params: Params,
    nthreads: usize,
    ntrims: u32,
    max_sols: usize,
    dump_bits: Option<PathBuf>,
}

impl Solver {
    /// Build a solver for `header` with default thread count, trim rounds
    /// and solution cap.
    pub fn new(header: &[u8], params: Params) -> Result<Self, CuckooError> {
        params.validate()?;
        Ok(Self {
            hasher: SipHasher::from_header(header),
            params,
            nthreads: num_cpus::get(),
            ntrims: params.default_ntrims(),
            max_sols: 8,
            dump_bits: None,
        })
    }

    /// Set the trimming worker count.
    pub fn set_threads(&mut self, nthreads: usize) -> Result<(), CuckooError> {
        if nthreads == 0 {
            return Err(CuckooError::Config("thread count must be positive".into()));
        }
        self.nthreads = nthreads;
        Ok(())
    }

    /// Set the number of trimming rounds. Zero disables trimming, which
    /// leaves the graph overloaded at any practical geometry.
    pub fn set_trims(&mut self, ntrims: u32) {
        self.ntrims = ntrims;
    }

    /// Cap the number of recorded solutions.
    pub fn set_max_sols(&mut self, max_sols: usize) {
        self.max_sols = max_sols;
    }

    /// Dump the post-trim alive bitmap to `path` as raw little-endian words.
    pub fn set_dump_bits(&mut self, path: Option<PathBuf>) {
        self.dump_bits = path;
    }

    /// Graph parameters of this solver.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Run the full trim-then-search pipeline.
    pub fn solve(&self) -> Result<SolveResult, CuckooError> {
        let p = &self.params;
        let alive = AliveSet::new(p.half_size());
        let scratch: Box<[AtomicU64]> =
            (0..p.scratch_words()).map(|_| AtomicU64::new(0)).collect();

        tracing::info!(
            sizeshift = p.sizeshift,
            proof_size = p.proof_size,
            threads = self.nthreads,
            trims = self.ntrims,
            "starting solve, initial load {}%",
            100 * p.half_size() / p.cuckoo_size()
        );

        self.trim(&alive, &scratch);

        let alive_edges = alive.count();
        let load = 100 * alive_edges / p.cuckoo_size();
        tracing::info!("trim complete: {} edges alive, load {}%", alive_edges, load);

        if let Some(path) = &self.dump_bits {
            self.dump_alive(&alive, path)?;
        }

        if load >= OVERLOAD_PERCENT {
            return Ok(SolveResult {
                status: Status::Overloaded,
                solutions: Vec::new(),
                alive_edges,
            });
        }

        // the degree counters are done with the scratch buffer; zero it and
        // hand it to the cuckoo table
        for word in scratch.iter() {
            word.store(0, Ordering::Relaxed);
        }
        let map = CuckooMap::new(&scratch, p);
        let mut finder = finder::CycleFinder::new(&self.hasher, &alive, map, p);
        let solutions = finder.search(self.max_sols);

        let status = if solutions.is_empty() {
            Status::NoSolution
        } else {
            Status::Solved
        };
        Ok(SolveResult {
            status,
            solutions,
            alive_edges,
        })
    }

    /// Run `ntrims` rounds of alternating U/V leaf-edge removal over all
    /// partitions, with a barrier between every phase.
    fn trim(&self, alive: &AliveSet, scratch: &[AtomicU64]) {
        let p = &self.params;
        let pass = trim::TrimPass {
            hasher: &self.hasher,
            alive,
            degrees: DegreeSet::new(scratch),
            params: p,
            nthreads: self.nthreads,
        };
        let barrier = Barrier::new(self.nthreads);
        let ntrims = self.ntrims;
        let part_mask = p.part_mask();
        let cuckoo_size = p.cuckoo_size();

        thread::scope(|scope| {
            for id in 0..self.nthreads {
                let pass = &pass;
                let barrier = &barrier;
                scope.spawn(move || {
                    for round in 1..=ntrims {
                        for side in 0..2u64 {
                            for part in 0..=part_mask {
                                if id == 0 {
                                    pass.degrees.reset();
                                }
                                barrier.wait();
                                pass.count_node_degrees(id, side, part);
                                barrier.wait();
                                pass.kill_leaf_edges(id, side, part);
                                barrier.wait();
                                if id == 0 {
                                    tracing::debug!(
                                        "round {} side {} part {} load {}%",
                                        round,
                                        ["U", "V"][side as usize],
                                        part,
                                        100 * pass.alive.count() / cuckoo_size
                                    );
                                }
                            }
                        }
                    }
                });
            }
        });
    }

    fn dump_alive(&self, alive: &AliveSet, path: &PathBuf) -> Result<(), CuckooError> {
        let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
        for word in alive.words() {
            out.write_u64::<LittleEndian>(word)?;
        }
        out.flush()?;
        Ok(())
    }
}
