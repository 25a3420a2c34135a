// src/config/settings.rs - solver run configuration

use crate::cuckoo::{Params, DEFAULT_PROOF_SIZE, DEFAULT_SIZESHIFT};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Main configuration settings for the solver
pub struct Settings {
    /// log2 of the graph node space
    pub sizeshift: u32,
    /// Required cycle length
    pub proof_size: usize,
    /// Degree-set partition bits
    pub part_bits: u32,
    /// Trimming rounds; `None` picks the density-based default
    pub ntrims: Option<u32>,
    /// Worker thread count
    pub nthreads: usize,
    /// Maximum solutions recorded per run
    pub max_sols: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sizeshift: DEFAULT_SIZESHIFT,
            proof_size: DEFAULT_PROOF_SIZE,
            part_bits: 0,
            ntrims: None,
            nthreads: num_cpus::get(),
            max_sols: 8,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Graph parameters described by these settings.
    pub fn params(&self) -> Params {
        Params {
            sizeshift: self.sizeshift,
            proof_size: self.proof_size,
            part_bits: self.part_bits,
        }
    }
}
