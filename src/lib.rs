// src/lib.rs - Main library file for the ruckoo Cuckoo Cycle solver

//! ruckoo - Multi-threaded CPU Cuckoo Cycle solver
//!
//! Finds fixed-length cycles in a very large implicit bipartite graph whose
//! edges are generated by a keyed SipHash of an edge nonce. The dominant
//! cost is random access over large shared bitmaps, which is the point:
//! Cuckoo Cycle is a memory-hard proof-of-work.
//!
//! The pipeline is repeated leaf-edge trimming over a shared alive bitmap,
//! followed by cuckoo-hash path merging over the surviving edges and a
//! rescan that recovers the proof nonces.
//!
//! # Version History
//! - 0.1.0: Single-threaded trim and cycle walk
//! - 0.2.0: Data-parallel trimming workers, degree/cuckoo buffer sharing,
//!   partitioned degree passes, JSON settings

#![warn(missing_docs)]

/// Configuration module for solver settings
pub mod config;
/// Edge trimming and cycle finding core
pub mod cuckoo;

// Re-export main types for convenience
pub use config::Settings;
pub use cuckoo::{Params, Solution, Solver, SolveResult, Status};

use thiserror::Error;

/// Main error type for ruckoo
#[derive(Error, Debug)]
pub enum RuckooError {
    /// Solver errors
    #[error("solver error: {0}")]
    Cuckoo(#[from] cuckoo::CuckooError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO operation errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Hex decode errors for binary headers
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Result type alias for ruckoo operations
pub type Result<T> = std::result::Result<T, RuckooError>;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("{} v{} starting", NAME, VERSION);
    Ok(())
}
