// src/main.rs - CLI entry point for the ruckoo solver

//! Command-line interface for the ruckoo Cuckoo Cycle solver.
//!
//! Subcommands: `solve` one header, `bench` repeated solves over derived
//! headers, `config` to inspect effective settings and derived sizes.

use chrono::Local;
use clap::{Parser, Subcommand};
use ruckoo::{init, Result, Settings, Solver, Status};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "ruckoo")]
#[command(version)]
#[command(about = "Multi-threaded CPU Cuckoo Cycle proof-of-work solver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one header for proof-size cycles
    Solve {
        /// Header string
        #[arg(short = 'H', long, default_value = "")]
        header: String,
        /// Header as hex bytes (overrides --header)
        #[arg(long)]
        header_hex: Option<String>,
        /// JSON settings file; explicit flags override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// log2 of the graph node space
        #[arg(long)]
        sizeshift: Option<u32>,
        /// Required cycle length
        #[arg(long)]
        proof_size: Option<usize>,
        /// Degree-set partition bits
        #[arg(long)]
        part_bits: Option<u32>,
        /// Trimming rounds
        #[arg(short = 'n', long)]
        ntrims: Option<u32>,
        /// Worker threads
        #[arg(short = 't', long)]
        nthreads: Option<usize>,
        /// Maximum solutions to record
        #[arg(short = 'm', long)]
        max_sols: Option<usize>,
        /// Dump the post-trim alive bitmap to this file as raw
        /// little-endian words
        #[arg(long)]
        dump_bits: Option<PathBuf>,
    },
    /// Run repeated solves over derived headers for throughput measurement
    Bench {
        /// Base header; the iteration index is appended
        #[arg(short = 'H', long, default_value = "bench")]
        header: String,
        /// Number of headers to solve
        #[arg(short, long, default_value = "10")]
        iterations: u64,
        /// log2 of the graph node space
        #[arg(long, default_value = "16")]
        sizeshift: u32,
        /// Required cycle length
        #[arg(long, default_value = "6")]
        proof_size: usize,
        /// Trimming rounds
        #[arg(short = 'n', long)]
        ntrims: Option<u32>,
        /// Worker threads
        #[arg(short = 't', long)]
        nthreads: Option<usize>,
    },
    /// Show the effective configuration and derived sizes
    Config {
        /// JSON settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Solve {
            header,
            header_hex,
            config,
            sizeshift,
            proof_size,
            part_bits,
            ntrims,
            nthreads,
            max_sols,
            dump_bits,
        } => {
            let mut settings = load_settings(config)?;
            if let Some(v) = sizeshift {
                settings.sizeshift = v;
            }
            if let Some(v) = proof_size {
                settings.proof_size = v;
            }
            if let Some(v) = part_bits {
                settings.part_bits = v;
            }
            if let Some(v) = ntrims {
                settings.ntrims = Some(v);
            }
            if let Some(v) = nthreads {
                settings.nthreads = v;
            }
            if let Some(v) = max_sols {
                settings.max_sols = v;
            }
            let header_bytes = match header_hex {
                Some(h) => hex::decode(h.trim_start_matches("0x"))?,
                None => header.into_bytes(),
            };
            run_solve(&header_bytes, &settings, dump_bits)
        }
        Commands::Bench {
            header,
            iterations,
            sizeshift,
            proof_size,
            ntrims,
            nthreads,
        } => {
            let mut settings = Settings {
                sizeshift,
                proof_size,
                ..Settings::default()
            };
            settings.ntrims = ntrims;
            if let Some(v) = nthreads {
                settings.nthreads = v;
            }
            run_bench(&header, iterations, &settings)
        }
        Commands::Config { config } => {
            let settings = load_settings(config)?;
            show_config(&settings)
        }
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => Settings::from_file(&path),
        None => Ok(Settings::default()),
    }
}

fn build_solver(header: &[u8], settings: &Settings) -> Result<Solver> {
    let mut solver = Solver::new(header, settings.params())?;
    solver.set_threads(settings.nthreads)?;
    if let Some(n) = settings.ntrims {
        solver.set_trims(n);
    }
    solver.set_max_sols(settings.max_sols);
    Ok(solver)
}

fn run_solve(header: &[u8], settings: &Settings, dump_bits: Option<PathBuf>) -> Result<()> {
    let mut solver = build_solver(header, settings)?;
    solver.set_dump_bits(dump_bits);

    let ntrims = settings
        .ntrims
        .unwrap_or_else(|| settings.params().default_ntrims());
    let timestamp = Local::now().format("%H:%M:%S").to_string();
    println!(
        "{} Solving 2^{} graph for {}-cycles with {} threads, {} trim rounds",
        timestamp, settings.sizeshift, settings.proof_size, settings.nthreads, ntrims
    );

    let start = Instant::now();
    let result = solver.solve()?;
    let elapsed = start.elapsed();

    let timestamp = Local::now().format("%H:%M:%S").to_string();
    match result.status {
        Status::Overloaded => {
            println!("{} overloaded! exiting...", timestamp);
            return Ok(());
        }
        Status::NoSolution => {
            println!(
                "{} No solution ({} edges alive, {:.2}s)",
                timestamp,
                result.alive_edges,
                elapsed.as_secs_f64()
            );
        }
        Status::Solved => {
            println!(
                "{} Found {} solution(s) ({} edges alive, {:.2}s)",
                timestamp,
                result.solutions.len(),
                result.alive_edges,
                elapsed.as_secs_f64()
            );
        }
    }
    for (i, solution) in result.solutions.iter().enumerate() {
        println!("Solution {}: {}", i + 1, solution);
    }
    Ok(())
}

fn run_bench(header: &str, iterations: u64, settings: &Settings) -> Result<()> {
    let timestamp = Local::now().format("%H:%M:%S").to_string();
    println!(
        "{} Benchmarking {} solves at 2^{}, proof size {}",
        timestamp, iterations, settings.sizeshift, settings.proof_size
    );

    let start = Instant::now();
    let mut total_solutions = 0usize;
    for i in 0..iterations {
        let derived = format!("{}{}", header, i);
        let solver = build_solver(derived.as_bytes(), settings)?;
        let result = solver.solve()?;
        total_solutions += result.solutions.len();

        if (i + 1) % 10 == 0 || i == 0 {
            let timestamp = Local::now().format("%H:%M:%S").to_string();
            println!("{} Completed solve {}/{}", timestamp, i + 1, iterations);
        }
    }
    let elapsed = start.elapsed();

    let timestamp = Local::now().format("%H:%M:%S").to_string();
    println!("{} Benchmark completed:", timestamp);
    println!("{} Total solutions: {}", timestamp, total_solutions);
    println!("{} Time elapsed: {:.2}s", timestamp, elapsed.as_secs_f64());
    println!(
        "{} Rate: {:.2} graphs/s",
        timestamp,
        iterations as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}

fn show_config(settings: &Settings) -> Result<()> {
    let params = settings.params();
    params.validate()?;

    println!("ruckoo configuration:");
    println!("Sizeshift: {} ({} edges)", settings.sizeshift, params.half_size());
    println!("Proof size: {}", settings.proof_size);
    println!("Part bits: {}", settings.part_bits);
    println!(
        "Trim rounds: {}",
        settings.ntrims.unwrap_or_else(|| params.default_ntrims())
    );
    println!("Threads: {}", settings.nthreads);
    println!("Max solutions: {}", settings.max_sols);

    println!("\nDerived sizes:");
    println!("Alive bitmap: {} KiB", params.half_size() / 8 / 1024);
    println!(
        "Degree/cuckoo scratch: {} KiB ({} slots, shared)",
        params.scratch_words() * 8 / 1024,
        params.cuckoo_size()
    );
    println!("Max cuckoo path: {}", params.max_path_len());
    Ok(())
}
