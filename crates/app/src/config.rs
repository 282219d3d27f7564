//! Configuration for the busframe application.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including randomized link impairments that are reproducible with a seed).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments: it falls back to a built-in demo
//! record and a randomized link. The resolved configuration can be printed so
//! any run can be repeated exactly.

use busframe_core::network::NetworkConfig;
use busframe_core::{Error, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "busframe")]
#[command(version)]
#[command(about = "Plan, emit and exercise fixed-width record frames")]
#[command(
    long_about = "Flattens a nested record into a fixed binary frame layout, optionally emits \
Rust pack/unpack sources for it, then sends sample frames through a simulated lossy datagram \
link and verifies every frame the decoder accepts.\n\n\
EXAMPLES:\n  \
  busframe                                  # Demo record, random link\n  \
  busframe --seed 42                        # Deterministic run\n  \
  busframe --record telemetry.json --print-layout\n  \
  busframe --emit generated/ --name Telemetry\n  \
  busframe --loss 0 --truncate 0 --latency 0  # Perfect link"
)]
pub struct Args {
    /// Record document (JSON); the built-in demo record is used if omitted
    #[arg(short, long, value_name = "PATH")]
    pub record: Option<PathBuf>,

    /// Random seed for link impairments and sample records
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of sample frames to send
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub frames: u64,

    /// Base link latency in ms (default: random 0-5)
    #[arg(long, value_name = "MS")]
    pub latency: Option<u64>,

    /// Latency jitter in ms (default: random 0-3)
    #[arg(long, value_name = "MS")]
    pub jitter: Option<u64>,

    /// Datagram loss rate 0.0-1.0 (default: random 0-0.05)
    #[arg(long, value_name = "RATE")]
    pub loss: Option<f64>,

    /// Datagram truncation rate 0.0-1.0 (default: random 0-0.05)
    #[arg(long, value_name = "RATE")]
    pub truncate: Option<f64>,

    /// Print the frame layout table
    #[arg(long)]
    pub print_layout: bool,

    /// Write the frame layout as JSON
    #[arg(long, value_name = "PATH")]
    pub layout_out: Option<PathBuf>,

    /// Emit Rust definition, packer and unpacker sources into this directory
    #[arg(long, value_name = "DIR")]
    pub emit: Option<PathBuf>,

    /// Type name for emitted sources
    #[arg(long, default_value = "Frame")]
    pub name: String,

    /// Print resolved configuration
    #[arg(long)]
    pub print_config: bool,

    /// Don't print metrics summary
    #[arg(long)]
    pub no_metrics: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Input ===
    /// Record document (None = built-in demo)
    pub record: Option<PathBuf>,

    // === Outputs ===
    pub print_layout: bool,
    pub layout_out: Option<PathBuf>,
    pub emit_dir: Option<PathBuf>,
    pub type_name: String,

    // === Run ===
    pub frames: u64,

    /// Seed for sample records (the link uses `network.seed`)
    pub seed: u64,

    pub network: NetworkConfig,

    // === Behavior ===
    pub print_config: bool,
    pub print_metrics: bool,
}

impl Config {
    /// Resolve arguments into a configuration.
    ///
    /// Unspecified link parameters are drawn from a ChaCha8 RNG seeded with
    /// `--seed`, or with the clock if no seed was given.
    ///
    /// # Errors
    /// `Error::Config` if a rate lies outside 0.0-1.0.
    pub fn from_args(args: Args) -> Result<Self> {
        for (flag, rate) in [("--loss", args.loss), ("--truncate", args.truncate)] {
            if let Some(rate) = rate {
                if !(0.0..=1.0).contains(&rate) {
                    return Err(Error::Config(format!("{} must be within 0.0-1.0, got {}", flag, rate)));
                }
            }
        }

        let seed = args.seed.unwrap_or_else(clock_seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let network = NetworkConfig {
            base_latency_ms: args.latency.unwrap_or_else(|| rng.gen_range(0..=5)),
            jitter_ms: args.jitter.unwrap_or_else(|| rng.gen_range(0..=3)),
            loss_rate: args.loss.unwrap_or_else(|| small_rate(&mut rng)),
            truncate_rate: args.truncate.unwrap_or_else(|| small_rate(&mut rng)),
            seed,
        };

        Ok(Config {
            record: args.record,
            print_layout: args.print_layout,
            layout_out: args.layout_out,
            emit_dir: args.emit,
            type_name: args.name,
            frames: args.frames,
            seed,
            network,
            print_config: args.print_config,
            print_metrics: !args.no_metrics,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.record {
            Some(path) => println!("Record: {}", path.display()),
            None => println!("Record: (built-in demo)"),
        }
        println!("Frames: {}", self.frames);
        if let Some(dir) = &self.emit_dir {
            println!("Emit: {} as {}", dir.display(), self.type_name);
        }
        if let Some(path) = &self.layout_out {
            println!("Layout JSON: {}", path.display());
        }
        println!();
        println!("=== Link Simulation ===");
        println!("Seed: {}", self.seed);
        println!("Base latency: {} ms", self.network.base_latency_ms);
        println!("Jitter: ±{} ms", self.network.jitter_ms);
        println!("Loss rate: {:.2}%", self.network.loss_rate * 100.0);
        println!("Truncation rate: {:.2}%", self.network.truncate_rate * 100.0);
        println!();
    }
}

// 0-5%, biased toward 0
fn small_rate(rng: &mut ChaCha8Rng) -> f64 {
    let r: f64 = rng.gen();
    (r * r * 0.05).min(0.05)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
