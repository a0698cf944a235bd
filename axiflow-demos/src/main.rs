mod arbiter;
mod bridge;
mod config;
mod dma;
mod shim;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::SystemConfig;

/// Runs canned bus scenarios on the cycle-level simulator.
#[derive(Parser, Debug)]
#[command(name = "axiflow-demos", version, about, long_about = None)]
struct Args {
    /// System description (bus widths, arbiter, address map)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Raise the log level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    scenario: Scenario,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Scenario {
    /// Two initiators sharing two SRAM targets through the transaction arbiter
    Arbiter,
    /// Bursts through the register-bus bridge into a register file
    Bridge,
    /// A DMA writer run copied back out by the DMA reader
    Dma,
    /// Narrow writes through the write-issue shim
    Shim,
}

fn init_log(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_log(args.verbose);

    let config = match &args.config {
        Some(path) => SystemConfig::load(path)?,
        None => SystemConfig::default(),
    };

    match args.scenario {
        Scenario::Arbiter => arbiter::run(&config),
        Scenario::Bridge => bridge::run(&config),
        Scenario::Dma => dma::run(&config),
        Scenario::Shim => shim::run(&config),
    }
}
