//! Simulator CLI.
//!
//! A single `run` subcommand: load a flat binary image, execute it to halt
//! or triple fault, and print final register state plus statistics.

use std::process;

use clap::{Parser, Subcommand};

use rvsim_core::common::error::HostError;
use rvsim_core::config::Config;
use rvsim_core::core::Cpu;
use rvsim_core::sim::loader;
use rvsim_core::sim::simulator::Simulator;
use rvsim_core::soc::System;

#[derive(Parser, Debug)]
#[command(name = "rvsim", author, version, about = "32-bit fixed-width ISA simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and run a flat binary image until it halts or triple-faults.
    Run {
        /// Flat binary image, loaded at physical address 0.
        image: String,

        /// RAM size in bytes. Overrides the config file and built-in default.
        #[arg(long)]
        ram_bytes: Option<u32>,

        /// Backing file for the block storage device. Overrides the config
        /// file and built-in default.
        #[arg(long)]
        storage_file: Option<String>,

        /// Config file (TOML or JSON) layered under built-in defaults.
        #[arg(long)]
        config: Option<String>,

        /// Print each retired instruction's address and mnemonic.
        #[arg(long)]
        trace: bool,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            image,
            ram_bytes,
            storage_file,
            config,
            trace,
        } => {
            if let Err(err) = run(&image, ram_bytes, storage_file, config.as_deref(), trace) {
                tracing::error!("{err}");
                process::exit(1);
            }
        }
    }
}

fn run(
    image: &str,
    ram_bytes_override: Option<u32>,
    storage_file_override: Option<String>,
    config_path: Option<&str>,
    trace_override: bool,
) -> Result<(), HostError> {
    let mut config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(ram_bytes) = ram_bytes_override {
        config.system.ram_bytes = ram_bytes;
    }
    if let Some(storage_path) = storage_file_override {
        config.system.storage_path = storage_path;
    }
    let trace = trace_override || config.general.trace;

    let (mut system, interrupts) = System::assemble(config.system.ram_bytes, &config.system.storage_path)?;
    loader::load_image(&mut system, image, config.system.ram_bytes)?;
    tracing::info!(image, ram_bytes = config.system.ram_bytes, "image loaded");

    let cpu = Cpu::new(system, interrupts, trace);
    let simulator = Simulator::new(cpu);
    let exit_code = simulator.run();

    {
        let cpu = simulator.handle();
        let cpu = cpu.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cpu.dump_state();
        cpu.stats.print();
    }

    process::exit(exit_code as i32);
}
