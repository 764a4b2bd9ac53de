//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective runaway/stall knobs of the current run (for JSON details).
pub static LAST_RUN: OnceLock<RunContext> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct RunContext {
    pub target_c: u32,
    pub tick_ms: u64,
    pub runaway_threshold_c: i32,
    pub runaway_timeout_ms: u64,
}

#[derive(Parser, Debug)]
#[command(name = "tipctl", version, about = "Soldering tip temperature controller")]
pub struct Cli {
    /// Path to config TOML (defaults apply when omitted)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop against the simulated tip
    Run {
        /// Set point in °C (0 keeps the heater off)
        #[arg(long, value_name = "C")]
        target_c: u32,
        /// Stop after this many milliseconds (default: until Ctrl-C)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Override the supply wattage limit (0 disables)
        #[arg(long, value_name = "W")]
        supply_limit_w: Option<i32>,
        /// Suspend sampling ticks after this many milliseconds
        #[arg(long, value_name = "MS")]
        stall_after_ms: Option<u64>,
        /// Simulate a broken heater circuit
        #[arg(long, action = ArgAction::SetTrue)]
        open_heater: bool,
        /// Print loop counters to stderr
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Build the loop and run one cycle against the simulator
    SelfCheck,
}
