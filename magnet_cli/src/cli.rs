//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "magnet", version, about = "Superconducting magnet supply CLI")]
pub struct Cli {
    /// Path to config TOML; a missing file means factory defaults
    #[arg(long, value_name = "FILE", default_value = "etc/magnet_config.toml")]
    pub config: PathBuf,

    /// Print results and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Talk to the simulated supply instead of the serial port
    #[arg(long, action = ArgAction::SetTrue)]
    pub sim: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RampTarget {
    Zero,
    Mid,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Direction {
    #[value(name = "+")]
    Plus,
    #[value(name = "-")]
    Minus,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read and print every supply setting
    Status,
    /// Switch the persistent-switch heater (interlocked)
    Heater {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Ramp to zero or to the MID setpoint and record the transient
    Ramp {
        #[arg(value_enum)]
        target: RampTarget,
        /// Write the recorded transient to this CSV file
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Change the MID setpoint (tesla)
    SetMid {
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Set the current direction (only while holding)
    Direction {
        #[arg(value_enum)]
        sign: Direction,
    },
    /// Sample the output until Ctrl-C, then export the record
    Record {
        /// Destination CSV file
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,
        /// Stop after this many samples instead of waiting for Ctrl-C
        #[arg(long, value_name = "N")]
        samples: Option<usize>,
    },
    /// Poll the supply and print the newest snapshot on every tick
    Watch {
        /// Poll period in ms
        #[arg(long, value_name = "MS", default_value_t = 1000)]
        interval_ms: u64,
        /// Stop after this many ticks (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        count: Option<usize>,
    },
    /// Quick health check (supply answers, ramp rate nominal)
    SelfCheck,
}
