//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls event and error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[inline]
pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(
    name = "lockguard",
    version,
    about = "Locks the workstation when its user walks away"
)]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/lockguard.toml")]
    pub config: PathBuf,

    /// Log and print events as JSON lines instead of pretty
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
    /// Watch the desk and lock the session once the user has left
    Guard {
        /// Override monitor.interval_ms (polling period)
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
        /// Override monitor.threshold_cm (distance beyond which the user is away)
        #[arg(long, value_name = "CM")]
        threshold_cm: Option<f64>,
        /// Override monitor.sample_size (readings per decision window)
        #[arg(long, value_name = "N")]
        sample_size: Option<usize>,
    },
    /// Measure the seated and away distances and derive the thresholds
    Calibrate {
        /// Readings taken per phase
        #[arg(long, value_name = "N", default_value_t = 16)]
        samples: usize,
        /// Pause between readings
        #[arg(long, value_name = "MS", default_value_t = 250)]
        rest_ms: u64,
        /// Countdown before the away phase starts
        #[arg(long, value_name = "SECS", default_value_t = 10)]
        away_delay_s: u64,
        /// Store the result in the [monitor] table of the config file
        #[arg(long, action = ArgAction::SetTrue)]
        write: bool,
        /// Do not wait for Enter before each phase
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Quick health check (device presence, one reading, badge probe)
    SelfCheck,
}
