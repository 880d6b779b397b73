#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `lockguard`: locks the workstation when the ultrasonic rangefinder sees
//! that its user has left the desk.

mod calibrate;
mod cli;
mod devices;
mod error_fmt;
mod guard;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use lockguard_config::Config;
use lockguard_core::GuardError;
use lockguard_core::link_error::map_link_error;
use lockguard_traits::{BadgeReader, Rangefinder};
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{Cli, Commands, JSON_MODE, json_mode};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    // Dropped before exit so the file sink flushes its queue.
    let mut file_guard = None;
    let code = match run(cli, &mut file_guard) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            if json_mode() {
                println!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    drop(file_guard);
    std::process::exit(code);
}

fn run(cli: Cli, file_guard: &mut Option<WorkerGuard>) -> eyre::Result<()> {
    let (cfg, found) = load_config(&cli.config)?;
    *file_guard = init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    if !found {
        tracing::info!(path = %cli.config.display(), "config file not found; using defaults");
    }

    match cli.cmd {
        Commands::Guard {
            interval_ms,
            threshold_cm,
            sample_size,
        } => guard::run_guard(
            &cfg,
            guard::GuardOverrides {
                interval_ms,
                threshold_cm,
                sample_size,
            },
        ),
        Commands::Calibrate {
            samples,
            rest_ms,
            away_delay_s,
            write,
            yes,
        } => calibrate::run_calibrate(
            &cli.config,
            &cfg,
            calibrate::CalibrateOpts {
                samples,
                rest: Duration::from_millis(rest_ms),
                away_delay: Duration::from_secs(away_delay_s),
                write,
                yes,
            },
        ),
        Commands::SelfCheck => self_check(&cfg),
    }
}

/// Read and validate the TOML at `path`. A missing file yields the defaults;
/// the flag reports whether the file existed.
fn load_config(path: &Path) -> eyre::Result<(Config, bool)> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Config::default(), false)),
        Err(e) => {
            return Err(e).wrap_err_with(|| format!("failed to read {}", path.display()));
        }
    };
    let cfg = lockguard_config::load_toml(&text)
        .map_err(|e| GuardError::Config(format!("{}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| GuardError::Config(e.to_string()))?;
    Ok((cfg, true))
}

/// Console subscriber plus the optional `[logging]` file sink. The returned
/// guard must outlive every log call that should reach the file.
fn init_tracing(
    json: bool,
    level: &str,
    logging: &lockguard_config::Logging,
) -> eyre::Result<Option<WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| GuardError::Config(format!("--log-level {level:?}: {e}")))?,
    };

    let mut guard = None;
    let file_layer = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let Some(name) = path.file_name() else {
                return Err(GuardError::Config(format!("logging.file {file:?} has no file name")).into());
            };
            let rotation = match logging.rotation.as_deref() {
                Some("daily") => Rotation::DAILY,
                Some("hourly") => Rotation::HOURLY,
                _ => Rotation::NEVER,
            };
            let appender = RollingFileAppender::builder()
                .rotation(rotation)
                .filename_prefix(name.to_string_lossy().into_owned())
                .build(dir)
                .wrap_err_with(|| format!("failed to open log file {file}"))?;
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            let file_filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
                .map_err(|e| GuardError::Config(format!("logging.level: {e}")))?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(file_layer);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .try_init()?;
    }
    Ok(guard)
}

fn self_check(cfg: &Config) -> eyre::Result<()> {
    let mut devices = devices::open(cfg).wrap_err("self-check")?;
    let range_cm = devices
        .rangefinder
        .read_range()
        .map_err(|e| eyre::Report::new(map_link_error(&*e)))
        .wrap_err("self-check")?;
    let badge = devices.badge.has_badge();
    tracing::info!(port = %devices.port, range_cm, badge, "self-check passed");
    if json_mode() {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "port": devices.port,
                "range_cm": range_cm,
                "badge": badge,
            })
        );
    } else {
        println!("OK");
        println!("port: {}", devices.port);
        if range_cm > 0 {
            println!("range: {range_cm} cm");
        } else {
            println!("range: no echo");
        }
        println!("badge: {}", if badge { "present" } else { "absent" });
    }
    Ok(())
}
