//! `calibrate`: two-phase seated/away measurement on the terminal.

use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

use eyre::WrapErr;
use lockguard_config::{Config, MAX_SAMPLE_SIZE};
use lockguard_core::{Calibration, GuardError, sample_average};
use lockguard_traits::{Clock, MonotonicClock};
use tracing::info;

use crate::cli::json_mode;
use crate::devices;

#[derive(Debug, Clone, Copy)]
pub struct CalibrateOpts {
    pub samples: usize,
    pub rest: Duration,
    pub away_delay: Duration,
    pub write: bool,
    pub yes: bool,
}

pub fn run_calibrate(config_path: &Path, cfg: &Config, opts: CalibrateOpts) -> eyre::Result<()> {
    if opts.samples == 0 {
        return Err(GuardError::Config("--samples must be >= 1".into()).into());
    }
    if opts.samples > MAX_SAMPLE_SIZE {
        return Err(GuardError::Config(format!("--samples must be <= {MAX_SAMPLE_SIZE}")).into());
    }
    let mut devices = devices::open(cfg)?;
    let clock = MonotonicClock::new();
    info!(port = %devices.port, samples = opts.samples, "calibration started");

    prompt(opts.yes, "Sit at the desk as you normally would, then press Enter.")?;
    let seated_cm = sample_average(&mut devices.rangefinder, opts.samples, opts.rest, &clock)
        .wrap_err("seated measurement")?;
    say(&format!("Seated distance: {seated_cm:.1} cm"));

    prompt(opts.yes, "Press Enter, then walk away from the desk.")?;
    countdown(opts.away_delay, &clock);
    let away_cm = sample_average(&mut devices.rangefinder, opts.samples, opts.rest, &clock)
        .wrap_err("away measurement")?;
    say(&format!("Away distance: {away_cm:.1} cm"));

    let cal = Calibration { seated_cm, away_cm };
    let mut updated = cfg.clone();
    updated.monitor.threshold_cm = cal.threshold_cm();
    updated.monitor.max_tolerance_cm = cal.max_tolerance_cm();
    updated
        .validate()
        .map_err(|e| GuardError::Config(format!("calibrated values rejected: {e}")))?;
    info!(
        seated_cm,
        away_cm,
        threshold_cm = cal.threshold_cm(),
        max_tolerance_cm = cal.max_tolerance_cm(),
        "calibration complete"
    );

    report(&cal)?;

    if opts.write {
        store(config_path, &cal)?;
        say(&format!("Saved to {}", config_path.display()));
    }
    Ok(())
}

/// Merge the derived distances into `[monitor]` of the file at `path`.
pub fn store(path: &Path, cal: &Calibration) -> eyre::Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).wrap_err_with(|| format!("failed to read {}", path.display()));
        }
    };
    let merged =
        lockguard_config::apply_calibration(&existing, cal.threshold_cm(), cal.max_tolerance_cm())
            .map_err(|e| GuardError::Config(e.to_string()))?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create {}", dir.display()))?;
    }
    lockguard_core::atomic::write_atomic(path, merged.as_bytes())
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "calibration stored");
    Ok(())
}

fn report(cal: &Calibration) -> eyre::Result<()> {
    if json_mode() {
        println!(
            "{}",
            serde_json::json!({
                "seated_cm": cal.seated_cm,
                "away_cm": cal.away_cm,
                "threshold_cm": cal.threshold_cm(),
                "max_tolerance_cm": cal.max_tolerance_cm(),
            })
        );
        return Ok(());
    }
    let mut monitor = toml::Table::new();
    monitor.insert("threshold_cm".into(), toml::Value::Float(cal.threshold_cm()));
    monitor.insert(
        "max_tolerance_cm".into(),
        toml::Value::Float(cal.max_tolerance_cm()),
    );
    let mut root = toml::Table::new();
    root.insert("monitor".into(), toml::Value::Table(monitor));
    println!("\n{}", toml::to_string(&root)?);
    Ok(())
}

fn say(line: &str) {
    if json_mode() {
        info!("{line}");
    } else {
        println!("{line}");
    }
}

fn prompt(skip: bool, line: &str) -> eyre::Result<()> {
    say(line);
    if skip {
        return Ok(());
    }
    let mut buf = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut buf)
        .wrap_err("failed to read from stdin")?;
    Ok(())
}

fn countdown<C: Clock>(delay: Duration, clock: &C) {
    let mut left = delay.as_secs();
    while left > 0 {
        say(&format!("Measuring in {left} s..."));
        clock.sleep(Duration::from_secs(1));
        left -= 1;
    }
    let rest = delay - Duration::from_secs(delay.as_secs());
    clock.sleep(rest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockguard_traits::clock::test_clock::TestClock;

    #[test]
    fn countdown_waits_the_whole_delay() {
        let clock = TestClock::new();
        countdown(Duration::from_millis(2500), &clock);
        assert_eq!(clock.elapsed(), Duration::from_millis(2500));
    }

    #[test]
    fn store_creates_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc").join("lockguard.toml");
        store(
            &path,
            &Calibration {
                seated_cm: 80.0,
                away_cm: 250.0,
            },
        )
        .unwrap();
        let cfg = lockguard_config::load_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(cfg.monitor.threshold_cm, 130.0);
        assert_eq!(cfg.monitor.max_tolerance_cm, 250.0);
    }
}
