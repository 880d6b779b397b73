//! `guard`: run the presence monitor until Ctrl-C or a fatal abort.

use crossbeam_channel as xch;
use lockguard_config::Config;
use lockguard_core::{GuardError, GuardEvent, MonitorCfg, MonitorWorker, PresenceMonitor, VetoCfg};
use tracing::{info, warn};

use crate::cli::json_mode;
use crate::devices;

/// Command-line overrides for the `[monitor]` table.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuardOverrides {
    pub interval_ms: Option<u64>,
    pub threshold_cm: Option<f64>,
    pub sample_size: Option<usize>,
}

impl GuardOverrides {
    pub fn apply(&self, cfg: &mut MonitorCfg) {
        if let Some(ms) = self.interval_ms {
            cfg.interval_ms = ms;
        }
        if let Some(cm) = self.threshold_cm {
            cfg.threshold_cm = cm;
        }
        if let Some(n) = self.sample_size {
            cfg.sample_size = n;
        }
    }
}

pub fn run_guard(cfg: &Config, overrides: GuardOverrides) -> eyre::Result<()> {
    let mut monitor_cfg: MonitorCfg = (&cfg.monitor).into();
    overrides.apply(&mut monitor_cfg);
    let veto: VetoCfg = (&cfg.veto).into();

    let devices = devices::open(cfg)?;
    let port = devices.port;
    let mut monitor = PresenceMonitor::builder()
        .with_rangefinder(devices.rangefinder)
        .with_session(devices.session)
        .with_badge_reader(devices.badge)
        .with_config(monitor_cfg.clone())
        .with_veto(veto)
        .build()?;

    if let Some(on) = cfg.device.range_sounds {
        monitor.configure_device(if on { "1" } else { "0" });
    }
    let events = monitor.subscribe();
    let _watcher = watch_session(cfg, &monitor);

    let (interrupt_tx, interrupt_rx) = xch::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;

    let worker = MonitorWorker::spawn(monitor)?;
    info!(
        port = %port,
        interval_ms = monitor_cfg.interval_ms,
        threshold_cm = monitor_cfg.threshold_cm,
        sample_size = monitor_cfg.sample_size,
        "guard started"
    );

    let aborted = loop {
        xch::select! {
            recv(events) -> ev => match ev {
                Ok(ev) => {
                    print_event(ev);
                    if ev == GuardEvent::Abort {
                        break true;
                    }
                }
                Err(_) => {
                    warn!("monitor event stream ended");
                    break false;
                }
            },
            recv(interrupt_rx) -> _ => {
                info!("interrupted; stopping guard");
                break false;
            }
        }
    };

    let monitor = worker.stop()?;
    info!(state = ?monitor.state(), "guard stopped");
    if aborted {
        return Err(GuardError::PortClosed.into());
    }
    Ok(())
}

fn print_event(ev: GuardEvent) {
    if json_mode() {
        println!("{}", event_json(ev));
        return;
    }
    match ev {
        GuardEvent::RangeRead(cm) => println!("range {cm} cm"),
        GuardEvent::Locked => println!("session locked"),
        GuardEvent::Unlocked => println!("session unlocked; watching"),
        GuardEvent::Abort => println!("Abort: rangefinder disconnected, session locked"),
    }
}

/// One JSON line per monitor event.
pub fn event_json(ev: GuardEvent) -> serde_json::Value {
    use serde_json::json;
    match ev {
        GuardEvent::RangeRead(cm) => json!({ "event": "RangeRead", "range_cm": cm }),
        GuardEvent::Locked => json!({ "event": "Locked" }),
        GuardEvent::Unlocked => json!({ "event": "Unlocked" }),
        GuardEvent::Abort => json!({ "event": "Abort" }),
    }
}

/// Forward OS lock/unlock edges to the monitor while guarding.
#[cfg(all(feature = "hardware", any(windows, target_os = "linux")))]
fn watch_session(
    cfg: &Config,
    monitor: &PresenceMonitor,
) -> Option<lockguard_hardware::SessionWatcher> {
    if !cfg.session.watch {
        warn!("session.watch is off; after its first lock the guard waits until restarted");
        return None;
    }
    let notifier = monitor.notifier();
    let poll = std::time::Duration::from_millis(cfg.session.poll_ms);
    info!(poll_ms = cfg.session.poll_ms, "watching session lock state");
    Some(lockguard_hardware::SessionWatcher::spawn(poll, move |change| {
        if !notifier.notify(change) {
            tracing::debug!(?change, "monitor gone; session change dropped");
        }
    }))
}

#[cfg(all(feature = "hardware", not(any(windows, target_os = "linux"))))]
fn watch_session(_cfg: &Config, _monitor: &PresenceMonitor) -> Option<()> {
    warn!(
        "session lock notifications are unavailable on this platform; after its first lock the guard waits until restarted"
    );
    None
}

/// Simulated sessions never change on their own.
#[cfg(not(feature = "hardware"))]
fn watch_session(cfg: &Config, _monitor: &PresenceMonitor) -> Option<()> {
    if cfg.session.watch {
        tracing::debug!("session lock notifications unavailable in simulation");
    }
    None
}
