//! `PresenceMonitor`: the per-tick presence decision state machine.
//!
//! Each tick reads one range sample, keeps it in the window if it is within
//! tolerance, and locks the session once the window is both stable and far.
//! A present badge may veto a bounded number of consecutive lock attempts.
//!
//! Session notifications arrive through `SessionNotifier` from any thread and
//! are applied by the monitor itself at the start of a tick or while waiting,
//! so the monitor is the only writer of its locked flag.

use std::time::Instant;

use crossbeam_channel as xch;
use lockguard_traits::{BadgeReader, Rangefinder, SessionChange, SessionControl, Tone};
use tracing::{debug, error, info, trace, warn};

use crate::config::{MonitorCfg, VetoCfg};
use crate::error::{GuardError, Result};
use crate::event::{EventBus, GuardEvent};
use crate::link_error::map_link_error;
use crate::policy::{VetoCounter, confidently_absent};
use crate::stats::WindowStats;
use crate::status::{MonitorState, TickStatus};
use crate::window::SampleWindow;

pub type BoxedRangefinder = Box<dyn Rangefinder + Send>;
pub type BoxedBadgeReader = Box<dyn BadgeReader + Send>;
pub type BoxedSession = Box<dyn SessionControl + Send>;

/// Cloneable handle for reporting OS session changes to a monitor.
///
/// Safe to use from any thread; the change is queued and applied by the
/// monitor at its next wait boundary.
#[derive(Debug, Clone)]
pub struct SessionNotifier {
    tx: xch::Sender<SessionChange>,
}

impl SessionNotifier {
    /// Queue a change. Returns false once the monitor has been dropped.
    pub fn notify(&self, change: SessionChange) -> bool {
        self.tx.send(change).is_ok()
    }

    pub fn locked(&self) -> bool {
        self.notify(SessionChange::Locked)
    }

    pub fn unlocked(&self) -> bool {
        self.notify(SessionChange::Unlocked)
    }
}

pub struct PresenceMonitor {
    pub(crate) rangefinder: BoxedRangefinder,
    pub(crate) badge: BoxedBadgeReader,
    pub(crate) session: BoxedSession,
    pub(crate) cfg: MonitorCfg,
    pub(crate) veto_cfg: VetoCfg,
    pub(crate) window: SampleWindow,
    pub(crate) vetoes: VetoCounter,
    pub(crate) locked: bool,
    pub(crate) state: MonitorState,
    pub(crate) events: EventBus,
    pub(crate) session_tx: xch::Sender<SessionChange>,
    pub(crate) session_rx: xch::Receiver<SessionChange>,
}

impl core::fmt::Debug for PresenceMonitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PresenceMonitor")
            .field("state", &self.state)
            .field("locked", &self.locked)
            .field("window_len", &self.window.len())
            .field("vetoes", &self.vetoes.count())
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl PresenceMonitor {
    pub(crate) fn from_parts(
        rangefinder: BoxedRangefinder,
        badge: BoxedBadgeReader,
        session: BoxedSession,
        cfg: MonitorCfg,
        veto_cfg: VetoCfg,
    ) -> Self {
        let (session_tx, session_rx) = xch::unbounded();
        Self {
            rangefinder,
            badge,
            session,
            window: SampleWindow::new(cfg.sample_size),
            vetoes: VetoCounter::new(veto_cfg.cap()),
            cfg,
            veto_cfg,
            locked: false,
            state: MonitorState::Idle,
            events: EventBus::default(),
            session_tx,
            session_rx,
        }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&mut self) -> xch::Receiver<GuardEvent> {
        self.events.subscribe()
    }

    pub fn notifier(&self) -> SessionNotifier {
        SessionNotifier {
            tx: self.session_tx.clone(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn config(&self) -> &MonitorCfg {
        &self.cfg
    }

    pub fn veto_config(&self) -> &VetoCfg {
        &self.veto_cfg
    }

    pub fn vetoes(&self) -> u32 {
        self.vetoes.count()
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    /// Replace the detection parameters. Starts over with an empty window.
    pub fn set_config(&mut self, cfg: MonitorCfg) -> Result<()> {
        crate::builder::validate(&cfg)?;
        debug!(?cfg, "monitor reconfigured");
        self.window = SampleWindow::new(cfg.sample_size);
        self.cfg = cfg;
        Ok(())
    }

    /// Replace the veto policy. Resets the veto count.
    pub fn set_veto(&mut self, veto_cfg: VetoCfg) {
        self.vetoes = VetoCounter::new(veto_cfg.cap());
        self.veto_cfg = veto_cfg;
    }

    /// Push a configuration payload to the device (best effort).
    pub fn configure_device(&mut self, payload: &str) {
        self.rangefinder.write_configuration(payload);
    }

    /// One decision step.
    pub fn tick(&mut self) -> TickStatus {
        if self.state == MonitorState::Aborted {
            return TickStatus::Aborted(GuardError::PortClosed);
        }
        self.drain_notifications();

        if self.locked {
            self.state = MonitorState::Locked;
            return TickStatus::Idle;
        }
        self.state = MonitorState::Polling;

        let range_cm = match self.rangefinder.read_range() {
            Ok(v) => v,
            Err(e) => {
                let err = map_link_error(&*e);
                if err == GuardError::PortClosed {
                    return self.abort(err);
                }
                warn!(error = %err, "range read failed; skipping tick");
                return TickStatus::Skipped;
            }
        };

        if !self.cfg.accepts(range_cm) {
            trace!(range_cm, "reading outside tolerance");
            return TickStatus::Skipped;
        }

        self.window.push(range_cm);
        let Some(stats) = WindowStats::of(self.window.as_slice()) else {
            return TickStatus::Skipped;
        };
        debug!(
            range_cm,
            culled_cm = stats.culled_cm,
            stddev = stats.stddev,
            samples = self.window.len(),
            "range"
        );
        self.events.emit(GuardEvent::RangeRead(range_cm));

        if !confidently_absent(
            stats.stddev,
            stats.culled_cm,
            self.cfg.std_epsilon,
            self.cfg.threshold_cm,
        ) {
            return TickStatus::Watching {
                range_cm,
                culled_cm: stats.culled_cm,
                stddev: stats.stddev,
            };
        }

        self.attempt_lock(stats)
    }

    fn attempt_lock(&mut self, stats: WindowStats) -> TickStatus {
        if !self.vetoes.exhausted() && self.badge.has_badge() && self.vetoes.try_veto() {
            let vetoes = self.vetoes.count();
            info!(vetoes, cap = self.vetoes.cap(), "badge present; lock vetoed");
            if self.veto_cfg.warning_tone {
                self.rangefinder.play_tone(Tone::Warning);
            }
            return TickStatus::Vetoed { vetoes };
        }

        if !self.session.lock_session() {
            warn!("session lock failed; retrying on a later tick");
            return TickStatus::LockFailed;
        }

        info!(
            culled_cm = stats.culled_cm,
            stddev = stats.stddev,
            "user absent; session locked"
        );
        self.enter_locked();
        TickStatus::Locked
    }

    fn enter_locked(&mut self) {
        self.vetoes.reset();
        self.window.clear();
        self.locked = true;
        self.state = MonitorState::Locked;
        self.rangefinder.play_tone(Tone::Lock);
        self.events.emit(GuardEvent::Locked);
    }

    fn abort(&mut self, err: GuardError) -> TickStatus {
        error!(error = %err, "rangefinder channel lost; locking session and stopping");
        if !self.session.lock_session() {
            error!("safety lock failed");
        }
        self.state = MonitorState::Aborted;
        self.events.emit(GuardEvent::Abort);
        TickStatus::Aborted(err)
    }

    /// Apply an OS session change immediately.
    ///
    /// A change that repeats the current state only resets the veto count.
    pub fn on_session_change(&mut self, change: SessionChange) {
        if self.state == MonitorState::Aborted {
            debug!(?change, "session change ignored after abort");
            return;
        }
        self.vetoes.reset();
        let locked = change == SessionChange::Locked;
        if self.locked == locked {
            trace!(?change, "session already in reported state");
            return;
        }

        info!(?change, "session state changed");
        if locked {
            self.enter_locked();
        } else {
            self.locked = false;
            self.state = MonitorState::Polling;
            self.rangefinder.play_tone(Tone::Unlock);
            self.events.emit(GuardEvent::Unlocked);
        }
    }

    fn drain_notifications(&mut self) {
        while let Ok(change) = self.session_rx.try_recv() {
            self.on_session_change(change);
        }
    }

    /// Apply session notifications until `deadline`.
    ///
    /// Returns false as soon as `stop` fires or its sender is dropped.
    pub(crate) fn wait_until(&mut self, deadline: Instant, stop: &xch::Receiver<()>) -> bool {
        let session_rx = self.session_rx.clone();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            xch::select! {
                recv(stop) -> _ => return false,
                recv(session_rx) -> msg => {
                    if let Ok(change) = msg {
                        self.on_session_change(change);
                    }
                }
                default(remaining) => return true,
            }
        }
    }
}
