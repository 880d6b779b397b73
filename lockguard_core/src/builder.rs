//! Type-state builder for `PresenceMonitor`.
//!
//! The builder enforces at compile time that a rangefinder and a session
//! control are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;

use lockguard_traits::{BadgeReader, Rangefinder, SessionControl};

use crate::config::{MAX_SAMPLE_SIZE, MonitorCfg, VetoCfg};
use crate::error::{BuildError, Result};
use crate::monitor::{BoxedBadgeReader, BoxedRangefinder, BoxedSession, PresenceMonitor};

/// Badge reader used when none is configured: never sees a card.
struct NoBadgeReader;

impl BadgeReader for NoBadgeReader {
    fn has_badge(&mut self) -> bool {
        false
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `PresenceMonitor`. The configuration is validated on `build()`.
pub struct MonitorBuilder<R, S> {
    rangefinder: Option<BoxedRangefinder>,
    session: Option<BoxedSession>,
    badge: Option<BoxedBadgeReader>,
    cfg: Option<MonitorCfg>,
    veto: Option<VetoCfg>,
    _r: PhantomData<R>,
    _s: PhantomData<S>,
}

impl Default for MonitorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            rangefinder: None,
            session: None,
            badge: None,
            cfg: None,
            veto: None,
            _r: PhantomData,
            _s: PhantomData,
        }
    }
}

impl PresenceMonitor {
    /// Start building a monitor.
    pub fn builder() -> MonitorBuilder<Missing, Missing> {
        MonitorBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Single source of truth for runtime validation of the detection parameters.
pub(crate) fn validate(cfg: &MonitorCfg) -> Result<()> {
    if cfg.interval_ms == 0 {
        return Err(invalid("interval_ms must be >= 1"));
    }
    if cfg.sample_size == 0 {
        return Err(invalid("sample_size must be >= 1"));
    }
    if cfg.sample_size > MAX_SAMPLE_SIZE {
        return Err(invalid("sample_size must be <= 4096"));
    }
    if !(cfg.max_tolerance_cm.is_finite() && cfg.max_tolerance_cm > 0.0) {
        return Err(invalid("max_tolerance_cm must be positive"));
    }
    if !(cfg.threshold_cm.is_finite() && cfg.threshold_cm > 0.0) {
        return Err(invalid("threshold_cm must be positive"));
    }
    if cfg.threshold_cm >= cfg.max_tolerance_cm {
        return Err(invalid("threshold_cm must be below max_tolerance_cm"));
    }
    if !(cfg.std_epsilon.is_finite() && cfg.std_epsilon > 0.0) {
        return Err(invalid("std_epsilon must be positive"));
    }
    Ok(())
}

impl<R, S> MonitorBuilder<R, S> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<PresenceMonitor> {
        let rangefinder = self
            .rangefinder
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRangefinder))?;
        let session = self
            .session
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSession))?;
        let cfg = self.cfg.unwrap_or_default();
        validate(&cfg)?;

        Ok(PresenceMonitor::from_parts(
            rangefinder,
            self.badge.unwrap_or_else(|| Box::new(NoBadgeReader)),
            session,
            cfg,
            self.veto.unwrap_or_default(),
        ))
    }

    pub fn with_badge_reader(mut self, badge: impl BadgeReader + Send + 'static) -> Self {
        self.badge = Some(Box::new(badge));
        self
    }

    pub fn with_config(mut self, cfg: MonitorCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn with_veto(mut self, veto: VetoCfg) -> Self {
        self.veto = Some(veto);
        self
    }
}

// Setters that advance type-state
impl<S> MonitorBuilder<Missing, S> {
    pub fn with_rangefinder(
        self,
        rangefinder: impl Rangefinder + Send + 'static,
    ) -> MonitorBuilder<Set, S> {
        MonitorBuilder {
            rangefinder: Some(Box::new(rangefinder)),
            session: self.session,
            badge: self.badge,
            cfg: self.cfg,
            veto: self.veto,
            _r: PhantomData,
            _s: PhantomData,
        }
    }
}

impl<R> MonitorBuilder<R, Missing> {
    pub fn with_session(
        self,
        session: impl SessionControl + Send + 'static,
    ) -> MonitorBuilder<R, Set> {
        MonitorBuilder {
            rangefinder: self.rangefinder,
            session: Some(Box::new(session)),
            badge: self.badge,
            cfg: self.cfg,
            veto: self.veto,
            _r: PhantomData,
            _s: PhantomData,
        }
    }
}

impl MonitorBuilder<Set, Set> {
    /// Validate and build. Only available once rangefinder and session are set.
    pub fn build(self) -> Result<PresenceMonitor> {
        self.try_build()
    }
}
