#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core presence detection (hardware-agnostic).
//!
//! All device interaction goes through the `lockguard_traits` seams:
//! `Rangefinder`, `BadgeReader` and `SessionControl`.
//!
//! ## Architecture
//!
//! - **Statistics**: culled mean and population deviation (`stats`)
//! - **Window**: ring of the last N accepted readings (`window`)
//! - **Policy**: stable-and-far decision rule, badge veto counter (`policy`)
//! - **Monitor**: per-tick state machine and session integration (`monitor`)
//! - **Worker**: paced, cancellable background thread (`worker`)
//! - **Calibration**: seated/away measurement (`calibration`)

pub mod atomic;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod event;
pub mod link_error;
pub mod mocks;
pub mod monitor;
pub mod policy;
pub mod stats;
pub mod status;
pub mod window;
pub mod worker;

pub use builder::MonitorBuilder;
pub use calibration::{Calibration, sample_average};
pub use config::{MAX_SAMPLE_SIZE, MonitorCfg, VetoCfg};
pub use error::{BuildError, GuardError, Result};
pub use event::GuardEvent;
pub use monitor::{PresenceMonitor, SessionNotifier};
pub use status::{MonitorState, TickStatus};
pub use worker::MonitorWorker;

pub use lockguard_traits::{SessionChange, Tone};
